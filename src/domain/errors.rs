use std::fmt;

// Domain-level errors for registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A vessel with this name is already registered.
    DuplicateName(String),
    /// No vessel with this name is registered.
    NotFound(String),
    /// A heading or position update carried a NaN or infinite component.
    InvalidVector(String),
    /// Vessel names must contain at least one non-whitespace character.
    InvalidName,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => write!(f, "vessel {name} already registered"),
            RegistryError::NotFound(name) => write!(f, "vessel {name} not found"),
            RegistryError::InvalidVector(name) => {
                write!(f, "vector for vessel {name} has non-finite components")
            }
            RegistryError::InvalidName => write!(f, "vessel name is required"),
        }
    }
}

impl std::error::Error for RegistryError {}
