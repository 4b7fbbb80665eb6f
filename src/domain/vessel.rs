// Domain-level vessel records and the snapshot type handed to readers.

use std::sync::Arc;

/// Three-component vector used for headings and positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    /// Bow axis every instrument angle is measured from.
    pub const REFERENCE: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Authoritative vessel record. Only the registry holds these.
#[derive(Debug)]
pub struct Vessel {
    name: Arc<str>,
    heading: Vec3,
    position: Vec3,
    // Registry-wide revision of the last accepted change; never reused across leave/join.
    revision: u64,
}

impl Vessel {
    pub fn new(name: Arc<str>, revision: u64) -> Self {
        Self {
            name,
            heading: Vec3::REFERENCE,
            position: Vec3::ZERO,
            revision,
        }
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn heading(&self) -> Vec3 {
        self.heading
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // Callers validate finiteness and hand out a fresh revision before mutating.
    pub(crate) fn set_heading(&mut self, heading: Vec3, revision: u64) {
        self.heading = heading;
        self.revision = revision;
    }

    pub(crate) fn set_position(&mut self, position: Vec3, revision: u64) {
        self.position = position;
        self.revision = revision;
    }
}

/// Immutable copy of a vessel's public state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselState {
    pub name: Arc<str>,
    pub heading: Vec3,
    pub position: Vec3,
    pub revision: u64,
}

impl From<&Vessel> for VesselState {
    fn from(v: &Vessel) -> Self {
        Self {
            name: v.name.clone(),
            heading: v.heading,
            position: v.position,
            revision: v.revision,
        }
    }
}
