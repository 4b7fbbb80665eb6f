// Domain layer: vessel records, instrument math, and registry errors.

pub mod errors;
pub mod instruments;
pub mod vessel;

pub use errors::RegistryError;
pub use instruments::{
    AzimuthPolar, InstrumentFrame, ProjectionAngles, azimuth_polar, projection_angles,
};
pub use vessel::{Vec3, Vessel, VesselState};
