// Use cases layer: registry, update fan-out, and the world broadcaster.

pub mod broadcast;
pub mod channel;
pub mod fleet;
pub mod registry;
pub mod types;

pub use channel::{ChannelError, DeliveryFailure, DeliveryReport, UpdateChannel};
pub use fleet::Fleet;
pub use registry::VesselRegistry;
pub use types::{ClientId, ConnectionState, Outbound, ShipUpdate, Topic, WorldSnapshot};
