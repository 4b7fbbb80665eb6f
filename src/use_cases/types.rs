// Use-case level events delivered through the update channel.

use crate::domain::VesselState;
use std::sync::Arc;

/// Identifier the update channel assigns to each client connection.
pub type ClientId = u64;

/// Named class of updates a client can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Full-world snapshots on every broadcast tick.
    World,
    /// State changes for one vessel.
    Ship(Arc<str>),
}

/// One client's view of the world: its own vessel plus every other vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub ship: VesselState,
    pub other_ships: Vec<VesselState>,
}

/// A single vessel's state, shared across all subscribers of that vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipUpdate(pub Arc<VesselState>);

impl ShipUpdate {
    pub fn vessel(&self) -> &VesselState {
        &self.0
    }
}

impl From<VesselState> for ShipUpdate {
    fn from(state: VesselState) -> Self {
        Self(Arc::new(state))
    }
}

/// Messages queued for a single client connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    World(WorldSnapshot),
    Ship(ShipUpdate),
}

/// Per-connection lifecycle as seen by the update channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Subscribed(Vec<Topic>),
    Disconnected,
}
