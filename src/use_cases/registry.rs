// Authoritative roster of vessels. The registry is the only owner of `Vessel` records.

use crate::domain::{RegistryError, Vec3, Vessel, VesselState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Roster {
    // Registration order; `list()` iterates in this order.
    order: Vec<Arc<str>>,
    vessels: HashMap<Arc<str>, Vessel>,
    // Last revision handed out. Shared by all vessels and never reset.
    last_revision: u64,
}

impl Roster {
    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }

    fn insert(&mut self, name: &str) -> Result<VesselState, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        if self.vessels.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let name: Arc<str> = Arc::from(name);
        let vessel = Vessel::new(name.clone(), self.next_revision());
        let state = VesselState::from(&vessel);
        self.order.push(name.clone());
        self.vessels.insert(name, vessel);
        Ok(state)
    }

    // Validates, stamps the next revision, and applies one vector change.
    fn apply(
        &mut self,
        name: &str,
        value: Vec3,
        set: fn(&mut Vessel, Vec3, u64),
    ) -> Result<VesselState, RegistryError> {
        let vessel = self
            .vessels
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !value.is_finite() {
            return Err(RegistryError::InvalidVector(name.to_string()));
        }
        self.last_revision += 1;
        set(vessel, value, self.last_revision);
        Ok(VesselState::from(&*vessel))
    }
}

/// Thread-safe, ordered registry of vessels keyed by name.
#[derive(Debug, Default)]
pub struct VesselRegistry {
    roster: RwLock<Roster>,
}

impl VesselRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a fixed roster, preserving roster order.
    pub fn seeded<I, S>(names: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster = Roster::default();
        for name in names {
            roster.insert(name.as_ref())?;
        }
        info!(vessels = roster.order.len(), "registry seeded");
        Ok(Self {
            roster: RwLock::new(roster),
        })
    }

    /// Registers a new vessel pointing along the reference axis.
    pub async fn register(&self, name: &str) -> Result<VesselState, RegistryError> {
        let mut roster = self.roster.write().await;
        let state = roster.insert(name)?;
        info!(vessel = %state.name, "vessel registered");
        Ok(state)
    }

    /// Removes a vessel that left the simulation.
    pub async fn remove(&self, name: &str) -> Result<VesselState, RegistryError> {
        let mut roster = self.roster.write().await;
        let vessel = roster
            .vessels
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        roster.order.retain(|n| n.as_ref() != name);
        info!(vessel = %name, "vessel removed");
        Ok(VesselState::from(&vessel))
    }

    /// Snapshot of every vessel in registration order.
    pub async fn list(&self) -> Vec<VesselState> {
        let roster = self.roster.read().await;
        roster
            .order
            .iter()
            .filter_map(|name| roster.vessels.get(name))
            .map(VesselState::from)
            .collect()
    }

    pub async fn find(&self, name: &str) -> Result<VesselState, RegistryError> {
        let roster = self.roster.read().await;
        roster
            .vessels
            .get(name)
            .map(VesselState::from)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.roster.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replaces the heading in one write section; readers never see a partial vector.
    pub async fn update_heading(
        &self,
        name: &str,
        heading: Vec3,
    ) -> Result<VesselState, RegistryError> {
        let state = self
            .roster
            .write()
            .await
            .apply(name, heading, Vessel::set_heading)?;
        debug!(vessel = %name, revision = state.revision, "heading updated");
        Ok(state)
    }

    pub async fn update_position(
        &self,
        name: &str,
        position: Vec3,
    ) -> Result<VesselState, RegistryError> {
        let state = self
            .roster
            .write()
            .await
            .apply(name, position, Vessel::set_position)?;
        debug!(vessel = %name, revision = state.revision, "position updated");
        Ok(state)
    }
}
