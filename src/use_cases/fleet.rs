// Simulation-loop entry point: registry mutations plus the ship-topic fan-out they trigger.

use super::channel::{DeliveryReport, UpdateChannel};
use super::registry::VesselRegistry;
use crate::domain::{RegistryError, Vec3, VesselState};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry and update channel wired together for the simulation loop.
#[derive(Clone)]
pub struct Fleet {
    registry: Arc<VesselRegistry>,
    channel: Arc<UpdateChannel>,
}

impl Fleet {
    pub fn new(registry: Arc<VesselRegistry>, channel: Arc<UpdateChannel>) -> Self {
        Self { registry, channel }
    }

    pub fn registry(&self) -> &Arc<VesselRegistry> {
        &self.registry
    }

    pub fn channel(&self) -> &Arc<UpdateChannel> {
        &self.channel
    }

    pub async fn join(&self, name: &str) -> Result<VesselState, RegistryError> {
        self.registry.register(name).await
    }

    pub async fn leave(&self, name: &str) -> Result<VesselState, RegistryError> {
        let state = self.registry.remove(name).await?;
        self.channel.forget_vessel(name).await;
        Ok(state)
    }

    /// Registry errors come back to the caller; delivery failures are only logged.
    pub async fn update_heading(
        &self,
        name: &str,
        heading: Vec3,
    ) -> Result<VesselState, RegistryError> {
        let state = self.registry.update_heading(name, heading).await?;
        self.publish(state.clone()).await;
        Ok(state)
    }

    pub async fn update_position(
        &self,
        name: &str,
        position: Vec3,
    ) -> Result<VesselState, RegistryError> {
        let state = self.registry.update_position(name, position).await?;
        self.publish(state.clone()).await;
        Ok(state)
    }

    async fn publish(&self, state: VesselState) {
        let vessel = state.name.clone();
        let report: DeliveryReport = self.channel.publish_vessel_update(state.into()).await;
        if !report.failures.is_empty() {
            warn!(
                vessel = %vessel,
                failed = report.failures.len(),
                delivered = report.delivered,
                "ship update not delivered to every subscriber"
            );
        } else {
            debug!(vessel = %vessel, delivered = report.delivered, "ship update published");
        }
    }
}
