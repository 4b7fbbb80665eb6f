// Wire protocol DTOs and conversions for client-facing messages.
// Field names follow what the instrument clients already read (`otherShips`, `angleZX`).

use crate::domain::instruments::{AzimuthPolar, ProjectionAngles};
use crate::domain::{Vec3, VesselState};
use crate::use_cases::{Outbound, Topic, WorldSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Identity assigned to the connection by the update channel.
    Identity { client_id: String },
    // World snapshot scoped to the client's own vessel.
    World(WorldEventDto),
    // Single-vessel update for a ship topic.
    Ship(VesselStateDto),
    // Acknowledgements for client commands.
    Boarded { ship: String },
    Subscribed { topic: TopicDto },
    Unsubscribed { topic: TopicDto },
    // Rejected command; the connection stays open.
    Error { message: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Selects the vessel world snapshots are built around.
    Board { ship: String },
    Subscribe(TopicDto),
    Unsubscribe(TopicDto),
}

/// Topic identifier on the wire: `{"topic":"world"}` or `{"topic":"ship","name":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum TopicDto {
    World,
    Ship { name: String },
}

impl From<TopicDto> for Topic {
    fn from(topic: TopicDto) -> Self {
        match topic {
            TopicDto::World => Topic::World,
            TopicDto::Ship { name } => Topic::Ship(Arc::from(name.trim())),
        }
    }
}

impl From<&Topic> for TopicDto {
    fn from(topic: &Topic) -> Self {
        match topic {
            Topic::World => TopicDto::World,
            Topic::Ship(name) => TopicDto::Ship {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Dto {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3> for Vec3Dto {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3Dto> for Vec3 {
    fn from(v: Vec3Dto) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Public vessel state. The internal revision counter is not sent.
#[derive(Debug, Clone, Serialize)]
pub struct VesselStateDto {
    pub name: String,
    pub heading: Vec3Dto,
    pub position: Vec3Dto,
}

impl From<&VesselState> for VesselStateDto {
    fn from(state: &VesselState) -> Self {
        Self {
            name: state.name.to_string(),
            heading: state.heading.into(),
            position: state.position.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldEventDto {
    pub ship: VesselStateDto,
    #[serde(rename = "otherShips")]
    pub other_ships: Vec<VesselStateDto>,
}

impl From<&WorldSnapshot> for WorldEventDto {
    fn from(snapshot: &WorldSnapshot) -> Self {
        Self {
            ship: VesselStateDto::from(&snapshot.ship),
            other_ships: snapshot
                .other_ships
                .iter()
                .map(VesselStateDto::from)
                .collect(),
        }
    }
}

impl From<&Outbound> for ServerMessage {
    fn from(msg: &Outbound) -> Self {
        match msg {
            Outbound::World(snapshot) => ServerMessage::World(snapshot.into()),
            Outbound::Ship(update) => ServerMessage::Ship(update.vessel().into()),
        }
    }
}

/// Instrument readout for one vessel's current heading.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentsDto {
    pub name: String,
    pub azimuth: f64,
    pub polar: f64,
    #[serde(rename = "angleZX")]
    pub angle_zx: f64,
    #[serde(rename = "angleYZ")]
    pub angle_yz: f64,
}

impl InstrumentsDto {
    pub fn new(name: &str, bearing: AzimuthPolar, projection: ProjectionAngles) -> Self {
        Self {
            name: name.to_string(),
            azimuth: bearing.azimuth,
            polar: bearing.polar,
            angle_zx: projection.angle_zx,
            angle_yz: projection.angle_yz,
        }
    }
}
