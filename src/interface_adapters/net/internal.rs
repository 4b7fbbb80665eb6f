// Internal HTTP routes used by the simulation loop and bootstrap tooling.

use crate::domain::{InstrumentFrame, Vec3};
use crate::interface_adapters::protocol::{InstrumentsDto, Vec3Dto, VesselStateDto};
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct CreateVesselRequest {
    // Unique vessel name; surrounding whitespace is ignored.
    name: String,
}

pub async fn list_vessels_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let vessels = state.fleet.registry().list().await;
    let body: Vec<VesselStateDto> = vessels.iter().map(VesselStateDto::from).collect();
    Json(body)
}

pub async fn create_vessel_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVesselRequest>,
) -> impl IntoResponse {
    match state.fleet.join(&payload.name).await {
        Ok(vessel) => (StatusCode::CREATED, Json(VesselStateDto::from(&vessel))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_vessel_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.fleet.registry().find(&name).await {
        Ok(vessel) => Json(VesselStateDto::from(&vessel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_vessel_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.fleet.leave(&name).await {
        Ok(vessel) => Json(VesselStateDto::from(&vessel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_heading_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(heading): Json<Vec3Dto>,
) -> impl IntoResponse {
    match state.fleet.update_heading(&name, Vec3::from(heading)).await {
        Ok(vessel) => Json(VesselStateDto::from(&vessel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_position_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(position): Json<Vec3Dto>,
) -> impl IntoResponse {
    match state.fleet.update_position(&name, Vec3::from(position)).await {
        Ok(vessel) => Json(VesselStateDto::from(&vessel)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_instruments_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.fleet.registry().find(&name).await {
        Ok(vessel) => {
            let frame = InstrumentFrame::resolve(vessel.heading);
            Json(InstrumentsDto::new(
                &vessel.name,
                frame.azimuth_polar(),
                frame.projection_angles(),
            ))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}
