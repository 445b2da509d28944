//! Vehicle API endpoints

use api_types::vehicle::{Vehicle, VehicleNew, VehicleStatus, VehicleStatusUpdate};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState};

fn map_status(status: engine::VehicleStatus) -> VehicleStatus {
    match status {
        engine::VehicleStatus::Available => VehicleStatus::Available,
        engine::VehicleStatus::InUse => VehicleStatus::InUse,
        engine::VehicleStatus::InMaintenance => VehicleStatus::InMaintenance,
        engine::VehicleStatus::OutOfService => VehicleStatus::OutOfService,
        engine::VehicleStatus::Decommissioned => VehicleStatus::Decommissioned,
    }
}

fn parse_status(status: VehicleStatus) -> engine::VehicleStatus {
    match status {
        VehicleStatus::Available => engine::VehicleStatus::Available,
        VehicleStatus::InUse => engine::VehicleStatus::InUse,
        VehicleStatus::InMaintenance => engine::VehicleStatus::InMaintenance,
        VehicleStatus::OutOfService => engine::VehicleStatus::OutOfService,
        VehicleStatus::Decommissioned => engine::VehicleStatus::Decommissioned,
    }
}

fn map_vehicle(vehicle: engine::Vehicle) -> Vehicle {
    Vehicle {
        km_to_next_service: vehicle.km_to_next_service(),
        status: map_status(vehicle.status),
        plate: vehicle.plate,
        brand: vehicle.brand,
        model: vehicle.model,
        odometer_km: vehicle.odometer_km,
        service_interval_km: vehicle.service_interval_km,
    }
}

/// Handle requests for registering a vehicle
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<VehicleNew>,
) -> Result<(StatusCode, Json<Vehicle>), ServerError> {
    let mut vehicle = engine::Vehicle::new(
        &payload.plate,
        &payload.brand,
        &payload.model,
        payload.odometer_km,
    )?;
    if let Some(km) = payload.service_interval_km {
        vehicle = vehicle.with_service_interval(km);
    }
    let vehicle = state.engine.create_vehicle(vehicle).await?;
    Ok((StatusCode::CREATED, Json(map_vehicle(vehicle))))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(plate): Path<String>,
) -> Result<Json<Vehicle>, ServerError> {
    let vehicle = state.engine.vehicle(&plate).await?;
    Ok(Json(map_vehicle(vehicle)))
}

/// Handle requests for setting the status of a vehicle
pub async fn update_status(
    State(state): State<ServerState>,
    Path(plate): Path<String>,
    Json(payload): Json<VehicleStatusUpdate>,
) -> Result<Json<Vehicle>, ServerError> {
    let vehicle = state
        .engine
        .set_vehicle_status(&plate, parse_status(payload.status))
        .await?;
    Ok(Json(map_vehicle(vehicle)))
}
