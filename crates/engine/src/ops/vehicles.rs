use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, MaintenanceState, ResultEngine, RentalState, Vehicle, VehicleStatus, maintenance,
    rentals, util::normalize_plate, vehicles,
};

use super::{Engine, with_tx};

pub(super) async fn require_vehicle(db: &DatabaseTransaction, plate: &str) -> ResultEngine<Vehicle> {
    let model = vehicles::Entity::find_by_id(plate.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("vehicle {plate}")))?;
    Vehicle::try_from(model)
}

async fn save_vehicle(db: &DatabaseTransaction, vehicle: &Vehicle) -> ResultEngine<()> {
    vehicles::ActiveModel {
        plate: ActiveValue::Unchanged(vehicle.plate.clone()),
        odometer_km: ActiveValue::Set(vehicle.odometer_km),
        status: ActiveValue::Set(vehicle.status.as_str().to_string()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Raises the odometer of `plate` to `reading` if greater. Never decreases it.
pub(super) async fn raise_odometer(
    db: &DatabaseTransaction,
    plate: &str,
    reading: i64,
) -> ResultEngine<()> {
    let mut vehicle = require_vehicle(db, plate).await?;
    if vehicle.raise_odometer(reading) {
        save_vehicle(db, &vehicle).await?;
    }
    Ok(())
}

/// Derives the availability of `plate` from its open maintenance events and
/// active rentals.
///
/// An active replacement rental keeps the vehicle `OutOfService`; otherwise
/// an event in the workshop keeps it `InMaintenance`; otherwise a vehicle
/// held by either is released to `Available`. `InUse` and `Decommissioned`
/// vehicles are only overridden while held.
pub(super) async fn settle_vehicle_status(
    db: &DatabaseTransaction,
    plate: &str,
) -> ResultEngine<VehicleStatus> {
    let mut vehicle = require_vehicle(db, plate).await?;
    if vehicle.status == VehicleStatus::Decommissioned {
        return Ok(vehicle.status);
    }

    let replaced = rentals::Entity::find()
        .filter(rentals::Column::ReplacedVehicle.eq(plate))
        .filter(rentals::Column::State.eq(RentalState::Active.as_str()))
        .one(db)
        .await?
        .is_some();
    let in_shop = maintenance::Entity::find()
        .filter(maintenance::Column::VehiclePlate.eq(plate))
        .filter(maintenance::Column::State.is_in([
            MaintenanceState::InShop.as_str(),
            MaintenanceState::AwaitingParts.as_str(),
        ]))
        .one(db)
        .await?
        .is_some();

    let status = if replaced {
        VehicleStatus::OutOfService
    } else if in_shop {
        VehicleStatus::InMaintenance
    } else if matches!(
        vehicle.status,
        VehicleStatus::InMaintenance | VehicleStatus::OutOfService
    ) {
        VehicleStatus::Available
    } else {
        vehicle.status
    };

    if status != vehicle.status {
        tracing::info!(
            plate,
            from = vehicle.status.as_str(),
            to = status.as_str(),
            "vehicle status changed"
        );
        vehicle.status = status;
        save_vehicle(db, &vehicle).await?;
    }
    Ok(status)
}

impl Engine {
    /// Registers a vehicle.
    pub async fn create_vehicle(&self, vehicle: Vehicle) -> ResultEngine<Vehicle> {
        with_tx!(self, |db_tx| {
            let exists = vehicles::Entity::find_by_id(vehicle.plate.clone())
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(vehicle.plate));
            }
            vehicles::ActiveModel::from(&vehicle).insert(&db_tx).await?;
            Ok(vehicle)
        })
    }

    pub async fn vehicle(&self, plate: &str) -> ResultEngine<Vehicle> {
        let plate = normalize_plate(plate)?;
        with_tx!(self, |db_tx| require_vehicle(&db_tx, &plate).await)
    }

    /// All vehicles ordered by plate.
    pub async fn vehicles(&self) -> ResultEngine<Vec<Vehicle>> {
        with_tx!(self, |db_tx| {
            vehicles::Entity::find()
                .order_by_asc(vehicles::Column::Plate)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Vehicle::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Moves a vehicle to `Decommissioned` or back to `Available`, or marks
    /// it `InUse`. Workshop and rental states are derived and cannot be set
    /// directly.
    pub async fn set_vehicle_status(
        &self,
        plate: &str,
        status: VehicleStatus,
    ) -> ResultEngine<Vehicle> {
        if matches!(
            status,
            VehicleStatus::InMaintenance | VehicleStatus::OutOfService
        ) {
            return Err(EngineError::InvalidTransition(format!(
                "vehicle status {} is derived from maintenance and rentals",
                status.as_str()
            )));
        }
        let plate = normalize_plate(plate)?;
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let mut vehicle = require_vehicle(&db_tx, &plate).await?;
            vehicle.status = status;
            save_vehicle(&db_tx, &vehicle).await?;
            if status != VehicleStatus::Decommissioned {
                vehicle.status = settle_vehicle_status(&db_tx, &plate).await?;
            }
            Ok(vehicle)
        })
    }
}
