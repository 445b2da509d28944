//! The module contains the `Vehicle` struct and its availability status.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    util::{normalize_plate, normalize_required_text},
};

/// Default distance between preventive services.
pub const DEFAULT_SERVICE_INTERVAL_KM: i64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    InMaintenance,
    OutOfService,
    Decommissioned,
}

impl VehicleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::InMaintenance => "in_maintenance",
            Self::OutOfService => "out_of_service",
            Self::Decommissioned => "decommissioned",
        }
    }
}

impl TryFrom<&str> for VehicleStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "available" => Ok(Self::Available),
            "in_use" => Ok(Self::InUse),
            "in_maintenance" => Ok(Self::InMaintenance),
            "out_of_service" => Ok(Self::OutOfService),
            "decommissioned" => Ok(Self::Decommissioned),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid vehicle status: {other}"
            ))),
        }
    }
}

/// A fleet vehicle, identified by its plate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub brand: String,
    pub model: String,
    /// Current odometer reading. Never decreases.
    pub odometer_km: i64,
    pub service_interval_km: i64,
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn new(plate: &str, brand: &str, model: &str, odometer_km: i64) -> ResultEngine<Self> {
        if odometer_km < 0 {
            return Err(EngineError::InvalidAmount(
                "odometer_km must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            plate: normalize_plate(plate)?,
            brand: normalize_required_text(brand, "brand")?,
            model: normalize_required_text(model, "model")?,
            odometer_km,
            service_interval_km: DEFAULT_SERVICE_INTERVAL_KM,
            status: VehicleStatus::Available,
        })
    }

    #[must_use]
    pub fn with_service_interval(mut self, km: i64) -> Self {
        self.service_interval_km = km.max(0);
        self
    }

    /// Kilometres left before the next preventive service is due.
    pub fn km_to_next_service(&self) -> i64 {
        if self.service_interval_km > 0 {
            self.service_interval_km - self.odometer_km % self.service_interval_km
        } else {
            0
        }
    }

    /// Raises the odometer to `reading` if it is greater than the current
    /// value. Returns `true` when the odometer changed.
    pub fn raise_odometer(&mut self, reading: i64) -> bool {
        if reading > self.odometer_km {
            self.odometer_km = reading;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub odometer_km: i64,
    pub service_interval_km: i64,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Vehicle> for ActiveModel {
    fn from(value: &Vehicle) -> Self {
        Self {
            plate: ActiveValue::Set(value.plate.clone()),
            brand: ActiveValue::Set(value.brand.clone()),
            model: ActiveValue::Set(value.model.clone()),
            odometer_km: ActiveValue::Set(value.odometer_km),
            service_interval_km: ActiveValue::Set(value.service_interval_km),
            status: ActiveValue::Set(value.status.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Vehicle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            status: VehicleStatus::try_from(model.status.as_str())?,
            plate: model.plate,
            brand: model.brand,
            model: model.model,
            odometer_km: model.odometer_km,
            service_interval_km: model.service_interval_km,
        })
    }
}
