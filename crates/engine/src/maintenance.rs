//! Maintenance events and their lifecycle.
//!
//! A maintenance event moves through the following states:
//!
//! ```text
//! Scheduled ──► InShop ◄──► AwaitingParts
//!                 │              │
//!                 └──► Finalized ◄┘
//!
//! any non-terminal ──► Cancelled
//! Finalized ──► Cancelled   (administrative reversal)
//! ```
//!
//! Only `Finalized` events count against a budget allocation. The total real
//! cost is always `labor_cost + parts_cost` and is never stored.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    aggregate::LedgerKey,
    util::{budget_year, normalize_plate, normalize_required_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Preventive,
    Corrective,
}

impl MaintenanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preventive => "preventive",
            Self::Corrective => "corrective",
        }
    }
}

impl TryFrom<&str> for MaintenanceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "preventive" => Ok(Self::Preventive),
            "corrective" => Ok(Self::Corrective),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid maintenance kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceState {
    Scheduled,
    InShop,
    AwaitingParts,
    Finalized,
    Cancelled,
}

impl MaintenanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InShop => "in_shop",
            Self::AwaitingParts => "awaiting_parts",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled)
    }

    /// `true` while the vehicle is physically in the workshop.
    pub fn holds_vehicle(self) -> bool {
        matches!(self, Self::InShop | Self::AwaitingParts)
    }

    pub fn can_transition_to(self, to: MaintenanceState) -> bool {
        use MaintenanceState::*;
        matches!(
            (self, to),
            (Scheduled, InShop)
                | (InShop, AwaitingParts)
                | (AwaitingParts, InShop)
                | (InShop, Finalized)
                | (AwaitingParts, Finalized)
                | (Scheduled, Cancelled)
                | (InShop, Cancelled)
                | (AwaitingParts, Cancelled)
                | (Finalized, Cancelled)
        )
    }

    pub fn check_transition(self, to: MaintenanceState) -> ResultEngine<()> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition(format!(
                "maintenance cannot move from {} to {}",
                self.as_str(),
                to.as_str()
            )))
        }
    }
}

impl TryFrom<&str> for MaintenanceState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "in_shop" => Ok(Self::InShop),
            "awaiting_parts" => Ok(Self::AwaitingParts),
            "finalized" => Ok(Self::Finalized),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid maintenance state: {other}"
            ))),
        }
    }
}

/// One maintenance occurrence for a vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub id: Uuid,
    pub vehicle_plate: String,
    pub kind: MaintenanceKind,
    pub state: MaintenanceState,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    /// Mileage recorded when the vehicle entered the workshop.
    pub odometer_km: i64,
    pub description: String,
    pub estimated_cost: Money,
    pub labor_cost: Money,
    pub parts_cost: Money,
    pub account_code: Option<String>,
    pub work_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceEvent {
    pub fn new(
        vehicle_plate: &str,
        kind: MaintenanceKind,
        entry_date: NaiveDate,
        odometer_km: i64,
        description: &str,
    ) -> ResultEngine<Self> {
        if odometer_km < 0 {
            return Err(EngineError::InvalidAmount(
                "odometer_km must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            vehicle_plate: normalize_plate(vehicle_plate)?,
            kind,
            state: MaintenanceState::Scheduled,
            entry_date,
            exit_date: None,
            scheduled_date: None,
            odometer_km,
            description: normalize_required_text(description, "description")?,
            estimated_cost: Money::ZERO,
            labor_cost: Money::ZERO,
            parts_cost: Money::ZERO,
            account_code: None,
            work_order_id: None,
            created_at: Utc::now(),
        })
    }

    /// `labor_cost + parts_cost`.
    pub fn total_real_cost(&self) -> Money {
        self.labor_cost + self.parts_cost
    }

    /// Validates the amounts and dates of the event.
    pub fn validate(&self) -> ResultEngine<()> {
        self.estimated_cost.ensure_non_negative("estimated_cost")?;
        self.labor_cost.ensure_non_negative("labor_cost")?;
        self.parts_cost.ensure_non_negative("parts_cost")?;
        if self.labor_cost.checked_add(self.parts_cost).is_none() {
            return Err(EngineError::InvalidAmount("cost too large".to_string()));
        }
        if let Some(exit) = self.exit_date
            && exit < self.entry_date
        {
            return Err(EngineError::InvalidAmount(
                "exit_date must not precede entry_date".to_string(),
            ));
        }
        Ok(())
    }

    /// Preconditions for closing the event as `Finalized`.
    pub fn check_finalizable(&self) -> ResultEngine<()> {
        if self.exit_date.is_none() {
            return Err(EngineError::InvalidTransition(
                "exit_date is required to finalize a maintenance".to_string(),
            ));
        }
        if !self.total_real_cost().is_positive() {
            return Err(EngineError::InvalidTransition(
                "labor_cost + parts_cost must be > 0 to finalize a maintenance".to_string(),
            ));
        }
        Ok(())
    }

    /// Ledger scope this event draws from, if it is attached to an account.
    pub fn ledger_key(&self) -> Option<LedgerKey> {
        self.account_code.as_ref().map(|account| LedgerKey {
            year: budget_year(self.entry_date),
            account_code: account.clone(),
            vehicle_plate: Some(self.vehicle_plate.clone()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "maintenance_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub vehicle_plate: String,
    pub kind: String,
    pub state: String,
    pub entry_date: Date,
    pub exit_date: Option<Date>,
    pub scheduled_date: Option<Date>,
    pub odometer_km: i64,
    pub description: String,
    pub estimated_cost_minor: i64,
    pub labor_cost_minor: i64,
    pub parts_cost_minor: i64,
    pub account_code: Option<String>,
    pub work_order_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&MaintenanceEvent> for ActiveModel {
    fn from(value: &MaintenanceEvent) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            vehicle_plate: ActiveValue::Set(value.vehicle_plate.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            state: ActiveValue::Set(value.state.as_str().to_string()),
            entry_date: ActiveValue::Set(value.entry_date),
            exit_date: ActiveValue::Set(value.exit_date),
            scheduled_date: ActiveValue::Set(value.scheduled_date),
            odometer_km: ActiveValue::Set(value.odometer_km),
            description: ActiveValue::Set(value.description.clone()),
            estimated_cost_minor: ActiveValue::Set(value.estimated_cost.cents()),
            labor_cost_minor: ActiveValue::Set(value.labor_cost.cents()),
            parts_cost_minor: ActiveValue::Set(value.parts_cost.cents()),
            account_code: ActiveValue::Set(value.account_code.clone()),
            work_order_id: ActiveValue::Set(value.work_order_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for MaintenanceEvent {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "maintenance")?,
            vehicle_plate: model.vehicle_plate,
            kind: MaintenanceKind::try_from(model.kind.as_str())?,
            state: MaintenanceState::try_from(model.state.as_str())?,
            entry_date: model.entry_date,
            exit_date: model.exit_date,
            scheduled_date: model.scheduled_date,
            odometer_km: model.odometer_km,
            description: model.description,
            estimated_cost: Money::new(model.estimated_cost_minor),
            labor_cost: Money::new(model.labor_cost_minor),
            parts_cost: Money::new(model.parts_cost_minor),
            account_code: model.account_code,
            work_order_id: model
                .work_order_id
                .as_deref()
                .map(|id| parse_uuid(id, "work order"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}
