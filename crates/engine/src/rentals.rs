//! Rental contracts for vehicles that stand in for fleet vehicles.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    aggregate::LedgerKey,
    util::{budget_year, normalize_plate, normalize_required_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalState {
    Active,
    Finalized,
}

impl RentalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }
}

impl TryFrom<&str> for RentalState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "finalized" => Ok(Self::Finalized),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid rental state: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalContract {
    pub id: Uuid,
    /// Free-form description or plate of the rented (external) vehicle.
    pub rented_vehicle: String,
    pub replaced_vehicle: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub daily_cost: Money,
    pub reason: String,
    pub account_code: Option<String>,
    pub state: RentalState,
}

impl RentalContract {
    pub fn new(
        rented_vehicle: &str,
        start_date: NaiveDate,
        daily_cost: Money,
        reason: &str,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            rented_vehicle: normalize_required_text(rented_vehicle, "rented vehicle")?,
            replaced_vehicle: None,
            start_date,
            end_date: None,
            daily_cost: daily_cost.ensure_non_negative("daily_cost")?,
            reason: normalize_required_text(reason, "reason")?,
            account_code: None,
            state: RentalState::Active,
        })
    }

    pub fn replaced_vehicle(mut self, plate: &str) -> ResultEngine<Self> {
        self.replaced_vehicle = Some(normalize_plate(plate)?);
        Ok(self)
    }

    /// Days between start and end. Zero while the contract is open-ended.
    pub fn elapsed_days(&self) -> i64 {
        self.end_date
            .map(|end| (end - self.start_date).num_days().max(0))
            .unwrap_or(0)
    }

    /// `daily_cost * elapsed_days`, saturating on overflow.
    pub fn total_cost(&self) -> Money {
        self.daily_cost
            .checked_mul(self.elapsed_days())
            .unwrap_or(Money::new(i64::MAX))
    }

    pub fn validate(&self) -> ResultEngine<()> {
        self.daily_cost.ensure_non_negative("daily_cost")?;
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(EngineError::InvalidAmount(
                "end_date must not precede start_date".to_string(),
            ));
        }
        if self.daily_cost.checked_mul(self.elapsed_days()).is_none() {
            return Err(EngineError::InvalidAmount(
                "rental total too large".to_string(),
            ));
        }
        Ok(())
    }

    /// Closes the contract on `end_date`.
    pub fn finalize(&mut self, end_date: NaiveDate) -> ResultEngine<()> {
        if self.state != RentalState::Active {
            return Err(EngineError::InvalidTransition(
                "rental already finalized".to_string(),
            ));
        }
        if end_date < self.start_date {
            return Err(EngineError::InvalidTransition(
                "end_date must not precede start_date".to_string(),
            ));
        }
        self.end_date = Some(end_date);
        self.state = RentalState::Finalized;
        Ok(())
    }

    pub fn ledger_key(&self) -> Option<LedgerKey> {
        self.account_code.as_ref().map(|account| LedgerKey {
            year: budget_year(self.start_date),
            account_code: account.clone(),
            vehicle_plate: self.replaced_vehicle.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rental_contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub rented_vehicle: String,
    pub replaced_vehicle: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub daily_cost_minor: i64,
    pub reason: String,
    pub account_code: Option<String>,
    pub state: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RentalContract> for ActiveModel {
    fn from(value: &RentalContract) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            rented_vehicle: ActiveValue::Set(value.rented_vehicle.clone()),
            replaced_vehicle: ActiveValue::Set(value.replaced_vehicle.clone()),
            start_date: ActiveValue::Set(value.start_date),
            end_date: ActiveValue::Set(value.end_date),
            daily_cost_minor: ActiveValue::Set(value.daily_cost.cents()),
            reason: ActiveValue::Set(value.reason.clone()),
            account_code: ActiveValue::Set(value.account_code.clone()),
            state: ActiveValue::Set(value.state.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for RentalContract {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "rental")?,
            rented_vehicle: model.rented_vehicle,
            replaced_vehicle: model.replaced_vehicle,
            start_date: model.start_date,
            end_date: model.end_date,
            daily_cost: Money::new(model.daily_cost_minor),
            reason: model.reason,
            account_code: model.account_code,
            state: RentalState::try_from(model.state.as_str())?,
        })
    }
}
