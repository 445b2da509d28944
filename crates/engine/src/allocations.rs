//! The module contains the representation of a budget allocation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    aggregate::AllocationScope,
    util::{normalize_plate, normalize_required_text, parse_uuid},
};

/// What an allocation pays for.
///
/// A `Preventive` allocation only absorbs preventive maintenance; corrective
/// maintenance drawing from the same account is ignored by its ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    Preventive,
    Operational,
}

impl AllocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preventive => "preventive",
            Self::Operational => "operational",
        }
    }
}

impl TryFrom<&str> for AllocationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "preventive" => Ok(Self::Preventive),
            "operational" => Ok(Self::Operational),
            other => Err(EngineError::InvariantViolation(format!(
                "invalid allocation kind: {other}"
            ))),
        }
    }
}

/// Lifecycle of an allocation.
///
/// `Disabled` is terminal: the row stays for audit but the allocation no longer
/// takes part in resolution, guard checks or recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AllocationStatus {
    Active,
    Disabled { disabled_at: DateTime<Utc> },
}

impl AllocationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled { .. } => "disabled",
        }
    }
}

/// A budget ceiling for a `(year, account, vehicle-or-general)` scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub id: Uuid,
    pub year: i32,
    pub account_code: String,
    /// `None` means general (fleet-wide) allocation.
    pub vehicle_plate: Option<String>,
    pub kind: AllocationKind,
    pub assigned: Money,
    executed: Money,
    pub status: AllocationStatus,
    pub created_at: DateTime<Utc>,
}

impl BudgetAllocation {
    pub fn new(
        year: i32,
        account_code: &str,
        vehicle_plate: Option<&str>,
        kind: AllocationKind,
        assigned: Money,
    ) -> ResultEngine<Self> {
        if !(1900..=9999).contains(&year) {
            return Err(EngineError::InvalidAmount(format!("invalid year: {year}")));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            year,
            account_code: normalize_required_text(account_code, "account code")?,
            vehicle_plate: vehicle_plate.map(normalize_plate).transpose()?,
            kind,
            assigned: assigned.ensure_non_negative("assigned amount")?,
            executed: Money::ZERO,
            status: AllocationStatus::Active,
            created_at: Utc::now(),
        })
    }

    /// Executed amount as last computed by the aggregator.
    pub fn executed(&self) -> Money {
        self.executed
    }

    /// `assigned - executed`. Negative when the allocation is already
    /// overspent.
    pub fn available(&self) -> Money {
        self.assigned - self.executed
    }

    /// Executed share of the assigned amount in basis points (1% = 100).
    pub fn pct_executed_bps(&self) -> i64 {
        if self.assigned.is_positive() {
            let bps = i128::from(self.executed.cents()) * 10_000
                / i128::from(self.assigned.cents());
            i64::try_from(bps).unwrap_or(i64::MAX)
        } else {
            0
        }
    }

    /// Executed share of the assigned amount as a ratio (`0.4` = 40%), for
    /// display only.
    pub fn pct_executed(&self) -> f64 {
        self.pct_executed_bps() as f64 / 10_000.0
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, AllocationStatus::Active)
    }

    pub fn scope(&self) -> AllocationScope {
        AllocationScope {
            year: self.year,
            account_code: self.account_code.clone(),
            vehicle_plate: self.vehicle_plate.clone(),
            kind: self.kind,
        }
    }

    #[must_use]
    pub(crate) fn with_executed(mut self, executed: Money) -> Self {
        self.executed = executed;
        self
    }

    pub fn disable(&mut self, at: DateTime<Utc>) -> ResultEngine<()> {
        match self.status {
            AllocationStatus::Active => {
                self.status = AllocationStatus::Disabled { disabled_at: at };
                Ok(())
            }
            AllocationStatus::Disabled { .. } => Err(EngineError::InvalidTransition(
                "allocation already disabled".to_string(),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub year: i32,
    pub account_code: String,
    pub vehicle_plate: Option<String>,
    pub kind: String,
    pub assigned_minor: i64,
    pub executed_minor: i64,
    pub status: String,
    pub disabled_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BudgetAllocation> for ActiveModel {
    fn from(value: &BudgetAllocation) -> Self {
        let disabled_at = match value.status {
            AllocationStatus::Active => None,
            AllocationStatus::Disabled { disabled_at } => Some(disabled_at),
        };
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            year: ActiveValue::Set(value.year),
            account_code: ActiveValue::Set(value.account_code.clone()),
            vehicle_plate: ActiveValue::Set(value.vehicle_plate.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            assigned_minor: ActiveValue::Set(value.assigned.cents()),
            executed_minor: ActiveValue::Set(value.executed.cents()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            disabled_at: ActiveValue::Set(disabled_at),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for BudgetAllocation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = match (model.status.as_str(), model.disabled_at) {
            ("active", _) => AllocationStatus::Active,
            ("disabled", Some(disabled_at)) => AllocationStatus::Disabled { disabled_at },
            (other, _) => {
                return Err(EngineError::InvariantViolation(format!(
                    "invalid allocation status: {other}"
                )));
            }
        };
        Ok(Self {
            id: parse_uuid(&model.id, "allocation")?,
            year: model.year,
            account_code: model.account_code,
            vehicle_plate: model.vehicle_plate,
            kind: AllocationKind::try_from(model.kind.as_str())?,
            assigned: Money::new(model.assigned_minor),
            executed: Money::new(model.executed_minor),
            status,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(assigned: i64, executed: i64) -> BudgetAllocation {
        let mut allocation = BudgetAllocation::new(
            2024,
            "22.06.002",
            None,
            AllocationKind::Preventive,
            Money::from_units(assigned),
        )
        .unwrap();
        allocation.executed = Money::from_units(executed);
        allocation
    }

    #[test]
    fn available_is_derived() {
        let allocation = allocation(1000, 900);
        assert_eq!(allocation.available(), Money::from_units(100));
        assert_eq!(allocation.pct_executed_bps(), 9_000);
    }

    #[test]
    fn available_may_be_negative_when_overspent() {
        let allocation = allocation(1000, 1200);
        assert_eq!(allocation.available(), Money::from_units(-200));
        assert_eq!(allocation.pct_executed_bps(), 12_000);
    }

    #[test]
    fn pct_is_zero_without_assigned_amount() {
        let allocation = allocation(0, 50);
        assert_eq!(allocation.pct_executed_bps(), 0);
        assert_eq!(allocation.pct_executed(), 0.0);
    }

    #[test]
    fn negative_assigned_is_rejected() {
        let result = BudgetAllocation::new(
            2024,
            "22.06.002",
            None,
            AllocationKind::Operational,
            Money::new(-1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn disable_is_terminal() {
        let mut allocation = allocation(10, 0);
        allocation.disable(Utc::now()).unwrap();
        assert!(!allocation.is_active());
        assert!(matches!(
            allocation.disable(Utc::now()),
            Err(EngineError::InvalidTransition(_))
        ));
    }

    #[test]
    fn unknown_stored_kind_is_an_invariant_violation() {
        assert_eq!(
            AllocationKind::try_from("capital"),
            Err(EngineError::InvariantViolation(
                "invalid allocation kind: capital".to_string()
            ))
        );
    }
}
