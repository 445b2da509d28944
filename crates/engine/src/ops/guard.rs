use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::Serialize;

use crate::{EngineError, LedgerKey, Money, ResultEngine, util::normalize_plate};

use super::{Engine, ledger::resolve_allocation, with_tx};

/// Outcome of an overspend check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allowed,
    /// No active allocation resolves for the account and year.
    NoBudget { account_code: String, year: i32 },
    Insufficient { available: Money, required: Money },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn into_result(self) -> ResultEngine<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::NoBudget { account_code, year } => Err(EngineError::Configuration(format!(
                "no budget allocation for account {account_code} in {year}, assign a budget first"
            ))),
            Self::Insufficient {
                available,
                required,
            } => Err(EngineError::OverspendRejected {
                available,
                required,
            }),
        }
    }
}

/// Compares `required` with the available amount of the allocation `key`
/// resolves to. Never writes.
pub(super) async fn check(
    db: &DatabaseTransaction,
    key: &LedgerKey,
    required: Money,
) -> ResultEngine<GuardDecision> {
    let Some(allocation) = resolve_allocation(db, key).await? else {
        tracing::warn!(
            account = %key.account_code,
            year = key.year,
            "overspend guard: no budget configured"
        );
        return Ok(GuardDecision::NoBudget {
            account_code: key.account_code.clone(),
            year: key.year,
        });
    };

    let available = allocation.available();
    if required > available {
        tracing::warn!(
            allocation_id = %allocation.id,
            available = %available,
            required = %required,
            "overspend guard: rejected"
        );
        return Ok(GuardDecision::Insufficient {
            available,
            required,
        });
    }
    Ok(GuardDecision::Allowed)
}

impl Engine {
    /// Dry-run of the overspend guard for an additional expense of `required`
    /// on `account_code` in `year`, attributed to `vehicle_plate` if given.
    pub async fn check_overspend(
        &self,
        account_code: &str,
        vehicle_plate: Option<&str>,
        year: i32,
        required: Money,
    ) -> ResultEngine<GuardDecision> {
        let key = LedgerKey {
            year,
            account_code: account_code.trim().to_string(),
            vehicle_plate: vehicle_plate.map(normalize_plate).transpose()?,
        };
        with_tx!(self, |db_tx| check(&db_tx, &key, required).await)
    }
}
