use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    AllocationKind, AllocationReport, BudgetAllocation, EngineError, ExecutionBreakdown, LedgerKey,
    LedgerStatus, Money, RecomputedAllocation, ResultEngine, aggregate::aggregate, allocations,
    util::normalize_plate,
};

use super::{
    Engine,
    accounts::require_account,
    ledger::{load_sources, recompute_models, resolve_allocation},
    vehicles::require_vehicle,
    with_tx,
};

/// Filter for allocation listings. Empty filter lists every active
/// allocation.
#[derive(Clone, Debug, Default)]
pub struct AllocationFilter {
    pub year: Option<i32>,
    pub account_code: Option<String>,
    pub vehicle_plate: Option<String>,
    pub include_disabled: bool,
}

impl AllocationFilter {
    #[must_use]
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }

    #[must_use]
    pub fn vehicle(mut self, plate: impl Into<String>) -> Self {
        self.vehicle_plate = Some(plate.into());
        self
    }

    #[must_use]
    pub fn include_disabled(mut self) -> Self {
        self.include_disabled = true;
        self
    }
}

async fn require_allocation(
    db: &DatabaseTransaction,
    allocation_id: Uuid,
) -> ResultEngine<allocations::Model> {
    allocations::Entity::find_by_id(allocation_id.to_string())
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("allocation {allocation_id}")))
}

pub(super) async fn list_allocations(
    db: &DatabaseTransaction,
    filter: &AllocationFilter,
) -> ResultEngine<Vec<BudgetAllocation>> {
    let mut query = allocations::Entity::find();
    if !filter.include_disabled {
        query = query.filter(allocations::Column::Status.eq("active"));
    }
    if let Some(year) = filter.year {
        query = query.filter(allocations::Column::Year.eq(year));
    }
    if let Some(account) = filter.account_code.as_deref() {
        query = query.filter(allocations::Column::AccountCode.eq(account.trim()));
    }
    if let Some(plate) = filter.vehicle_plate.as_deref() {
        query = query.filter(allocations::Column::VehiclePlate.eq(normalize_plate(plate)?));
    }
    query
        .order_by_asc(allocations::Column::Year)
        .order_by_asc(allocations::Column::AccountCode)
        .order_by_asc(allocations::Column::VehiclePlate)
        .order_by_asc(allocations::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(BudgetAllocation::try_from)
        .collect()
}

impl Engine {
    /// Creates an active allocation and computes its executed amount from
    /// the records already on file.
    ///
    /// Fails with `InvariantViolation` when an active allocation already
    /// exists for the same `(year, account, vehicle)`.
    pub async fn create_allocation(
        &self,
        year: i32,
        account_code: &str,
        vehicle_plate: Option<&str>,
        kind: AllocationKind,
        assigned: Money,
    ) -> ResultEngine<BudgetAllocation> {
        let allocation = BudgetAllocation::new(year, account_code, vehicle_plate, kind, assigned)?;
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            require_account(&db_tx, &allocation.account_code).await?;
            if let Some(plate) = allocation.vehicle_plate.as_deref() {
                require_vehicle(&db_tx, plate).await?;
            }

            let mut duplicate = allocations::Entity::find()
                .filter(allocations::Column::Status.eq("active"))
                .filter(allocations::Column::Year.eq(allocation.year))
                .filter(allocations::Column::AccountCode.eq(allocation.account_code.clone()));
            duplicate = match allocation.vehicle_plate.as_deref() {
                Some(plate) => duplicate.filter(allocations::Column::VehiclePlate.eq(plate)),
                None => duplicate.filter(allocations::Column::VehiclePlate.is_null()),
            };
            if duplicate.one(&db_tx).await?.is_some() {
                return Err(EngineError::InvariantViolation(format!(
                    "an active allocation already exists for {} / {} / {}",
                    allocation.year,
                    allocation.account_code,
                    allocation.vehicle_plate.as_deref().unwrap_or("general")
                )));
            }

            let model = allocations::ActiveModel::from(&allocation)
                .insert(&db_tx)
                .await?;
            tracing::info!(
                allocation_id = %allocation.id,
                year = allocation.year,
                account = %allocation.account_code,
                assigned = %allocation.assigned,
                "allocation created"
            );
            recompute_models(&db_tx, vec![model]).await?;
            let model = require_allocation(&db_tx, allocation.id).await?;
            BudgetAllocation::try_from(model)
        })
    }

    pub async fn allocation(&self, allocation_id: Uuid) -> ResultEngine<BudgetAllocation> {
        with_tx!(self, |db_tx| {
            let model = require_allocation(&db_tx, allocation_id).await?;
            BudgetAllocation::try_from(model)
        })
    }

    /// Changes the assigned amount of an active allocation.
    pub async fn update_allocation_assigned(
        &self,
        allocation_id: Uuid,
        assigned: Money,
    ) -> ResultEngine<BudgetAllocation> {
        let assigned = assigned.ensure_non_negative("assigned amount")?;
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let model = require_allocation(&db_tx, allocation_id).await?;
            let mut allocation = BudgetAllocation::try_from(model)?;
            if !allocation.is_active() {
                return Err(EngineError::InvalidTransition(
                    "disabled allocations cannot be changed".to_string(),
                ));
            }
            allocations::Entity::update_many()
                .col_expr(allocations::Column::AssignedMinor, Expr::value(assigned.cents()))
                .filter(allocations::Column::Id.eq(allocation_id.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!(allocation_id = %allocation.id, assigned = %assigned, "allocation reassigned");
            allocation.assigned = assigned;
            Ok(allocation)
        })
    }

    /// Soft-deletes an allocation. The row and its last executed amount stay
    /// for audit.
    pub async fn disable_allocation(&self, allocation_id: Uuid) -> ResultEngine<BudgetAllocation> {
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let model = require_allocation(&db_tx, allocation_id).await?;
            let mut allocation = BudgetAllocation::try_from(model)?;
            allocation.disable(Utc::now())?;
            let mut model = allocations::ActiveModel::from(&allocation);
            model.executed_minor = ActiveValue::NotSet;
            model.update(&db_tx).await?;
            tracing::info!(allocation_id = %allocation.id, "allocation disabled");
            Ok(allocation)
        })
    }

    /// Lists allocations matching `filter`.
    pub async fn allocations(&self, filter: &AllocationFilter) -> ResultEngine<Vec<BudgetAllocation>> {
        with_tx!(self, |db_tx| list_allocations(&db_tx, filter).await)
    }

    /// Lists allocations matching `filter` with assigned, executed and
    /// available totals.
    pub async fn allocation_report(&self, filter: &AllocationFilter) -> ResultEngine<AllocationReport> {
        let allocations = self.allocations(filter).await?;
        Ok(AllocationReport::new(allocations))
    }

    /// Ledger figures of the active allocation for exactly
    /// `(account, vehicle, year)`. `vehicle_plate = None` selects the general
    /// allocation; there is no fallback.
    pub async fn query_allocation_status(
        &self,
        account_code: &str,
        vehicle_plate: Option<&str>,
        year: i32,
    ) -> ResultEngine<LedgerStatus> {
        let account_code = account_code.trim().to_string();
        let vehicle_plate = vehicle_plate.map(normalize_plate).transpose()?;
        with_tx!(self, |db_tx| {
            let mut query = allocations::Entity::find()
                .filter(allocations::Column::Status.eq("active"))
                .filter(allocations::Column::Year.eq(year))
                .filter(allocations::Column::AccountCode.eq(account_code.clone()));
            query = match vehicle_plate.as_deref() {
                Some(plate) => query.filter(allocations::Column::VehiclePlate.eq(plate)),
                None => query.filter(allocations::Column::VehiclePlate.is_null()),
            };
            let model = query.one(&db_tx).await?.ok_or_else(|| {
                EngineError::KeyNotFound(format!(
                    "allocation {account_code} / {} / {year}",
                    vehicle_plate.as_deref().unwrap_or("general")
                ))
            })?;
            let allocation = BudgetAllocation::try_from(model)?;
            Ok(LedgerStatus::from(&allocation))
        })
    }

    /// Allocation a record would draw from: the vehicle-specific one, else the
    /// general one.
    pub async fn resolve_allocation(
        &self,
        account_code: &str,
        vehicle_plate: Option<&str>,
        year: i32,
    ) -> ResultEngine<Option<BudgetAllocation>> {
        let key = LedgerKey {
            year,
            account_code: account_code.trim().to_string(),
            vehicle_plate: vehicle_plate.map(normalize_plate).transpose()?,
        };
        with_tx!(self, |db_tx| resolve_allocation(&db_tx, &key).await)
    }

    /// Per-source split of the executed amount, computed from the records
    /// without touching the stored value.
    pub async fn execution_breakdown(&self, allocation_id: Uuid) -> ResultEngine<ExecutionBreakdown> {
        with_tx!(self, |db_tx| {
            let model = require_allocation(&db_tx, allocation_id).await?;
            let allocation = BudgetAllocation::try_from(model)?;
            let sources = load_sources(&db_tx, allocation.year, &allocation.account_code).await?;
            aggregate(&allocation.scope(), &sources)
        })
    }

    /// Rebuilds the executed amount of one active allocation from scratch.
    pub async fn recompute_allocation(
        &self,
        allocation_id: Uuid,
    ) -> ResultEngine<RecomputedAllocation> {
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let model = require_allocation(&db_tx, allocation_id).await?;
            if model.status != "active" {
                return Err(EngineError::InvalidTransition(
                    "disabled allocations are not recomputed".to_string(),
                ));
            }
            recompute_models(&db_tx, vec![model])
                .await?
                .pop()
                .ok_or_else(|| EngineError::KeyNotFound(format!("allocation {allocation_id}")))
        })
    }

    /// Rebuilds the executed amount of every active allocation of `year`.
    pub async fn recompute_year(&self, year: i32) -> ResultEngine<Vec<RecomputedAllocation>> {
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let models = allocations::Entity::find()
                .filter(allocations::Column::Status.eq("active"))
                .filter(allocations::Column::Year.eq(year))
                .lock_exclusive()
                .all(&db_tx)
                .await?;
            let recomputed = recompute_models(&db_tx, models).await?;
            tracing::info!(year, count = recomputed.len(), "year recomputed");
            Ok(recomputed)
        })
    }
}
