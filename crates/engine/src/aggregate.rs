//! Expense aggregation.
//!
//! Sums the records of the four expense sources that fall inside an
//! allocation scope. Aggregation is a full recomputation from the records it
//! is given; there is no incremental state, so the same inputs always yield
//! the same executed amount.

use serde::{Deserialize, Serialize};

use crate::{
    AllocationKind, EngineError, FuelPurchase, MaintenanceEvent, Money, RentalContract,
    ResultEngine,
    maintenance::{MaintenanceKind, MaintenanceState},
    purchase_orders::ResolvedPurchaseOrder,
    rentals::RentalState,
    util::budget_year,
};

/// The `(year, account, vehicle-or-general, kind)` tuple an allocation covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationScope {
    pub year: i32,
    pub account_code: String,
    pub vehicle_plate: Option<String>,
    pub kind: AllocationKind,
}

impl AllocationScope {
    fn matches(&self, year: i32, account: Option<&str>, vehicle: Option<&str>) -> bool {
        if year != self.year || account != Some(self.account_code.as_str()) {
            return false;
        }
        match self.vehicle_plate.as_deref() {
            Some(plate) => vehicle == Some(plate),
            None => true,
        }
    }

    /// `true` when a record with ledger key `key` can count toward this
    /// scope. Kind filtering is left to the aggregation itself.
    pub fn covers(&self, key: &LedgerKey) -> bool {
        self.matches(
            key.year,
            Some(key.account_code.as_str()),
            key.vehicle_plate.as_deref(),
        )
    }
}

/// Where an expense record lands in the ledger: the year of its date, its
/// account and the vehicle it is attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub year: i32,
    pub account_code: String,
    pub vehicle_plate: Option<String>,
}

/// Records loaded for one aggregation pass.
#[derive(Clone, Debug, Default)]
pub struct ExpenseSources {
    pub maintenance: Vec<MaintenanceEvent>,
    pub fuel: Vec<FuelPurchase>,
    pub rentals: Vec<RentalContract>,
    pub purchase_orders: Vec<ResolvedPurchaseOrder>,
}

/// Executed amount split by source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBreakdown {
    pub maintenance: Money,
    pub fuel: Money,
    pub rentals: Money,
    pub purchase_orders: Money,
}

impl ExecutionBreakdown {
    /// Sum of the four sources. Fails with `InvalidAmount` on overflow.
    pub fn total(&self) -> ResultEngine<Money> {
        checked_total(
            "executed",
            [self.maintenance, self.fuel, self.rentals, self.purchase_orders],
        )
    }
}

pub(crate) fn checked_total<I>(what: &str, amounts: I) -> ResultEngine<Money>
where
    I: IntoIterator<Item = Money>,
{
    Money::checked_sum(amounts)
        .ok_or_else(|| EngineError::InvalidAmount(format!("{what} amount overflow")))
}

/// Computes the executed amount of `scope` over `sources`.
///
/// Fails with `InvalidAmount` when a per-source sum overflows.
pub fn aggregate(
    scope: &AllocationScope,
    sources: &ExpenseSources,
) -> ResultEngine<ExecutionBreakdown> {
    let maintenance = sources
        .maintenance
        .iter()
        .filter(|event| event.state == MaintenanceState::Finalized)
        .filter(|event| {
            scope.kind != AllocationKind::Preventive || event.kind == MaintenanceKind::Preventive
        })
        .filter(|event| {
            scope.matches(
                budget_year(event.entry_date),
                event.account_code.as_deref(),
                Some(event.vehicle_plate.as_str()),
            )
        })
        .map(MaintenanceEvent::total_real_cost);

    let fuel = sources
        .fuel
        .iter()
        .filter(|purchase| {
            scope.matches(
                budget_year(purchase.date),
                purchase.account_code.as_deref(),
                Some(purchase.vehicle_plate.as_str()),
            )
        })
        .map(|purchase| purchase.total_cost);

    let rentals = sources
        .rentals
        .iter()
        .filter(|rental| rental.state == RentalState::Active)
        .filter(|rental| {
            scope.matches(
                budget_year(rental.start_date),
                rental.account_code.as_deref(),
                rental.replaced_vehicle.as_deref(),
            )
        })
        .map(RentalContract::total_cost);

    let purchase_orders = sources
        .purchase_orders
        .iter()
        .filter(|resolved| !resolved.order.is_voided())
        .filter(|resolved| {
            scope.matches(
                budget_year(resolved.order.issued_on),
                resolved.order.account_code.as_deref(),
                resolved.vehicle_plate.as_deref(),
            )
        })
        .map(|resolved| resolved.order.amount_total);

    Ok(ExecutionBreakdown {
        maintenance: checked_total("maintenance", maintenance)?,
        fuel: checked_total("fuel", fuel)?,
        rentals: checked_total("rental", rentals)?,
        purchase_orders: checked_total("purchase order", purchase_orders)?,
    })
}
