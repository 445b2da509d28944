//! Ledger recomputation.
//!
//! The write path calls into this module explicitly after every change to an
//! expense record, inside the same DB transaction. A failure here aborts the
//! triggering write.

use std::collections::{BTreeMap, HashMap};

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::Expr,
};

use crate::{
    BudgetAllocation, FuelPurchase, LedgerKey, MaintenanceEvent, PurchaseOrder, RecomputedAllocation,
    RentalContract, ResultEngine,
    aggregate::{ExpenseSources, aggregate},
    allocations, fuel, maintenance, purchase_orders,
    purchase_orders::ResolvedPurchaseOrder,
    rentals,
    util::year_bounds,
    work_orders,
};

fn active_in_scope(year: i32, account_code: &str) -> Condition {
    Condition::all()
        .add(allocations::Column::Status.eq("active"))
        .add(allocations::Column::Year.eq(year))
        .add(allocations::Column::AccountCode.eq(account_code))
}

/// Active allocation a record with `key` draws from: the vehicle-specific
/// allocation first, then the general one.
///
/// The row is read with an exclusive lock where the backend supports it.
pub(super) async fn resolve_allocation(
    db: &DatabaseTransaction,
    key: &LedgerKey,
) -> ResultEngine<Option<BudgetAllocation>> {
    if let Some(plate) = key.vehicle_plate.as_deref() {
        let specific = allocations::Entity::find()
            .filter(active_in_scope(key.year, &key.account_code))
            .filter(allocations::Column::VehiclePlate.eq(plate))
            .lock_exclusive()
            .one(db)
            .await?;
        if let Some(model) = specific {
            return Ok(Some(BudgetAllocation::try_from(model)?));
        }
    }

    allocations::Entity::find()
        .filter(active_in_scope(key.year, &key.account_code))
        .filter(allocations::Column::VehiclePlate.is_null())
        .lock_exclusive()
        .one(db)
        .await?
        .map(BudgetAllocation::try_from)
        .transpose()
}

/// Every active allocation whose scope covers `key`: the vehicle-specific
/// allocation and the general one.
async fn covering_allocations(
    db: &DatabaseTransaction,
    key: &LedgerKey,
) -> ResultEngine<Vec<allocations::Model>> {
    let vehicle = match key.vehicle_plate.as_deref() {
        Some(plate) => Condition::any()
            .add(allocations::Column::VehiclePlate.is_null())
            .add(allocations::Column::VehiclePlate.eq(plate)),
        None => Condition::all().add(allocations::Column::VehiclePlate.is_null()),
    };
    Ok(allocations::Entity::find()
        .filter(active_in_scope(key.year, &key.account_code))
        .filter(vehicle)
        .order_by_asc(allocations::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?)
}

/// Attaches the vehicle resolved through linked work orders.
pub(super) async fn resolve_purchase_order(
    db: &DatabaseTransaction,
    order: PurchaseOrder,
) -> ResultEngine<ResolvedPurchaseOrder> {
    let plates: Vec<String> = work_orders::Entity::find()
        .filter(work_orders::Column::PurchaseOrderId.eq(order.id.to_string()))
        .all(db)
        .await?
        .into_iter()
        .map(|model| model.vehicle_plate)
        .collect();
    Ok(ResolvedPurchaseOrder::resolve(order, &plates))
}

/// Loads every record of `account_code` dated in `year`.
pub(super) async fn load_sources(
    db: &DatabaseTransaction,
    year: i32,
    account_code: &str,
) -> ResultEngine<ExpenseSources> {
    let (start, next) = year_bounds(year)?;

    let maintenance = maintenance::Entity::find()
        .filter(maintenance::Column::AccountCode.eq(account_code))
        .filter(maintenance::Column::EntryDate.gte(start))
        .filter(maintenance::Column::EntryDate.lt(next))
        .all(db)
        .await?
        .into_iter()
        .map(MaintenanceEvent::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    let fuel = fuel::Entity::find()
        .filter(fuel::Column::AccountCode.eq(account_code))
        .filter(fuel::Column::Date.gte(start))
        .filter(fuel::Column::Date.lt(next))
        .all(db)
        .await?
        .into_iter()
        .map(FuelPurchase::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    let rentals = rentals::Entity::find()
        .filter(rentals::Column::AccountCode.eq(account_code))
        .filter(rentals::Column::StartDate.gte(start))
        .filter(rentals::Column::StartDate.lt(next))
        .all(db)
        .await?
        .into_iter()
        .map(RentalContract::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    let orders = purchase_orders::Entity::find()
        .filter(purchase_orders::Column::AccountCode.eq(account_code))
        .filter(purchase_orders::Column::IssuedOn.gte(start))
        .filter(purchase_orders::Column::IssuedOn.lt(next))
        .all(db)
        .await?
        .into_iter()
        .map(PurchaseOrder::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    let order_ids: Vec<String> = orders.iter().map(|order| order.id.to_string()).collect();
    let mut plates_by_order: HashMap<String, Vec<String>> = HashMap::new();
    if !order_ids.is_empty() {
        let linked = work_orders::Entity::find()
            .filter(work_orders::Column::PurchaseOrderId.is_in(order_ids))
            .all(db)
            .await?;
        for work_order in linked {
            if let Some(order_id) = work_order.purchase_order_id {
                plates_by_order
                    .entry(order_id)
                    .or_default()
                    .push(work_order.vehicle_plate);
            }
        }
    }
    let purchase_orders = orders
        .into_iter()
        .map(|order| {
            let plates = plates_by_order
                .get(&order.id.to_string())
                .map(Vec::as_slice)
                .unwrap_or_default();
            ResolvedPurchaseOrder::resolve(order, plates)
        })
        .collect();

    Ok(ExpenseSources {
        maintenance,
        fuel,
        rentals,
        purchase_orders,
    })
}

/// Loads the maintenance, fuel and rental records of one vehicle, every
/// account included, optionally restricted to `year`.
pub(super) async fn load_vehicle_sources(
    db: &DatabaseTransaction,
    plate: &str,
    year: Option<i32>,
) -> ResultEngine<ExpenseSources> {
    let bounds = year.map(year_bounds).transpose()?;

    let mut maintenance_query =
        maintenance::Entity::find().filter(maintenance::Column::VehiclePlate.eq(plate));
    let mut fuel_query = fuel::Entity::find().filter(fuel::Column::VehiclePlate.eq(plate));
    let mut rentals_query =
        rentals::Entity::find().filter(rentals::Column::ReplacedVehicle.eq(plate));
    if let Some((start, next)) = bounds {
        maintenance_query = maintenance_query
            .filter(maintenance::Column::EntryDate.gte(start))
            .filter(maintenance::Column::EntryDate.lt(next));
        fuel_query = fuel_query
            .filter(fuel::Column::Date.gte(start))
            .filter(fuel::Column::Date.lt(next));
        rentals_query = rentals_query
            .filter(rentals::Column::StartDate.gte(start))
            .filter(rentals::Column::StartDate.lt(next));
    }

    Ok(ExpenseSources {
        maintenance: maintenance_query
            .all(db)
            .await?
            .into_iter()
            .map(MaintenanceEvent::try_from)
            .collect::<ResultEngine<Vec<_>>>()?,
        fuel: fuel_query
            .all(db)
            .await?
            .into_iter()
            .map(FuelPurchase::try_from)
            .collect::<ResultEngine<Vec<_>>>()?,
        rentals: rentals_query
            .all(db)
            .await?
            .into_iter()
            .map(RentalContract::try_from)
            .collect::<ResultEngine<Vec<_>>>()?,
        purchase_orders: Vec::new(),
    })
}

/// Rebuilds and stores the executed amount of each allocation in `models`.
///
/// Sources are loaded once per `(year, account)`.
pub(super) async fn recompute_models(
    db: &DatabaseTransaction,
    models: Vec<allocations::Model>,
) -> ResultEngine<Vec<RecomputedAllocation>> {
    let mut groups: BTreeMap<(i32, String), Vec<BudgetAllocation>> = BTreeMap::new();
    for model in models {
        let allocation = BudgetAllocation::try_from(model)?;
        groups
            .entry((allocation.year, allocation.account_code.clone()))
            .or_default()
            .push(allocation);
    }

    let mut recomputed = Vec::new();
    for ((year, account_code), group) in groups {
        let sources = load_sources(db, year, &account_code).await?;
        for allocation in group {
            let executed = aggregate(&allocation.scope(), &sources)?.total()?;
            allocations::Entity::update_many()
                .col_expr(
                    allocations::Column::ExecutedMinor,
                    Expr::value(executed.cents()),
                )
                .filter(allocations::Column::Id.eq(allocation.id.to_string()))
                .exec(db)
                .await?;

            let allocation = allocation.with_executed(executed);
            tracing::info!(
                allocation_id = %allocation.id,
                year,
                account = %account_code,
                vehicle = allocation.vehicle_plate.as_deref().unwrap_or("general"),
                executed = %executed,
                available = %allocation.available(),
                "allocation recomputed"
            );
            recomputed.push(RecomputedAllocation {
                allocation_id: allocation.id,
                executed,
                available: allocation.available(),
            });
        }
    }
    Ok(recomputed)
}

/// Recomputes every active allocation covering any of `keys`.
///
/// `None` keys (records without an account) are skipped.
pub(super) async fn recompute_keys<I>(
    db: &DatabaseTransaction,
    keys: I,
) -> ResultEngine<Vec<RecomputedAllocation>>
where
    I: IntoIterator<Item = Option<LedgerKey>>,
{
    let mut models: BTreeMap<String, allocations::Model> = BTreeMap::new();
    let mut seen: Vec<LedgerKey> = Vec::new();
    for key in keys.into_iter().flatten() {
        if seen.contains(&key) {
            continue;
        }
        for model in covering_allocations(db, &key).await? {
            models.entry(model.id.clone()).or_insert(model);
        }
        seen.push(key);
    }
    recompute_models(db, models.into_values().collect()).await
}
