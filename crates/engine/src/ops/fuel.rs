use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseReceipt, FuelPurchase, NewFuelCmd, ResultEngine, UpdateFuelCmd, fuel,
    util::normalize_plate,
};

use super::{
    Engine, accounts::require_optional_account, ledger::recompute_keys,
    vehicles::{raise_odometer, require_vehicle},
    with_tx,
};

async fn require_purchase(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<FuelPurchase> {
    let model = fuel::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("fuel purchase {id}")))?;
    FuelPurchase::try_from(model)
}

pub(super) async fn create(db: &DatabaseTransaction, cmd: NewFuelCmd) -> ResultEngine<ExpenseReceipt> {
    let plate = normalize_plate(&cmd.vehicle_plate)?;
    require_vehicle(db, &plate).await?;

    let mut purchase = FuelPurchase::new(
        &plate,
        cmd.date,
        cmd.liters,
        cmd.total_cost,
        cmd.odometer_km,
    )?
    .receipt_number(cmd.receipt_number.as_deref());
    purchase.unit_price = cmd.unit_price;
    purchase.account_code = require_optional_account(db, cmd.account_code.as_deref()).await?;
    purchase.validate()?;

    fuel::ActiveModel::from(&purchase).insert(db).await?;
    raise_odometer(db, &purchase.vehicle_plate, purchase.odometer_km).await?;
    tracing::info!(
        fuel_id = %purchase.id,
        vehicle = %purchase.vehicle_plate,
        total = %purchase.total_cost,
        "fuel purchase recorded"
    );

    let recomputed = recompute_keys(db, [purchase.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: purchase.id,
        recomputed,
    })
}

pub(super) async fn update(
    db: &DatabaseTransaction,
    cmd: UpdateFuelCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut purchase = require_purchase(db, cmd.id).await?;
    let old_key = purchase.ledger_key();

    if let Some(plate) = cmd.vehicle_plate.as_deref() {
        let plate = normalize_plate(plate)?;
        require_vehicle(db, &plate).await?;
        purchase.vehicle_plate = plate;
    }
    if let Some(date) = cmd.date {
        purchase.date = date;
    }
    if let Some(liters) = cmd.liters {
        purchase.liters = liters;
    }
    if let Some(amount) = cmd.total_cost {
        purchase.total_cost = amount;
    }
    if let Some(km) = cmd.odometer_km {
        purchase.odometer_km = km;
    }
    if let Some(account) = cmd.account_code {
        purchase.account_code = require_optional_account(db, account.as_deref()).await?;
    }
    purchase.validate()?;

    fuel::ActiveModel::from(&purchase).update(db).await?;
    raise_odometer(db, &purchase.vehicle_plate, purchase.odometer_km).await?;

    let recomputed = recompute_keys(db, [old_key, purchase.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: purchase.id,
        recomputed,
    })
}

pub(super) async fn delete(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<ExpenseReceipt> {
    let purchase = require_purchase(db, id).await?;
    fuel::Entity::delete_by_id(id.to_string()).exec(db).await?;
    let recomputed = recompute_keys(db, [purchase.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: id,
        recomputed,
    })
}

impl Engine {
    pub async fn fuel_purchase(&self, id: Uuid) -> ResultEngine<FuelPurchase> {
        with_tx!(self, |db_tx| require_purchase(&db_tx, id).await)
    }

    /// Fuel purchases of a vehicle, most recent first.
    pub async fn fuel_purchases(&self, plate: &str) -> ResultEngine<Vec<FuelPurchase>> {
        let plate = normalize_plate(plate)?;
        with_tx!(self, |db_tx| {
            fuel::Entity::find()
                .filter(fuel::Column::VehiclePlate.eq(plate.clone()))
                .order_by_desc(fuel::Column::Date)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(FuelPurchase::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
