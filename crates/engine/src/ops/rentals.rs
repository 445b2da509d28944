use chrono::NaiveDate;
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseReceipt, NewRentalCmd, RentalContract, RentalState, ResultEngine,
    UpdateRentalCmd, rentals,
};

use super::{
    Engine, accounts::require_optional_account, ledger::recompute_keys,
    vehicles::{require_vehicle, settle_vehicle_status},
    with_tx,
};

async fn require_rental(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<RentalContract> {
    let model = rentals::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("rental {id}")))?;
    RentalContract::try_from(model)
}

/// Opens a rental. A replaced fleet vehicle goes out of service while the
/// contract is active.
pub(super) async fn create(
    db: &DatabaseTransaction,
    cmd: NewRentalCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut rental = RentalContract::new(
        &cmd.rented_vehicle,
        cmd.start_date,
        cmd.daily_cost,
        &cmd.reason,
    )?;
    if let Some(plate) = cmd.replaced_vehicle.as_deref() {
        rental = rental.replaced_vehicle(plate)?;
    }
    if let Some(plate) = rental.replaced_vehicle.as_deref() {
        require_vehicle(db, plate).await?;
    }
    rental.end_date = cmd.end_date;
    rental.account_code = require_optional_account(db, cmd.account_code.as_deref()).await?;
    rental.validate()?;

    rentals::ActiveModel::from(&rental).insert(db).await?;
    tracing::info!(rental_id = %rental.id, "rental opened");
    if let Some(plate) = rental.replaced_vehicle.as_deref() {
        settle_vehicle_status(db, plate).await?;
    }

    let recomputed = recompute_keys(db, [rental.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: rental.id,
        recomputed,
    })
}

pub(super) async fn update(
    db: &DatabaseTransaction,
    cmd: UpdateRentalCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut rental = require_rental(db, cmd.id).await?;
    let old_key = rental.ledger_key();

    if let Some(date) = cmd.start_date {
        rental.start_date = date;
    }
    if let Some(date) = cmd.end_date {
        if rental.state == RentalState::Finalized && date.is_none() {
            return Err(EngineError::InvalidTransition(
                "a finalized rental keeps its end_date".to_string(),
            ));
        }
        rental.end_date = date;
    }
    if let Some(amount) = cmd.daily_cost {
        rental.daily_cost = amount;
    }
    if let Some(account) = cmd.account_code {
        rental.account_code = require_optional_account(db, account.as_deref()).await?;
    }
    rental.validate()?;

    rentals::ActiveModel::from(&rental).update(db).await?;
    let recomputed = recompute_keys(db, [old_key, rental.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: rental.id,
        recomputed,
    })
}

/// Closes a rental on `end_date` and releases the replaced vehicle.
pub(super) async fn finalize(
    db: &DatabaseTransaction,
    id: Uuid,
    end_date: NaiveDate,
) -> ResultEngine<ExpenseReceipt> {
    let mut rental = require_rental(db, id).await?;
    rental.finalize(end_date)?;
    rental.validate()?;

    rentals::ActiveModel::from(&rental).update(db).await?;
    tracing::info!(rental_id = %rental.id, total = %rental.total_cost(), "rental finalized");
    if let Some(plate) = rental.replaced_vehicle.as_deref() {
        settle_vehicle_status(db, plate).await?;
    }

    let recomputed = recompute_keys(db, [rental.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: rental.id,
        recomputed,
    })
}

pub(super) async fn delete(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<ExpenseReceipt> {
    let rental = require_rental(db, id).await?;
    rentals::Entity::delete_by_id(id.to_string()).exec(db).await?;
    if let Some(plate) = rental.replaced_vehicle.as_deref() {
        settle_vehicle_status(db, plate).await?;
    }
    let recomputed = recompute_keys(db, [rental.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: id,
        recomputed,
    })
}

impl Engine {
    pub async fn rental(&self, id: Uuid) -> ResultEngine<RentalContract> {
        with_tx!(self, |db_tx| require_rental(&db_tx, id).await)
    }
}
