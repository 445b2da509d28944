use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseReceipt, MaintenanceEvent, MaintenanceState, MaintenanceTransitionCmd,
    NewMaintenanceCmd, ResultEngine, UpdateMaintenanceCmd, maintenance,
    util::{normalize_plate, normalize_required_text},
    work_orders,
};

use super::{
    Engine, accounts::require_optional_account, guard, ledger::recompute_keys,
    vehicles::{raise_odometer, require_vehicle, settle_vehicle_status},
    with_tx,
};

async fn require_event(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<MaintenanceEvent> {
    let model = maintenance::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("maintenance {id}")))?;
    MaintenanceEvent::try_from(model)
}

pub(super) async fn create(
    db: &DatabaseTransaction,
    cmd: NewMaintenanceCmd,
) -> ResultEngine<ExpenseReceipt> {
    let plate = normalize_plate(&cmd.vehicle_plate)?;
    require_vehicle(db, &plate).await?;
    if let Some(work_order_id) = cmd.work_order_id {
        work_orders::Entity::find_by_id(work_order_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("work order {work_order_id}")))?;
    }

    let mut event = MaintenanceEvent::new(
        &plate,
        cmd.kind,
        cmd.entry_date,
        cmd.odometer_km,
        &cmd.description,
    )?;
    event.scheduled_date = cmd.scheduled_date;
    event.estimated_cost = cmd.estimated_cost;
    event.labor_cost = cmd.labor_cost;
    event.parts_cost = cmd.parts_cost;
    event.account_code = require_optional_account(db, cmd.account_code.as_deref()).await?;
    event.work_order_id = cmd.work_order_id;
    event.validate()?;

    maintenance::ActiveModel::from(&event).insert(db).await?;
    tracing::info!(maintenance_id = %event.id, vehicle = %event.vehicle_plate, "maintenance scheduled");

    let recomputed = recompute_keys(db, [event.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: event.id,
        recomputed,
    })
}

/// Edits an event in any state. Edits of a finalized event recompute the
/// ledger of the old and new scopes without consulting the guard.
pub(super) async fn update(
    db: &DatabaseTransaction,
    cmd: UpdateMaintenanceCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut event = require_event(db, cmd.id).await?;
    let old_key = event.ledger_key();
    let old_plate = event.vehicle_plate.clone();

    if let Some(plate) = cmd.vehicle_plate.as_deref() {
        let plate = normalize_plate(plate)?;
        require_vehicle(db, &plate).await?;
        event.vehicle_plate = plate;
    }
    if let Some(date) = cmd.entry_date {
        event.entry_date = date;
    }
    if let Some(date) = cmd.exit_date {
        event.exit_date = date;
    }
    if let Some(km) = cmd.odometer_km {
        if km < 0 {
            return Err(EngineError::InvalidAmount(
                "odometer_km must be >= 0".to_string(),
            ));
        }
        event.odometer_km = km;
    }
    if let Some(description) = cmd.description.as_deref() {
        event.description = normalize_required_text(description, "description")?;
    }
    if let Some(amount) = cmd.estimated_cost {
        event.estimated_cost = amount;
    }
    if let Some(amount) = cmd.labor_cost {
        event.labor_cost = amount;
    }
    if let Some(amount) = cmd.parts_cost {
        event.parts_cost = amount;
    }
    if let Some(account) = cmd.account_code {
        event.account_code = require_optional_account(db, account.as_deref()).await?;
    }
    event.validate()?;
    if event.state == MaintenanceState::Finalized {
        event.check_finalizable()?;
    }

    maintenance::ActiveModel::from(&event).update(db).await?;

    if old_plate != event.vehicle_plate {
        settle_vehicle_status(db, &old_plate).await?;
        settle_vehicle_status(db, &event.vehicle_plate).await?;
    }
    if event.state == MaintenanceState::Finalized {
        raise_odometer(db, &event.vehicle_plate, event.odometer_km).await?;
    }

    let recomputed = recompute_keys(db, [old_key, event.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: event.id,
        recomputed,
    })
}

/// Applies a state transition.
///
/// Finalization checks the preconditions, then the overspend guard when an
/// account is attached, before anything is written.
pub(super) async fn transition(
    db: &DatabaseTransaction,
    cmd: MaintenanceTransitionCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut event = require_event(db, cmd.id).await?;
    let from = event.state;
    from.check_transition(cmd.to)?;

    if let Some(exit_date) = cmd.exit_date {
        event.exit_date = Some(exit_date);
    }
    if cmd.to == MaintenanceState::Finalized {
        event.check_finalizable()?;
        event.validate()?;
        if let Some(key) = event.ledger_key() {
            guard::check(db, &key, event.total_real_cost())
                .await?
                .into_result()?;
        }
    }

    event.state = cmd.to;
    maintenance::ActiveModel::from(&event).update(db).await?;
    tracing::info!(
        maintenance_id = %event.id,
        from = from.as_str(),
        to = cmd.to.as_str(),
        "maintenance transitioned"
    );

    settle_vehicle_status(db, &event.vehicle_plate).await?;
    if cmd.to == MaintenanceState::Finalized {
        raise_odometer(db, &event.vehicle_plate, event.odometer_km).await?;
    }

    let recomputed = recompute_keys(db, [event.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: event.id,
        recomputed,
    })
}

pub(super) async fn delete(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<ExpenseReceipt> {
    let event = require_event(db, id).await?;
    maintenance::Entity::delete_by_id(id.to_string())
        .exec(db)
        .await?;
    tracing::info!(maintenance_id = %id, "maintenance deleted");

    settle_vehicle_status(db, &event.vehicle_plate).await?;
    let recomputed = recompute_keys(db, [event.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: id,
        recomputed,
    })
}

impl Engine {
    pub async fn maintenance_event(&self, id: Uuid) -> ResultEngine<MaintenanceEvent> {
        with_tx!(self, |db_tx| require_event(&db_tx, id).await)
    }

    /// Maintenance history of a vehicle, most recent entry first.
    pub async fn maintenance_events(&self, plate: &str) -> ResultEngine<Vec<MaintenanceEvent>> {
        let plate = normalize_plate(plate)?;
        with_tx!(self, |db_tx| {
            maintenance::Entity::find()
                .filter(maintenance::Column::VehiclePlate.eq(plate.clone()))
                .order_by_desc(maintenance::Column::EntryDate)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(MaintenanceEvent::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
