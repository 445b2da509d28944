use chrono::NaiveDate;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseReceipt, ResultEngine, WorkOrder, util::normalize_plate, work_orders,
};

use super::{
    Engine,
    ledger::{recompute_keys, resolve_purchase_order},
    purchase_orders::require_order,
    vehicles::require_vehicle,
    with_tx,
};

async fn require_work_order(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<WorkOrder> {
    let model = work_orders::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("work order {id}")))?;
    WorkOrder::try_from(model)
}

/// Points `work_order` at `purchase_order_id` (or detaches it) and
/// recomputes the ledger of every order whose resolved vehicle may change.
async fn set_link(
    db: &DatabaseTransaction,
    work_order: &WorkOrder,
    purchase_order_id: Option<Uuid>,
) -> ResultEngine<ExpenseReceipt> {
    let mut affected = Vec::new();
    for order_id in [work_order.purchase_order_id, purchase_order_id]
        .into_iter()
        .flatten()
    {
        let order = require_order(db, order_id).await?;
        affected.push(resolve_purchase_order(db, order).await?.ledger_key());
    }

    work_orders::ActiveModel {
        id: ActiveValue::Unchanged(work_order.id.to_string()),
        purchase_order_id: ActiveValue::Set(purchase_order_id.map(|id| id.to_string())),
        ..Default::default()
    }
    .update(db)
    .await?;
    tracing::info!(
        work_order_id = %work_order.id,
        purchase_order_id = ?purchase_order_id,
        "work order linked"
    );

    for order_id in [work_order.purchase_order_id, purchase_order_id]
        .into_iter()
        .flatten()
    {
        let order = require_order(db, order_id).await?;
        affected.push(resolve_purchase_order(db, order).await?.ledger_key());
    }

    let recomputed = recompute_keys(db, affected).await?;
    Ok(ExpenseReceipt {
        record_id: work_order.id,
        recomputed,
    })
}

impl Engine {
    /// Opens a work order for a vehicle, optionally linked to a purchase
    /// order right away.
    pub async fn create_work_order(
        &self,
        order_number: &str,
        vehicle_plate: &str,
        requested_on: NaiveDate,
        description: &str,
        purchase_order_id: Option<Uuid>,
    ) -> ResultEngine<WorkOrder> {
        let mut work_order = WorkOrder::new(order_number, vehicle_plate, requested_on, description)?;
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            require_vehicle(&db_tx, &work_order.vehicle_plate).await?;
            let exists = work_orders::Entity::find()
                .filter(work_orders::Column::OrderNumber.eq(work_order.order_number.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(work_order.order_number));
            }
            work_orders::ActiveModel::from(&work_order).insert(&db_tx).await?;
            if purchase_order_id.is_some() {
                set_link(&db_tx, &work_order, purchase_order_id).await?;
                work_order.purchase_order_id = purchase_order_id;
            }
            Ok(work_order)
        })
    }

    /// Links a work order to a purchase order, or detaches it with `None`.
    pub async fn link_work_order(
        &self,
        work_order_id: Uuid,
        purchase_order_id: Option<Uuid>,
    ) -> ResultEngine<ExpenseReceipt> {
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            let work_order = require_work_order(&db_tx, work_order_id).await?;
            set_link(&db_tx, &work_order, purchase_order_id).await
        })
    }

    pub async fn work_order(&self, id: Uuid) -> ResultEngine<WorkOrder> {
        with_tx!(self, |db_tx| require_work_order(&db_tx, id).await)
    }

    /// Work orders of a vehicle.
    pub async fn work_orders(&self, plate: &str) -> ResultEngine<Vec<WorkOrder>> {
        let plate = normalize_plate(plate)?;
        with_tx!(self, |db_tx| {
            work_orders::Entity::find()
                .filter(work_orders::Column::VehiclePlate.eq(plate.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(WorkOrder::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
