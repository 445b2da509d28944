use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseReceipt, NewPurchaseOrderCmd, PurchaseOrder, PurchaseOrderState,
    ResolvedPurchaseOrder, ResultEngine, UpdatePurchaseOrderCmd, purchase_orders,
    util::normalize_plate, work_orders,
};

use super::{
    Engine,
    accounts::require_optional_account,
    ledger::{recompute_keys, resolve_purchase_order},
    vehicles::require_vehicle,
    with_tx,
};

pub(super) async fn require_order(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<PurchaseOrder> {
    let model = purchase_orders::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("purchase order {id}")))?;
    PurchaseOrder::try_from(model)
}

async fn require_optional_vehicle(
    db: &DatabaseTransaction,
    plate: Option<&str>,
) -> ResultEngine<Option<String>> {
    match plate {
        Some(plate) => {
            let plate = normalize_plate(plate)?;
            require_vehicle(db, &plate).await?;
            Ok(Some(plate))
        }
        None => Ok(None),
    }
}

pub(super) async fn create(
    db: &DatabaseTransaction,
    cmd: NewPurchaseOrderCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut order = PurchaseOrder::new(&cmd.order_number, cmd.issued_on, cmd.amount_total)?;
    let exists = purchase_orders::Entity::find()
        .filter(purchase_orders::Column::OrderNumber.eq(order.order_number.clone()))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Err(EngineError::ExistingKey(order.order_number));
    }
    order.vehicle_plate = require_optional_vehicle(db, cmd.vehicle_plate.as_deref()).await?;
    order.account_code = require_optional_account(db, cmd.account_code.as_deref()).await?;

    purchase_orders::ActiveModel::from(&order).insert(db).await?;
    tracing::info!(
        purchase_order_id = %order.id,
        order_number = %order.order_number,
        total = %order.amount_total,
        "purchase order issued"
    );

    let resolved = resolve_purchase_order(db, order).await?;
    let recomputed = recompute_keys(db, [resolved.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: resolved.order.id,
        recomputed,
    })
}

pub(super) async fn update(
    db: &DatabaseTransaction,
    cmd: UpdatePurchaseOrderCmd,
) -> ResultEngine<ExpenseReceipt> {
    let mut order = require_order(db, cmd.id).await?;
    let old_key = resolve_purchase_order(db, order.clone()).await?.ledger_key();

    if let Some(date) = cmd.issued_on {
        order.issued_on = date;
    }
    if let Some(amount) = cmd.amount_total {
        order.amount_total = amount.ensure_non_negative("amount_total")?;
    }
    if let Some(plate) = cmd.vehicle_plate {
        order.vehicle_plate = require_optional_vehicle(db, plate.as_deref()).await?;
    }
    if let Some(account) = cmd.account_code {
        order.account_code = require_optional_account(db, account.as_deref()).await?;
    }

    purchase_orders::ActiveModel::from(&order).update(db).await?;
    let resolved = resolve_purchase_order(db, order).await?;
    let recomputed = recompute_keys(db, [old_key, resolved.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: resolved.order.id,
        recomputed,
    })
}

/// Moves an order forward, or voids it. Voiding removes the commitment from
/// the ledger.
pub(super) async fn transition(
    db: &DatabaseTransaction,
    id: Uuid,
    to: PurchaseOrderState,
) -> ResultEngine<ExpenseReceipt> {
    let mut order = require_order(db, id).await?;
    let from = order.state;
    order.transition(to)?;

    purchase_orders::ActiveModel::from(&order).update(db).await?;
    tracing::info!(
        purchase_order_id = %order.id,
        from = from.as_str(),
        to = to.as_str(),
        "purchase order transitioned"
    );

    let resolved = resolve_purchase_order(db, order).await?;
    let recomputed = recompute_keys(db, [resolved.ledger_key()]).await?;
    Ok(ExpenseReceipt {
        record_id: id,
        recomputed,
    })
}

/// Deletes an order and detaches the work orders linked to it.
pub(super) async fn delete(db: &DatabaseTransaction, id: Uuid) -> ResultEngine<ExpenseReceipt> {
    let order = require_order(db, id).await?;
    let key = resolve_purchase_order(db, order).await?.ledger_key();

    work_orders::Entity::update_many()
        .col_expr(
            work_orders::Column::PurchaseOrderId,
            Expr::value(Option::<String>::None),
        )
        .filter(work_orders::Column::PurchaseOrderId.eq(id.to_string()))
        .exec(db)
        .await?;
    purchase_orders::Entity::delete_by_id(id.to_string())
        .exec(db)
        .await?;

    let recomputed = recompute_keys(db, [key]).await?;
    Ok(ExpenseReceipt {
        record_id: id,
        recomputed,
    })
}

impl Engine {
    /// A purchase order with the vehicle it resolves to.
    pub async fn purchase_order(&self, id: Uuid) -> ResultEngine<ResolvedPurchaseOrder> {
        with_tx!(self, |db_tx| {
            let order = require_order(&db_tx, id).await?;
            resolve_purchase_order(&db_tx, order).await
        })
    }
}
