//! Work order API endpoints

use api_types::{
    expense::ExpenseReceipt,
    work_order::{WorkOrder, WorkOrderLink, WorkOrderNew},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, expenses::map_receipt, server::ServerState};

fn map_work_order(work_order: engine::WorkOrder) -> WorkOrder {
    WorkOrder {
        id: work_order.id,
        order_number: work_order.order_number,
        vehicle_plate: work_order.vehicle_plate,
        requested_on: work_order.requested_on,
        description: work_order.description,
        purchase_order_id: work_order.purchase_order_id,
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<WorkOrderNew>,
) -> Result<(StatusCode, Json<WorkOrder>), ServerError> {
    let work_order = state
        .engine
        .create_work_order(
            &payload.order_number,
            &payload.vehicle_plate,
            payload.requested_on,
            &payload.description,
            payload.purchase_order_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_work_order(work_order))))
}

/// Handle requests for (un)linking a work order to a purchase order
pub async fn link(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkOrderLink>,
) -> Result<Json<ExpenseReceipt>, ServerError> {
    let receipt = state
        .engine
        .link_work_order(id, payload.purchase_order_id)
        .await?;
    Ok(Json(map_receipt(receipt)))
}
