//! Expense API endpoint
//!
//! Every expense write goes through `POST /expenses`; the body is a tagged
//! [`ExpenseCommand`] and the response lists the allocations it recomputed.

use api_types::expense::{
    ExpenseCommand, ExpenseReceipt, FuelNew, FuelUpdate, MaintenanceKind, MaintenanceNew,
    MaintenanceState, MaintenanceUpdate, PurchaseOrderNew, PurchaseOrderState,
    PurchaseOrderUpdate, RentalNew, RentalUpdate,
};
use axum::{Json, extract::State};
use engine::{Liters, Money};

use crate::{ServerError, allocations::map_recomputed, server::ServerState};

fn parse_money(value: Option<String>) -> Result<Option<Money>, ServerError> {
    Ok(value.map(|value| value.parse::<Money>()).transpose()?)
}

fn parse_maintenance_kind(kind: MaintenanceKind) -> engine::MaintenanceKind {
    match kind {
        MaintenanceKind::Preventive => engine::MaintenanceKind::Preventive,
        MaintenanceKind::Corrective => engine::MaintenanceKind::Corrective,
    }
}

fn parse_maintenance_state(state: MaintenanceState) -> engine::MaintenanceState {
    match state {
        MaintenanceState::Scheduled => engine::MaintenanceState::Scheduled,
        MaintenanceState::InShop => engine::MaintenanceState::InShop,
        MaintenanceState::AwaitingParts => engine::MaintenanceState::AwaitingParts,
        MaintenanceState::Finalized => engine::MaintenanceState::Finalized,
        MaintenanceState::Cancelled => engine::MaintenanceState::Cancelled,
    }
}

fn parse_order_state(state: PurchaseOrderState) -> engine::PurchaseOrderState {
    match state {
        PurchaseOrderState::Issued => engine::PurchaseOrderState::Issued,
        PurchaseOrderState::Accepted => engine::PurchaseOrderState::Accepted,
        PurchaseOrderState::Received => engine::PurchaseOrderState::Received,
        PurchaseOrderState::Paid => engine::PurchaseOrderState::Paid,
        PurchaseOrderState::Voided => engine::PurchaseOrderState::Voided,
    }
}

fn new_maintenance(payload: MaintenanceNew) -> Result<engine::NewMaintenanceCmd, ServerError> {
    let mut cmd = engine::NewMaintenanceCmd::new(
        payload.vehicle_plate,
        parse_maintenance_kind(payload.kind),
        payload.entry_date,
        payload.odometer_km,
        payload.description,
    );
    if let Some(date) = payload.scheduled_date {
        cmd = cmd.scheduled_date(date);
    }
    if let Some(amount) = parse_money(payload.estimated_cost)? {
        cmd = cmd.estimated_cost(amount);
    }
    if let Some(amount) = parse_money(payload.labor_cost)? {
        cmd = cmd.labor_cost(amount);
    }
    if let Some(amount) = parse_money(payload.parts_cost)? {
        cmd = cmd.parts_cost(amount);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    if let Some(work_order_id) = payload.work_order_id {
        cmd = cmd.work_order(work_order_id);
    }
    Ok(cmd)
}

fn update_maintenance(
    payload: MaintenanceUpdate,
) -> Result<engine::UpdateMaintenanceCmd, ServerError> {
    let mut cmd = engine::UpdateMaintenanceCmd::new(payload.id);
    if let Some(plate) = payload.vehicle_plate {
        cmd = cmd.vehicle(plate);
    }
    if let Some(date) = payload.entry_date {
        cmd = cmd.entry_date(date);
    }
    if let Some(date) = payload.exit_date {
        cmd = cmd.exit_date(date);
    }
    if let Some(km) = payload.odometer_km {
        cmd = cmd.odometer_km(km);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(amount) = parse_money(payload.estimated_cost)? {
        cmd = cmd.estimated_cost(amount);
    }
    if let Some(amount) = parse_money(payload.labor_cost)? {
        cmd = cmd.labor_cost(amount);
    }
    if let Some(amount) = parse_money(payload.parts_cost)? {
        cmd = cmd.parts_cost(amount);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn new_fuel(payload: FuelNew) -> Result<engine::NewFuelCmd, ServerError> {
    let liters: Liters = payload.liters.parse()?;
    let total_cost: Money = payload.total_cost.parse()?;
    let mut cmd = engine::NewFuelCmd::new(
        payload.vehicle_plate,
        payload.date,
        liters,
        total_cost,
        payload.odometer_km,
    );
    if let Some(price) = parse_money(payload.unit_price)? {
        cmd = cmd.unit_price(price);
    }
    if let Some(receipt) = payload.receipt_number {
        cmd = cmd.receipt_number(receipt);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn update_fuel(payload: FuelUpdate) -> Result<engine::UpdateFuelCmd, ServerError> {
    let mut cmd = engine::UpdateFuelCmd::new(payload.id);
    if let Some(plate) = payload.vehicle_plate {
        cmd = cmd.vehicle(plate);
    }
    if let Some(date) = payload.date {
        cmd = cmd.date(date);
    }
    if let Some(liters) = payload.liters {
        cmd = cmd.liters(liters.parse::<Liters>()?);
    }
    if let Some(amount) = parse_money(payload.total_cost)? {
        cmd = cmd.total_cost(amount);
    }
    if let Some(km) = payload.odometer_km {
        cmd = cmd.odometer_km(km);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn new_rental(payload: RentalNew) -> Result<engine::NewRentalCmd, ServerError> {
    let daily_cost: Money = payload.daily_cost.parse()?;
    let mut cmd = engine::NewRentalCmd::new(
        payload.rented_vehicle,
        payload.start_date,
        daily_cost,
        payload.reason,
    );
    if let Some(plate) = payload.replaced_vehicle {
        cmd = cmd.replaces(plate);
    }
    if let Some(date) = payload.end_date {
        cmd = cmd.end_date(date);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn update_rental(payload: RentalUpdate) -> Result<engine::UpdateRentalCmd, ServerError> {
    let mut cmd = engine::UpdateRentalCmd::new(payload.id);
    if let Some(date) = payload.start_date {
        cmd = cmd.start_date(date);
    }
    if let Some(date) = payload.end_date {
        cmd = cmd.end_date(date);
    }
    if let Some(amount) = parse_money(payload.daily_cost)? {
        cmd = cmd.daily_cost(amount);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn new_purchase_order(
    payload: PurchaseOrderNew,
) -> Result<engine::NewPurchaseOrderCmd, ServerError> {
    let amount_total: Money = payload.amount_total.parse()?;
    let mut cmd =
        engine::NewPurchaseOrderCmd::new(payload.order_number, payload.issued_on, amount_total);
    if let Some(plate) = payload.vehicle_plate {
        cmd = cmd.vehicle(plate);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn update_purchase_order(
    payload: PurchaseOrderUpdate,
) -> Result<engine::UpdatePurchaseOrderCmd, ServerError> {
    let mut cmd = engine::UpdatePurchaseOrderCmd::new(payload.id);
    if let Some(date) = payload.issued_on {
        cmd = cmd.issued_on(date);
    }
    if let Some(amount) = parse_money(payload.amount_total)? {
        cmd = cmd.amount_total(amount);
    }
    if let Some(plate) = payload.vehicle_plate {
        cmd = cmd.vehicle(plate);
    }
    if let Some(account) = payload.account_code {
        cmd = cmd.account(account);
    }
    Ok(cmd)
}

fn parse_command(cmd: ExpenseCommand) -> Result<engine::ExpenseCommand, ServerError> {
    Ok(match cmd {
        ExpenseCommand::CreateMaintenance(payload) => {
            engine::ExpenseCommand::CreateMaintenance(new_maintenance(payload)?)
        }
        ExpenseCommand::UpdateMaintenance(payload) => {
            engine::ExpenseCommand::UpdateMaintenance(update_maintenance(payload)?)
        }
        ExpenseCommand::TransitionMaintenance(payload) => {
            let mut cmd = engine::MaintenanceTransitionCmd::new(
                payload.id,
                parse_maintenance_state(payload.to),
            );
            if let Some(date) = payload.exit_date {
                cmd = cmd.exit_date(date);
            }
            engine::ExpenseCommand::TransitionMaintenance(cmd)
        }
        ExpenseCommand::DeleteMaintenance { id } => engine::ExpenseCommand::DeleteMaintenance { id },
        ExpenseCommand::CreateFuel(payload) => engine::ExpenseCommand::CreateFuel(new_fuel(payload)?),
        ExpenseCommand::UpdateFuel(payload) => {
            engine::ExpenseCommand::UpdateFuel(update_fuel(payload)?)
        }
        ExpenseCommand::DeleteFuel { id } => engine::ExpenseCommand::DeleteFuel { id },
        ExpenseCommand::CreateRental(payload) => {
            engine::ExpenseCommand::CreateRental(new_rental(payload)?)
        }
        ExpenseCommand::UpdateRental(payload) => {
            engine::ExpenseCommand::UpdateRental(update_rental(payload)?)
        }
        ExpenseCommand::FinalizeRental { id, end_date } => {
            engine::ExpenseCommand::FinalizeRental { id, end_date }
        }
        ExpenseCommand::DeleteRental { id } => engine::ExpenseCommand::DeleteRental { id },
        ExpenseCommand::CreatePurchaseOrder(payload) => {
            engine::ExpenseCommand::CreatePurchaseOrder(new_purchase_order(payload)?)
        }
        ExpenseCommand::UpdatePurchaseOrder(payload) => {
            engine::ExpenseCommand::UpdatePurchaseOrder(update_purchase_order(payload)?)
        }
        ExpenseCommand::TransitionPurchaseOrder { id, to } => {
            engine::ExpenseCommand::TransitionPurchaseOrder {
                id,
                to: parse_order_state(to),
            }
        }
        ExpenseCommand::DeletePurchaseOrder { id } => {
            engine::ExpenseCommand::DeletePurchaseOrder { id }
        }
    })
}

pub(crate) fn map_receipt(receipt: engine::ExpenseReceipt) -> ExpenseReceipt {
    ExpenseReceipt {
        record_id: receipt.record_id,
        recomputed: receipt.recomputed.into_iter().map(map_recomputed).collect(),
    }
}

/// Handle requests for any expense write
pub async fn submit(
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseCommand>,
) -> Result<Json<ExpenseReceipt>, ServerError> {
    let cmd = parse_command(payload)?;
    let receipt = state.engine.submit_expense(cmd).await?;
    Ok(Json(map_receipt(receipt)))
}
