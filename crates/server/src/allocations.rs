//! Budget allocation API endpoints

use api_types::allocation::{
    Allocation, AllocationKind, AllocationList, AllocationListResponse, AllocationNew,
    AllocationStatus, AllocationStatusQuery, AllocationUpdate, Recomputed,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{AllocationFilter, BudgetAllocation, Money};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: engine::AllocationKind) -> AllocationKind {
    match kind {
        engine::AllocationKind::Preventive => AllocationKind::Preventive,
        engine::AllocationKind::Operational => AllocationKind::Operational,
    }
}

fn parse_kind(kind: AllocationKind) -> engine::AllocationKind {
    match kind {
        AllocationKind::Preventive => engine::AllocationKind::Preventive,
        AllocationKind::Operational => engine::AllocationKind::Operational,
    }
}

pub(crate) fn map_allocation(allocation: &BudgetAllocation) -> Allocation {
    let disabled_at = match allocation.status {
        engine::AllocationStatus::Active => None,
        engine::AllocationStatus::Disabled { disabled_at } => Some(disabled_at),
    };
    Allocation {
        id: allocation.id,
        year: allocation.year,
        account_code: allocation.account_code.clone(),
        vehicle_plate: allocation.vehicle_plate.clone(),
        kind: map_kind(allocation.kind),
        assigned: allocation.assigned.to_decimal_string(),
        executed: allocation.executed().to_decimal_string(),
        available: allocation.available().to_decimal_string(),
        pct_executed_bps: allocation.pct_executed_bps(),
        pct_executed: allocation.pct_executed(),
        active: allocation.is_active(),
        disabled_at,
    }
}

pub(crate) fn map_recomputed(recomputed: engine::RecomputedAllocation) -> Recomputed {
    Recomputed {
        allocation_id: recomputed.allocation_id,
        executed: recomputed.executed.to_decimal_string(),
        available: recomputed.available.to_decimal_string(),
    }
}

/// Handle requests for creating a budget allocation
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<AllocationNew>,
) -> Result<(StatusCode, Json<Allocation>), ServerError> {
    let assigned: Money = payload.assigned.parse()?;
    let allocation = state
        .engine
        .create_allocation(
            payload.year,
            &payload.account_code,
            payload.vehicle_plate.as_deref(),
            parse_kind(payload.kind),
            assigned,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_allocation(&allocation))))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<AllocationList>,
) -> Result<Json<AllocationListResponse>, ServerError> {
    let mut filter = AllocationFilter::default();
    if let Some(year) = query.year {
        filter = filter.year(year);
    }
    if let Some(account) = query.account {
        filter = filter.account(account);
    }
    if let Some(vehicle) = query.vehicle {
        filter = filter.vehicle(vehicle);
    }
    if query.include_disabled {
        filter = filter.include_disabled();
    }

    let report = state.engine.allocation_report(&filter).await?;
    Ok(Json(AllocationListResponse {
        allocations: report.allocations.iter().map(map_allocation).collect(),
        total_assigned: report.total_assigned.to_decimal_string(),
        total_executed: report.total_executed.to_decimal_string(),
        total_available: report.total_available.to_decimal_string(),
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Allocation>, ServerError> {
    let allocation = state.engine.allocation(id).await?;
    Ok(Json(map_allocation(&allocation)))
}

/// Handle requests for changing the assigned amount
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AllocationUpdate>,
) -> Result<Json<Allocation>, ServerError> {
    let assigned: Money = payload.assigned.parse()?;
    let allocation = state.engine.update_allocation_assigned(id, assigned).await?;
    Ok(Json(map_allocation(&allocation)))
}

pub async fn disable(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Allocation>, ServerError> {
    let allocation = state.engine.disable_allocation(id).await?;
    Ok(Json(map_allocation(&allocation)))
}

pub async fn recompute(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recomputed>, ServerError> {
    let recomputed = state.engine.recompute_allocation(id).await?;
    Ok(Json(map_recomputed(recomputed)))
}

/// Handle requests for the ledger figures of one exact scope
pub async fn status(
    State(state): State<ServerState>,
    Query(query): Query<AllocationStatusQuery>,
) -> Result<Json<AllocationStatus>, ServerError> {
    let status = state
        .engine
        .query_allocation_status(&query.account, query.vehicle.as_deref(), query.year)
        .await?;
    Ok(Json(AllocationStatus {
        allocation_id: status.allocation_id,
        assigned: status.assigned.to_decimal_string(),
        executed: status.executed.to_decimal_string(),
        available: status.available.to_decimal_string(),
        pct_executed_bps: status.pct_executed_bps,
    }))
}
