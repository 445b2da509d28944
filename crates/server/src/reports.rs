//! Budget report API endpoints

use api_types::report::{
    AlertsQuery, ExecutionAlert, MaintenanceAlert, MaintenanceAlertsQuery, VarianceLine,
    VarianceQuery, VehicleCost, VehicleCostQuery,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{ServerError, allocations::map_allocation, server::ServerState};

pub async fn alerts(
    State(state): State<ServerState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<ExecutionAlert>>, ServerError> {
    let alerts = state.engine.execution_alerts(query.year).await?;
    Ok(Json(
        alerts
            .into_iter()
            .map(|alert| ExecutionAlert {
                allocation: map_allocation(&alert.allocation),
                pct_executed_bps: alert.pct_executed_bps,
                remaining: alert.remaining.to_decimal_string(),
            })
            .collect(),
    ))
}

pub async fn variance(
    State(state): State<ServerState>,
    Query(query): Query<VarianceQuery>,
) -> Result<Json<Vec<VarianceLine>>, ServerError> {
    let lines = state.engine.variance_report(query.year).await?;
    Ok(Json(
        lines
            .into_iter()
            .map(|line| VarianceLine {
                allocation: map_allocation(&line.allocation),
                variance: line.variance.to_decimal_string(),
                variance_bps: line.variance_bps,
                overrun: line.overrun,
            })
            .collect(),
    ))
}

pub async fn vehicle_costs(
    State(state): State<ServerState>,
    Path(plate): Path<String>,
    Query(query): Query<VehicleCostQuery>,
) -> Result<Json<VehicleCost>, ServerError> {
    let report = state.engine.vehicle_cost_report(&plate, query.year).await?;
    Ok(Json(VehicleCost {
        vehicle_plate: report.vehicle_plate,
        year: report.year,
        maintenance: report.maintenance.to_decimal_string(),
        fuel: report.fuel.to_decimal_string(),
        rentals: report.rentals.to_decimal_string(),
        total: report.total.to_decimal_string(),
        cost_per_km: report.cost_per_km.to_decimal_string(),
        days_out_of_service: report.days_out_of_service,
    }))
}

fn map_maintenance_alert(alert: engine::MaintenanceAlert) -> MaintenanceAlert {
    match alert {
        engine::MaintenanceAlert::ServiceDue {
            vehicle_plate,
            km_remaining,
        } => MaintenanceAlert::ServiceDue {
            vehicle_plate,
            km_remaining,
        },
        engine::MaintenanceAlert::ServiceOverdue {
            vehicle_plate,
            threshold_km,
            km_past,
        } => MaintenanceAlert::ServiceOverdue {
            vehicle_plate,
            threshold_km,
            km_past,
        },
        engine::MaintenanceAlert::ScheduledSoon {
            vehicle_plate,
            event_id,
            scheduled_date,
            days_remaining,
        } => MaintenanceAlert::ScheduledSoon {
            vehicle_plate,
            event_id,
            scheduled_date,
            days_remaining,
        },
        engine::MaintenanceAlert::ScheduledOverdue {
            vehicle_plate,
            event_id,
            scheduled_date,
            days_overdue,
        } => MaintenanceAlert::ScheduledOverdue {
            vehicle_plate,
            event_id,
            scheduled_date,
            days_overdue,
        },
    }
}

pub async fn maintenance_alerts(
    State(state): State<ServerState>,
    Query(query): Query<MaintenanceAlertsQuery>,
) -> Result<Json<Vec<MaintenanceAlert>>, ServerError> {
    let today = query.today.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let alerts = state.engine.maintenance_alerts(today).await?;
    Ok(Json(alerts.into_iter().map(map_maintenance_alert).collect()))
}
