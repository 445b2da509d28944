//! Read models over budget allocations and vehicles.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    BudgetAllocation, MaintenanceEvent, Money, RentalContract, ResultEngine, Vehicle,
    VehicleStatus,
    aggregate::{ExpenseSources, checked_total},
    maintenance::{MaintenanceKind, MaintenanceState},
    util::budget_year,
};

/// Executed share (in basis points) from which an allocation is reported as
/// close to exhaustion.
pub const ALERT_THRESHOLD_BPS: i64 = 8_000;

/// Overrun share (in basis points) above which a variance line is flagged.
pub const VARIANCE_THRESHOLD_BPS: i64 = 1_000;

/// Distance to a service threshold from which a vehicle is reported.
pub const SERVICE_ALERT_KM: i64 = 1_000;

/// Days ahead of a scheduled maintenance from which it is reported.
pub const SCHEDULE_ALERT_DAYS: i64 = 7;

/// Ledger figures of one allocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerStatus {
    pub allocation_id: Uuid,
    pub assigned: Money,
    pub executed: Money,
    pub available: Money,
    pub pct_executed_bps: i64,
}

impl From<&BudgetAllocation> for LedgerStatus {
    fn from(allocation: &BudgetAllocation) -> Self {
        Self {
            allocation_id: allocation.id,
            assigned: allocation.assigned,
            executed: allocation.executed(),
            available: allocation.available(),
            pct_executed_bps: allocation.pct_executed_bps(),
        }
    }
}

/// Allocation listing with totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    pub allocations: Vec<BudgetAllocation>,
    pub total_assigned: Money,
    pub total_executed: Money,
    pub total_available: Money,
}

impl AllocationReport {
    pub fn new(allocations: Vec<BudgetAllocation>) -> Self {
        let total_assigned = allocations.iter().map(|a| a.assigned).sum();
        let total_executed = allocations.iter().map(BudgetAllocation::executed).sum();
        let total_available = allocations.iter().map(BudgetAllocation::available).sum();
        Self {
            allocations,
            total_assigned,
            total_executed,
            total_available,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionAlert {
    pub allocation: BudgetAllocation,
    pub pct_executed_bps: i64,
    pub remaining: Money,
}

/// Active allocations at or above [`ALERT_THRESHOLD_BPS`], most executed
/// first.
pub fn execution_alerts(allocations: Vec<BudgetAllocation>) -> Vec<ExecutionAlert> {
    let mut alerts: Vec<ExecutionAlert> = allocations
        .into_iter()
        .filter(BudgetAllocation::is_active)
        .filter(|a| a.pct_executed_bps() >= ALERT_THRESHOLD_BPS)
        .map(|allocation| ExecutionAlert {
            pct_executed_bps: allocation.pct_executed_bps(),
            remaining: allocation.available(),
            allocation,
        })
        .collect();
    alerts.sort_by(|a, b| b.pct_executed_bps.cmp(&a.pct_executed_bps));
    alerts
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VarianceLine {
    pub allocation: BudgetAllocation,
    /// `executed - assigned`; positive means overrun.
    pub variance: Money,
    /// Variance relative to the assigned amount, in basis points.
    pub variance_bps: i64,
    pub overrun: bool,
}

impl From<BudgetAllocation> for VarianceLine {
    fn from(allocation: BudgetAllocation) -> Self {
        let variance = allocation.executed() - allocation.assigned;
        let (variance_bps, overrun) = if allocation.assigned.is_positive() {
            let bps = i128::from(variance.cents()) * 10_000
                / i128::from(allocation.assigned.cents());
            let bps = i64::try_from(bps).unwrap_or(i64::MAX);
            (bps, bps > VARIANCE_THRESHOLD_BPS)
        } else {
            (0, variance.is_positive())
        };
        Self {
            allocation,
            variance,
            variance_bps,
            overrun,
        }
    }
}

/// Variance of every active allocation in `allocations`.
pub fn variance_report(allocations: Vec<BudgetAllocation>) -> Vec<VarianceLine> {
    allocations
        .into_iter()
        .filter(BudgetAllocation::is_active)
        .map(VarianceLine::from)
        .collect()
}

/// Running costs of one vehicle across every account.
///
/// Maintenance counts every event that was not cancelled, fuel every
/// purchase and rentals every contract replacing the vehicle. Purchase
/// orders are budget commitments and stay out of this report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VehicleCostReport {
    pub vehicle_plate: String,
    pub year: Option<i32>,
    pub maintenance: Money,
    pub fuel: Money,
    pub rentals: Money,
    pub total: Money,
    /// `total / odometer_km`, truncated to the cent. Zero at 0 km.
    pub cost_per_km: Money,
    /// Workshop days (`exit_date - entry_date`) of closed events.
    pub days_out_of_service: i64,
}

impl VehicleCostReport {
    pub fn new(
        vehicle: &Vehicle,
        year: Option<i32>,
        sources: &ExpenseSources,
    ) -> ResultEngine<Self> {
        let in_year = |date: NaiveDate| year.is_none_or(|year| budget_year(date) == year);
        let plate = vehicle.plate.as_str();

        let events: Vec<&MaintenanceEvent> = sources
            .maintenance
            .iter()
            .filter(|event| event.vehicle_plate == plate)
            .filter(|event| event.state != MaintenanceState::Cancelled)
            .filter(|event| in_year(event.entry_date))
            .collect();
        let maintenance = checked_total(
            "maintenance",
            events.iter().map(|event| event.total_real_cost()),
        )?;
        let days_out_of_service: i64 = events
            .iter()
            .filter_map(|event| event.exit_date.map(|exit| (exit - event.entry_date).num_days()))
            .sum();

        let fuel = checked_total(
            "fuel",
            sources
                .fuel
                .iter()
                .filter(|purchase| purchase.vehicle_plate == plate && in_year(purchase.date))
                .map(|purchase| purchase.total_cost),
        )?;
        let rentals = checked_total(
            "rental",
            sources
                .rentals
                .iter()
                .filter(|rental| rental.replaced_vehicle.as_deref() == Some(plate))
                .filter(|rental| in_year(rental.start_date))
                .map(RentalContract::total_cost),
        )?;

        let total = checked_total("vehicle cost", [maintenance, fuel, rentals])?;
        let cost_per_km = if vehicle.odometer_km > 0 {
            Money::new(total.cents() / vehicle.odometer_km)
        } else {
            Money::ZERO
        };

        Ok(Self {
            vehicle_plate: vehicle.plate.clone(),
            year,
            maintenance,
            fuel,
            rentals,
            total,
            cost_per_km,
            days_out_of_service,
        })
    }
}

/// A vehicle that needs workshop attention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MaintenanceAlert {
    /// The odometer is within [`SERVICE_ALERT_KM`] of the next threshold.
    ServiceDue {
        vehicle_plate: String,
        km_remaining: i64,
    },
    /// The last threshold was passed with no finalized preventive service
    /// recorded around it.
    ServiceOverdue {
        vehicle_plate: String,
        threshold_km: i64,
        km_past: i64,
    },
    ScheduledSoon {
        vehicle_plate: String,
        event_id: Uuid,
        scheduled_date: NaiveDate,
        days_remaining: i64,
    },
    ScheduledOverdue {
        vehicle_plate: String,
        event_id: Uuid,
        scheduled_date: NaiveDate,
        days_overdue: i64,
    },
}

/// Mileage alerts per vehicle, then schedule alerts of `Scheduled` events
/// by date. Decommissioned vehicles and vehicles without a service interval
/// raise no mileage alert.
pub fn maintenance_alerts(
    vehicles: &[Vehicle],
    events: &[MaintenanceEvent],
    today: NaiveDate,
) -> Vec<MaintenanceAlert> {
    let mut alerts = Vec::new();

    for vehicle in vehicles {
        let interval = vehicle.service_interval_km;
        if interval <= 0 || vehicle.status == VehicleStatus::Decommissioned {
            continue;
        }
        let threshold = vehicle.odometer_km - vehicle.odometer_km % interval;
        let serviced = events.iter().any(|event| {
            event.vehicle_plate == vehicle.plate
                && event.kind == MaintenanceKind::Preventive
                && event.state == MaintenanceState::Finalized
                && event.odometer_km >= threshold - SERVICE_ALERT_KM
        });
        if threshold > 0 && !serviced {
            alerts.push(MaintenanceAlert::ServiceOverdue {
                vehicle_plate: vehicle.plate.clone(),
                threshold_km: threshold,
                km_past: vehicle.odometer_km - threshold,
            });
        } else if vehicle.km_to_next_service() <= SERVICE_ALERT_KM {
            alerts.push(MaintenanceAlert::ServiceDue {
                vehicle_plate: vehicle.plate.clone(),
                km_remaining: vehicle.km_to_next_service(),
            });
        }
    }

    let mut scheduled: Vec<(&MaintenanceEvent, NaiveDate)> = events
        .iter()
        .filter(|event| event.state == MaintenanceState::Scheduled)
        .filter_map(|event| event.scheduled_date.map(|date| (event, date)))
        .collect();
    scheduled.sort_by_key(|(event, date)| (*date, event.vehicle_plate.clone()));
    for (event, scheduled_date) in scheduled {
        let days = (scheduled_date - today).num_days();
        if days < 0 {
            alerts.push(MaintenanceAlert::ScheduledOverdue {
                vehicle_plate: event.vehicle_plate.clone(),
                event_id: event.id,
                scheduled_date,
                days_overdue: -days,
            });
        } else if days <= SCHEDULE_ALERT_DAYS {
            alerts.push(MaintenanceAlert::ScheduledSoon {
                vehicle_plate: event.vehicle_plate.clone(),
                event_id: event.id,
                scheduled_date,
                days_remaining: days,
            });
        }
    }

    alerts
}
