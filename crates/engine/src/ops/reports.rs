use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    ExecutionAlert, MaintenanceAlert, MaintenanceEvent, MaintenanceState, ResultEngine,
    VarianceLine, Vehicle, VehicleCostReport, maintenance,
    reports::{execution_alerts, maintenance_alerts, variance_report},
    util::normalize_plate,
    vehicles,
};

use super::{
    AllocationFilter, Engine, allocations::list_allocations, ledger::load_vehicle_sources,
    vehicles::require_vehicle, with_tx,
};

impl Engine {
    /// Active allocations that have consumed at least 80% of their assigned
    /// amount, optionally restricted to `year`.
    pub async fn execution_alerts(&self, year: Option<i32>) -> ResultEngine<Vec<ExecutionAlert>> {
        let filter = AllocationFilter {
            year,
            ..AllocationFilter::default()
        };
        with_tx!(self, |db_tx| {
            let allocations = list_allocations(&db_tx, &filter).await?;
            Ok(execution_alerts(allocations))
        })
    }

    /// Executed against assigned for every active allocation of `year`.
    pub async fn variance_report(&self, year: i32) -> ResultEngine<Vec<VarianceLine>> {
        let filter = AllocationFilter::default().year(year);
        with_tx!(self, |db_tx| {
            let allocations = list_allocations(&db_tx, &filter).await?;
            Ok(variance_report(allocations))
        })
    }

    /// Maintenance, fuel and rental costs of one vehicle, for `year` or its
    /// whole history.
    pub async fn vehicle_cost_report(
        &self,
        plate: &str,
        year: Option<i32>,
    ) -> ResultEngine<VehicleCostReport> {
        let plate = normalize_plate(plate)?;
        with_tx!(self, |db_tx| {
            let vehicle = require_vehicle(&db_tx, &plate).await?;
            let sources = load_vehicle_sources(&db_tx, &plate, year).await?;
            VehicleCostReport::new(&vehicle, year, &sources)
        })
    }

    /// Vehicles close to or past a service threshold, and scheduled
    /// maintenance due within a week of `today` or overdue.
    pub async fn maintenance_alerts(&self, today: NaiveDate) -> ResultEngine<Vec<MaintenanceAlert>> {
        with_tx!(self, |db_tx| {
            let vehicles = vehicles::Entity::find()
                .order_by_asc(vehicles::Column::Plate)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Vehicle::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let events = maintenance::Entity::find()
                .filter(maintenance::Column::State.is_in([
                    MaintenanceState::Scheduled.as_str(),
                    MaintenanceState::Finalized.as_str(),
                ]))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(MaintenanceEvent::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(maintenance_alerts(&vehicles, &events, today))
        })
    }
}
