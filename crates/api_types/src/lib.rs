//! JSON payloads shared by the HTTP server and its clients.
//!
//! Amounts travel as decimal strings with two fractional digits
//! (`"400000.00"`). Percentages are basis points (`8000` = 80%).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Deserializes a field that distinguishes "absent" from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub code: String,
        pub name: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Account {
        pub code: String,
        pub name: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountList {
        pub accounts: Vec<Account>,
    }
}

pub mod vehicle {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum VehicleStatus {
        Available,
        InUse,
        InMaintenance,
        OutOfService,
        Decommissioned,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleNew {
        pub plate: String,
        pub brand: String,
        pub model: String,
        pub odometer_km: i64,
        /// Defaults to 10 000 km.
        pub service_interval_km: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Vehicle {
        pub plate: String,
        pub brand: String,
        pub model: String,
        pub odometer_km: i64,
        pub service_interval_km: i64,
        pub km_to_next_service: i64,
        pub status: VehicleStatus,
    }

    /// Body of `PATCH /vehicles/{plate}`. Only `available`, `in_use` and
    /// `decommissioned` can be set directly.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleStatusUpdate {
        pub status: VehicleStatus,
    }
}

pub mod allocation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AllocationKind {
        Preventive,
        Operational,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationNew {
        pub year: i32,
        pub account_code: String,
        /// `None` creates the general allocation of the account.
        pub vehicle_plate: Option<String>,
        pub kind: AllocationKind,
        pub assigned: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationUpdate {
        pub assigned: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Allocation {
        pub id: Uuid,
        pub year: i32,
        pub account_code: String,
        pub vehicle_plate: Option<String>,
        pub kind: AllocationKind,
        pub assigned: String,
        pub executed: String,
        /// May be negative when a reassignment lowered `assigned`.
        pub available: String,
        pub pct_executed_bps: i64,
        /// Same share as a ratio (`0.85` = 85%).
        pub pct_executed: f64,
        pub active: bool,
        pub disabled_at: Option<DateTime<Utc>>,
    }

    /// Query string of `GET /allocations`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AllocationList {
        pub year: Option<i32>,
        pub account: Option<String>,
        pub vehicle: Option<String>,
        #[serde(default)]
        pub include_disabled: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationListResponse {
        pub allocations: Vec<Allocation>,
        pub total_assigned: String,
        pub total_executed: String,
        pub total_available: String,
    }

    /// Query string of `GET /allocations/status`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationStatusQuery {
        pub account: String,
        pub vehicle: Option<String>,
        pub year: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationStatus {
        pub allocation_id: Uuid,
        pub assigned: String,
        pub executed: String,
        pub available: String,
        pub pct_executed_bps: i64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Recomputed {
        pub allocation_id: Uuid,
        pub executed: String,
        pub available: String,
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MaintenanceKind {
        Preventive,
        Corrective,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MaintenanceState {
        Scheduled,
        InShop,
        AwaitingParts,
        Finalized,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PurchaseOrderState {
        Issued,
        Accepted,
        Received,
        Paid,
        Voided,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaintenanceNew {
        pub vehicle_plate: String,
        pub kind: MaintenanceKind,
        pub entry_date: NaiveDate,
        pub odometer_km: i64,
        pub description: String,
        pub scheduled_date: Option<NaiveDate>,
        pub estimated_cost: Option<String>,
        pub labor_cost: Option<String>,
        pub parts_cost: Option<String>,
        pub account_code: Option<String>,
        pub work_order_id: Option<Uuid>,
    }

    /// Partial update. Fields left out are unchanged; `null` clears the
    /// nullable ones.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MaintenanceUpdate {
        pub id: Uuid,
        pub vehicle_plate: Option<String>,
        pub entry_date: Option<NaiveDate>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub exit_date: Option<Option<NaiveDate>>,
        pub odometer_km: Option<i64>,
        pub description: Option<String>,
        pub estimated_cost: Option<String>,
        pub labor_cost: Option<String>,
        pub parts_cost: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub account_code: Option<Option<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MaintenanceTransition {
        pub id: Uuid,
        pub to: MaintenanceState,
        pub exit_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FuelNew {
        pub vehicle_plate: String,
        pub date: NaiveDate,
        /// Liters with two fractional digits, e.g. `"45.50"`.
        pub liters: String,
        pub unit_price: Option<String>,
        pub total_cost: String,
        pub odometer_km: i64,
        pub receipt_number: Option<String>,
        pub account_code: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FuelUpdate {
        pub id: Uuid,
        pub vehicle_plate: Option<String>,
        pub date: Option<NaiveDate>,
        pub liters: Option<String>,
        pub total_cost: Option<String>,
        pub odometer_km: Option<i64>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub account_code: Option<Option<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RentalNew {
        pub rented_vehicle: String,
        pub replaced_vehicle: Option<String>,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub daily_cost: String,
        pub reason: String,
        pub account_code: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RentalUpdate {
        pub id: Uuid,
        pub start_date: Option<NaiveDate>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub end_date: Option<Option<NaiveDate>>,
        pub daily_cost: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub account_code: Option<Option<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseOrderNew {
        pub order_number: String,
        pub issued_on: NaiveDate,
        pub amount_total: String,
        pub vehicle_plate: Option<String>,
        pub account_code: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PurchaseOrderUpdate {
        pub id: Uuid,
        pub issued_on: Option<NaiveDate>,
        pub amount_total: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub vehicle_plate: Option<Option<String>>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub account_code: Option<Option<String>>,
    }

    /// Body of `POST /expenses`, tagged by `op`.
    ///
    /// ```json
    /// { "op": "finalize_rental", "id": "…", "end_date": "2024-07-11" }
    /// ```
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "op", rename_all = "snake_case")]
    pub enum ExpenseCommand {
        CreateMaintenance(MaintenanceNew),
        UpdateMaintenance(MaintenanceUpdate),
        TransitionMaintenance(MaintenanceTransition),
        DeleteMaintenance { id: Uuid },
        CreateFuel(FuelNew),
        UpdateFuel(FuelUpdate),
        DeleteFuel { id: Uuid },
        CreateRental(RentalNew),
        UpdateRental(RentalUpdate),
        FinalizeRental { id: Uuid, end_date: NaiveDate },
        DeleteRental { id: Uuid },
        CreatePurchaseOrder(PurchaseOrderNew),
        UpdatePurchaseOrder(PurchaseOrderUpdate),
        TransitionPurchaseOrder { id: Uuid, to: PurchaseOrderState },
        DeletePurchaseOrder { id: Uuid },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseReceipt {
        pub record_id: Uuid,
        pub recomputed: Vec<crate::allocation::Recomputed>,
    }
}

pub mod work_order {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkOrderNew {
        pub order_number: String,
        pub vehicle_plate: String,
        pub requested_on: NaiveDate,
        pub description: String,
        pub purchase_order_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkOrder {
        pub id: Uuid,
        pub order_number: String,
        pub vehicle_plate: String,
        pub requested_on: NaiveDate,
        pub description: String,
        pub purchase_order_id: Option<Uuid>,
    }

    /// `purchase_order_id: null` detaches the work order.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WorkOrderLink {
        pub purchase_order_id: Option<Uuid>,
    }
}

pub mod report {
    use super::*;
    use crate::allocation::Allocation;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AlertsQuery {
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExecutionAlert {
        pub allocation: Allocation,
        pub pct_executed_bps: i64,
        pub remaining: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VarianceQuery {
        pub year: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VarianceLine {
        pub allocation: Allocation,
        pub variance: String,
        pub variance_bps: i64,
        pub overrun: bool,
    }

    /// Query string of `GET /reports/vehicles/{plate}`. Without `year` the
    /// whole history is reported.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct VehicleCostQuery {
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleCost {
        pub vehicle_plate: String,
        pub year: Option<i32>,
        pub maintenance: String,
        pub fuel: String,
        pub rentals: String,
        pub total: String,
        pub cost_per_km: String,
        pub days_out_of_service: i64,
    }

    /// Query string of `GET /reports/maintenance`. Defaults to the current
    /// UTC date.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MaintenanceAlertsQuery {
        pub today: Option<NaiveDate>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "reason", rename_all = "snake_case")]
    pub enum MaintenanceAlert {
        ServiceDue {
            vehicle_plate: String,
            km_remaining: i64,
        },
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
}
