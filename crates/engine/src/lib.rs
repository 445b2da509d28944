//! Budget ledger engine for fleet operations.
//!
//! The engine keeps the executed amount of every yearly budget allocation in
//! sync with the expense records that draw from it (maintenance, fuel,
//! rentals and purchase orders) and refuses maintenance finalizations that
//! would overspend an allocation.

pub use accounts::Account;
pub use aggregate::{AllocationScope, ExecutionBreakdown, ExpenseSources, LedgerKey, aggregate};
pub use allocations::{AllocationKind, AllocationStatus, BudgetAllocation};
pub use commands::*;
pub use error::EngineError;
pub use fuel::{FuelPurchase, Liters};
pub use maintenance::{MaintenanceEvent, MaintenanceKind, MaintenanceState};
pub use money::Money;
pub use ops::{AllocationFilter, Engine, EngineBuilder, GuardDecision};
pub use purchase_orders::{PurchaseOrder, PurchaseOrderState, ResolvedPurchaseOrder};
pub use rentals::{RentalContract, RentalState};
pub use reports::{
    AllocationReport, ExecutionAlert, LedgerStatus, MaintenanceAlert, VarianceLine, VehicleCostReport,
};
pub use vehicles::{Vehicle, VehicleStatus};
pub use work_orders::WorkOrder;

pub mod accounts;
pub mod aggregate;
pub mod allocations;
mod commands;
mod error;
pub mod fuel;
pub mod maintenance;
mod money;
mod ops;
pub mod purchase_orders;
pub mod rentals;
pub mod reports;
mod util;
pub mod vehicles;
pub mod work_orders;

pub type ResultEngine<T> = Result<T, EngineError>;
