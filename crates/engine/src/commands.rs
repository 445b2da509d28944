//! Command structs for expense write operations.
//!
//! Every change to an expense-generating record goes through
//! [`ExpenseCommand`], so the engine can run the ledger trigger (and, for
//! maintenance finalization, the overspend guard) in the same transaction as
//! the write.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Money,
    fuel::Liters,
    maintenance::{MaintenanceKind, MaintenanceState},
    purchase_orders::PurchaseOrderState,
};

/// A write against one of the four expense sources.
#[derive(Clone, Debug)]
pub enum ExpenseCommand {
    CreateMaintenance(NewMaintenanceCmd),
    UpdateMaintenance(UpdateMaintenanceCmd),
    TransitionMaintenance(MaintenanceTransitionCmd),
    DeleteMaintenance { id: Uuid },
    CreateFuel(NewFuelCmd),
    UpdateFuel(UpdateFuelCmd),
    DeleteFuel { id: Uuid },
    CreateRental(NewRentalCmd),
    UpdateRental(UpdateRentalCmd),
    FinalizeRental { id: Uuid, end_date: NaiveDate },
    DeleteRental { id: Uuid },
    CreatePurchaseOrder(NewPurchaseOrderCmd),
    UpdatePurchaseOrder(UpdatePurchaseOrderCmd),
    TransitionPurchaseOrder { id: Uuid, to: PurchaseOrderState },
    DeletePurchaseOrder { id: Uuid },
}

/// Outcome of a successful [`ExpenseCommand`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpenseReceipt {
    pub record_id: Uuid,
    pub recomputed: Vec<RecomputedAllocation>,
}

/// New executed amount of an allocation touched by the trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecomputedAllocation {
    pub allocation_id: Uuid,
    pub executed: Money,
    pub available: Money,
}

/// Create a maintenance event in `Scheduled` state.
#[derive(Clone, Debug)]
pub struct NewMaintenanceCmd {
    pub vehicle_plate: String,
    pub kind: MaintenanceKind,
    pub entry_date: NaiveDate,
    pub odometer_km: i64,
    pub description: String,
    pub scheduled_date: Option<NaiveDate>,
    pub estimated_cost: Money,
    pub labor_cost: Money,
    pub parts_cost: Money,
    pub account_code: Option<String>,
    pub work_order_id: Option<Uuid>,
}

impl NewMaintenanceCmd {
    #[must_use]
    pub fn new(
        vehicle_plate: impl Into<String>,
        kind: MaintenanceKind,
        entry_date: NaiveDate,
        odometer_km: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_plate: vehicle_plate.into(),
            kind,
            entry_date,
            odometer_km,
            description: description.into(),
            scheduled_date: None,
            estimated_cost: Money::ZERO,
            labor_cost: Money::ZERO,
            parts_cost: Money::ZERO,
            account_code: None,
            work_order_id: None,
        }
    }

    #[must_use]
    pub fn scheduled_date(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    #[must_use]
    pub fn estimated_cost(mut self, amount: Money) -> Self {
        self.estimated_cost = amount;
        self
    }

    #[must_use]
    pub fn labor_cost(mut self, amount: Money) -> Self {
        self.labor_cost = amount;
        self
    }

    #[must_use]
    pub fn parts_cost(mut self, amount: Money) -> Self {
        self.parts_cost = amount;
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }

    #[must_use]
    pub fn work_order(mut self, work_order_id: Uuid) -> Self {
        self.work_order_id = Some(work_order_id);
        self
    }
}

/// Patch a maintenance event. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateMaintenanceCmd {
    pub id: Uuid,
    pub vehicle_plate: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub exit_date: Option<Option<NaiveDate>>,
    pub odometer_km: Option<i64>,
    pub description: Option<String>,
    pub estimated_cost: Option<Money>,
    pub labor_cost: Option<Money>,
    pub parts_cost: Option<Money>,
    pub account_code: Option<Option<String>>,
}

impl UpdateMaintenanceCmd {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn vehicle(mut self, plate: impl Into<String>) -> Self {
        self.vehicle_plate = Some(plate.into());
        self
    }

    #[must_use]
    pub fn entry_date(mut self, date: NaiveDate) -> Self {
        self.entry_date = Some(date);
        self
    }

    #[must_use]
    pub fn exit_date(mut self, date: Option<NaiveDate>) -> Self {
        self.exit_date = Some(date);
        self
    }

    #[must_use]
    pub fn odometer_km(mut self, km: i64) -> Self {
        self.odometer_km = Some(km);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn estimated_cost(mut self, amount: Money) -> Self {
        self.estimated_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn labor_cost(mut self, amount: Money) -> Self {
        self.labor_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn parts_cost(mut self, amount: Money) -> Self {
        self.parts_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: Option<String>) -> Self {
        self.account_code = Some(account_code);
        self
    }
}

/// Move a maintenance event to another state.
///
/// `exit_date` is applied before the finalization preconditions are checked.
#[derive(Clone, Debug)]
pub struct MaintenanceTransitionCmd {
    pub id: Uuid,
    pub to: MaintenanceState,
    pub exit_date: Option<NaiveDate>,
}

impl MaintenanceTransitionCmd {
    #[must_use]
    pub fn new(id: Uuid, to: MaintenanceState) -> Self {
        Self {
            id,
            to,
            exit_date: None,
        }
    }

    #[must_use]
    pub fn exit_date(mut self, date: NaiveDate) -> Self {
        self.exit_date = Some(date);
        self
    }
}

/// Record a fuel purchase.
#[derive(Clone, Debug)]
pub struct NewFuelCmd {
    pub vehicle_plate: String,
    pub date: NaiveDate,
    pub liters: Liters,
    pub unit_price: Option<Money>,
    pub total_cost: Money,
    pub odometer_km: i64,
    pub receipt_number: Option<String>,
    pub account_code: Option<String>,
}

impl NewFuelCmd {
    #[must_use]
    pub fn new(
        vehicle_plate: impl Into<String>,
        date: NaiveDate,
        liters: Liters,
        total_cost: Money,
        odometer_km: i64,
    ) -> Self {
        Self {
            vehicle_plate: vehicle_plate.into(),
            date,
            liters,
            unit_price: None,
            total_cost,
            odometer_km,
            receipt_number: None,
            account_code: None,
        }
    }

    #[must_use]
    pub fn unit_price(mut self, price: Money) -> Self {
        self.unit_price = Some(price);
        self
    }

    #[must_use]
    pub fn receipt_number(mut self, receipt: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt.into());
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }
}

/// Patch a fuel purchase. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateFuelCmd {
    pub id: Uuid,
    pub vehicle_plate: Option<String>,
    pub date: Option<NaiveDate>,
    pub liters: Option<Liters>,
    pub total_cost: Option<Money>,
    pub odometer_km: Option<i64>,
    pub account_code: Option<Option<String>>,
}

impl UpdateFuelCmd {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn vehicle(mut self, plate: impl Into<String>) -> Self {
        self.vehicle_plate = Some(plate.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn liters(mut self, liters: Liters) -> Self {
        self.liters = Some(liters);
        self
    }

    #[must_use]
    pub fn total_cost(mut self, amount: Money) -> Self {
        self.total_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn odometer_km(mut self, km: i64) -> Self {
        self.odometer_km = Some(km);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: Option<String>) -> Self {
        self.account_code = Some(account_code);
        self
    }
}

/// Open a rental contract.
#[derive(Clone, Debug)]
pub struct NewRentalCmd {
    pub rented_vehicle: String,
    pub replaced_vehicle: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub daily_cost: Money,
    pub reason: String,
    pub account_code: Option<String>,
}

impl NewRentalCmd {
    #[must_use]
    pub fn new(
        rented_vehicle: impl Into<String>,
        start_date: NaiveDate,
        daily_cost: Money,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            rented_vehicle: rented_vehicle.into(),
            replaced_vehicle: None,
            start_date,
            end_date: None,
            daily_cost,
            reason: reason.into(),
            account_code: None,
        }
    }

    #[must_use]
    pub fn replaces(mut self, plate: impl Into<String>) -> Self {
        self.replaced_vehicle = Some(plate.into());
        self
    }

    #[must_use]
    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }
}

/// Patch a rental contract. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateRentalCmd {
    pub id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub daily_cost: Option<Money>,
    pub account_code: Option<Option<String>>,
}

impl UpdateRentalCmd {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    #[must_use]
    pub fn daily_cost(mut self, amount: Money) -> Self {
        self.daily_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: Option<String>) -> Self {
        self.account_code = Some(account_code);
        self
    }
}

/// Issue a purchase order.
#[derive(Clone, Debug)]
pub struct NewPurchaseOrderCmd {
    pub order_number: String,
    pub issued_on: NaiveDate,
    pub amount_total: Money,
    pub vehicle_plate: Option<String>,
    pub account_code: Option<String>,
}

impl NewPurchaseOrderCmd {
    #[must_use]
    pub fn new(order_number: impl Into<String>, issued_on: NaiveDate, amount_total: Money) -> Self {
        Self {
            order_number: order_number.into(),
            issued_on,
            amount_total,
            vehicle_plate: None,
            account_code: None,
        }
    }

    #[must_use]
    pub fn vehicle(mut self, plate: impl Into<String>) -> Self {
        self.vehicle_plate = Some(plate.into());
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }
}

/// Patch a purchase order. `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdatePurchaseOrderCmd {
    pub id: Uuid,
    pub issued_on: Option<NaiveDate>,
    pub amount_total: Option<Money>,
    pub vehicle_plate: Option<Option<String>>,
    pub account_code: Option<Option<String>>,
}

impl UpdatePurchaseOrderCmd {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn issued_on(mut self, date: NaiveDate) -> Self {
        self.issued_on = Some(date);
        self
    }

    #[must_use]
    pub fn amount_total(mut self, amount: Money) -> Self {
        self.amount_total = Some(amount);
        self
    }

    #[must_use]
    pub fn vehicle(mut self, plate: Option<String>) -> Self {
        self.vehicle_plate = Some(plate);
        self
    }

    #[must_use]
    pub fn account(mut self, account_code: Option<String>) -> Self {
        self.account_code = Some(account_code);
        self
    }
}
