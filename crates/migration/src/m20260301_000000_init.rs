//! Initial schema migration - creates all tables from scratch.
//!
//! - `accounts`: budget classification codes
//! - `vehicles`: fleet vehicles
//! - `budget_allocations`: yearly ceilings per account and vehicle (or general)
//! - `work_orders`: workshop orders, optionally linked to a purchase order
//! - `purchase_orders`: procurement commitments
//! - `maintenance_events`: preventive and corrective maintenance
//! - `fuel_purchases`: fuel receipts
//! - `rental_contracts`: replacement rentals
//!
//! Money columns hold integer cents (`*_minor`).

use sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Code,
    Name,
    Description,
}

#[derive(Iden)]
enum Vehicles {
    Table,
    Plate,
    Brand,
    Model,
    OdometerKm,
    ServiceIntervalKm,
    Status,
}

#[derive(Iden)]
enum BudgetAllocations {
    Table,
    Id,
    Year,
    AccountCode,
    VehiclePlate,
    Kind,
    AssignedMinor,
    ExecutedMinor,
    Status,
    DisabledAt,
    CreatedAt,
}

#[derive(Iden)]
enum WorkOrders {
    Table,
    Id,
    OrderNumber,
    VehiclePlate,
    RequestedOn,
    Description,
    PurchaseOrderId,
}

#[derive(Iden)]
enum PurchaseOrders {
    Table,
    Id,
    OrderNumber,
    IssuedOn,
    VehiclePlate,
    AccountCode,
    AmountTotalMinor,
    State,
}

#[derive(Iden)]
enum MaintenanceEvents {
    Table,
    Id,
    VehiclePlate,
    Kind,
    State,
    EntryDate,
    ExitDate,
    ScheduledDate,
    OdometerKm,
    Description,
    EstimatedCostMinor,
    LaborCostMinor,
    PartsCostMinor,
    AccountCode,
    WorkOrderId,
    CreatedAt,
}

#[derive(Iden)]
enum FuelPurchases {
    Table,
    Id,
    VehiclePlate,
    Date,
    LitersHundredths,
    UnitPriceMinor,
    TotalCostMinor,
    OdometerKm,
    ReceiptNumber,
    AccountCode,
}

#[derive(Iden)]
enum RentalContracts {
    Table,
    Id,
    RentedVehicle,
    ReplacedVehicle,
    StartDate,
    EndDate,
    DailyCostMinor,
    Reason,
    AccountCode,
    State,
}

/// At most one active allocation per `(year, account, vehicle)`; the general
/// allocation (no vehicle) counts as its own scope.
const ACTIVE_ALLOCATION_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     \"idx-budget_allocations-active-scope\" ON budget_allocations \
     (year, account_code, COALESCE(vehicle_plate, '')) WHERE status = 'active'";

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Description).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Vehicles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vehicles::Plate)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vehicles::Brand).string().not_null())
                    .col(ColumnDef::new(Vehicles::Model).string().not_null())
                    .col(ColumnDef::new(Vehicles::OdometerKm).big_integer().not_null())
                    .col(
                        ColumnDef::new(Vehicles::ServiceIntervalKm)
                            .big_integer()
                            .not_null()
                            .default(10_000),
                    )
                    .col(
                        ColumnDef::new(Vehicles::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Budget allocations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetAllocations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetAllocations::Year).integer().not_null())
                    .col(
                        ColumnDef::new(BudgetAllocations::AccountCode)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetAllocations::VehiclePlate).string())
                    .col(ColumnDef::new(BudgetAllocations::Kind).string().not_null())
                    .col(
                        ColumnDef::new(BudgetAllocations::AssignedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::ExecutedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(BudgetAllocations::Status).string().not_null())
                    .col(ColumnDef::new(BudgetAllocations::DisabledAt).timestamp())
                    .col(
                        ColumnDef::new(BudgetAllocations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-account_code")
                            .from(BudgetAllocations::Table, BudgetAllocations::AccountCode)
                            .to(Accounts::Table, Accounts::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-vehicle_plate")
                            .from(BudgetAllocations::Table, BudgetAllocations::VehiclePlate)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_allocations-year-account_code")
                    .table(BudgetAllocations::Table)
                    .col(BudgetAllocations::Year)
                    .col(BudgetAllocations::AccountCode)
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        let backend = db.get_database_backend();
        db.execute(Statement::from_string(
            backend,
            ACTIVE_ALLOCATION_INDEX.to_string(),
        ))
        .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Purchase orders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::IssuedOn).date().not_null())
                    .col(ColumnDef::new(PurchaseOrders::VehiclePlate).string())
                    .col(ColumnDef::new(PurchaseOrders::AccountCode).string())
                    .col(
                        ColumnDef::new(PurchaseOrders::AmountTotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::State).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_orders-vehicle_plate")
                            .from(PurchaseOrders::Table, PurchaseOrders::VehiclePlate)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_orders-account_code")
                            .from(PurchaseOrders::Table, PurchaseOrders::AccountCode)
                            .to(Accounts::Table, Accounts::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_orders-account_code-issued_on")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::AccountCode)
                    .col(PurchaseOrders::IssuedOn)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Work orders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(WorkOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkOrders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WorkOrders::VehiclePlate).string().not_null())
                    .col(ColumnDef::new(WorkOrders::RequestedOn).date().not_null())
                    .col(ColumnDef::new(WorkOrders::Description).string().not_null())
                    .col(ColumnDef::new(WorkOrders::PurchaseOrderId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-work_orders-vehicle_plate")
                            .from(WorkOrders::Table, WorkOrders::VehiclePlate)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-work_orders-purchase_order_id")
                            .from(WorkOrders::Table, WorkOrders::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-work_orders-purchase_order_id")
                    .table(WorkOrders::Table)
                    .col(WorkOrders::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Maintenance events
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MaintenanceEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaintenanceEvents::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceEvents::VehiclePlate)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceEvents::Kind).string().not_null())
                    .col(ColumnDef::new(MaintenanceEvents::State).string().not_null())
                    .col(
                        ColumnDef::new(MaintenanceEvents::EntryDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceEvents::ExitDate).date())
                    .col(ColumnDef::new(MaintenanceEvents::ScheduledDate).date())
                    .col(
                        ColumnDef::new(MaintenanceEvents::OdometerKm)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceEvents::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceEvents::EstimatedCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceEvents::LaborCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaintenanceEvents::PartsCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MaintenanceEvents::AccountCode).string())
                    .col(ColumnDef::new(MaintenanceEvents::WorkOrderId).string())
                    .col(
                        ColumnDef::new(MaintenanceEvents::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_events-vehicle_plate")
                            .from(MaintenanceEvents::Table, MaintenanceEvents::VehiclePlate)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_events-account_code")
                            .from(MaintenanceEvents::Table, MaintenanceEvents::AccountCode)
                            .to(Accounts::Table, Accounts::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-maintenance_events-work_order_id")
                            .from(MaintenanceEvents::Table, MaintenanceEvents::WorkOrderId)
                            .to(WorkOrders::Table, WorkOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-maintenance_events-account_code-entry_date")
                    .table(MaintenanceEvents::Table)
                    .col(MaintenanceEvents::AccountCode)
                    .col(MaintenanceEvents::EntryDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Fuel purchases
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FuelPurchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FuelPurchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FuelPurchases::VehiclePlate).string().not_null())
                    .col(ColumnDef::new(FuelPurchases::Date).date().not_null())
                    .col(
                        ColumnDef::new(FuelPurchases::LitersHundredths)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FuelPurchases::UnitPriceMinor).big_integer())
                    .col(
                        ColumnDef::new(FuelPurchases::TotalCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FuelPurchases::OdometerKm).big_integer().not_null())
                    .col(ColumnDef::new(FuelPurchases::ReceiptNumber).string())
                    .col(ColumnDef::new(FuelPurchases::AccountCode).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-vehicle_plate")
                            .from(FuelPurchases::Table, FuelPurchases::VehiclePlate)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-account_code")
                            .from(FuelPurchases::Table, FuelPurchases::AccountCode)
                            .to(Accounts::Table, Accounts::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fuel_purchases-account_code-date")
                    .table(FuelPurchases::Table)
                    .col(FuelPurchases::AccountCode)
                    .col(FuelPurchases::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Rental contracts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RentalContracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RentalContracts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RentalContracts::RentedVehicle)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RentalContracts::ReplacedVehicle).string())
                    .col(ColumnDef::new(RentalContracts::StartDate).date().not_null())
                    .col(ColumnDef::new(RentalContracts::EndDate).date())
                    .col(
                        ColumnDef::new(RentalContracts::DailyCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RentalContracts::Reason).string().not_null())
                    .col(ColumnDef::new(RentalContracts::AccountCode).string())
                    .col(ColumnDef::new(RentalContracts::State).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rental_contracts-replaced_vehicle")
                            .from(RentalContracts::Table, RentalContracts::ReplacedVehicle)
                            .to(Vehicles::Table, Vehicles::Plate),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-rental_contracts-account_code")
                            .from(RentalContracts::Table, RentalContracts::AccountCode)
                            .to(Accounts::Table, Accounts::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rental_contracts-account_code-start_date")
                    .table(RentalContracts::Table)
                    .col(RentalContracts::AccountCode)
                    .col(RentalContracts::StartDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RentalContracts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FuelPurchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
