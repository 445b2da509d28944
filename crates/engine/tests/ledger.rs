use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AllocationFilter, AllocationKind, Engine, EngineError, ExpenseCommand, GuardDecision, Liters,
    MaintenanceAlert, MaintenanceKind, MaintenanceState, MaintenanceTransitionCmd, Money, NewFuelCmd,
    NewMaintenanceCmd, NewPurchaseOrderCmd, NewRentalCmd, PurchaseOrderState, UpdateFuelCmd,
    UpdateMaintenanceCmd, Vehicle, VehicleStatus,
};
use migration::MigratorTrait;
use uuid::Uuid;

const PREVENTIVE: &str = "22.06.002";
const OPERATIONS: &str = "22.06.003";
const PLATE: &str = "AB-1234";
const OTHER_PLATE: &str = "CD-5678";

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    engine
        .create_account(PREVENTIVE, "Preventive maintenance", None)
        .await
        .unwrap();
    engine
        .create_account(OPERATIONS, "Fleet operations", Some("fuel, rentals, parts"))
        .await
        .unwrap();
    engine
        .create_vehicle(Vehicle::new(PLATE, "Mercedes", "Sprinter", 42_000).unwrap())
        .await
        .unwrap();
    engine
        .create_vehicle(Vehicle::new(OTHER_PLATE, "Iveco", "Daily", 10_000).unwrap())
        .await
        .unwrap();
    (engine, db)
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn units(value: i64) -> Money {
    Money::from_units(value)
}

/// Creates a maintenance event on `account` costing `cost` and moves it into
/// the workshop.
async fn event_in_shop(
    engine: &Engine,
    plate: &str,
    account: Option<&str>,
    kind: MaintenanceKind,
    cost: Money,
) -> Uuid {
    let mut cmd = NewMaintenanceCmd::new(plate, kind, date(3, 1), 45_000, "service")
        .labor_cost(cost);
    if let Some(account) = account {
        cmd = cmd.account(account);
    }
    let receipt = engine
        .submit_expense(ExpenseCommand::CreateMaintenance(cmd))
        .await
        .unwrap();
    engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(receipt.record_id, MaintenanceState::InShop),
        ))
        .await
        .unwrap();
    receipt.record_id
}

async fn finalize(engine: &Engine, id: Uuid) -> Result<engine::ExpenseReceipt, EngineError> {
    engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(id, MaintenanceState::Finalized).exit_date(date(3, 5)),
        ))
        .await
}

async fn finalized_event(engine: &Engine, plate: &str, account: &str, cost: Money) -> Uuid {
    let id = event_in_shop(engine, plate, Some(account), MaintenanceKind::Preventive, cost).await;
    finalize(engine, id).await.unwrap();
    id
}

#[tokio::test]
async fn finalization_consumes_budget_and_rejects_overspend() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(
            2024,
            PREVENTIVE,
            Some(PLATE),
            AllocationKind::Preventive,
            units(1_000_000),
        )
        .await
        .unwrap();

    let first = event_in_shop(
        &engine,
        PLATE,
        Some(PREVENTIVE),
        MaintenanceKind::Preventive,
        units(300_000),
    )
    .await;
    engine
        .submit_expense(ExpenseCommand::UpdateMaintenance(
            UpdateMaintenanceCmd::new(first).parts_cost(units(100_000)),
        ))
        .await
        .unwrap();
    let receipt = finalize(&engine, first).await.unwrap();
    assert_eq!(receipt.recomputed.len(), 1);
    assert_eq!(receipt.recomputed[0].executed, units(400_000));

    let status = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, units(400_000));
    assert_eq!(status.available, units(600_000));
    assert_eq!(status.pct_executed_bps, 4_000);

    let second = event_in_shop(
        &engine,
        PLATE,
        Some(PREVENTIVE),
        MaintenanceKind::Preventive,
        units(700_000),
    )
    .await;
    let err = finalize(&engine, second).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::OverspendRejected {
            available: units(600_000),
            required: units(700_000),
        }
    );
    assert_eq!(
        err.to_string(),
        "Insufficient budget. Available: $600,000.00, required: $700,000.00"
    );

    let event = engine.maintenance_event(second).await.unwrap();
    assert_eq!(event.state, MaintenanceState::InShop);
    assert_eq!(event.exit_date, None);
    let status = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, units(400_000));
}

#[tokio::test]
async fn guard_allows_up_to_the_available_amount() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(900)).await;

    let too_much =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(150))
            .await;
    assert_eq!(
        finalize(&engine, too_much).await.unwrap_err(),
        EngineError::OverspendRejected {
            available: units(100),
            required: units(150),
        }
    );

    let fits =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(90))
            .await;
    finalize(&engine, fits).await.unwrap();
    let status = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, units(990));
    assert_eq!(status.available, units(10));
}

#[tokio::test]
async fn check_overspend_is_a_dry_run() {
    let (engine, _db) = engine_with_db().await;
    let decision = engine
        .check_overspend(PREVENTIVE, Some(PLATE), 2024, units(10))
        .await
        .unwrap();
    assert_eq!(
        decision,
        GuardDecision::NoBudget {
            account_code: PREVENTIVE.to_string(),
            year: 2024,
        }
    );

    engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Preventive, units(100))
        .await
        .unwrap();
    let decision = engine
        .check_overspend(PREVENTIVE, Some(PLATE), 2024, units(100))
        .await
        .unwrap();
    assert!(decision.is_allowed());
    let decision = engine
        .check_overspend(PREVENTIVE, Some(PLATE), 2024, units(101))
        .await
        .unwrap();
    assert!(!decision.is_allowed());
}

#[tokio::test]
async fn finalization_without_allocation_is_a_configuration_error() {
    let (engine, _db) = engine_with_db().await;
    let id =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(10))
            .await;
    let err = finalize(&engine, id).await.unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));

    // Events without an account never reach the guard.
    let untracked = event_in_shop(&engine, PLATE, None, MaintenanceKind::Preventive, units(10)).await;
    let receipt = finalize(&engine, untracked).await.unwrap();
    assert!(receipt.recomputed.is_empty());
}

#[tokio::test]
async fn finalization_requires_exit_date_and_cost() {
    let (engine, _db) = engine_with_db().await;
    let id = event_in_shop(&engine, PLATE, None, MaintenanceKind::Corrective, units(10)).await;
    let err = engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(id, MaintenanceState::Finalized),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let free = event_in_shop(&engine, PLATE, None, MaintenanceKind::Corrective, Money::ZERO).await;
    assert!(matches!(
        finalize(&engine, free).await,
        Err(EngineError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn reassigning_account_moves_the_amount() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Operational, units(5_000))
        .await
        .unwrap();
    engine
        .create_allocation(2024, OPERATIONS, None, AllocationKind::Operational, units(5_000))
        .await
        .unwrap();
    let id = finalized_event(&engine, PLATE, PREVENTIVE, units(1_200)).await;

    engine
        .submit_expense(ExpenseCommand::UpdateMaintenance(
            UpdateMaintenanceCmd::new(id).account(Some(OPERATIONS.to_string())),
        ))
        .await
        .unwrap();

    let old = engine
        .query_allocation_status(PREVENTIVE, None, 2024)
        .await
        .unwrap();
    let new = engine
        .query_allocation_status(OPERATIONS, None, 2024)
        .await
        .unwrap();
    assert_eq!(old.executed, Money::ZERO);
    assert_eq!(new.executed, units(1_200));
}

#[tokio::test]
async fn cancelling_a_finalized_event_reverses_it() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    let id = finalized_event(&engine, PLATE, PREVENTIVE, units(700)).await;

    let receipt = engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(id, MaintenanceState::Cancelled),
        ))
        .await
        .unwrap();
    assert_eq!(receipt.recomputed[0].executed, Money::ZERO);
    assert_eq!(receipt.recomputed[0].available, units(1_000));

    let err = engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(id, MaintenanceState::InShop),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn vehicle_records_fall_back_to_the_general_allocation() {
    let (engine, _db) = engine_with_db().await;
    let general = engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Preventive, units(2_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(500)).await;
    finalized_event(&engine, OTHER_PLATE, PREVENTIVE, units(300)).await;

    let general = engine.allocation(general.id).await.unwrap();
    assert_eq!(general.executed(), units(800));

    let resolved = engine
        .resolve_allocation(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.id, general.id);

    let err = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn general_allocation_tracks_vehicle_specific_spending() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Preventive, units(3_000))
        .await
        .unwrap();

    let id = event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(400))
        .await;
    let receipt = finalize(&engine, id).await.unwrap();
    assert_eq!(receipt.recomputed.len(), 2);

    let specific = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    let general = engine
        .query_allocation_status(PREVENTIVE, None, 2024)
        .await
        .unwrap();
    assert_eq!(specific.executed, units(400));
    assert_eq!(general.executed, units(400));
}

#[tokio::test]
async fn preventive_allocations_ignore_corrective_work() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    let id =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Corrective, units(250))
            .await;
    finalize(&engine, id).await.unwrap();

    let status = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, Money::ZERO);
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let allocation = engine
        .create_allocation(2024, OPERATIONS, None, AllocationKind::Operational, units(10_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, OPERATIONS, units(1_000)).await;
    engine
        .submit_expense(ExpenseCommand::CreateFuel(
            NewFuelCmd::new(PLATE, date(4, 2), "45.50".parse::<Liters>().unwrap(), units(80), 45_500)
                .account(OPERATIONS),
        ))
        .await
        .unwrap();

    let first = engine.recompute_allocation(allocation.id).await.unwrap();
    let second = engine.recompute_allocation(allocation.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.executed, units(1_080));

    let year = engine.recompute_year(2024).await.unwrap();
    assert_eq!(year, vec![first]);

    let breakdown = engine.execution_breakdown(allocation.id).await.unwrap();
    assert_eq!(breakdown.maintenance, units(1_000));
    assert_eq!(breakdown.fuel, units(80));
    assert_eq!(breakdown.total().unwrap(), units(1_080));
}

#[tokio::test]
async fn allocation_created_late_picks_up_existing_records() {
    let (engine, _db) = engine_with_db().await;
    engine
        .submit_expense(ExpenseCommand::CreateFuel(
            NewFuelCmd::new(PLATE, date(1, 10), Liters::from_hundredths(4_000), units(60), 43_000)
                .account(OPERATIONS),
        ))
        .await
        .unwrap();

    let allocation = engine
        .create_allocation(2024, OPERATIONS, Some(PLATE), AllocationKind::Operational, units(500))
        .await
        .unwrap();
    assert_eq!(allocation.executed(), units(60));
}

#[tokio::test]
async fn duplicate_active_allocation_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let first = engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(100))
        .await
        .unwrap();
    let err = engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Operational, units(200))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));

    // A different scope is fine.
    engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Preventive, units(100))
        .await
        .unwrap();

    engine.disable_allocation(first.id).await.unwrap();
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(300))
        .await
        .unwrap();
}

#[tokio::test]
async fn disabled_allocation_is_frozen_and_skipped() {
    let (engine, _db) = engine_with_db().await;
    let specific = engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    let general = engine
        .create_allocation(2024, PREVENTIVE, None, AllocationKind::Preventive, units(5_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(200)).await;

    engine.disable_allocation(specific.id).await.unwrap();
    assert!(matches!(
        engine.disable_allocation(specific.id).await,
        Err(EngineError::InvalidTransition(_))
    ));

    // Resolution now lands on the general allocation.
    let id = event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(1_500))
        .await;
    finalize(&engine, id).await.unwrap();

    let specific = engine.allocation(specific.id).await.unwrap();
    assert!(!specific.is_active());
    assert_eq!(specific.executed(), units(200));
    let general = engine.allocation(general.id).await.unwrap();
    assert_eq!(general.executed(), units(1_700));

    assert!(matches!(
        engine.recompute_allocation(specific.id).await,
        Err(EngineError::InvalidTransition(_))
    ));

    let listed = engine
        .allocations(&AllocationFilter::default().year(2024))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    let report = engine
        .allocation_report(&AllocationFilter::default().year(2024).include_disabled())
        .await
        .unwrap();
    assert_eq!(report.allocations.len(), 2);
    assert_eq!(report.total_assigned, units(6_000));
}

#[tokio::test]
async fn voided_purchase_orders_leave_the_ledger() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, OPERATIONS, None, AllocationKind::Operational, units(10_000))
        .await
        .unwrap();
    let receipt = engine
        .submit_expense(ExpenseCommand::CreatePurchaseOrder(
            NewPurchaseOrderCmd::new("OC-2024-001", date(5, 1), units(2_500)).account(OPERATIONS),
        ))
        .await
        .unwrap();
    assert_eq!(receipt.recomputed[0].executed, units(2_500));

    let duplicate = engine
        .submit_expense(ExpenseCommand::CreatePurchaseOrder(
            NewPurchaseOrderCmd::new("OC-2024-001", date(5, 2), units(1)).account(OPERATIONS),
        ))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, EngineError::ExistingKey(_)));

    let voided = engine
        .submit_expense(ExpenseCommand::TransitionPurchaseOrder {
            id: receipt.record_id,
            to: PurchaseOrderState::Voided,
        })
        .await
        .unwrap();
    assert_eq!(voided.recomputed[0].executed, Money::ZERO);
}

#[tokio::test]
async fn purchase_order_vehicle_resolves_through_work_orders() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, OPERATIONS, Some(PLATE), AllocationKind::Operational, units(5_000))
        .await
        .unwrap();
    let order = engine
        .submit_expense(ExpenseCommand::CreatePurchaseOrder(
            NewPurchaseOrderCmd::new("OC-2024-002", date(6, 1), units(750)).account(OPERATIONS),
        ))
        .await
        .unwrap();
    // No vehicle yet: the order only counts toward general allocations.
    assert!(order.recomputed.is_empty());

    let work_order = engine
        .create_work_order("OT-77", PLATE, date(5, 30), "brake pads", None)
        .await
        .unwrap();
    let receipt = engine
        .link_work_order(work_order.id, Some(order.record_id))
        .await
        .unwrap();
    assert_eq!(receipt.recomputed.len(), 1);
    assert_eq!(receipt.recomputed[0].executed, units(750));

    let resolved = engine.purchase_order(order.record_id).await.unwrap();
    assert_eq!(resolved.vehicle_plate.as_deref(), Some(PLATE));

    let receipt = engine.link_work_order(work_order.id, None).await.unwrap();
    assert_eq!(receipt.recomputed[0].executed, Money::ZERO);
}

#[tokio::test]
async fn maintenance_moves_vehicle_and_odometer() {
    let (engine, _db) = engine_with_db().await;
    let id = event_in_shop(&engine, PLATE, None, MaintenanceKind::Corrective, units(10)).await;
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::InMaintenance
    );

    finalize(&engine, id).await.unwrap();
    let vehicle = engine.vehicle(PLATE).await.unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Available);
    assert_eq!(vehicle.odometer_km, 45_000);

    // A lower reading never winds the odometer back.
    let cmd = NewMaintenanceCmd::new(PLATE, MaintenanceKind::Corrective, date(4, 1), 30_000, "tyre")
        .labor_cost(units(5));
    let receipt = engine
        .submit_expense(ExpenseCommand::CreateMaintenance(cmd))
        .await
        .unwrap();
    engine
        .submit_expense(ExpenseCommand::TransitionMaintenance(
            MaintenanceTransitionCmd::new(receipt.record_id, MaintenanceState::InShop),
        ))
        .await
        .unwrap();
    finalize(&engine, receipt.record_id).await.unwrap();
    assert_eq!(engine.vehicle(PLATE).await.unwrap().odometer_km, 45_000);
}

#[tokio::test]
async fn rental_takes_vehicle_out_of_service_until_finalized() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, OPERATIONS, Some(PLATE), AllocationKind::Operational, units(5_000))
        .await
        .unwrap();

    let rental = engine
        .submit_expense(ExpenseCommand::CreateRental(
            NewRentalCmd::new("Rented Transit", date(7, 1), units(40), "engine repair")
                .replaces(PLATE)
                .end_date(date(7, 11))
                .account(OPERATIONS),
        ))
        .await
        .unwrap();
    assert_eq!(rental.recomputed[0].executed, units(400));
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::OutOfService
    );

    let finalized = engine
        .submit_expense(ExpenseCommand::FinalizeRental {
            id: rental.record_id,
            end_date: date(7, 11),
        })
        .await
        .unwrap();
    assert_eq!(finalized.recomputed[0].executed, Money::ZERO);
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::Available
    );
}

#[tokio::test]
async fn finalized_rental_returns_vehicle_to_workshop() {
    let (engine, _db) = engine_with_db().await;
    event_in_shop(&engine, PLATE, None, MaintenanceKind::Corrective, units(10)).await;

    let rental = engine
        .submit_expense(ExpenseCommand::CreateRental(
            NewRentalCmd::new("Rented Transit", date(7, 1), units(40), "workshop").replaces(PLATE),
        ))
        .await
        .unwrap();
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::OutOfService
    );

    engine
        .submit_expense(ExpenseCommand::FinalizeRental {
            id: rental.record_id,
            end_date: date(7, 3),
        })
        .await
        .unwrap();
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::InMaintenance
    );
}

#[tokio::test]
async fn deleting_a_record_recomputes_its_allocation() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, OPERATIONS, Some(PLATE), AllocationKind::Operational, units(1_000))
        .await
        .unwrap();
    let fuel = engine
        .submit_expense(ExpenseCommand::CreateFuel(
            NewFuelCmd::new(PLATE, date(2, 2), Liters::from_hundredths(3_000), units(45), 43_100)
                .account(OPERATIONS),
        ))
        .await
        .unwrap();
    assert_eq!(fuel.recomputed[0].executed, units(45));
    assert_eq!(engine.vehicle(PLATE).await.unwrap().odometer_km, 43_100);

    let deleted = engine
        .submit_expense(ExpenseCommand::DeleteFuel { id: fuel.record_id })
        .await
        .unwrap();
    assert_eq!(deleted.recomputed[0].executed, Money::ZERO);
    assert!(matches!(
        engine.fuel_purchase(fuel.record_id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn reassigning_vehicle_moves_the_amount() {
    let (engine, _db) = engine_with_db().await;
    for plate in [PLATE, OTHER_PLATE] {
        engine
            .create_allocation(2024, OPERATIONS, Some(plate), AllocationKind::Operational, units(1_000))
            .await
            .unwrap();
    }
    let fuel = engine
        .submit_expense(ExpenseCommand::CreateFuel(
            NewFuelCmd::new(PLATE, date(2, 2), Liters::from_hundredths(3_000), units(50), 43_000)
                .account(OPERATIONS),
        ))
        .await
        .unwrap();

    let moved = engine
        .submit_expense(ExpenseCommand::UpdateFuel(
            UpdateFuelCmd::new(fuel.record_id).vehicle(OTHER_PLATE),
        ))
        .await
        .unwrap();
    assert_eq!(moved.recomputed.len(), 2);

    let before = engine
        .query_allocation_status(OPERATIONS, Some(PLATE), 2024)
        .await
        .unwrap();
    let after = engine
        .query_allocation_status(OPERATIONS, Some(OTHER_PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(before.executed, Money::ZERO);
    assert_eq!(before.available, units(1_000));
    assert_eq!(after.executed, units(50));
    assert_eq!(after.available, units(950));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_finalizations_never_overspend() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    let first =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(600))
            .await;
    let second =
        event_in_shop(&engine, PLATE, Some(PREVENTIVE), MaintenanceKind::Preventive, units(600))
            .await;

    let engine = Arc::new(engine);
    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { finalize(&engine, id).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|result| matches!(result, Err(EngineError::OverspendRejected { .. })))
    );
    let status = engine
        .query_allocation_status(PREVENTIVE, Some(PLATE), 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, units(600));
    assert_eq!(status.available, units(400));
}

#[tokio::test]
async fn executed_amount_overflow_aborts_the_write() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, OPERATIONS, None, AllocationKind::Operational, units(1_000))
        .await
        .unwrap();
    let huge = Money::new(i64::MAX / 2 + 1);
    let fuel = |day| {
        ExpenseCommand::CreateFuel(
            NewFuelCmd::new(PLATE, date(2, day), Liters::from_hundredths(3_000), huge, 43_000)
                .account(OPERATIONS),
        )
    };
    engine.submit_expense(fuel(2)).await.unwrap();

    let err = engine.submit_expense(fuel(3)).await.unwrap_err();
    assert_eq!(err, EngineError::InvalidAmount("fuel amount overflow".to_string()));
    assert_eq!(engine.fuel_purchases(PLATE).await.unwrap().len(), 1);
    let status = engine
        .query_allocation_status(OPERATIONS, None, 2024)
        .await
        .unwrap();
    assert_eq!(status.executed, huge);
}

#[tokio::test]
async fn reports_flag_exhausted_allocations() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    engine
        .create_allocation(2024, PREVENTIVE, Some(OTHER_PLATE), AllocationKind::Preventive, units(1_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(850)).await;
    finalized_event(&engine, OTHER_PLATE, PREVENTIVE, units(100)).await;

    let alerts = engine.execution_alerts(Some(2024)).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].allocation.vehicle_plate.as_deref(), Some(PLATE));
    assert_eq!(alerts[0].remaining, units(150));

    let variance = engine.variance_report(2024).await.unwrap();
    assert_eq!(variance.len(), 2);
    assert!(variance.iter().all(|line| !line.overrun));
}

#[tokio::test]
async fn vehicle_cost_report_covers_every_account() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(10_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(400)).await;
    engine
        .submit_expense(ExpenseCommand::CreateFuel(NewFuelCmd::new(
            PLATE,
            date(4, 2),
            Liters::from_hundredths(4_000),
            units(60),
            45_500,
        )))
        .await
        .unwrap();

    let report = engine.vehicle_cost_report(PLATE, Some(2024)).await.unwrap();
    assert_eq!(report.maintenance, units(400));
    assert_eq!(report.fuel, units(60));
    assert_eq!(report.rentals, Money::ZERO);
    assert_eq!(report.total, units(460));
    assert_eq!(report.cost_per_km, Money::new(1));
    assert_eq!(report.days_out_of_service, 4);

    let previous_year = engine.vehicle_cost_report(PLATE, Some(2023)).await.unwrap();
    assert_eq!(previous_year.total, Money::ZERO);
    assert!(matches!(
        engine.vehicle_cost_report("ZZ-0000", None).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn maintenance_alerts_report_mileage_and_schedule() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_allocation(2024, PREVENTIVE, Some(PLATE), AllocationKind::Preventive, units(10_000))
        .await
        .unwrap();
    finalized_event(&engine, PLATE, PREVENTIVE, units(400)).await;
    let scheduled = engine
        .submit_expense(ExpenseCommand::CreateMaintenance(
            NewMaintenanceCmd::new(
                OTHER_PLATE,
                MaintenanceKind::Preventive,
                date(6, 1),
                10_000,
                "10k service",
            )
            .scheduled_date(date(6, 14)),
        ))
        .await
        .unwrap();

    let alerts = engine.maintenance_alerts(date(6, 10)).await.unwrap();
    assert_eq!(
        alerts,
        vec![
            MaintenanceAlert::ServiceOverdue {
                vehicle_plate: OTHER_PLATE.to_string(),
                threshold_km: 10_000,
                km_past: 0,
            },
            MaintenanceAlert::ScheduledSoon {
                vehicle_plate: OTHER_PLATE.to_string(),
                event_id: scheduled.record_id,
                scheduled_date: date(6, 14),
                days_remaining: 4,
            },
        ]
    );
}

#[tokio::test]
async fn vehicle_status_can_be_set_except_derived_states() {
    let (engine, _db) = engine_with_db().await;
    let in_use = engine
        .set_vehicle_status(OTHER_PLATE, VehicleStatus::InUse)
        .await
        .unwrap();
    assert_eq!(in_use.status, VehicleStatus::InUse);
    assert!(matches!(
        engine
            .set_vehicle_status(OTHER_PLATE, VehicleStatus::OutOfService)
            .await,
        Err(EngineError::InvalidTransition(_))
    ));

    event_in_shop(&engine, PLATE, None, MaintenanceKind::Corrective, units(100)).await;
    let held = engine
        .set_vehicle_status(PLATE, VehicleStatus::Available)
        .await
        .unwrap();
    assert_eq!(held.status, VehicleStatus::InMaintenance);

    let retired = engine
        .set_vehicle_status(PLATE, VehicleStatus::Decommissioned)
        .await
        .unwrap();
    assert_eq!(retired.status, VehicleStatus::Decommissioned);
    assert_eq!(
        engine.vehicle(PLATE).await.unwrap().status,
        VehicleStatus::Decommissioned
    );
}
