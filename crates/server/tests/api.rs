use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::router(engine)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed(app: &Router) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/accounts",
        Some(json!({ "code": "22.06.002", "name": "Preventive maintenance" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, vehicle) = send(
        app,
        Method::POST,
        "/vehicles",
        Some(json!({
            "plate": "ab-1234",
            "brand": "Mercedes",
            "model": "Sprinter",
            "odometer_km": 42000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(vehicle["plate"], "AB-1234");
    assert_eq!(vehicle["status"], "available");

    let (status, allocation) = send(
        app,
        Method::POST,
        "/allocations",
        Some(json!({
            "year": 2024,
            "account_code": "22.06.002",
            "vehicle_plate": "AB-1234",
            "kind": "preventive",
            "assigned": "1000000.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(allocation["executed"], "0.00");
    allocation["id"].as_str().unwrap().to_string()
}

/// Creates a preventive event costing `labor` and moves it into the shop.
async fn event_in_shop(app: &Router, labor: &str) -> String {
    let (status, receipt) = send(
        app,
        Method::POST,
        "/expenses",
        Some(json!({
            "op": "create_maintenance",
            "vehicle_plate": "AB-1234",
            "kind": "preventive",
            "entry_date": "2024-03-01",
            "odometer_km": 45000,
            "description": "annual service",
            "labor_cost": labor,
            "account_code": "22.06.002"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = receipt["record_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::POST,
        "/expenses",
        Some(json!({ "op": "transition_maintenance", "id": id, "to": "in_shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

async fn finalize(app: &Router, id: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/expenses",
        Some(json!({
            "op": "transition_maintenance",
            "id": id,
            "to": "finalized",
            "exit_date": "2024-03-05"
        })),
    )
    .await
}

#[tokio::test]
async fn finalization_updates_status_and_rejects_overspend() {
    let app = app().await;
    let allocation_id = seed(&app).await;

    let first = event_in_shop(&app, "400000.00").await;
    let (status, receipt) = finalize(&app, &first).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["recomputed"][0]["allocation_id"], allocation_id);
    assert_eq!(receipt["recomputed"][0]["executed"], "400000.00");

    let (status, body) = send(
        &app,
        Method::GET,
        "/allocations/status?account=22.06.002&vehicle=AB-1234&year=2024",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], "400000.00");
    assert_eq!(body["available"], "600000.00");
    assert_eq!(body["pct_executed_bps"], 4000);

    let second = event_in_shop(&app, "700000.00").await;
    let (status, body) = finalize(&app, &second).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"],
        "Insufficient budget. Available: $600,000.00, required: $700,000.00"
    );
}

#[tokio::test]
async fn duplicate_allocation_conflicts() {
    let app = app().await;
    seed(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/allocations",
        Some(json!({
            "year": 2024,
            "account_code": "22.06.002",
            "vehicle_plate": "AB-1234",
            "kind": "operational",
            "assigned": "10.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn allocation_lifecycle_over_http() {
    let app = app().await;
    let id = seed(&app).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/allocations/{id}"),
        Some(json!({ "assigned": "1200000.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned"], "1200000.00");

    let (status, body) = send(&app, Method::POST, &format!("/allocations/{id}/recompute"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], "1200000.00");

    let (status, body) = send(&app, Method::POST, &format!("/allocations/{id}/disable"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (status, body) = send(&app, Method::GET, "/allocations?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allocations"].as_array().unwrap().len(), 0);

    let (status, body) = send(
        &app,
        Method::GET,
        "/allocations?year=2024&include_disabled=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allocations"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_assigned"], "1200000.00");
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = app().await;

    let (status, _) = send(&app, Method::GET, "/vehicles/ZZ-0000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        "/allocations/6f1c2a52-3c1e-4d5c-9a43-5b0f1f0f7c11",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_amount_is_rejected() {
    let app = app().await;
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/expenses",
        Some(json!({
            "op": "create_purchase_order",
            "order_number": "OC-1",
            "issued_on": "2024-05-01",
            "amount_total": "twelve"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid amount: invalid amount");
}

#[tokio::test]
async fn alerts_list_exhausted_allocations() {
    let app = app().await;
    seed(&app).await;
    let id = event_in_shop(&app, "850000.00").await;
    let (status, _) = finalize(&app, &id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/reports/alerts?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["pct_executed_bps"], 8500);
    assert_eq!(alerts[0]["remaining"], "150000.00");
    assert_eq!(alerts[0]["allocation"]["pct_executed"], 0.85);

    let (status, body) = send(&app, Method::GET, "/reports/variance?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["variance"], "-150000.00");
    assert_eq!(body[0]["overrun"], false);
}

#[tokio::test]
async fn vehicle_cost_report_over_http() {
    let app = app().await;
    seed(&app).await;
    let id = event_in_shop(&app, "850000.00").await;
    let (status, _) = finalize(&app, &id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/reports/vehicles/ab-1234?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vehicle_plate"], "AB-1234");
    assert_eq!(body["maintenance"], "850000.00");
    assert_eq!(body["fuel"], "0.00");
    assert_eq!(body["total"], "850000.00");
    assert_eq!(body["cost_per_km"], "18.88");
    assert_eq!(body["days_out_of_service"], 4);

    let (status, _) = send(&app, Method::GET, "/reports/vehicles/ZZ-0000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn maintenance_alerts_follow_vehicle_status() {
    let app = app().await;
    seed(&app).await;

    let (status, body) = send(&app, Method::GET, "/reports/maintenance?today=2024-06-10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "reason": "service_overdue",
            "vehicle_plate": "AB-1234",
            "threshold_km": 40000,
            "km_past": 2000
        }])
    );

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/vehicles/AB-1234",
        Some(json!({ "status": "out_of_service" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("derived"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/vehicles/AB-1234",
        Some(json!({ "status": "decommissioned" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "decommissioned");

    let (status, body) = send(&app, Method::GET, "/reports/maintenance?today=2024-06-10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
