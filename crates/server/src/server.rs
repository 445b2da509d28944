use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{accounts, allocations, expenses, reports, vehicles, work_orders};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Builds the HTTP API around `engine`.
pub fn router(engine: Engine) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
    };

    Router::new()
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route("/vehicles", post(vehicles::create))
        .route(
            "/vehicles/{plate}",
            get(vehicles::get).patch(vehicles::update_status),
        )
        .route(
            "/allocations",
            post(allocations::create).get(allocations::list),
        )
        .route("/allocations/status", get(allocations::status))
        .route(
            "/allocations/{id}",
            get(allocations::get).patch(allocations::update),
        )
        .route("/allocations/{id}/disable", post(allocations::disable))
        .route("/allocations/{id}/recompute", post(allocations::recompute))
        .route("/reports/alerts", get(reports::alerts))
        .route("/reports/variance", get(reports::variance))
        .route("/reports/vehicles/{plate}", get(reports::vehicle_costs))
        .route("/reports/maintenance", get(reports::maintenance_alerts))
        .route("/expenses", post(expenses::submit))
        .route("/work-orders", post(work_orders::create))
        .route("/work-orders/{id}/link", post(work_orders::link))
        .with_state(state)
}

pub async fn run(engine: Engine) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
