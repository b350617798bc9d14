use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use clutch_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::db;
use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let db_check = match db::run(&state.db, |conn| {
        diesel::sql_query("SELECT 1").execute(conn)?;
        Ok(())
    })
    .await
    {
        Ok(()) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };

    let response = HealthResponse::healthy("clutch-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![db_check]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
