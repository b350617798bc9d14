use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use clutch_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn index() -> &'static str {
    "API is running. Use /api/register, /api/login, /api/me."
}

/// Liveness plus a `SELECT 1` against the pool.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let db_check = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthCheck::healthy("database"),
            Err(e) => HealthCheck::unhealthy("database", e.to_string()),
        },
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };

    let response = HealthResponse::healthy("clutch-auth", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![db_check]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}
