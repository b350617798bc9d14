use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::ApiResponse;

use crate::models::User;
use crate::routes::register::AuthPayload;
use crate::schema::users;
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "Email and password are required",
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let user: User = users::table
        .filter(users::email.eq(auth_service::normalize_email(&req.email)))
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "Invalid credentials"))?;

    if !auth_service::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(AppError::new(ErrorCode::InvalidCredentials, "Invalid credentials"));
    }

    let token = token_service::create_access_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(AuthPayload {
        user: user.into(),
        token,
    })))
}
