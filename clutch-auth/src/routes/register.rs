use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::Role;
use clutch_shared::types::ApiResponse;

use crate::models::{NewProfile, NewUser, NewUserRole, PublicUser, User};
use crate::schema::{profiles, user_roles, users};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name, email and password are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: PublicUser,
    pub token: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let name = req.name.trim();
    if name.is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "Name, email and password are required",
        ));
    }
    req.validate()?;
    auth_service::validate_password(&req.password)?;

    let email = auth_service::normalize_email(&req.email);
    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // User, profile and default role land together or not at all.
    let user: User = conn.transaction::<_, AppError, _>(|conn| {
        let exists: i64 = users::table
            .filter(users::email.eq(&email))
            .count()
            .get_result(conn)?;
        if exists > 0 {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "Email already registered"));
        }

        let user: User = diesel::insert_into(users::table)
            .values(&NewUser {
                name,
                email: &email,
                password_hash: &password_hash,
            })
            .returning(User::as_returning())
            .get_result(conn)?;

        diesel::insert_into(profiles::table)
            .values(&NewProfile {
                user_id: user.id,
                email: &email,
                full_name: Some(name),
                is_verified: false,
                verification_status: "pending",
            })
            .execute(conn)?;

        diesel::insert_into(user_roles::table)
            .values(&NewUserRole {
                user_id: user.id,
                role: Role::User.as_str(),
            })
            .execute(conn)?;

        Ok(user)
    })?;

    let token = token_service::create_access_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )?;

    tracing::info!(user_id = %user.id, email = %user.email, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthPayload {
            user: user.into(),
            token,
        })),
    ))
}
