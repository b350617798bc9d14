use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::AuthUser;
use clutch_shared::types::ApiResponse;

use crate::models::{PublicUser, User};
use crate::schema::users;
use crate::AppState;

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let record = users::table
        .find(user.id)
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;

    Ok(Json(ApiResponse::ok(record.into())))
}
