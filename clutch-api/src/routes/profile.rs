use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::{AuthUser, Role};
use clutch_shared::types::ApiResponse;
use clutch_shared::validation::{http_url, normalize};

use crate::db;
use crate::models::Profile;
use crate::schema::profiles;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub roles: Vec<Role>,
}

/// Only presentation fields are self-service; verification is staff-owned.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100, message = "Name too long"))]
    pub full_name: Option<String>,
    #[validate(custom = "http_url")]
    pub avatar_url: Option<String>,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let user_id = user.id;
    let profile = db::run(&state.db, move |conn| find_profile(conn, user_id)).await?;
    let roles = state.gate.roles().roles_for(user_id).await?;

    Ok(Json(ApiResponse::ok(ProfileResponse { profile, roles })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let body = UpdateProfileRequest {
        full_name: normalize(body.full_name),
        avatar_url: normalize(body.avatar_url),
    };
    body.validate()?;

    let user_id = user.id;
    let UpdateProfileRequest { full_name, avatar_url } = body;

    let profile = db::run(&state.db, move |conn| {
        let current = find_profile(conn, user_id)?;
        diesel::update(profiles::table.find(current.id))
            .set((
                profiles::full_name.eq(full_name.or(current.full_name)),
                profiles::avatar_url.eq(avatar_url.or(current.avatar_url)),
                profiles::updated_at.eq(chrono::Utc::now()),
            ))
            .returning(Profile::as_returning())
            .get_result(conn)
            .map_err(AppError::from)
    })
    .await?;

    tracing::info!(%user_id, "profile updated");
    Ok(Json(ApiResponse::ok(profile)))
}

fn find_profile(conn: &mut diesel::PgConnection, user_id: uuid::Uuid) -> AppResult<Profile> {
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select(Profile::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "Profile not found"))
}
