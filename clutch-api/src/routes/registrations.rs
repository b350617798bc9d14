use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::AppResult;
use clutch_shared::types::auth::AuthUser;
use clutch_shared::types::ApiResponse;

use crate::models::Registration;
use crate::registration::workflow::Transition;
use crate::services::registration_service::{self, Actor};
use crate::AppState;

pub async fn my_registrations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Registration>>>> {
    let rows = registration_service::list_for_user(&state.db, user.id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(registration_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Registration>>> {
    let updated = registration_service::transition(
        &state.db,
        registration_id,
        Transition::Withdraw,
        Actor::Registrant(user.id),
    )
    .await?;

    Ok(Json(ApiResponse::ok_with_message(updated, "Registration withdrawn")))
}
