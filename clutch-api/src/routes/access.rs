use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use clutch_shared::errors::AppResult;
use clutch_shared::middleware::OptionalAuthUser;
use clutch_shared::types::ApiResponse;

use crate::gate::{Capability, GateDecision, RedirectTarget};
use crate::AppState;

/// Page-level gate check. The guard lives as long as the request, so a
/// client that goes away cancels its pending role lookup.
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Path(capability): Path<String>,
) -> AppResult<Json<ApiResponse<GateDecision>>> {
    let capability: Capability = capability.parse()?;
    let guard = state.gate.guard(user.map(|u| u.id), capability);

    let decision = guard
        .settled()
        .await
        .unwrap_or(GateDecision::Redirect(RedirectTarget::Home));

    Ok(Json(ApiResponse::ok(decision)))
}
