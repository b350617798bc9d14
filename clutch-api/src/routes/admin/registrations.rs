use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult};
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::gate::StaffUser;
use crate::models::Registration;
use crate::registration::workflow::Transition;
use crate::schema::{profiles, teams_competitive, tournament_registrations, tournaments};
use crate::services::registration_service::{self, Actor};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegistrationFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
    pub tournament_id: Option<Uuid>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 50 }

impl RegistrationFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Staff decision on a pending registration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: StaffDecision,
}

#[derive(Debug, Serialize)]
pub struct RegistrationRow {
    #[serde(flatten)]
    pub registration: Registration,
    pub tournament_name: Option<String>,
    /// Player name for solo entries, team name for team entries.
    pub registrant_name: Option<String>,
}

// --- Handlers ---

pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    _admin: StaffUser,
    Query(params): Query<RegistrationFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<RegistrationRow>>>> {
    let status = registration_service::parse_status_filter(params.status.as_deref())?;
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());
    let tournament_filter = params.tournament_id;

    let (items, total) = db::run(&state.db, move |conn| {
        let filtered = || {
            let mut query = tournament_registrations::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(tournament_registrations::status.eq(status.as_str()));
            }
            if let Some(tournament_id) = tournament_filter {
                query = query.filter(tournament_registrations::tournament_id.eq(tournament_id));
            }
            query
        };

        let rows: Vec<Registration> = filtered()
            .order(tournament_registrations::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(Registration::as_select())
            .load(conn)?;
        let total: i64 = filtered().count().get_result(conn)?;

        let tournament_ids: Vec<Uuid> = rows.iter().map(|r| r.tournament_id).collect();
        let user_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.user_id).collect();
        let team_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.team_id).collect();

        let tournament_names: HashMap<Uuid, String> = tournaments::table
            .filter(tournaments::id.eq_any(&tournament_ids))
            .select((tournaments::id, tournaments::name))
            .load::<(Uuid, String)>(conn)?
            .into_iter()
            .collect();
        let player_names: HashMap<Uuid, Option<String>> = profiles::table
            .filter(profiles::user_id.eq_any(&user_ids))
            .select((profiles::user_id, profiles::full_name))
            .load::<(Uuid, Option<String>)>(conn)?
            .into_iter()
            .collect();
        let team_names: HashMap<Uuid, String> = teams_competitive::table
            .filter(teams_competitive::id.eq_any(&team_ids))
            .select((teams_competitive::id, teams_competitive::name))
            .load::<(Uuid, String)>(conn)?
            .into_iter()
            .collect();

        let items = rows
            .into_iter()
            .map(|registration| {
                let registrant_name = match (registration.user_id, registration.team_id) {
                    (Some(user_id), _) => player_names.get(&user_id).cloned().flatten(),
                    (_, Some(team_id)) => team_names.get(&team_id).cloned(),
                    _ => None,
                };
                RegistrationRow {
                    tournament_name: tournament_names.get(&registration.tournament_id).cloned(),
                    registrant_name,
                    registration,
                }
            })
            .collect();

        Ok::<_, AppError>((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(registration_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Registration>>> {
    let transition = match body.status {
        StaffDecision::Approved => Transition::Approve,
        StaffDecision::Rejected => Transition::Reject,
    };

    let updated = registration_service::transition(
        &state.db,
        registration_id,
        transition,
        Actor::Staff(admin.0.id),
    )
    .await?;

    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(registration_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    registration_service::delete(&state.db, registration_id, admin.0.id).await?;
    Ok(Json(ApiResponse::ok_with_message((), "Registration deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_cannot_request_withdrawn_or_pending() {
        assert!(serde_json::from_str::<UpdateStatusRequest>(r#"{"status":"approved"}"#).is_ok());
        assert!(serde_json::from_str::<UpdateStatusRequest>(r#"{"status":"withdrawn"}"#).is_err());
        assert!(serde_json::from_str::<UpdateStatusRequest>(r#"{"status":"pending"}"#).is_err());
    }
}
