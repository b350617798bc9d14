use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::middleware::OptionalAuthUser;
use clutch_shared::types::auth::AuthUser;
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::models::{Registration, Tournament};
use crate::registration::eligibility::{Eligibility, Offer, Reason};
use crate::registration::{RegistrationStatus, TournamentStatus};
use crate::schema::{tournament_registrations, tournaments};
use crate::services::registration_service;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct TournamentFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<TournamentStatus>,
    pub game: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl TournamentFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn query(&self) -> tournaments::BoxedQuery<'static, Pg> {
        let mut query = tournaments::table.into_boxed();
        if let Some(status) = self.status {
            query = query.filter(tournaments::status.eq(status.as_str()));
        }
        if let Some(game) = self.game.clone() {
            query = query.filter(tournaments::game.eq(game));
        }
        query
    }
}

#[derive(Debug, Serialize)]
pub struct TournamentDetail {
    #[serde(flatten)]
    pub tournament: Tournament,
    /// Pending plus approved registrations.
    pub registration_count: i64,
}

#[derive(Debug, Serialize)]
pub struct EligibilityView {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Eligibility> for EligibilityView {
    fn from(outcome: Eligibility) -> Self {
        match outcome {
            Eligibility::Eligible(offer) => Self {
                eligible: true,
                offer: Some(offer),
                reason: None,
                message: None,
            },
            Eligibility::Ineligible(reason) => Self {
                eligible: false,
                offer: None,
                message: Some(reason.message()),
                reason: Some(reason),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRegistrationRequest {
    pub team_id: Option<Uuid>,
}

impl SubmitRegistrationRequest {
    /// A request sent without a JSON body is a solo submission. A JSON body
    /// that does not parse is rejected, never read as "no team".
    fn from_body(body: Result<Json<Self>, JsonRejection>) -> AppResult<Self> {
        match body {
            Ok(Json(body)) => Ok(body),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(Self::default()),
            Err(rejection) => Err(AppError::with_details(
                ErrorCode::ValidationError,
                rejection.body_text(),
                serde_json::json!({ "body": [rejection.body_text()] }),
            )),
        }
    }
}

// --- Handlers ---

pub async fn list_tournaments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TournamentFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Tournament>>>> {
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());

    let (items, total) = db::run(&state.db, move |conn| {
        let items = params
            .query()
            .order(tournaments::start_date.asc())
            .offset(offset)
            .limit(limit)
            .select(Tournament::as_select())
            .load(conn)?;
        let total: i64 = params.query().count().get_result(conn)?;
        Ok((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}

pub async fn get_tournament(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TournamentDetail>>> {
    let detail = db::run(&state.db, move |conn| {
        let tournament = tournaments::table
            .find(tournament_id)
            .select(Tournament::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::TournamentNotFound, "Tournament not found"))?;

        let registration_count: i64 = tournament_registrations::table
            .filter(tournament_registrations::tournament_id.eq(tournament_id))
            .filter(tournament_registrations::status.eq_any([
                RegistrationStatus::Pending.as_str(),
                RegistrationStatus::Approved.as_str(),
            ]))
            .count()
            .get_result(conn)?;

        Ok(TournamentDetail { tournament, registration_count })
    })
    .await?;

    Ok(Json(ApiResponse::ok(detail)))
}

/// Read-only: whether the caller could register right now, and why not.
pub async fn get_eligibility(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Path(tournament_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EligibilityView>>> {
    let outcome = registration_service::check(&state.db, tournament_id, user.map(|u| u.id)).await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

pub async fn submit_registration(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(tournament_id): Path<Uuid>,
    body: Result<Json<SubmitRegistrationRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Registration>>)> {
    let body = SubmitRegistrationRequest::from_body(body)?;
    let registration =
        registration_service::submit(&state.db, tournament_id, user.id, body.team_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(registration, "Registration submitted")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    async fn extract(content_type: Option<&str>, body: impl Into<Body>) -> AppResult<SubmitRegistrationRequest> {
        let mut request = Request::builder().method("POST");
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let request = request.body(body.into()).unwrap();
        SubmitRegistrationRequest::from_body(Json::from_request(request, &()).await)
    }

    #[tokio::test]
    async fn no_body_is_a_solo_submission() {
        let body = extract(None, "").await.unwrap();
        assert_eq!(body.team_id, None);
    }

    #[tokio::test]
    async fn team_id_is_read_from_json() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"team_id":"{id}"}}"#);
        let body = extract(Some("application/json"), json).await.unwrap();
        assert_eq!(body.team_id, Some(id));
    }

    #[tokio::test]
    async fn malformed_team_id_is_a_validation_error() {
        let err = extract(Some("application/json"), r#"{"team_id":"not-a-uuid"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn broken_json_is_a_validation_error() {
        let err = extract(Some("application/json"), r#"{"team_id":"#).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
