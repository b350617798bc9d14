use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::ApiResponse;
use clutch_shared::validation::{http_url, normalize, not_blank};

use crate::db;
use crate::gate::StaffUser;
use crate::models::{Tournament, TournamentForm};
use crate::registration::{TournamentStatus, TournamentType};
use crate::schema::tournaments;
use crate::services::audit;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_dates", skip_on_field_errors = false))]
pub struct TournamentRequest {
    #[validate(custom = "not_blank", length(max = 100, message = "Name too long"))]
    pub name: String,
    #[validate(custom = "not_blank", length(max = 50, message = "Game name too long"))]
    pub game: String,
    #[validate(length(max = 3000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(custom = "http_url")]
    pub banner_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub tournament_type: TournamentType,
    #[validate(range(min = 1, max = 100, message = "Team size must be between 1 and 100"))]
    pub team_size: Option<i32>,
    pub status: TournamentStatus,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
    #[validate(range(min = 0, message = "Prize pool must be a positive number"))]
    pub prize_pool: Option<i64>,
    #[validate(range(min = 1, message = "Max participants must be positive"))]
    pub max_participants: Option<i32>,
}

fn validate_dates(req: &TournamentRequest) -> Result<(), ValidationError> {
    if matches!(req.end_date, Some(end) if end < req.start_date) {
        return Err(date_error("end_date_before_start", "End date must be after start date"));
    }
    if let (Some(open), Some(close)) = (req.registration_start, req.registration_end) {
        if close < open {
            return Err(date_error("registration_window", "Registration must close after it opens"));
        }
    }
    Ok(())
}

fn date_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

impl TournamentRequest {
    fn into_form(self) -> TournamentForm {
        TournamentForm {
            name: self.name.trim().to_string(),
            game: self.game.trim().to_string(),
            description: normalize(self.description),
            banner_url: normalize(self.banner_url),
            start_date: self.start_date,
            end_date: self.end_date,
            tournament_type: self.tournament_type.as_str().to_string(),
            team_size: self.team_size,
            status: self.status.as_str().to_string(),
            registration_start: self.registration_start,
            registration_end: self.registration_end,
            prize_pool: self.prize_pool,
            max_participants: self.max_participants,
        }
    }
}

pub async fn create_tournament(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Json(body): Json<TournamentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Tournament>>)> {
    let body = TournamentRequest {
        banner_url: normalize(body.banner_url),
        ..body
    };
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let tournament = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let tournament = diesel::insert_into(tournaments::table)
                .values(&form)
                .returning(Tournament::as_returning())
                .get_result(conn)?;
            audit::record(
                conn,
                admin_id,
                "create_tournament",
                Some(tournament.id),
                serde_json::json!({ "name": tournament.name, "game": tournament.game }),
            )?;
            Ok(tournament)
        })
    })
    .await?;

    tracing::info!(tournament_id = %tournament.id, %admin_id, "tournament created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tournament))))
}

pub async fn update_tournament(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(tournament_id): Path<Uuid>,
    Json(body): Json<TournamentRequest>,
) -> AppResult<Json<ApiResponse<Tournament>>> {
    let body = TournamentRequest {
        banner_url: normalize(body.banner_url),
        ..body
    };
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let tournament = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let tournament: Tournament = diesel::update(tournaments::table.find(tournament_id))
                .set((&form, tournaments::updated_at.eq(Utc::now())))
                .returning(Tournament::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "update_tournament",
                Some(tournament_id),
                serde_json::json!({ "status": tournament.status }),
            )?;
            Ok(tournament)
        })
    })
    .await?;

    tracing::info!(%tournament_id, %admin_id, "tournament updated");
    Ok(Json(ApiResponse::ok(tournament)))
}

pub async fn delete_tournament(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(tournament_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let name: String = diesel::delete(tournaments::table.find(tournament_id))
                .returning(tournaments::name)
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "delete_tournament",
                Some(tournament_id),
                serde_json::json!({ "name": name }),
            )
        })
    })
    .await?;

    tracing::info!(%tournament_id, %admin_id, "tournament deleted");
    Ok(Json(ApiResponse::ok_with_message((), "Tournament deleted")))
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::TournamentNotFound, "Tournament not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> TournamentRequest {
        let start = Utc::now() + Duration::days(14);
        TournamentRequest {
            name: "Clutch Cup".into(),
            game: "Valorant".into(),
            description: None,
            banner_url: None,
            start_date: start,
            end_date: Some(start + Duration::days(2)),
            tournament_type: TournamentType::Team,
            team_size: Some(5),
            status: TournamentStatus::Upcoming,
            registration_start: Some(Utc::now()),
            registration_end: Some(start - Duration::days(1)),
            prize_pool: Some(5_000),
            max_participants: Some(16),
        }
    }

    #[test]
    fn well_formed_tournament_passes() {
        assert!(request().validate().is_ok());
        let form = request().into_form();
        assert_eq!(form.tournament_type, "team");
        assert_eq!(form.status, "upcoming");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let req = request();
        let bad = TournamentRequest { end_date: Some(req.start_date - Duration::hours(1)), ..req };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn inverted_registration_window_is_rejected() {
        let req = request();
        let bad = TournamentRequest {
            registration_start: req.registration_end,
            registration_end: req.registration_start,
            ..req
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn negative_prize_pool_is_rejected() {
        let bad = TournamentRequest { prize_pool: Some(-1), ..request() };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("prize_pool"));
    }
}
