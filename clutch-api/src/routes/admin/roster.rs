use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::pg::PgConnection;
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
use crate::models::{Player, PlayerForm, RosterTeam, RosterTeamForm};
use crate::schema::{players, teams};
use crate::services::audit;
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize, Validate)]
pub struct RosterTeamRequest {
    #[validate(custom = "not_blank", length(max = 100, message = "Name too long"))]
    pub name: String,
    #[validate(custom = "not_blank", length(max = 50, message = "Game name too long"))]
    pub game: String,
    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(custom = "http_url")]
    pub logo_url: Option<String>,
    #[validate(custom = "http_url")]
    pub banner_url: Option<String>,
}

impl RosterTeamRequest {
    fn normalized(self) -> Self {
        Self {
            description: normalize(self.description),
            logo_url: normalize(self.logo_url),
            banner_url: normalize(self.banner_url),
            ..self
        }
    }

    fn into_form(self) -> RosterTeamForm {
        RosterTeamForm {
            name: self.name.trim().to_string(),
            game: self.game.trim().to_string(),
            description: self.description,
            logo_url: self.logo_url,
            banner_url: self.banner_url,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlayerRequest {
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[validate(custom = "not_blank", length(max = 50, message = "Gamertag too long"))]
    pub gamertag: String,
    #[validate(length(max = 100, message = "Real name too long"))]
    pub real_name: Option<String>,
    #[validate(length(max = 50, message = "Role too long"))]
    pub role_in_team: Option<String>,
    #[validate(length(max = 1000, message = "Bio too long"))]
    pub bio: Option<String>,
    #[validate(custom = "http_url")]
    pub avatar_url: Option<String>,
    #[serde(default = "empty_array")]
    #[validate(custom = "json_array")]
    pub achievements: serde_json::Value,
    #[serde(default = "empty_object")]
    #[validate(custom = "json_object")]
    pub gaming_setup: serde_json::Value,
    #[serde(default = "empty_object")]
    #[validate(custom = "json_object")]
    pub social_links: serde_json::Value,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn json_array(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_array() {
        Ok(())
    } else {
        Err(ValidationError::new("expected_array"))
    }
}

fn json_object(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("expected_object"))
    }
}

impl PlayerRequest {
    fn normalized(self) -> Self {
        Self {
            real_name: normalize(self.real_name),
            role_in_team: normalize(self.role_in_team),
            bio: normalize(self.bio),
            avatar_url: normalize(self.avatar_url),
            ..self
        }
    }

    fn into_form(self) -> PlayerForm {
        PlayerForm {
            team_id: self.team_id,
            user_id: self.user_id,
            gamertag: self.gamertag.trim().to_string(),
            real_name: self.real_name,
            role_in_team: self.role_in_team,
            bio: self.bio,
            avatar_url: self.avatar_url,
            achievements: self.achievements,
            gaming_setup: self.gaming_setup,
            social_links: self.social_links,
        }
    }
}

// --- Teams ---

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Json(body): Json<RosterTeamRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RosterTeam>>)> {
    let body = body.normalized();
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let team = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let team = diesel::insert_into(teams::table)
                .values(&form)
                .returning(RosterTeam::as_returning())
                .get_result(conn)?;
            audit::record(
                conn,
                admin_id,
                "create_roster_team",
                Some(team.id),
                serde_json::json!({ "name": team.name, "game": team.game }),
            )?;
            Ok(team)
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(team))))
}

pub async fn update_team(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(team_id): Path<Uuid>,
    Json(body): Json<RosterTeamRequest>,
) -> AppResult<Json<ApiResponse<RosterTeam>>> {
    let body = body.normalized();
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let team = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let team: RosterTeam = diesel::update(teams::table.find(team_id))
                .set((&form, teams::updated_at.eq(Utc::now())))
                .returning(RosterTeam::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(team_not_found)?;
            audit::record(
                conn,
                admin_id,
                "update_roster_team",
                Some(team_id),
                serde_json::json!({ "name": team.name }),
            )?;
            Ok(team)
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok(team)))
}

/// Players of a deleted team stay on the site as free agents.
pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let name: String = diesel::delete(teams::table.find(team_id))
                .returning(teams::name)
                .get_result(conn)
                .optional()?
                .ok_or_else(team_not_found)?;
            audit::record(
                conn,
                admin_id,
                "delete_roster_team",
                Some(team_id),
                serde_json::json!({ "name": name }),
            )
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message((), "Team deleted")))
}

// --- Players ---

pub async fn create_player(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Json(body): Json<PlayerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Player>>)> {
    let body = body.normalized();
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let player = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            ensure_team_exists(conn, form.team_id)?;
            let player = diesel::insert_into(players::table)
                .values(&form)
                .returning(Player::as_returning())
                .get_result(conn)?;
            audit::record(
                conn,
                admin_id,
                "create_player",
                Some(player.id),
                serde_json::json!({ "gamertag": player.gamertag, "team_id": player.team_id }),
            )?;
            Ok(player)
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(player))))
}

pub async fn update_player(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(player_id): Path<Uuid>,
    Json(body): Json<PlayerRequest>,
) -> AppResult<Json<ApiResponse<Player>>> {
    let body = body.normalized();
    body.validate()?;
    let form = body.into_form();
    let admin_id = admin.0.id;

    let player = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            ensure_team_exists(conn, form.team_id)?;
            let player: Player = diesel::update(players::table.find(player_id))
                .set((&form, players::updated_at.eq(Utc::now())))
                .returning(Player::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(player_not_found)?;
            audit::record(
                conn,
                admin_id,
                "update_player",
                Some(player_id),
                serde_json::json!({ "gamertag": player.gamertag }),
            )?;
            Ok(player)
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok(player)))
}

pub async fn delete_player(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(player_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let gamertag: String = diesel::delete(players::table.find(player_id))
                .returning(players::gamertag)
                .get_result(conn)
                .optional()?
                .ok_or_else(player_not_found)?;
            audit::record(
                conn,
                admin_id,
                "delete_player",
                Some(player_id),
                serde_json::json!({ "gamertag": gamertag }),
            )
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message((), "Player deleted")))
}

// --- Helpers ---

fn ensure_team_exists(conn: &mut PgConnection, team_id: Option<Uuid>) -> AppResult<()> {
    let Some(team_id) = team_id else {
        return Ok(());
    };
    let exists: bool = diesel::select(diesel::dsl::exists(teams::table.find(team_id))).get_result(conn)?;
    if !exists {
        return Err(team_not_found());
    }
    Ok(())
}

fn team_not_found() -> AppError {
    AppError::new(ErrorCode::RosterTeamNotFound, "Team not found")
}

fn player_not_found() -> AppError {
    AppError::new(ErrorCode::PlayerNotFound, "Player not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(body: serde_json::Value) -> PlayerRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn player_json_fields_default_to_empty() {
        let req = player(serde_json::json!({ "gamertag": "Nyx" }));
        assert!(req.validate().is_ok());
        assert_eq!(req.achievements, serde_json::json!([]));
        assert_eq!(req.social_links, serde_json::json!({}));
    }

    #[test]
    fn player_json_fields_must_have_the_right_shape() {
        let req = player(serde_json::json!({ "gamertag": "Nyx", "achievements": { "a": 1 } }));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("achievements"));

        let req = player(serde_json::json!({ "gamertag": "Nyx", "social_links": ["x"] }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn overlong_gamertag_is_rejected() {
        let req = player(serde_json::json!({ "gamertag": "x".repeat(51) }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_team_urls_are_cleared_before_validation() {
        let req: RosterTeamRequest = serde_json::from_value(serde_json::json!({
            "name": " Clutch Academy ",
            "game": "Valorant",
            "logo_url": "  ",
            "banner_url": "javascript:alert(1)",
        }))
        .unwrap();
        let req = req.normalized();
        assert_eq!(req.logo_url, None);
        assert!(req.validate().is_err());

        let ok = RosterTeamRequest { banner_url: None, ..req };
        assert_eq!(ok.into_form().name, "Clutch Academy");
    }
}
