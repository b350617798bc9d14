use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::models::{Player, RosterTeam};
use crate::schema::{players, teams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RosterFilter {
    pub game: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RosterTeamDetail {
    #[serde(flatten)]
    pub team: RosterTeam,
    pub players: Vec<Player>,
}

#[derive(Debug, Serialize)]
pub struct PlayerDetail {
    #[serde(flatten)]
    pub player: Player,
    pub team: Option<RosterTeam>,
}

pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RosterFilter>,
) -> AppResult<Json<ApiResponse<Vec<RosterTeam>>>> {
    let rows = db::run(&state.db, move |conn| {
        let mut query = teams::table.into_boxed();
        if let Some(game) = filter.game {
            query = query.filter(teams::game.eq(game));
        }
        Ok(query
            .order(teams::name.asc())
            .select(RosterTeam::as_select())
            .load(conn)?)
    })
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RosterTeamDetail>>> {
    let detail = db::run(&state.db, move |conn| {
        let team = teams::table
            .find(team_id)
            .select(RosterTeam::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::RosterTeamNotFound, "Team not found"))?;

        let players = players::table
            .filter(players::team_id.eq(team_id))
            .order(players::gamertag.asc())
            .select(Player::as_select())
            .load(conn)?;

        Ok(RosterTeamDetail { team, players })
    })
    .await?;

    Ok(Json(ApiResponse::ok(detail)))
}

pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PlayerDetail>>> {
    let detail = db::run(&state.db, move |conn| {
        let player = players::table
            .find(player_id)
            .select(Player::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::PlayerNotFound, "Player not found"))?;

        let team = match player.team_id {
            Some(team_id) => teams::table
                .find(team_id)
                .select(RosterTeam::as_select())
                .first(conn)
                .optional()?,
            None => None,
        };

        Ok(PlayerDetail { player, team })
    })
    .await?;

    Ok(Json(ApiResponse::ok(detail)))
}
