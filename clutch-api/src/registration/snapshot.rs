use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::db::{self, DbPool};
use crate::models::{CompetitiveTeam, Registration, Tournament};
use crate::schema::{profiles, teams_competitive, tournament_registrations, tournaments};

use super::eligibility::{CaptainedTeam, EligibilityInput, ExistingRegistration, TournamentFacts};

/// Load every fact the eligibility rules need for `user_id` on
/// `tournament_id`. All lookups run concurrently and the input is only
/// assembled once each of them has resolved.
pub async fn load(
    pool: &DbPool,
    tournament_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<(Tournament, EligibilityInput)> {
    let tournament = load_tournament(pool, tournament_id);

    let Some(user_id) = user_id else {
        let tournament = tournament.await?;
        let facts = TournamentFacts::try_from(&tournament)?;
        return Ok((tournament, EligibilityInput {
            user_id: None,
            profile_verified: false,
            tournament: facts,
            captained_teams: vec![],
            existing: vec![],
        }));
    };

    let (tournament, profile_verified, captained_teams, existing) = tokio::try_join!(
        tournament,
        load_profile_verified(pool, user_id),
        load_captained_teams(pool, user_id),
        load_existing(pool, tournament_id, user_id),
    )?;

    let facts = TournamentFacts::try_from(&tournament)?;
    Ok((tournament, EligibilityInput {
        user_id: Some(user_id),
        profile_verified,
        tournament: facts,
        captained_teams,
        existing,
    }))
}

async fn load_tournament(pool: &DbPool, tournament_id: Uuid) -> AppResult<Tournament> {
    db::run(pool, move |conn| {
        tournaments::table
            .find(tournament_id)
            .select(Tournament::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::TournamentNotFound, "Tournament not found"))
    })
    .await
}

/// A user without a profile row counts as unverified.
async fn load_profile_verified(pool: &DbPool, user_id: Uuid) -> AppResult<bool> {
    db::run(pool, move |conn| {
        let verified = profiles::table
            .filter(profiles::user_id.eq(user_id))
            .select(profiles::is_verified)
            .first::<bool>(conn)
            .optional()?;
        Ok(verified.unwrap_or(false))
    })
    .await
}

async fn load_captained_teams(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<CaptainedTeam>> {
    db::run(pool, move |conn| {
        let teams = teams_competitive::table
            .filter(teams_competitive::captain_id.eq(user_id))
            .order(teams_competitive::created_at.asc())
            .select(CompetitiveTeam::as_select())
            .load(conn)?;
        Ok(teams
            .into_iter()
            .map(|t| CaptainedTeam {
                id: t.id,
                name: t.name,
                game: t.game,
                is_verified: t.is_verified,
            })
            .collect())
    })
    .await
}

async fn load_existing(
    pool: &DbPool,
    tournament_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<ExistingRegistration>> {
    db::run(pool, move |conn| existing_registrations(conn, tournament_id, user_id)).await
}

/// Registrations on `tournament_id` held by `user_id` or by any team they
/// captain, oldest first.
pub fn existing_registrations(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<ExistingRegistration>> {
    let captained = teams_competitive::table
        .filter(teams_competitive::captain_id.eq(user_id))
        .select(teams_competitive::id.nullable());

    let rows = tournament_registrations::table
        .filter(tournament_registrations::tournament_id.eq(tournament_id))
        .filter(
            tournament_registrations::user_id
                .eq(user_id)
                .or(tournament_registrations::team_id.eq_any(captained)),
        )
        .order(tournament_registrations::created_at.asc())
        .select(Registration::as_select())
        .load(conn)?;

    rows.iter()
        .map(|r| ExistingRegistration::try_from(r).map_err(AppError::from))
        .collect()
}
