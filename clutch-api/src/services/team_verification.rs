//! A competitive team is verified when every member is. Member rows carry a
//! copy of their profile's flag, and the team flag is recomputed whenever
//! a member's flag or the membership itself changes.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use clutch_shared::errors::AppResult;

use crate::schema::{team_members, teams_competitive};

/// Team verification from member flags. An empty roster is not verified.
pub fn derive(member_flags: &[bool]) -> bool {
    !member_flags.is_empty() && member_flags.iter().all(|v| *v)
}

/// Recompute one team's flag from its member rows.
pub fn recompute_team(conn: &mut PgConnection, team_id: Uuid) -> AppResult<bool> {
    let flags: Vec<bool> = team_members::table
        .filter(team_members::team_id.eq(team_id))
        .select(team_members::is_verified)
        .load(conn)?;
    let verified = derive(&flags);

    diesel::update(teams_competitive::table.find(team_id))
        .set((
            teams_competitive::is_verified.eq(verified),
            teams_competitive::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

    tracing::debug!(%team_id, verified, members = flags.len(), "team verification recomputed");
    Ok(verified)
}

/// Copy a user's profile verification onto every membership they hold and
/// recompute each affected team.
pub fn sync_member(conn: &mut PgConnection, user_id: Uuid, verified: bool) -> AppResult<Vec<Uuid>> {
    let team_ids: Vec<Uuid> = diesel::update(team_members::table.filter(team_members::user_id.eq(user_id)))
        .set(team_members::is_verified.eq(verified))
        .returning(team_members::team_id)
        .get_results(conn)?;

    for team_id in &team_ids {
        recompute_team(conn, *team_id)?;
    }
    Ok(team_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_members_must_be_verified() {
        assert!(derive(&[true]));
        assert!(derive(&[true, true, true]));
        assert!(!derive(&[true, false]));
    }

    #[test]
    fn empty_roster_is_unverified() {
        assert!(!derive(&[]));
    }
}
