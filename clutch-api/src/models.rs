use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::registration::eligibility::{ExistingRegistration, TournamentFacts};
use crate::registration::{
    MalformedRow, Registrant, RegistrationStatus, TournamentStatus, TournamentType,
};
use crate::schema::{
    admin_actions, contact_submissions, partners, players, profiles, recruitment_applications,
    team_invitations, team_members, teams, teams_competitive, tournament_registrations,
    tournaments, user_roles,
};

// --- Profile / roles ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub verification_status: String,
    pub verification_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = user_roles)]
pub struct UserRoleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_roles)]
pub struct NewUserRole<'a> {
    pub user_id: Uuid,
    pub role: &'a str,
}

// --- Competitive teams ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = teams_competitive)]
pub struct CompetitiveTeam {
    pub id: Uuid,
    pub captain_id: Uuid,
    pub name: String,
    pub tag: String,
    pub game: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = teams_competitive)]
pub struct NewCompetitiveTeam {
    pub captain_id: Uuid,
    pub name: String,
    pub tag: String,
    pub game: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = team_members)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub is_verified: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = team_members)]
pub struct NewTeamMember<'a> {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: &'a str,
    pub is_verified: bool,
}

pub const MEMBER_ROLE_CAPTAIN: &str = "captain";
pub const MEMBER_ROLE_MEMBER: &str = "member";

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = team_invitations)]
pub struct TeamInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub invited_by: Uuid,
    pub invited_user_email: String,
    pub invited_user_id: Option<Uuid>,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = team_invitations)]
pub struct NewTeamInvitation {
    pub team_id: Uuid,
    pub invited_by: Uuid,
    pub invited_user_email: String,
    pub invited_user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

// --- Tournaments ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = tournaments)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub game: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub tournament_type: String,
    pub team_size: Option<i32>,
    pub status: String,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
    pub prize_pool: Option<i64>,
    pub max_participants: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Tournament> for TournamentFacts {
    type Error = MalformedRow;

    fn try_from(t: &Tournament) -> Result<Self, Self::Error> {
        Ok(TournamentFacts {
            id: t.id,
            game: t.game.clone(),
            kind: TournamentType::try_from(t.tournament_type.as_str())?,
            status: TournamentStatus::try_from(t.status.as_str())?,
            registration_start: t.registration_start,
            registration_end: t.registration_end,
        })
    }
}

/// Full row as written by the console; `None` clears a nullable column.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = tournaments, treat_none_as_null = true)]
pub struct TournamentForm {
    pub name: String,
    pub game: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub tournament_type: String,
    pub team_size: Option<i32>,
    pub status: String,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
    pub prize_pool: Option<i64>,
    pub max_participants: Option<i32>,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = tournament_registrations)]
pub struct Registration {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub registration_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn registrant(&self) -> Result<Registrant, MalformedRow> {
        Registrant::from_columns(&self.registration_type, self.user_id, self.team_id)
    }

    pub fn status(&self) -> Result<RegistrationStatus, MalformedRow> {
        RegistrationStatus::try_from(self.status.as_str())
    }
}

impl TryFrom<&Registration> for ExistingRegistration {
    type Error = MalformedRow;

    fn try_from(r: &Registration) -> Result<Self, Self::Error> {
        Ok(ExistingRegistration {
            id: r.id,
            status: r.status()?,
            registrant: r.registrant()?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tournament_registrations)]
pub struct NewRegistration<'a> {
    pub tournament_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub registration_type: &'a str,
    pub status: &'a str,
}

impl<'a> NewRegistration<'a> {
    pub fn pending(tournament_id: Uuid, registrant: Registrant) -> Self {
        Self {
            tournament_id,
            user_id: registrant.user_id(),
            team_id: registrant.team_id(),
            registration_type: registrant.registration_type().as_str(),
            status: RegistrationStatus::Pending.as_str(),
        }
    }
}

// --- Roster (the organisation's own teams and players) ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = teams)]
pub struct RosterTeam {
    pub id: Uuid,
    pub name: String,
    pub game: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = teams, treat_none_as_null = true)]
pub struct RosterTeamForm {
    pub name: String,
    pub game: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = players)]
pub struct Player {
    pub id: Uuid,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub gamertag: String,
    pub real_name: Option<String>,
    pub role_in_team: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub achievements: serde_json::Value,
    pub gaming_setup: serde_json::Value,
    pub social_links: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = players, treat_none_as_null = true)]
pub struct PlayerForm {
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub gamertag: String,
    pub real_name: Option<String>,
    pub role_in_team: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub achievements: serde_json::Value,
    pub gaming_setup: serde_json::Value,
    pub social_links: serde_json::Value,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = partners)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub partner_type: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = partners, treat_none_as_null = true)]
pub struct PartnerForm {
    pub name: String,
    pub partner_type: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

// --- Public submissions ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = recruitment_applications)]
pub struct RecruitmentApplication {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub position: String,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recruitment_applications)]
pub struct NewRecruitmentApplication {
    pub full_name: String,
    pub email: String,
    pub position: String,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = contact_submissions)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_submissions)]
pub struct NewContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

// --- AdminAction ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = admin_actions)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub target_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_actions)]
pub struct NewAdminAction<'a> {
    pub admin_id: Uuid,
    pub action: &'a str,
    pub target_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(kind: &str, user: Option<Uuid>, team: Option<Uuid>, status: &str) -> Registration {
        Registration {
            id: Uuid::now_v7(),
            tournament_id: Uuid::now_v7(),
            user_id: user,
            team_id: team,
            registration_type: kind.into(),
            status: status.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn new_registration_sets_one_side() {
        let team = Uuid::now_v7();
        let row = NewRegistration::pending(Uuid::now_v7(), Registrant::Team(team));
        assert_eq!(row.team_id, Some(team));
        assert_eq!(row.user_id, None);
        assert_eq!(row.registration_type, "team");
        assert_eq!(row.status, "pending");
    }

    #[test]
    fn stored_registration_parses() {
        let user = Uuid::now_v7();
        let row = registration("solo", Some(user), None, "approved");
        let existing = ExistingRegistration::try_from(&row).unwrap();
        assert_eq!(existing.status, RegistrationStatus::Approved);
        assert_eq!(existing.registrant, Registrant::Solo(user));
    }

    #[test]
    fn malformed_registration_is_an_error() {
        let row = registration("solo", Some(Uuid::now_v7()), None, "maybe");
        assert!(ExistingRegistration::try_from(&row).is_err());
    }
}
