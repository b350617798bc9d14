//! Captain area: competitive teams, their members and invitations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::AuthUser;
use clutch_shared::types::ApiResponse;
use clutch_shared::validation::{http_url, normalize, not_blank};

use crate::db;
use crate::models::{
    CompetitiveTeam, NewCompetitiveTeam, NewTeamInvitation, NewTeamMember, Profile,
    TeamInvitation, TeamMember, MEMBER_ROLE_CAPTAIN,
};
use crate::schema::{profiles, team_invitations, team_members, teams_competitive};
use crate::services::team_verification;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 3, max = 50, message = "Name must be 3 to 50 characters"))]
    pub name: String,
    #[validate(length(min = 2, max = 10, message = "Tag must be 2 to 10 characters"))]
    pub tag: String,
    #[validate(custom = "not_blank", length(max = 50))]
    pub game: String,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(custom = "http_url")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email address"), length(max = 255, message = "Email too long"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub member: TeamMember,
    pub full_name: Option<String>,
    pub profile_verified: bool,
}

// --- Handlers ---

pub async fn list_my_teams(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<CompetitiveTeam>>>> {
    let user_id = user.id;
    let rows = db::run(&state.db, move |conn| {
        Ok(teams_competitive::table
            .filter(teams_competitive::captain_id.eq(user_id))
            .order(teams_competitive::created_at.desc())
            .select(CompetitiveTeam::as_select())
            .load(conn)?)
    })
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

/// The captain joins their own team pre-verified, then the team flag is
/// derived from the roster.
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateTeamRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CompetitiveTeam>>)> {
    let body = CreateTeamRequest {
        name: body.name.trim().to_string(),
        tag: body.tag.trim().to_string(),
        game: body.game.trim().to_string(),
        description: normalize(body.description),
        logo_url: normalize(body.logo_url),
    };
    body.validate()?;

    let captain_id = user.id;
    let team = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let team: CompetitiveTeam = diesel::insert_into(teams_competitive::table)
                .values(&NewCompetitiveTeam {
                    captain_id,
                    name: body.name,
                    tag: body.tag,
                    game: body.game,
                    description: body.description,
                    logo_url: body.logo_url,
                    is_verified: false,
                })
                .returning(CompetitiveTeam::as_returning())
                .get_result(conn)?;

            diesel::insert_into(team_members::table)
                .values(&NewTeamMember {
                    team_id: team.id,
                    user_id: captain_id,
                    role: MEMBER_ROLE_CAPTAIN,
                    is_verified: true,
                })
                .execute(conn)?;

            let is_verified = team_verification::recompute_team(conn, team.id)?;
            Ok(CompetitiveTeam { is_verified, ..team })
        })
    })
    .await?;

    tracing::info!(team_id = %team.id, %captain_id, game = %team.game, "competitive team created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(team))))
}

/// Visible to the captain and to members of the team.
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<MemberView>>>> {
    let user_id = user.id;
    let members = db::run(&state.db, move |conn| {
        find_team(conn, team_id)?;

        let members: Vec<TeamMember> = team_members::table
            .filter(team_members::team_id.eq(team_id))
            .order(team_members::joined_at.asc())
            .select(TeamMember::as_select())
            .load(conn)?;
        if !members.iter().any(|m| m.user_id == user_id) {
            return Err(AppError::forbidden("Not a member of this team"));
        }

        let user_ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let profiles: HashMap<Uuid, Profile> = profiles::table
            .filter(profiles::user_id.eq_any(&user_ids))
            .select(Profile::as_select())
            .load(conn)?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(members
            .into_iter()
            .map(|member| {
                let profile = profiles.get(&member.user_id);
                MemberView {
                    full_name: profile.and_then(|p| p.full_name.clone()),
                    profile_verified: profile.map(|p| p.is_verified).unwrap_or(false),
                    member,
                }
            })
            .collect())
    })
    .await?;

    Ok(Json(ApiResponse::ok(members)))
}

pub async fn invite_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(team_id): Path<Uuid>,
    Json(body): Json<InviteRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TeamInvitation>>)> {
    let body = InviteRequest { email: body.email.trim().to_lowercase() };
    body.validate()?;

    let captain_id = user.id;
    let ttl = Duration::days(state.config.invitation_ttl_days);
    let invitation = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            captained_team(conn, team_id, captain_id)?;

            let invited_user_id: Option<Uuid> = profiles::table
                .filter(profiles::email.eq(&body.email))
                .select(profiles::user_id)
                .first(conn)
                .optional()?;

            if let Some(invitee) = invited_user_id {
                let already: i64 = team_members::table
                    .filter(team_members::team_id.eq(team_id))
                    .filter(team_members::user_id.eq(invitee))
                    .count()
                    .get_result(conn)?;
                if already > 0 {
                    return Err(AppError::new(ErrorCode::AlreadyTeamMember, "User is already on this team"));
                }
            }

            let pending: i64 = team_invitations::table
                .filter(team_invitations::team_id.eq(team_id))
                .filter(team_invitations::invited_user_email.eq(&body.email))
                .filter(team_invitations::status.eq("pending"))
                .count()
                .get_result(conn)?;
            if pending > 0 {
                return Err(AppError::new(
                    ErrorCode::InvitationAlreadyPending,
                    "Invitation already sent to this email",
                ));
            }

            Ok(diesel::insert_into(team_invitations::table)
                .values(&NewTeamInvitation {
                    team_id,
                    invited_by: captain_id,
                    invited_user_email: body.email,
                    invited_user_id,
                    expires_at: Utc::now() + ttl,
                })
                .returning(TeamInvitation::as_returning())
                .get_result(conn)?)
        })
    })
    .await?;

    tracing::info!(invitation_id = %invitation.id, %team_id, "team invitation sent");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(invitation, "Invitation sent!"))))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let captain_id = user.id;
    let team_verified = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            captained_team(conn, team_id, captain_id)?;

            let member: TeamMember = team_members::table
                .find(member_id)
                .filter(team_members::team_id.eq(team_id))
                .select(TeamMember::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::MemberNotFound, "Member not found"))?;
            if member.role == MEMBER_ROLE_CAPTAIN {
                return Err(AppError::new(ErrorCode::CannotRemoveCaptain, "The captain cannot be removed"));
            }

            diesel::delete(team_members::table.find(member_id)).execute(conn)?;
            team_verification::recompute_team(conn, team_id)
        })
    })
    .await?;

    tracing::info!(%team_id, %member_id, team_verified, "team member removed");
    Ok(Json(ApiResponse::ok_with_message((), "Member removed")))
}

fn find_team(conn: &mut PgConnection, team_id: Uuid) -> AppResult<CompetitiveTeam> {
    teams_competitive::table
        .find(team_id)
        .select(CompetitiveTeam::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::TeamNotFound, "Team not found"))
}

fn captained_team(conn: &mut PgConnection, team_id: Uuid, user_id: Uuid) -> AppResult<CompetitiveTeam> {
    let team = find_team(conn, team_id)?;
    if team.captain_id != user_id {
        return Err(AppError::new(ErrorCode::NotTeamCaptain, "Only the captain can manage this team"));
    }
    Ok(team)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_form_limits() {
        let form = CreateTeamRequest {
            name: "Night Owls".into(),
            tag: "NO".into(),
            game: "Valorant".into(),
            description: None,
            logo_url: Some("https://cdn.clutch.gg/owls.png".into()),
        };
        assert!(form.validate().is_ok());

        let short = CreateTeamRequest { name: "NO".into(), tag: "N".into(), ..form };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("tag"));
    }

    #[test]
    fn invite_requires_email() {
        assert!(InviteRequest { email: "mate@clutch.gg".into() }.validate().is_ok());
        assert!(InviteRequest { email: "mate".into() }.validate().is_err());
    }
}
