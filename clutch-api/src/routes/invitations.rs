use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::AuthUser;
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::models::{CompetitiveTeam, NewTeamMember, TeamInvitation, MEMBER_ROLE_MEMBER};
use crate::schema::{profiles, team_invitations, team_members, teams_competitive};
use crate::services::team_verification;
use crate::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationResponse {
    Accept,
    Decline,
}

impl InvitationResponse {
    fn status(self) -> &'static str {
        match self {
            InvitationResponse::Accept => "accepted",
            InvitationResponse::Decline => "declined",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub response: InvitationResponse,
}

#[derive(Debug, Serialize)]
pub struct InvitationView {
    #[serde(flatten)]
    pub invitation: TeamInvitation,
    pub team_name: String,
    pub team_tag: String,
    pub game: String,
}

/// Pending, unexpired invitations addressed to the caller.
pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<InvitationView>>>> {
    let (user_id, email) = (user.id, user.email.to_lowercase());
    let rows = db::run(&state.db, move |conn| {
        let rows: Vec<(TeamInvitation, CompetitiveTeam)> = team_invitations::table
            .inner_join(teams_competitive::table)
            .filter(
                team_invitations::invited_user_email
                    .eq(email)
                    .or(team_invitations::invited_user_id.eq(user_id)),
            )
            .filter(team_invitations::status.eq("pending"))
            .filter(team_invitations::expires_at.gt(Utc::now()))
            .order(team_invitations::created_at.desc())
            .select((TeamInvitation::as_select(), CompetitiveTeam::as_select()))
            .load(conn)?;

        Ok(rows
            .into_iter()
            .map(|(invitation, team)| InvitationView {
                invitation,
                team_name: team.name,
                team_tag: team.tag,
                game: team.game,
            })
            .collect())
    })
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

/// Accepting joins the team with the caller's current profile
/// verification and recomputes the team flag.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(invitation_id): Path<Uuid>,
    Json(body): Json<RespondRequest>,
) -> AppResult<Json<ApiResponse<TeamInvitation>>> {
    let (user_id, email) = (user.id, user.email.to_lowercase());
    let response = body.response;

    let invitation = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let invitation: TeamInvitation = team_invitations::table
                .find(invitation_id)
                .select(TeamInvitation::as_select())
                .first(conn)
                .optional()?
                .filter(|i| i.invited_user_email == email || i.invited_user_id == Some(user_id))
                .ok_or_else(|| AppError::new(ErrorCode::InvitationNotFound, "Invitation not found"))?;

            if invitation.status != "pending" {
                return Err(AppError::conflict(format!("Invitation already {}", invitation.status)));
            }
            if invitation.expires_at <= Utc::now() {
                return Err(AppError::new(ErrorCode::InvitationExpired, "Invitation has expired"));
            }

            let updated: TeamInvitation = diesel::update(
                team_invitations::table
                    .find(invitation_id)
                    .filter(team_invitations::status.eq("pending")),
            )
            .set((
                team_invitations::status.eq(response.status()),
                team_invitations::invited_user_id.eq(Some(user_id)),
                team_invitations::responded_at.eq(Some(Utc::now())),
            ))
            .returning(TeamInvitation::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::conflict("Invitation was answered concurrently"))?;

            if let InvitationResponse::Accept = response {
                let member_count: i64 = team_members::table
                    .filter(team_members::team_id.eq(updated.team_id))
                    .filter(team_members::user_id.eq(user_id))
                    .count()
                    .get_result(conn)?;
                if member_count > 0 {
                    return Err(AppError::new(ErrorCode::AlreadyTeamMember, "Already a member of this team"));
                }

                let profile_verified: bool = profiles::table
                    .filter(profiles::user_id.eq(user_id))
                    .select(profiles::is_verified)
                    .first(conn)
                    .optional()?
                    .unwrap_or(false);

                diesel::insert_into(team_members::table)
                    .values(&NewTeamMember {
                        team_id: updated.team_id,
                        user_id,
                        role: MEMBER_ROLE_MEMBER,
                        is_verified: profile_verified,
                    })
                    .execute(conn)?;
                team_verification::recompute_team(conn, updated.team_id)?;
            }

            Ok(updated)
        })
    })
    .await?;

    tracing::info!(%invitation_id, %user_id, status = %invitation.status, "invitation answered");
    Ok(Json(ApiResponse::ok(invitation)))
}
