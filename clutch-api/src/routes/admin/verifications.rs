use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::gate::StaffUser;
use crate::models::Profile;
use crate::schema::profiles;
use crate::services::{audit, team_verification};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

#[derive(Debug, Deserialize)]
pub struct VerificationFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<VerificationStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 50 }

impl VerificationFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub status: VerificationStatus,
}

#[derive(Debug, Serialize)]
pub struct VerificationOutcome {
    pub profile: Profile,
    /// Competitive teams whose verification was recomputed.
    pub affected_teams: Vec<Uuid>,
}

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    _admin: StaffUser,
    Query(params): Query<VerificationFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Profile>>>> {
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());
    let status = params.status;

    let (items, total) = db::run(&state.db, move |conn| {
        let filtered = || {
            let mut query = profiles::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(profiles::verification_status.eq(status.as_str()));
            }
            query
        };

        let items = filtered()
            .order(profiles::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(Profile::as_select())
            .load(conn)?;
        let total: i64 = filtered().count().get_result(conn)?;
        Ok::<_, AppError>((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}

/// Set a user's verification. `pending` revokes an earlier decision. Team
/// flags follow in the same transaction.
pub async fn set_verification(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<VerificationRequest>,
) -> AppResult<Json<ApiResponse<VerificationOutcome>>> {
    let admin_id = admin.0.id;
    let status = body.status;
    let decided_at = match status {
        VerificationStatus::Pending => None,
        _ => Some(Utc::now()),
    };

    let outcome = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let profile: Profile = diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
                .set((
                    profiles::is_verified.eq(status.is_verified()),
                    profiles::verification_status.eq(status.as_str()),
                    profiles::verification_date.eq(decided_at),
                    profiles::updated_at.eq(Utc::now()),
                ))
                .returning(Profile::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "Profile not found"))?;

            let affected_teams = team_verification::sync_member(conn, user_id, status.is_verified())?;

            audit::record(
                conn,
                admin_id,
                "set_verification",
                Some(user_id),
                serde_json::json!({ "status": status.as_str(), "teams": affected_teams }),
            )?;
            Ok(VerificationOutcome { profile, affected_teams })
        })
    })
    .await?;

    tracing::info!(
        %user_id,
        %admin_id,
        status = status.as_str(),
        teams = outcome.affected_teams.len(),
        "verification updated"
    );
    Ok(Json(ApiResponse::ok(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_verified_sets_the_flag() {
        assert!(VerificationStatus::Verified.is_verified());
        assert!(!VerificationStatus::Rejected.is_verified());
        assert!(!VerificationStatus::Pending.is_verified());
    }

    #[test]
    fn request_parses_lowercase_status() {
        let req: VerificationRequest = serde_json::from_str(r#"{"status":"rejected"}"#).unwrap();
        assert_eq!(req.status, VerificationStatus::Rejected);
        assert!(serde_json::from_str::<VerificationRequest>(r#"{"status":"Verified"}"#).is_err());
    }
}
