use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::auth::Role;
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::gate::StaffUser;
use crate::models::{NewUserRole, Profile};
use crate::schema::{profiles, team_members, teams_competitive, user_roles, users};
use crate::services::{audit, team_verification};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct UserFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Case-insensitive substring of email or name.
    pub search: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 50 }

impl UserFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub profile: Option<Profile>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

// --- Handlers ---

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: StaffUser,
    Query(params): Query<UserFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<UserSummary>>>> {
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());
    let pattern = params
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s)));

    let (items, total) = db::run(&state.db, move |conn| {
        let filtered = || {
            let mut query = users::table.into_boxed();
            if let Some(pattern) = &pattern {
                query = query.filter(
                    users::email
                        .ilike(pattern.clone())
                        .or(users::name.ilike(pattern.clone())),
                );
            }
            query
        };

        let rows: Vec<(Uuid, String, String, DateTime<Utc>)> = filtered()
            .order(users::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select((users::id, users::name, users::email, users::created_at))
            .load(conn)?;
        let total: i64 = filtered().count().get_result(conn)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.0).collect();
        let mut profiles_by_user: HashMap<Uuid, Profile> = profiles::table
            .filter(profiles::user_id.eq_any(&ids))
            .select(Profile::as_select())
            .load(conn)?
            .into_iter()
            .map(|p: Profile| (p.user_id, p))
            .collect();

        let mut roles_by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
        let role_rows: Vec<(Uuid, String)> = user_roles::table
            .filter(user_roles::user_id.eq_any(&ids))
            .order(user_roles::created_at.asc())
            .select((user_roles::user_id, user_roles::role))
            .load(conn)?;
        for (user_id, label) in role_rows {
            let role = Role::from_str(&label).map_err(AppError::internal)?;
            roles_by_user.entry(user_id).or_default().push(role);
        }

        let items = rows
            .into_iter()
            .map(|(id, name, email, created_at)| UserSummary {
                profile: profiles_by_user.remove(&id),
                roles: roles_by_user.remove(&id).unwrap_or_default(),
                id,
                name,
                email,
                created_at,
            })
            .collect();

        Ok::<_, AppError>((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}

pub async fn add_role(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    let role = body.role;

    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            ensure_user_exists(conn, user_id)?;
            diesel::insert_into(user_roles::table)
                .values(&NewUserRole { user_id, role: role.as_str() })
                .execute(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => AppError::new(
                        ErrorCode::RoleAlreadyAssigned,
                        format!("User already has the {role} role"),
                    ),
                    other => AppError::Database(other),
                })?;
            audit::record(
                conn,
                admin_id,
                "add_role",
                Some(user_id),
                serde_json::json!({ "role": role.as_str() }),
            )
        })
    })
    .await?;

    tracing::info!(%user_id, %role, %admin_id, "role granted");
    Ok(Json(ApiResponse::ok_with_message((), "Role added")))
}

pub async fn remove_role(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let role = Role::from_str(&role).map_err(AppError::bad_request)?;
    let admin_id = admin.0.id;
    if user_id == admin_id && role == Role::Admin {
        return Err(AppError::forbidden("You cannot remove your own admin role"));
    }

    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let removed = diesel::delete(
                user_roles::table
                    .filter(user_roles::user_id.eq(user_id))
                    .filter(user_roles::role.eq(role.as_str())),
            )
            .execute(conn)?;
            if removed == 0 {
                return Err(AppError::new(
                    ErrorCode::RoleNotAssigned,
                    format!("User does not have the {role} role"),
                ));
            }
            audit::record(
                conn,
                admin_id,
                "remove_role",
                Some(user_id),
                serde_json::json!({ "role": role.as_str() }),
            )
        })
    })
    .await?;

    tracing::info!(%user_id, %role, %admin_id, "role revoked");
    Ok(Json(ApiResponse::ok_with_message((), "Role removed")))
}

/// Deleting a user cascades to their profile, roles, memberships and solo
/// registrations. Teams they captain go with them; other teams they sat on
/// are re-derived.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    if user_id == admin_id {
        return Err(AppError::forbidden("You cannot delete your own account"));
    }

    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let joined: Vec<Uuid> = team_members::table
                .filter(team_members::user_id.eq(user_id))
                .select(team_members::team_id)
                .load(conn)?;
            let email: String = diesel::delete(users::table.find(user_id))
                .returning(users::email)
                .get_result(conn)
                .optional()?
                .ok_or_else(user_not_found)?;
            let surviving: Vec<Uuid> = teams_competitive::table
                .filter(teams_competitive::id.eq_any(&joined))
                .select(teams_competitive::id)
                .load(conn)?;
            for team_id in surviving {
                team_verification::recompute_team(conn, team_id)?;
            }
            audit::record(
                conn,
                admin_id,
                "delete_user",
                Some(user_id),
                serde_json::json!({ "email": email }),
            )
        })
    })
    .await?;

    tracing::warn!(%user_id, %admin_id, "user deleted");
    Ok(Json(ApiResponse::ok_with_message((), "User deleted")))
}

// --- Helpers ---

fn ensure_user_exists(conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(users::table.find(user_id))).get_result(conn)?;
    if !exists {
        return Err(user_not_found());
    }
    Ok(())
}

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "User not found")
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn role_request_accepts_known_roles_only() {
        let req: RoleRequest = serde_json::from_str(r#"{"role":"moderator"}"#).unwrap();
        assert_eq!(req.role, Role::Moderator);
        assert!(serde_json::from_str::<RoleRequest>(r#"{"role":"owner"}"#).is_err());
    }
}
