use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::gate::StaffUser;
use crate::models::RecruitmentApplication;
use crate::schema::recruitment_applications;
use crate::services::audit;
use crate::AppState;

/// Review states of a recruitment application. Staff may move between them
/// freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<ApplicationStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 50 }

impl ApplicationFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: ApplicationStatus,
}

pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    _admin: StaffUser,
    Query(params): Query<ApplicationFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<RecruitmentApplication>>>> {
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());
    let status = params.status;

    let (items, total) = db::run(&state.db, move |conn| {
        let filtered = || {
            let mut query = recruitment_applications::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(recruitment_applications::status.eq(status.as_str()));
            }
            query
        };

        let items = filtered()
            .order(recruitment_applications::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(RecruitmentApplication::as_select())
            .load(conn)?;
        let total: i64 = filtered().count().get_result(conn)?;
        Ok::<_, AppError>((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}

pub async fn update_application(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(application_id): Path<Uuid>,
    Json(body): Json<UpdateApplicationRequest>,
) -> AppResult<Json<ApiResponse<RecruitmentApplication>>> {
    let admin_id = admin.0.id;
    let status = body.status;

    let application = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let application: RecruitmentApplication =
                diesel::update(recruitment_applications::table.find(application_id))
                    .set((
                        recruitment_applications::status.eq(status.as_str()),
                        recruitment_applications::updated_at.eq(Utc::now()),
                    ))
                    .returning(RecruitmentApplication::as_returning())
                    .get_result(conn)
                    .optional()?
                    .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "update_application_status",
                Some(application_id),
                serde_json::json!({ "status": status.as_str(), "position": application.position }),
            )?;
            Ok(application)
        })
    })
    .await?;

    tracing::info!(%application_id, status = status.as_str(), "application status updated");
    Ok(Json(ApiResponse::ok(application)))
}

pub async fn delete_application(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let email: String = diesel::delete(recruitment_applications::table.find(application_id))
                .returning(recruitment_applications::email)
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "delete_application",
                Some(application_id),
                serde_json::json!({ "email": email }),
            )
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message((), "Application deleted")))
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::ApplicationNotFound, "Application not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values_are_closed() {
        let ok: UpdateApplicationRequest = serde_json::from_str(r#"{"status":"reviewing"}"#).unwrap();
        assert_eq!(ok.status, ApplicationStatus::Reviewing);
        assert_eq!(ok.status.as_str(), "reviewing");
        assert!(serde_json::from_str::<UpdateApplicationRequest>(r#"{"status":"hired"}"#).is_err());
    }
}
