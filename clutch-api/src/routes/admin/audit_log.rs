use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use clutch_shared::errors::{AppError, AppResult};
use clutch_shared::types::pagination::{Paginated, PaginationParams};
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::gate::StaffUser;
use crate::models::AdminAction;
use crate::schema::admin_actions;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub admin_id: Option<Uuid>,
    pub action: Option<String>,
    pub target_id: Option<Uuid>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 50 }

impl AuditFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Newest first.
pub async fn list_actions(
    State(state): State<Arc<AppState>>,
    _admin: StaffUser,
    Query(params): Query<AuditFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminAction>>>> {
    let pagination = params.pagination();
    let (offset, limit) = (pagination.offset(), pagination.limit());
    let AuditFilterParams { admin_id, action, target_id, .. } = params;

    let (items, total) = db::run(&state.db, move |conn| {
        let filtered = || {
            let mut query = admin_actions::table.into_boxed();
            if let Some(admin_id) = admin_id {
                query = query.filter(admin_actions::admin_id.eq(admin_id));
            }
            if let Some(action) = &action {
                query = query.filter(admin_actions::action.eq(action.clone()));
            }
            if let Some(target_id) = target_id {
                query = query.filter(admin_actions::target_id.eq(target_id));
            }
            query
        };

        let items = filtered()
            .order(admin_actions::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(AdminAction::as_select())
            .load(conn)?;
        let total: i64 = filtered().count().get_result(conn)?;
        Ok::<_, AppError>((items, total))
    })
    .await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total, &pagination))))
}
