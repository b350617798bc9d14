use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use clutch_shared::errors::AppResult;
use clutch_shared::types::ApiResponse;

use crate::db;
use crate::models::Partner;
use crate::schema::partners;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PartnerFilter {
    pub partner_type: Option<String>,
}

pub async fn list_partners(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PartnerFilter>,
) -> AppResult<Json<ApiResponse<Vec<Partner>>>> {
    let rows = db::run(&state.db, move |conn| {
        let mut query = partners::table.into_boxed();
        if let Some(kind) = filter.partner_type {
            query = query.filter(partners::partner_type.eq(kind));
        }
        Ok(query
            .order(partners::created_at.asc())
            .select(Partner::as_select())
            .load(conn)?)
    })
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}
