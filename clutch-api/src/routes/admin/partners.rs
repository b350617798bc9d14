use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::ApiResponse;
use clutch_shared::validation::{http_url, normalize, not_blank};

use crate::db;
use crate::gate::StaffUser;
use crate::models::{Partner, PartnerForm};
use crate::schema::partners;
use crate::services::audit;
use crate::AppState;

pub const PARTNER_TYPES: [&str; 4] = ["sponsor", "media", "technology", "community"];

fn known_partner_type(value: &str) -> Result<(), ValidationError> {
    if PARTNER_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_partner_type"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PartnerRequest {
    #[validate(custom = "not_blank", length(max = 100, message = "Name too long"))]
    pub name: String,
    #[serde(default = "default_partner_type")]
    #[validate(custom = "known_partner_type")]
    pub partner_type: String,
    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(custom = "http_url")]
    pub logo_url: Option<String>,
    #[validate(custom = "http_url")]
    pub website_url: Option<String>,
}

fn default_partner_type() -> String {
    PARTNER_TYPES[0].to_string()
}

impl PartnerRequest {
    fn into_form(self) -> PartnerForm {
        PartnerForm {
            name: self.name.trim().to_string(),
            partner_type: self.partner_type,
            description: normalize(self.description),
            logo_url: normalize(self.logo_url),
            website_url: normalize(self.website_url),
        }
    }
}

/// Blank URLs mean "none" and must not trip the URL check.
fn prepare(body: PartnerRequest) -> AppResult<PartnerForm> {
    let body = PartnerRequest {
        logo_url: normalize(body.logo_url),
        website_url: normalize(body.website_url),
        ..body
    };
    body.validate()?;
    Ok(body.into_form())
}

pub async fn create_partner(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Json(body): Json<PartnerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Partner>>)> {
    let form = prepare(body)?;
    let admin_id = admin.0.id;

    let partner = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let partner = diesel::insert_into(partners::table)
                .values(&form)
                .returning(Partner::as_returning())
                .get_result(conn)?;
            audit::record(
                conn,
                admin_id,
                "create_partner",
                Some(partner.id),
                serde_json::json!({ "name": partner.name, "partner_type": partner.partner_type }),
            )?;
            Ok(partner)
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(partner))))
}

pub async fn update_partner(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(partner_id): Path<Uuid>,
    Json(body): Json<PartnerRequest>,
) -> AppResult<Json<ApiResponse<Partner>>> {
    let form = prepare(body)?;
    let admin_id = admin.0.id;

    let partner = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let partner: Partner = diesel::update(partners::table.find(partner_id))
                .set((&form, partners::updated_at.eq(Utc::now())))
                .returning(Partner::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "update_partner",
                Some(partner_id),
                serde_json::json!({ "name": partner.name }),
            )?;
            Ok(partner)
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok(partner)))
}

pub async fn delete_partner(
    State(state): State<Arc<AppState>>,
    admin: StaffUser,
    Path(partner_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin_id = admin.0.id;
    db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            let name: String = diesel::delete(partners::table.find(partner_id))
                .returning(partners::name)
                .get_result(conn)
                .optional()?
                .ok_or_else(not_found)?;
            audit::record(
                conn,
                admin_id,
                "delete_partner",
                Some(partner_id),
                serde_json::json!({ "name": name }),
            )
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message((), "Partner deleted")))
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::PartnerNotFound, "Partner not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_type_defaults_to_sponsor() {
        let req: PartnerRequest = serde_json::from_value(serde_json::json!({ "name": "HyperX" })).unwrap();
        let form = prepare(req).unwrap();
        assert_eq!(form.partner_type, "sponsor");
        assert_eq!(form.website_url, None);
    }

    #[test]
    fn unknown_partner_type_is_rejected() {
        let req: PartnerRequest =
            serde_json::from_value(serde_json::json!({ "name": "HyperX", "partner_type": "casino" })).unwrap();
        assert!(prepare(req).is_err());
    }

    #[test]
    fn website_must_be_http() {
        let req: PartnerRequest = serde_json::from_value(serde_json::json!({
            "name": "HyperX",
            "website_url": "ftp://hyperx.example",
        }))
        .unwrap();
        assert!(prepare(req).is_err());
    }
}
