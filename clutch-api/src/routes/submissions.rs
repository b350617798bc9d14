use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use clutch_shared::errors::{AppError, AppResult, ErrorCode};
use clutch_shared::types::ApiResponse;
use clutch_shared::validation::{http_url, normalize, not_blank};

use crate::db;
use crate::models::{
    ContactSubmission, NewContactSubmission, NewRecruitmentApplication, RecruitmentApplication,
};
use crate::schema::{contact_submissions, recruitment_applications};
use crate::AppState;

pub const POSITIONS: [&str; 8] = [
    "Professional Player",
    "Content Creator",
    "Coach",
    "Analyst",
    "Manager",
    "Social Media Manager",
    "Video Editor",
    "Graphic Designer",
];

fn known_position(value: &str) -> Result<(), ValidationError> {
    if POSITIONS.contains(&value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("position");
        err.message = Some("Unknown position".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecruitmentRequest {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email address"), length(max = 255))]
    pub email: String,
    #[validate(custom = "known_position")]
    pub position: String,
    #[validate(length(max = 5000, message = "Cover letter too long"))]
    pub cover_letter: Option<String>,
    #[validate(custom = "http_url")]
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be less than 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"), length(max = 255))]
    pub email: String,
    #[validate(
        custom = "not_blank",
        length(max = 200, message = "Subject must be less than 200 characters")
    )]
    pub subject: String,
    #[validate(
        custom = "not_blank",
        length(max = 2000, message = "Message must be less than 2000 characters")
    )]
    pub message: String,
}

pub async fn apply(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecruitmentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RecruitmentApplication>>)> {
    let body = RecruitmentRequest {
        full_name: body.full_name.trim().to_string(),
        email: body.email.trim().to_lowercase(),
        position: body.position.trim().to_string(),
        cover_letter: normalize(body.cover_letter),
        resume_url: normalize(body.resume_url),
    };
    body.validate()?;

    let application = db::run(&state.db, move |conn| {
        Ok(diesel::insert_into(recruitment_applications::table)
            .values(&NewRecruitmentApplication {
                full_name: body.full_name,
                email: body.email,
                position: body.position,
                cover_letter: body.cover_letter,
                resume_url: body.resume_url,
            })
            .returning(RecruitmentApplication::as_returning())
            .get_result(conn)?)
    })
    .await?;

    tracing::info!(application_id = %application.id, position = %application.position, "recruitment application received");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            application,
            "Application submitted successfully! We'll review it and get back to you.",
        )),
    ))
}

impl ContactRequest {
    /// Trimmed fields and a lowercased email, the key the rate window uses.
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

/// One message per email address per rate window. Concurrent sends from
/// the same address queue on a transaction-scoped advisory lock, so only
/// the first of them sees an empty window.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContactRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContactSubmission>>)> {
    let body = body.normalized();
    body.validate()?;

    let window = Duration::seconds(state.config.contact_rate_window_secs);
    let submission = db::run(&state.db, move |conn| {
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind::<Text, _>(&body.email)
                .execute(conn)?;

            let recent: i64 = contact_submissions::table
                .filter(contact_submissions::email.eq(&body.email))
                .filter(contact_submissions::created_at.gt(Utc::now() - window))
                .count()
                .get_result(conn)?;
            if recent > 0 {
                return Err(AppError::new(
                    ErrorCode::ContactRateLimited,
                    "Please wait before sending another message",
                ));
            }

            Ok(diesel::insert_into(contact_submissions::table)
                .values(&NewContactSubmission {
                    name: body.name,
                    email: body.email,
                    subject: body.subject,
                    message: body.message,
                })
                .returning(ContactSubmission::as_returning())
                .get_result(conn)?)
        })
    })
    .await?;

    tracing::info!(submission_id = %submission.id, "contact message received");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(submission, "Message sent successfully!")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_form(email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: "Sam".into(),
            email: email.into(),
            subject: "Sponsorship".into(),
            message: message.into(),
        }
    }

    #[test]
    fn contact_form_rules() {
        assert!(contact_form("sam@clutch.gg", "Hello").validate().is_ok());
        assert!(contact_form("not-an-email", "Hello").validate().is_err());
        assert!(contact_form("sam@clutch.gg", "").validate().is_err());
        assert!(contact_form("sam@clutch.gg", &"x".repeat(2001)).validate().is_err());
    }

    #[test]
    fn contact_email_is_keyed_case_insensitively() {
        let a = contact_form("  Sam@Clutch.GG ", " Hello ").normalized();
        let b = contact_form("sam@clutch.gg", "Hello").normalized();
        assert_eq!(a.email, b.email);
        assert_eq!(a.message, "Hello");
    }

    #[test]
    fn recruitment_rejects_unknown_position_and_bad_resume() {
        let form = RecruitmentRequest {
            full_name: "Alex Doe".into(),
            email: "alex@clutch.gg".into(),
            position: "Coach".into(),
            cover_letter: None,
            resume_url: Some("https://cv.example.com/alex.pdf".into()),
        };
        assert!(form.validate().is_ok());

        let wrong_position = RecruitmentRequest { position: "Janitor".into(), ..form };
        let errors = wrong_position.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("position"));

        let bad_resume = RecruitmentRequest {
            position: "Coach".into(),
            resume_url: Some("javascript:alert(1)".into()),
            ..wrong_position
        };
        assert!(bad_resume.validate().is_err());
    }
}
