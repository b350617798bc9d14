use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile and role errors
/// - E3xxx: Tournament and registration errors
/// - E4xxx: Competitive team errors
/// - E5xxx: Site content errors (roster, partners, recruitment, contact)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,
    Conflict,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    MissingToken,
    UserNotFound,

    // Profile / roles (E2xxx)
    ProfileNotFound,
    RoleAlreadyAssigned,
    RoleNotAssigned,

    // Tournaments / registrations (E3xxx)
    TournamentNotFound,
    RegistrationNotFound,
    NotEligible,
    AlreadyRegistered,
    InvalidTransition,
    TeamSelectionRequired,
    NotRegistrant,

    // Competitive teams (E4xxx)
    TeamNotFound,
    MemberNotFound,
    NotTeamCaptain,
    InvitationNotFound,
    InvitationAlreadyPending,
    InvitationExpired,
    AlreadyTeamMember,
    CannotRemoveCaptain,

    // Site content (E5xxx)
    RosterTeamNotFound,
    PlayerNotFound,
    PartnerNotFound,
    ApplicationNotFound,
    ContactRateLimited,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::Conflict => "E0009",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::MissingToken => "E1005",
            Self::UserNotFound => "E1006",

            // Profile / roles
            Self::ProfileNotFound => "E2001",
            Self::RoleAlreadyAssigned => "E2002",
            Self::RoleNotAssigned => "E2003",

            // Tournaments / registrations
            Self::TournamentNotFound => "E3001",
            Self::RegistrationNotFound => "E3002",
            Self::NotEligible => "E3003",
            Self::AlreadyRegistered => "E3004",
            Self::InvalidTransition => "E3005",
            Self::TeamSelectionRequired => "E3006",
            Self::NotRegistrant => "E3007",

            // Competitive teams
            Self::TeamNotFound => "E4001",
            Self::MemberNotFound => "E4002",
            Self::NotTeamCaptain => "E4003",
            Self::InvitationNotFound => "E4004",
            Self::InvitationAlreadyPending => "E4005",
            Self::InvitationExpired => "E4006",
            Self::AlreadyTeamMember => "E4007",
            Self::CannotRemoveCaptain => "E4008",

            // Site content
            Self::RosterTeamNotFound => "E5001",
            Self::PlayerNotFound => "E5002",
            Self::PartnerNotFound => "E5003",
            Self::ApplicationNotFound => "E5004",
            Self::ContactRateLimited => "E5005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::TeamSelectionRequired => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::ProfileNotFound | Self::RoleNotAssigned
            | Self::TournamentNotFound | Self::RegistrationNotFound | Self::TeamNotFound
            | Self::MemberNotFound | Self::InvitationNotFound | Self::RosterTeamNotFound
            | Self::PlayerNotFound | Self::PartnerNotFound | Self::ApplicationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::TokenInvalid | Self::TokenExpired | Self::NotEligible
            | Self::NotRegistrant | Self::NotTeamCaptain | Self::CannotRemoveCaptain => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::ContactRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict | Self::EmailAlreadyExists | Self::RoleAlreadyAssigned
            | Self::AlreadyRegistered | Self::InvalidTransition | Self::InvitationAlreadyPending
            | Self::AlreadyTeamMember => StatusCode::CONFLICT,
            Self::InvitationExpired => StatusCode::GONE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code carried by this error, as rendered in the response body.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                ErrorCode::Conflict
            }
            AppError::Database(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

/// Field-level validation failures. The first message becomes the headline,
/// every field's messages go into `details`.
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = serde_json::Map::new();
        let mut headline = None;

        for (field, errs) in errors.field_errors() {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
                .collect();
            if headline.is_none() {
                headline = messages.first().cloned();
            }
            fields.insert(field.to_string(), serde_json::json!(messages));
        }

        AppError::with_details(
            ErrorCode::ValidationError,
            headline.unwrap_or_else(|| "validation failed".to_string()),
            serde_json::Value::Object(fields),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => match err {
                diesel::result::Error::NotFound => (
                    StatusCode::NOT_FOUND,
                    ApiErrorResponse::new("E0003", "resource not found"),
                ),
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                    tracing::warn!(constraint = ?info.constraint_name(), "unique violation");
                    (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new("E0009", info.message()),
                    )
                }
                _ => {
                    tracing::error!(error = %err, "database error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    )
                }
            },
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let (status, json) = body_json(AppError::new(
            ErrorCode::InvalidTransition,
            "registration is already approved",
        ))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "E3005");
        assert_eq!(json["error"]["message"], "registration is already approved");
    }

    #[tokio::test]
    async fn diesel_not_found_is_404() {
        let (status, json) = body_json(AppError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "E0003");
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let (status, json) = body_json(AppError::Internal(anyhow::anyhow!("pool exhausted"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn validation_errors_are_field_level() {
        let form = Form { name: String::new() };
        let err = AppError::from(form.validate().unwrap_err());
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "name is required");
        assert_eq!(json["error"]["details"]["name"][0], "name is required");
    }

    #[test]
    fn auth_failures_split_401_and_403() {
        assert_eq!(ErrorCode::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::TokenInvalid.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
    }
}
