use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

/// Application state that knows the HS256 secret shared by clutch-auth and
/// clutch-api.
pub trait JwtSecret {
    fn jwt_secret(&self) -> &str;
}

impl<T: JwtSecret> JwtSecret for Arc<T> {
    fn jwt_secret(&self) -> &str {
        (**self).jwt_secret()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: JwtSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = decode_token(&token, state.jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::MissingToken, "missing token"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::MissingToken, "invalid authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::MissingToken, "authorization header must use Bearer scheme"))?;

    Ok(token.to_string())
}

/// Sign `claims` with HS256.
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

/// Verify signature and expiry, returning the inner claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, "invalid token"),
    })?;

    Ok(token_data.claims)
}

/// Optional auth extractor: anonymous visitors and bad tokens both yield `None`.
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: JwtSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    struct TestState;

    impl JwtSecret for TestState {
        fn jwt_secret(&self) -> &str {
            "test-secret"
        }
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(v) = value {
            builder = builder.header("Authorization", v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let user_id = Uuid::now_v7();
        let token = encode_token(&Claims::new(user_id, "cap@clutch.gg", 3600), "test-secret").unwrap();
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));

        let user = AuthUser::from_request_parts(&mut parts, &TestState).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "cap@clutch.gg");
    }

    #[tokio::test]
    async fn missing_header_is_missing_token() {
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &TestState).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingToken);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_token() {
        let token = encode_token(&Claims::new(Uuid::now_v7(), "x@clutch.gg", 3600), "other").unwrap();
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &TestState).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn optional_user_swallows_errors() {
        let mut parts = parts_with_auth(Some("Basic abc"));
        let OptionalAuthUser(user) = OptionalAuthUser::from_request_parts(&mut parts, &TestState)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_token(&Claims::new(Uuid::now_v7(), "x@clutch.gg", -3600), "s").unwrap();
        let err = decode_token(&token, "s").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }
}
