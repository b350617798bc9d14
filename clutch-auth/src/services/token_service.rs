use uuid::Uuid;

use clutch_shared::errors::AppError;
use clutch_shared::middleware::encode_token;
use clutch_shared::types::auth::Claims;

pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    encode_token(&Claims::new(user_id, email, ttl_secs), secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clutch_shared::middleware::decode_token;

    #[test]
    fn token_carries_identity() {
        let user_id = Uuid::now_v7();
        let token = create_access_token(user_id, "p1@clutch.gg", "secret", 604_800).unwrap();
        let claims = decode_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "p1@clutch.gg");
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn foreign_secret_rejected() {
        let token = create_access_token(Uuid::now_v7(), "p1@clutch.gg", "a", 60).unwrap();
        assert!(decode_token(&token, "b").is_err());
    }
}
