use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use clutch_shared::errors::{AppError, ErrorCode};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) || !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "password must contain letters and numbers",
        ));
    }
    Ok(())
}

/// Emails are stored and looked up lowercased and trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter22x").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22x", &hash).unwrap());
        assert!(!verify_password("hunter23x", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_internal_error() {
        let err = verify_password("whatever1", "not-a-hash").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("gg-wp-2024").is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Captain@Clutch.GG "), "captain@clutch.gg");
    }
}
