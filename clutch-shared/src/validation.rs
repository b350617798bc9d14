//! Field validators shared by request bodies, used through
//! `#[validate(custom = "...")]`.

use std::borrow::Cow;

use validator::ValidationError;

pub const MAX_URL_LEN: usize = 500;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Only absolute `http`/`https` URLs up to 500 characters are accepted.
pub fn http_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.len() > MAX_URL_LEN {
        return Err(error("url_too_long", "URL too long"));
    }
    let lower = value.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(|| error("url_scheme", "Only HTTP/HTTPS URLs are allowed"))?;
    if rest.is_empty() || rest.starts_with('/') || !validator::validate_url(value) {
        return Err(error("url_invalid", "Only HTTP/HTTPS URLs are allowed"));
    }
    Ok(())
}

/// Rejects values that are empty after trimming.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "value must not be blank"));
    }
    Ok(())
}

/// Trim an optional form field; blank strings collapse to `None`.
pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(http_url("https://cdn.clutch.gg/logo.png").is_ok());
        assert!(http_url("http://example.com").is_ok());
        assert!(http_url("HTTPS://Example.com/a").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(http_url("javascript:alert(1)").is_err());
        assert!(http_url("ftp://files.example.com").is_err());
        assert!(http_url("data:image/png;base64,AAAA").is_err());
        assert!(http_url("https://").is_err());
    }

    #[test]
    fn rejects_overlong_urls() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        assert_eq!(http_url(&url).unwrap_err().code, "url_too_long");
    }

    #[test]
    fn normalize_collapses_blank() {
        assert_eq!(normalize(Some("   ".into())), None);
        assert_eq!(normalize(Some(" Valorant ".into())), Some("Valorant".into()));
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn not_blank_rejects_whitespace() {
        assert!(not_blank(" \t").is_err());
        assert!(not_blank("x").is_ok());
    }
}
