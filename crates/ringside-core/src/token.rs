//! Bearer token inspection.
//!
//! Reads the `exp` claim out of a JWT-shaped token without verifying the
//! signature. The backend is the authority on validity; the client only needs
//! to know when to refresh ahead of expiry.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Tokens expiring within this many seconds are treated as already expired.
pub const EXPIRY_WINDOW_SECS: i64 = 300;

/// Claims this client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Subject (user ID), when the issuer includes it.
    #[serde(default)]
    pub sub: Option<String>,
    /// Issued at (unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Why a token could not be decoded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    Format,
    #[error("Failed to decode token payload: {0}")]
    Base64(String),
    #[error("Failed to parse token claims: {0}")]
    Claims(String),
}

/// Decode the payload segment of `token`.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Format);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))
}

/// Whether `token` is absent, undecodable, or expires within `window_secs`
/// of `now_secs`.
pub fn is_expired_at(token: Option<&str>, now_secs: i64, window_secs: i64) -> bool {
    let Some(token) = token else {
        return true;
    };
    match decode_claims(token) {
        Ok(claims) => claims.exp <= now_secs.saturating_add(window_secs),
        Err(_) => true,
    }
}

/// [`is_expired_at`] against the system clock and the default window.
pub fn is_expired(token: Option<&str>) -> bool {
    is_expired_at(token, now_secs(), EXPIRY_WINDOW_SECS)
}

/// Seconds until `token` expires, or `None` if it cannot be decoded.
/// Negative once the expiry has passed.
pub fn expires_in(token: &str, now_secs: i64) -> Option<i64> {
    decode_claims(token).ok().map(|c| c.exp - now_secs)
}

/// Current unix time in seconds.
pub fn now_secs() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    secs
}

/// Build an unsigned JWT-shaped token with the given expiry.
#[cfg(any(test, feature = "test-utils"))]
pub fn test_token(subject: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": subject, "exp": exp })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn expiry_inside_window_is_expired() {
        let token = test_token("u1", NOW + 200);
        assert!(is_expired_at(Some(&token), NOW, EXPIRY_WINDOW_SECS));
    }

    #[test]
    fn expiry_outside_window_is_fresh() {
        let token = test_token("u1", NOW + 400);
        assert!(!is_expired_at(Some(&token), NOW, EXPIRY_WINDOW_SECS));
    }

    #[test]
    fn expiry_exactly_at_window_edge_is_expired() {
        let token = test_token("u1", NOW + EXPIRY_WINDOW_SECS);
        assert!(is_expired_at(Some(&token), NOW, EXPIRY_WINDOW_SECS));
    }

    #[test]
    fn missing_and_garbage_tokens_are_expired() {
        assert!(is_expired_at(None, NOW, EXPIRY_WINDOW_SECS));
        assert!(is_expired_at(Some(""), NOW, EXPIRY_WINDOW_SECS));
        assert!(is_expired_at(Some("not-a-token"), NOW, EXPIRY_WINDOW_SECS));
        assert!(is_expired_at(Some("a.!!!.c"), NOW, EXPIRY_WINDOW_SECS));
        assert!(is_expired_at(Some("a.b.c.d"), NOW, EXPIRY_WINDOW_SECS));
    }

    #[test]
    fn payload_without_exp_is_expired() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"u1"}"#);
        let token = format!("h.{payload}.s");
        assert!(matches!(decode_claims(&token), Err(TokenError::Claims(_))));
        assert!(is_expired_at(Some(&token), NOW, EXPIRY_WINDOW_SECS));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(
            serde_json::json!({ "exp": NOW + 1000 }).to_string().as_bytes(),
        );
        let token = format!("h.{payload}.s");
        assert_eq!(decode_claims(&token).unwrap().exp, NOW + 1000);
    }

    #[test]
    fn decode_reads_subject() {
        let token = test_token("user_123", NOW);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user_123"));
        assert_eq!(claims.exp, NOW);
    }

    #[test]
    fn expires_in_counts_down() {
        let token = test_token("u1", NOW + 60);
        assert_eq!(expires_in(&token, NOW), Some(60));
        assert_eq!(expires_in(&token, NOW + 90), Some(-30));
        assert_eq!(expires_in("junk", NOW), None);
    }

    #[test]
    fn system_clock_variant_agrees() {
        let fresh = test_token("u1", now_secs() + 3600);
        let stale = test_token("u1", now_secs() + 10);
        assert!(!is_expired(Some(&fresh)));
        assert!(is_expired(Some(&stale)));
    }
}
