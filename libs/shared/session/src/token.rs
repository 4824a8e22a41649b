use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    #[serde(default, alias = "id", alias = "userId")]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Reads the claims of a JWT without verifying its signature. Signature
/// checks belong to the backend; the client only needs the expiry.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Failed to decode token claims: {}", e);
            return None;
        }
    };

    match serde_json::from_slice::<TokenClaims>(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Failed to parse token claims: {}", e);
            None
        }
    }
}

/// True only when the token is a JWT whose `exp` lies at or before `now`.
/// Opaque tokens are never considered expired here.
pub fn is_expired(token: &str, now_timestamp: i64) -> bool {
    match decode_claims(token).and_then(|claims| claims.exp) {
        Some(exp) => exp <= now_timestamp,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_expired_token() {
        let token = token_with(r#"{"sub":"u1","exp":1000}"#);
        assert!(is_expired(&token, 1000));
        assert!(is_expired(&token, 5000));
        assert!(!is_expired(&token, 999));
    }

    #[test]
    fn test_opaque_token_never_expires() {
        assert!(!is_expired("abcdef", i64::MAX));
        assert!(!is_expired(&token_with(r#"{"sub":"u1"}"#), i64::MAX));
    }

    #[test]
    fn test_claims_accept_id_alias() {
        let claims = decode_claims(&token_with(r#"{"id":"u9","role":"clinic"}"#)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u9"));
        assert_eq!(claims.role.as_deref(), Some("clinic"));
    }
}
