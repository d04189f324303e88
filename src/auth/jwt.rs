//! JWT issue and validation (HS256)

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;
use crate::types::VaultError;

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued-at, seconds since epoch.
    pub iat: u64,
    /// Expiry, seconds since epoch.
    pub exp: u64,
}

/// Signing and verification keys plus the configured token lifetime.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a token for a user. Returns the token and its expiry instant.
    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<(String, u64), VaultError> {
        let now = Utc::now().timestamp() as u64;
        let exp = now + self.expiry_seconds;

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| VaultError::Auth(format!("failed to sign token: {e}")))?;

        Ok((token, exp))
    }

    /// Validate a token, returning its claims. Expired or tampered tokens
    /// fail here.
    pub fn validate(&self, token: &str) -> Result<Claims, VaultError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| VaultError::Auth(format!("invalid token: {e}")))
    }
}

/// Pull the bearer token out of an `Authorization` header value.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", 3600)
    }

    #[test]
    fn test_issue_and_validate() {
        let keys = keys();
        let id = Uuid::new_v4();
        let (token, exp) = keys.issue(id, "ada@example.com", Role::User).unwrap();

        let claims = keys.validate(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = keys().issue(Uuid::new_v4(), "a@b.c", Role::Admin).unwrap();
        let other = JwtKeys::new("different-secret", 3600);
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(keys().validate("not.a.jwt").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
        assert_eq!(extract_bearer("Bearer "), None);
    }
}
