//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs whose subject is the user id. The role claim is
//! informational only: request guards re-read the stored role.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use freshmart_core::{UserId, UserRole};

use crate::config::JwtConfig;

/// Errors raised while issuing or checking a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    /// Bad signature, malformed token or expired.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// The subject is not a user id.
    #[error("invalid token subject: {0}")]
    Subject(String),
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a decimal string.
    pub sub: String,
    pub role: UserRole,
    /// Expiration (Unix timestamp seconds)
    pub exp: i64,
    /// Issued at (Unix timestamp seconds)
    pub iat: i64,
}

impl Claims {
    /// The user the token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Subject` if `sub` is not an id.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Subject(self.sub.clone()))
    }
}

/// Signs and verifies bearer tokens with the configured secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::days(config.expiration_days),
        }
    }

    /// Issue a token for `user` valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue(
        &self,
        user: UserId,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.to_string(),
            role,
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(TokenError::Encode)
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any rejected token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(secret: &str, days: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from(secret.to_owned()),
            expiration_days: days,
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service("k3J9xP2mQ7vR4tY8wZ1aB5cD6eF0gH3j", 30);
        let token = tokens
            .issue(UserId::new(42), UserRole::Courier, Utc::now())
            .unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(42));
        assert_eq!(claims.role, UserRole::Courier);
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 60 * 60);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = service("k3J9xP2mQ7vR4tY8wZ1aB5cD6eF0gH3j", 30)
            .issue(UserId::new(1), UserRole::Admin, Utc::now())
            .unwrap();
        let other = service("Zq8Lw2Nx5Vb7Mc1Kd4Jf6Hg9Ps3Rt0Yu", 30);
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_rejects_expired_token() {
        let tokens = service("k3J9xP2mQ7vR4tY8wZ1aB5cD6eF0gH3j", 1);
        let token = tokens
            .issue(UserId::new(1), UserRole::Customer, Utc::now() - Duration::days(3))
            .unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        let tokens = service("k3J9xP2mQ7vR4tY8wZ1aB5cD6eF0gH3j", 30);
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }
}
