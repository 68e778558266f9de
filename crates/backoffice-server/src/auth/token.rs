//! HS384 access tokens.
//!
//! Claims carry the platform id as a string `uid` plus `iat`/`exp`. A token
//! that is still valid but expires within the renew window is replaced by
//! the auth middleware, which returns the new one in `X-Renewed-Token`.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {message}")]
    Invalid { message: String },

    #[error("Token encoding error: {message}")]
    Encoding { message: String },
}

impl TokenError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::invalid(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<u64, TokenError> {
        match self.uid.parse::<u64>() {
            Ok(id) if id != 0 => Ok(id),
            _ => Err(TokenError::invalid(format!("bad uid claim '{}'", self.uid))),
        }
    }
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    renew_window: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("renew_window", &self.renew_window)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration, renew_window: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            renew_window,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a fresh token for `uid`.
    pub fn issue(&self, uid: u64) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(&Claims {
            uid: uid.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS384), claims, &self.encoding_key)
            .map_err(|e| TokenError::encoding(e.to_string()))
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS384);
        validation.leeway = 0;
        validation.validate_aud = false;
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    /// Whether `claims` expire within the renew window.
    pub fn needs_renewal(&self, claims: &Claims) -> bool {
        let window = i64::try_from(self.renew_window.as_secs()).unwrap_or(i64::MAX);
        claims.exp.saturating_sub(Utc::now().timestamp()) < window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "0123456789abcdef0123",
            Duration::from_secs(7200),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn issue_then_verify() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp - claims.iat, 7200);
        assert!(!tokens.needs_renewal(&claims));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens
            .sign(&Claims {
                uid: "1".into(),
                iat: now - 8000,
                exp: now - 100,
            })
            .unwrap();
        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service().issue(1).unwrap();
        let other = TokenService::new(
            "another-secret-0000000",
            Duration::from_secs(7200),
            Duration::from_secs(600),
        );
        assert!(matches!(
            other.verify(&token).unwrap_err(),
            TokenError::Invalid { .. }
        ));
    }

    #[test]
    fn near_expiry_needs_renewal() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            uid: "1".into(),
            iat: now - 7000,
            exp: now + 200,
        };
        assert!(tokens.needs_renewal(&claims));
    }

    #[test]
    fn bad_uid_claim() {
        let claims = Claims {
            uid: "abc".into(),
            iat: 0,
            exp: 0,
        };
        assert!(claims.user_id().is_err());
    }
}
