//! Session token verification.
//!
//! Sign-in happens in a separate identity service. Requests reach the
//! diary carrying an HS256 token signed with the shared secret, and the
//! `sub` claim is the stable user identifier.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UserId;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user identifier.
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Returns the user the token was issued for.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

/// Errors that can occur while handling session tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is malformed, has a bad signature, or names no user.
    #[error("invalid token")]
    Invalid,

    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Verifies (and, for tooling, issues) session tokens.
#[derive(Clone)]
pub struct SessionVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish_non_exhaustive()
    }
}

impl SessionVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validates a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })?;

        if claims.sub.trim().is_empty() {
            return Err(SessionError::Invalid);
        }
        Ok(claims)
    }

    /// Issues a token for `user_id` that expires after `ttl`.
    pub fn issue(&self, user_id: &UserId, ttl: Duration) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Encoding(e.to_string()))
    }
}
