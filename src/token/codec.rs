//! HS256 action-token verification.
//!
//! Tokens are compact JWS (`header.payload.signature`) signed with
//! HMAC-SHA-256 under a shared secret. The library checks structure and
//! signature; expiry is checked here so the rule stays explicit:
//! a token is rejected iff its signature is invalid or `now >= exp + leeway`.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Which mailings an unsubscribe token covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Reminder,
    All,
}

/// Account identifier carried in a token. Issued as a string (UUID) in
/// practice; numeric ids are accepted and echoed back as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Verified claims of an action token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTokenPayload {
    pub user_id: UserId,
    pub email: String,
    #[serde(rename = "type")]
    pub scope: TokenScope,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Verifies action tokens. Holds no key material.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    leeway_secs: u64,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            leeway_secs,
            validation,
        }
    }

    /// Verify `token` against `secret` at the current time.
    pub fn verify(
        &self,
        token: &str,
        secret: &SecretString,
    ) -> Result<ActionTokenPayload, TokenError> {
        self.verify_at(token, secret, Utc::now().timestamp())
    }

    /// Verify `token` against `secret` as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        token: &str,
        secret: &SecretString,
        now: i64,
    ) -> Result<ActionTokenPayload, TokenError> {
        let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
        let payload = decode::<ActionTokenPayload>(token, &key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(claim) => {
                    TokenError::Malformed(format!("missing required claim `{claim}`"))
                }
                _ => TokenError::Malformed(e.to_string()),
            })?
            .claims;

        let deadline = payload
            .exp
            .saturating_add(i64::try_from(self.leeway_secs).unwrap_or(i64::MAX));
        if now >= deadline {
            return Err(TokenError::Expired {
                exp: payload.exp,
                now,
            });
        }

        Ok(payload)
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new(0)
    }
}
