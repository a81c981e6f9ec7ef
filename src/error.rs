//! Error types for mailgate.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures while forwarding an accepted message to the action processor.
///
/// `MissingConfig` is a deployment defect; every other variant is transient
/// from the mail transport's point of view.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Missing dispatch configuration: {key}")]
    MissingConfig { key: &'static str },

    #[error("Action processor returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Action processor request failed: {0}")]
    Transport(String),

    #[error("Action processor did not respond within {0:?}")]
    Timeout(Duration),
}

impl DispatchError {
    /// Whether this failure comes from local configuration rather than the downstream call.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingConfig { .. })
    }
}

/// Action-token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Signing secret is not configured")]
    SecretNotConfigured,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("The token signature is invalid")]
    InvalidSignature,

    #[error("The token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },
}

/// Raw message header extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Message has no parseable header block")]
    NoHeaders,
}
