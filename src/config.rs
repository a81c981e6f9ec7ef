//! Configuration types.
//!
//! Every component receives its configuration explicitly at construction.
//! Only `main` reads the process environment, through [`Config::from_env`].

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default maximum accepted raw message size (256 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u64 = 256 * 1024;

/// Subject fragments that mark vacation replies and bounces.
pub const DEFAULT_BLOCKED_SUBJECTS: [&str; 3] = ["out of office", "automatic reply", "undelivered"];

/// Full service configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub dispatch: DispatchConfig,
    pub verifier: VerifierConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Upper bound on intake request bodies. Must exceed the filter's
    /// `max_message_size` so oversized mail still reaches the size guard.
    pub max_body_bytes: usize,
    /// Bearer token a mail relay must present on intake routes. Unset
    /// refuses every submission.
    pub intake_token: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024,
            intake_token: None,
        }
    }
}

/// Intake filter settings.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Messages strictly larger than this are rejected.
    pub max_message_size: u64,
    /// Lowercase subject substrings that cause a silent drop.
    pub blocked_subjects: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            blocked_subjects: DEFAULT_BLOCKED_SUBJECTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Outbound action processor settings.
///
/// Endpoint and secret are optional here on purpose: their absence is
/// reported per message as a configuration failure, not at startup.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub endpoint_url: Option<String>,
    pub secret: Option<SecretString>,
    /// Bound on the whole outbound request.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            secret: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Action-token verification settings.
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    /// HS256 signing key. `None` fails every verification request.
    pub signing_secret: Option<SecretString>,
    /// Seconds a token stays valid past its `exp`.
    pub leeway_secs: u64,
    /// Echo the underlying verification error to callers in `details`.
    pub expose_error_details: bool,
}

impl Config {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind: get("MAILGATE_BIND").unwrap_or(server_defaults.bind),
            port: parse_or(&get, "MAILGATE_PORT", server_defaults.port)?,
            max_body_bytes: parse_or(&get, "INTAKE_MAX_BODY_BYTES", server_defaults.max_body_bytes)?,
            intake_token: get("INTAKE_TOKEN").map(SecretString::from),
        };

        let blocked_subjects = match get("INTAKE_BLOCKED_SUBJECTS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => FilterConfig::default().blocked_subjects,
        };
        let filter = FilterConfig {
            max_message_size: parse_or(&get, "INTAKE_MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_SIZE)?,
            blocked_subjects,
        };

        let dispatch = DispatchConfig {
            endpoint_url: get("ACTION_ENDPOINT_URL"),
            secret: get("ACTION_SECRET").map(SecretString::from),
            timeout: Duration::from_secs(parse_or(&get, "ACTION_TIMEOUT_SECS", 10)?),
        };

        let verifier = VerifierConfig {
            signing_secret: get("JWT_SECRET").map(SecretString::from),
            leeway_secs: parse_or(&get, "TOKEN_LEEWAY_SECS", 0)?,
            expose_error_details: parse_or(&get, "TOKEN_EXPOSE_ERROR_DETAILS", false)?,
        };

        if server.max_body_bytes as u64 <= filter.max_message_size {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_MAX_BODY_BYTES".into(),
                message: format!(
                    "must be larger than INTAKE_MAX_MESSAGE_BYTES ({})",
                    filter.max_message_size
                ),
            });
        }

        Ok(Self {
            server,
            filter,
            dispatch,
            verifier,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
