//! Forwards accepted messages to the external action processor.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::intake::types::EmailForwardPayload;

/// Longest response body kept for logs on a failed dispatch.
const MAX_ERROR_BODY: usize = 512;

/// Something that can take an accepted message off our hands.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, payload: &EmailForwardPayload) -> Result<(), DispatchError>;
}

/// HTTP dispatcher: one authenticated POST per message, no retries.
pub struct ActionDispatcher {
    config: DispatchConfig,
    client: reqwest::Client,
}

impl ActionDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

/// Read at most `MAX_ERROR_BODY` bytes of a failed response.
async fn read_error_body(mut resp: reqwest::Response) -> String {
    let mut buf = Vec::with_capacity(MAX_ERROR_BODY);
    while buf.len() < MAX_ERROR_BODY {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(MAX_ERROR_BODY - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    // Drop a multi-byte character split by the cut.
    if let Err(e) = std::str::from_utf8(&buf) {
        if e.error_len().is_none() {
            buf.truncate(e.valid_up_to());
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl Dispatch for ActionDispatcher {
    async fn dispatch(&self, payload: &EmailForwardPayload) -> Result<(), DispatchError> {
        let Some(url) = self.config.endpoint_url.as_deref() else {
            return Err(DispatchError::MissingConfig {
                key: "ACTION_ENDPOINT_URL",
            });
        };
        let Some(secret) = self.config.secret.as_ref() else {
            return Err(DispatchError::MissingConfig {
                key: "ACTION_SECRET",
            });
        };

        let timeout = self.config.timeout;
        let resp = self
            .client
            .post(url)
            .bearer_auth(secret.expose_secret())
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(timeout)
                } else {
                    DispatchError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = read_error_body(resp).await;
            warn!(status = status.as_u16(), body = %body, "Action processor rejected dispatch");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(sender = %payload.from, "Dispatched inbound email to action processor");
        Ok(())
    }
}
