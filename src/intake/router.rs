//! Per-message pipeline: filter, then dispatch, then a single disposition.

use std::sync::Arc;

use tracing::{error, warn};

use crate::intake::dispatcher::Dispatch;
use crate::intake::filter::IntakeFilter;
use crate::intake::types::{Disposition, InboundEmailMessage, Rejection, Verdict};

/// Reject reason when dispatch is not configured.
pub const CONFIG_ERROR_REASON: &str = "Internal Configuration Error";
/// Reject reason when the action processor fails.
pub const TRANSIENT_ERROR_REASON: &str = "Temporary System Error";

/// Composes the intake filter with a dispatcher.
#[derive(Clone)]
pub struct EmailRouter {
    filter: Arc<IntakeFilter>,
    dispatcher: Arc<dyn Dispatch>,
}

impl EmailRouter {
    pub fn new(filter: IntakeFilter, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            filter: Arc::new(filter),
            dispatcher,
        }
    }

    /// Route one message to its terminal disposition. Never fails.
    pub async fn handle(&self, message: &InboundEmailMessage) -> Disposition {
        match self.filter.classify(message) {
            Verdict::Reject { reason } => Disposition::Reject(Rejection::permanent(reason)),
            Verdict::SilentDrop { .. } => Disposition::SilentDrop,
            Verdict::Accept => {
                let payload = message.forward_payload();
                match self.dispatcher.dispatch(&payload).await {
                    Ok(()) => Disposition::Accept,
                    Err(e) if e.is_config() => {
                        error!(error = %e, "Email dispatch is not configured; rejecting message");
                        Disposition::Reject(Rejection::temporary(CONFIG_ERROR_REASON))
                    }
                    Err(e) => {
                        warn!(sender = %message.from, error = %e, "Failed to process email");
                        Disposition::Reject(Rejection::temporary(TRANSIENT_ERROR_REASON))
                    }
                }
            }
        }
    }
}
