//! Intake filter: an ordered guard chain over message metadata.
//!
//! Guards run top to bottom and the first one that fires decides:
//! - oversized messages → Reject (the sender's system must learn about it)
//! - auto-response subjects → SilentDrop
//! - `Auto-Submitted` other than `no` → SilentDrop
//!
//! Anything that passes every guard is accepted. The decision depends on
//! the message alone, so identical input always yields the same verdict.

use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::intake::types::{InboundEmailMessage, Verdict};

/// Reject reason for messages over the size limit.
pub const TOO_LARGE_REASON: &str = "message too large";

/// What a guard inspects.
#[derive(Debug, Clone)]
pub enum GuardKind {
    /// Fires when `raw_size` exceeds the limit.
    MaxSize(u64),
    /// Fires when the lowercase subject contains any fragment.
    SubjectContains(Vec<String>),
    /// Fires when `Auto-Submitted` is present with a value other than `no`.
    AutoSubmitted,
}

/// How a guard disposes of a message it fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    Reject,
    Drop,
}

/// A single guard in the chain.
#[derive(Debug, Clone)]
pub struct Guard {
    /// Short name used in logs.
    pub name: &'static str,
    pub kind: GuardKind,
    pub action: GuardAction,
    /// Reason attached to the verdict.
    pub reason: String,
}

impl Guard {
    /// Return the matched detail when this guard fires.
    fn fires(&self, message: &InboundEmailMessage) -> Option<String> {
        match &self.kind {
            GuardKind::MaxSize(max) => {
                (message.raw_size > *max).then(|| format!("{} bytes > {}", message.raw_size, max))
            }
            GuardKind::SubjectContains(fragments) => {
                let subject = message.subject.to_lowercase();
                fragments
                    .iter()
                    .find(|f| subject.contains(f.as_str()))
                    .cloned()
            }
            GuardKind::AutoSubmitted => message
                .auto_submitted
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| v != "no"),
        }
    }
}

/// The intake filter.
#[derive(Debug, Clone)]
pub struct IntakeFilter {
    guards: Vec<Guard>,
}

impl IntakeFilter {
    /// Build the standard chain: size, subject, auto-submitted.
    pub fn new(config: &FilterConfig) -> Self {
        let guards = vec![
            Guard {
                name: "size",
                kind: GuardKind::MaxSize(config.max_message_size),
                action: GuardAction::Reject,
                reason: TOO_LARGE_REASON.into(),
            },
            Guard {
                name: "auto-response subject",
                kind: GuardKind::SubjectContains(
                    config
                        .blocked_subjects
                        .iter()
                        .map(|s| s.to_lowercase())
                        .collect(),
                ),
                action: GuardAction::Drop,
                reason: "auto-response subject".into(),
            },
            Guard {
                name: "auto-submitted header",
                kind: GuardKind::AutoSubmitted,
                action: GuardAction::Drop,
                reason: "Auto-Submitted header".into(),
            },
        ];
        Self { guards }
    }

    /// An empty chain that accepts everything.
    pub fn empty() -> Self {
        Self { guards: Vec::new() }
    }

    /// Append a guard at the end of the chain.
    pub fn push(&mut self, guard: Guard) {
        self.guards.push(guard);
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Classify a message. First firing guard wins.
    pub fn classify(&self, message: &InboundEmailMessage) -> Verdict {
        for guard in &self.guards {
            let Some(detail) = guard.fires(message) else {
                continue;
            };
            return match guard.action {
                GuardAction::Reject => {
                    info!(
                        sender = %message.from,
                        guard = guard.name,
                        detail = %detail,
                        "Rejecting inbound email"
                    );
                    Verdict::Reject {
                        reason: guard.reason.clone(),
                    }
                }
                GuardAction::Drop => {
                    info!(
                        sender = %message.from,
                        guard = guard.name,
                        detail = %detail,
                        "Dropping inbound email"
                    );
                    Verdict::SilentDrop {
                        reason: guard.reason.clone(),
                    }
                }
            };
        }

        debug!(sender = %message.from, "Inbound email passed all guards");
        Verdict::Accept
    }
}

impl Default for IntakeFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
