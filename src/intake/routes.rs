//! HTTP surface through which a mail relay submits inbound messages.
//!
//! The relay posts each delivery once and applies the returned action:
//! `accept` and `drop` end the delivery quietly, `reject` maps to the
//! relay's own reject primitive with the given reason.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use super::filter::TOO_LARGE_REASON;
use super::router::EmailRouter;
use super::types::{Disposition, InboundEmailMessage, Rejection};

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeState {
    pub router: EmailRouter,
    /// Bearer token the relay must present. `None` refuses every submission.
    pub intake_token: Option<SecretString>,
    /// Upper bound on a buffered request body.
    pub max_body_bytes: usize,
}

/// Metadata-only submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntakeRequest {
    from: String,
    to: String,
    raw_size: u64,
    #[serde(default)]
    headers: IntakeHeaders,
}

#[derive(Debug, Default, Deserialize)]
struct IntakeHeaders {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default, rename = "message-id")]
    message_id: Option<String>,
    #[serde(default, rename = "auto-submitted")]
    auto_submitted: Option<String>,
}

impl From<IntakeRequest> for InboundEmailMessage {
    fn from(req: IntakeRequest) -> Self {
        Self {
            from: req.from,
            to: req.to,
            subject: req.headers.subject.unwrap_or_default(),
            message_id: req.headers.message_id,
            raw_size: req.raw_size,
            auto_submitted: req.headers.auto_submitted,
        }
    }
}

/// Envelope for raw submissions.
#[derive(Debug, Deserialize)]
struct Envelope {
    from: String,
    to: String,
}

/// What the relay should do with the delivery.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum IntakeResponse {
    Accept,
    Drop,
    Reject {
        reason: String,
        #[serde(rename = "smtpCode")]
        smtp_code: u16,
    },
}

impl From<Disposition> for IntakeResponse {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Accept => Self::Accept,
            Disposition::SilentDrop => Self::Drop,
            Disposition::Reject(rejection) => Self::Reject {
                smtp_code: rejection.smtp_code(),
                reason: rejection.reason,
            },
        }
    }
}

/// `None` when the caller may submit, otherwise the response to send back.
fn check_access(state: &IntakeState, headers: &HeaderMap) -> Option<Response> {
    let Some(expected) = state.intake_token.as_ref() else {
        error!("Refused intake submission: INTAKE_TOKEN is not set");
        return Some(
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": "Intake is not configured"})),
            )
                .into_response(),
        );
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    if bool::from(presented.as_bytes().ct_eq(expected.expose_secret().as_bytes())) {
        return None;
    }
    warn!("Rejected intake submission with bad credentials");
    Some(
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Unauthorized"})),
        )
            .into_response(),
    )
}

/// POST /inbound-email
async fn submit_metadata(
    State(state): State<IntakeState>,
    headers: HeaderMap,
    Json(req): Json<IntakeRequest>,
) -> Response {
    if let Some(refused) = check_access(&state, &headers) {
        return refused;
    }
    let message = InboundEmailMessage::from(req);
    let disposition = state.router.handle(&message).await;
    Json(IntakeResponse::from(disposition)).into_response()
}

/// POST /inbound-email/raw?from=..&to=..
///
/// A body over the intake limit is necessarily over the message size limit,
/// so it is answered with the size rejection instead of a bare 413.
async fn submit_raw(
    State(state): State<IntakeState>,
    Query(envelope): Query<Envelope>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if let Some(refused) = check_access(&state, &headers) {
        return refused;
    }
    let body = match body {
        Ok(body) => body,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_))) => {
            warn!(
                sender = %envelope.from,
                limit = state.max_body_bytes,
                "Raw submission exceeds the intake body limit"
            );
            let disposition = Disposition::Reject(Rejection::permanent(TOO_LARGE_REASON));
            return Json(IntakeResponse::from(disposition)).into_response();
        }
        Err(rejection) => return rejection.into_response(),
    };
    let message = match InboundEmailMessage::from_raw(&envelope.from, &envelope.to, &body) {
        Ok(message) => message,
        Err(e) => {
            warn!(sender = %envelope.from, error = %e, "Unparseable raw submission");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };
    let disposition = state.router.handle(&message).await;
    Json(IntakeResponse::from(disposition)).into_response()
}

/// Build the intake routes.
pub fn intake_routes(state: IntakeState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/inbound-email", post(submit_metadata))
        .route("/inbound-email/raw", post(submit_raw))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}
