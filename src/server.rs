//! HTTP server assembly.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::intake::{ActionDispatcher, Dispatch, EmailRouter, IntakeFilter, IntakeState, intake_routes};
use crate::token::{VerifierState, verifier_routes};

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mailgate"
    }))
}

/// Build the full application router with the HTTP dispatcher.
pub fn app(config: &Config) -> Router {
    let dispatcher = Arc::new(ActionDispatcher::new(config.dispatch.clone()));
    app_with_dispatcher(config, dispatcher)
}

/// Build the application router around a caller-supplied dispatcher.
pub fn app_with_dispatcher(config: &Config, dispatcher: Arc<dyn Dispatch>) -> Router {
    let intake = intake_routes(IntakeState {
        router: EmailRouter::new(IntakeFilter::new(&config.filter), dispatcher),
        intake_token: config.server.intake_token.clone(),
        max_body_bytes: config.server.max_body_bytes,
    });

    Router::new()
        .route("/health", get(health))
        .merge(intake)
        .merge(verifier_routes(VerifierState::new(&config.verifier)))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
