//! `/verify-token` — checks an action token for a browser caller.
//!
//! Per request: OPTIONS → 200; any method other than POST → 405;
//! POST without a token → 400; anything that fails verification,
//! including a missing signing secret → 401; otherwise 200 with the payload.
//! Every response carries permissive CORS headers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::codec::TokenCodec;
use crate::config::VerifierConfig;
use crate::error::TokenError;

const CORS_HEADERS: [(HeaderName, &str); 2] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        "authorization, x-client-info, apikey, content-type",
    ),
];

const INVALID_TOKEN: &str = "Invalid or expired token";
const GENERIC_DETAILS: &str = "Token verification failed";

/// Shared state for the verification route.
#[derive(Clone)]
pub struct VerifierState {
    inner: Arc<VerifierInner>,
}

struct VerifierInner {
    codec: TokenCodec,
    signing_secret: Option<SecretString>,
    expose_error_details: bool,
}

impl VerifierState {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            inner: Arc::new(VerifierInner {
                codec: TokenCodec::new(config.leeway_secs),
                signing_secret: config.signing_secret.clone(),
                expose_error_details: config.expose_error_details,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    token: Option<String>,
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, CORS_HEADERS, Json(body)).into_response()
}

/// 401 with a caller-safe `details` unless exposure is switched on.
fn invalid_token(state: &VerifierState, detail: &str) -> Response {
    let details = if state.inner.expose_error_details {
        detail
    } else {
        GENERIC_DETAILS
    };
    json_response(
        StatusCode::UNAUTHORIZED,
        json!({"error": INVALID_TOKEN, "details": details}),
    )
}

async fn verify_token(State(state): State<VerifierState>, method: Method, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return (StatusCode::OK, CORS_HEADERS).into_response();
    }
    if method != Method::POST {
        return json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"error": "Method not allowed"}),
        );
    }

    let request: VerifyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Token verification error: unreadable request body");
            return invalid_token(&state, &e.to_string());
        }
    };

    let Some(token) = request.token.filter(|t| !t.is_empty()) else {
        return json_response(StatusCode::BAD_REQUEST, json!({"error": "Token is required"}));
    };

    let Some(secret) = state.inner.signing_secret.as_ref() else {
        let e = TokenError::SecretNotConfigured;
        error!(error = %e, "Token verification error: JWT_SECRET is not set");
        return invalid_token(&state, &e.to_string());
    };

    match state.inner.codec.verify(&token, secret) {
        Ok(payload) => {
            info!(user_id = %payload.user_id, scope = ?payload.scope, "Verified action token");
            json_response(StatusCode::OK, json!({"payload": payload}))
        }
        Err(e) => {
            warn!(error = %e, "Token verification error");
            invalid_token(&state, &e.to_string())
        }
    }
}

/// Build the verification route.
pub fn verifier_routes(state: VerifierState) -> Router {
    Router::new()
        .route("/verify-token", any(verify_token))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request};
    use chrono::Utc;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use tower::ServiceExt;

    use super::*;

    const SECRET: &str = "unsubscribe-signing-key";

    fn app(secret: Option<&str>, expose: bool) -> Router {
        verifier_routes(VerifierState::new(&VerifierConfig {
            signing_secret: secret.map(SecretString::from),
            leeway_secs: 0,
            expose_error_details: expose,
        }))
    }

    fn make_token(user_id: serde_json::Value, exp: i64, key: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &json!({"userId": user_id, "email": "donor@example.com", "type": "reminder", "exp": exp}),
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .unwrap()
    }

    fn request(method: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/verify-token")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let resp = app.oneshot(req).await.unwrap();
        let (parts, body) = resp.into_parts();
        let bytes = to_bytes(body, 64 * 1024).await.unwrap();
        (parts.status, parts.headers, bytes)
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(
            headers["access-control-allow-headers"],
            "authorization, x-client-info, apikey, content-type"
        );
    }

    fn json_of(bytes: &Bytes) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn options_returns_cors_regardless_of_body() {
        for body in ["", "not json", r#"{"token": "x"}"#] {
            let (status, headers, bytes) = send(app(Some(SECRET), false), request("OPTIONS", body)).await;
            assert_eq!(status, StatusCode::OK);
            assert_cors(&headers);
            assert!(bytes.is_empty());
        }
    }

    #[tokio::test]
    async fn options_works_without_secret() {
        let (status, headers, _) = send(app(None, false), request("OPTIONS", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn get_is_method_not_allowed() {
        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let (status, headers, bytes) = send(app(Some(SECRET), false), request(method, "")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_cors(&headers);
            assert_eq!(json_of(&bytes), json!({"error": "Method not allowed"}));
        }
    }

    #[tokio::test]
    async fn missing_token_is_bad_request() {
        for body in ["{}", r#"{"token": ""}"#, r#"{"token": null}"#] {
            let (status, headers, bytes) = send(app(Some(SECRET), false), request("POST", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_cors(&headers);
            assert_eq!(json_of(&bytes), json!({"error": "Token is required"}));
        }
    }

    #[tokio::test]
    async fn valid_token_returns_payload() {
        let exp = Utc::now().timestamp() + 3600;
        let token = make_token(json!(42), exp, SECRET);
        let body = json!({"token": token}).to_string();

        let (status, headers, bytes) = send(app(Some(SECRET), false), request("POST", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
        let json = json_of(&bytes);
        assert_eq!(json["payload"]["userId"], 42);
        assert_eq!(json["payload"]["email"], "donor@example.com");
        assert_eq!(json["payload"]["type"], "reminder");
        assert_eq!(json["payload"]["exp"], exp);
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized_with_generic_details() {
        let token = make_token(json!("u-1"), Utc::now().timestamp() + 3600, "other-key");
        let body = json!({"token": token}).to_string();

        let (status, headers, bytes) = send(app(Some(SECRET), false), request("POST", body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_cors(&headers);
        assert_eq!(
            json_of(&bytes),
            json!({"error": "Invalid or expired token", "details": "Token verification failed"})
        );
    }

    #[tokio::test]
    async fn expired_token_details_exposed_when_enabled() {
        let token = make_token(json!("u-1"), Utc::now().timestamp() - 10, SECRET);
        let body = json!({"token": token}).to_string();

        let (status, _, bytes) = send(app(Some(SECRET), true), request("POST", body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json = json_of(&bytes);
        assert_eq!(json["error"], "Invalid or expired token");
        assert!(json["details"].as_str().unwrap().contains("expired"));
    }

    #[tokio::test]
    async fn missing_secret_is_unauthorized() {
        let token = make_token(json!("u-1"), Utc::now().timestamp() + 3600, SECRET);
        let body = json!({"token": token}).to_string();

        let (status, headers, bytes) = send(app(None, false), request("POST", body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_cors(&headers);
        let json = json_of(&bytes);
        assert_eq!(json["error"], "Invalid or expired token");
        assert!(!json["details"].as_str().unwrap().contains("JWT_SECRET"));
    }

    #[tokio::test]
    async fn unreadable_body_is_unauthorized() {
        let (status, headers, _) = send(app(Some(SECRET), false), request("POST", "{not json")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn missing_token_checked_before_secret() {
        let (status, _, _) = send(app(None, false), request("POST", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
