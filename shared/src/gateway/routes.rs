use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gateway_error::AppResult;
use serde_json::{Value, json};
use std::sync::Arc;

use super::middleware::{bearer_token, require_session};
use crate::auth::{AuthenticatedUser, TokenVerifier};
use crate::key_management::SigningKeyManager;
use crate::sessions::{Session, SessionRegistry};

#[derive(Clone)]
pub struct GatewayState {
    pub keys: Arc<SigningKeyManager>,
    pub sessions: SessionRegistry,
    pub verifier: Arc<TokenVerifier>,
}

impl GatewayState {
    pub fn new(keys: Arc<SigningKeyManager>, sessions: SessionRegistry) -> Self {
        let verifier = Arc::new(TokenVerifier::new(keys.clone(), sessions.clone()));
        Self {
            keys,
            sessions,
            verifier,
        }
    }
}

pub fn router(state: GatewayState) -> Router {
    let protected = Router::new()
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/logout-all", post(logout_all))
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/v1/auth/session", post(open_session))
        .merge(protected)
        .with_state(state)
}

async fn health(State(state): State<GatewayState>) -> Json<Value> {
    let version = state.keys.snapshot().map(|(_, version)| version);
    Json(json!({
        "status": "ok",
        "key_loaded": version.is_some(),
        "key_version": version,
    }))
}

async fn metrics() -> Response {
    match gateway_metrics::gather_metrics() {
        Ok(body) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to gather metrics: {}", e),
        )
            .into_response(),
    }
}

/// Record the session for a token just issued by the auth service.
///
/// The token must verify against the current key; the caller's earlier
/// sessions are revoked.
async fn open_session(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Session>)> {
    let token = bearer_token(&headers)?;
    let session = state.verifier.login(token).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Revoke the session the request was made with
async fn logout(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<StatusCode> {
    state.sessions.revoke(user.user_id, user.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke every session of the caller
async fn logout_all(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Value>> {
    let report = state.sessions.revoke_all(user.user_id).await?;
    Ok(Json(json!({ "revoked": report.revoked })))
}
