// ============================================================================
// Gateway Middleware
// ============================================================================
//
// Bearer authentication for protected routes. On success the caller's
// AuthenticatedUser is inserted into the request extensions; on failure the
// request is answered with a generic 401.
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use gateway_error::{AppError, AppResult};
use std::sync::Arc;

use crate::auth::TokenVerifier;

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::auth("missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::auth("invalid Authorization header format"))
}

pub async fn require_session(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let token = bearer_token(request.headers())?.to_string();

    let user = verifier.verify(&token).await.inspect_err(|e| {
        tracing::debug!(path = %path, error = %e, "Request authentication failed");
    })?;

    tracing::debug!(path = %path, user_id = %user.user_id, "Request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
