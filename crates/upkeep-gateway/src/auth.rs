use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use upkeep_core::config::{AuthConfig, AuthMode};

use crate::app::AppState;
use crate::error::ApiError;

/// Route layer guarding mutating endpoints. Reads always pass.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let read_only = matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if read_only || check_auth(&state.config.auth, req.headers()) {
        return Ok(next.run(req).await);
    }
    warn!(method = %req.method(), path = %req.uri().path(), "unauthorized mutation rejected");
    Err(ApiError::Unauthorized)
}

/// Returns true if the request is authorised.
fn check_auth(auth: &AuthConfig, headers: &HeaderMap) -> bool {
    match auth.mode {
        AuthMode::None => true,
        AuthMode::Token => {
            let expected = match &auth.token {
                Some(t) => t.as_str(),
                // Token mode configured but no token value: deny.
                None => return false,
            };
            extract_bearer(headers)
                .map(|t| t == expected)
                .unwrap_or(false)
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
