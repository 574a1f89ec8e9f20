use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::AppState;

/// Requires a session token issued by `/api/auth/telegram` and stores its
/// claims as a request extension.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    match state.sessions.decode(token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            unauthorized("invalid_token")
        }
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}
