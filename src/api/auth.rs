//! Bearer-token middleware for gated routes

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::{AppState, ErrorResponse};

/// Reject the request unless the access gate admits its bearer token
pub async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.gate.authorize(authorization) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            warn!("Rejected request to {}: {}", req.uri().path(), e);
            let challenge = format!("Bearer realm=\"{}\"", state.gate.audience());
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, challenge)],
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}
