//! Profile lookup endpoint
//!
//! GET /api/user?name={name} - Resolve a name to a profile with photo and resume URLs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{AppState, ErrorResponse};
use crate::resolver::{ResolveError, UserProfile};

/// Build the lookup router
pub fn router() -> Router<AppState> {
    Router::new().route("/api/user", get(get_user))
}

/// Lookup query params. `name` is optional so a missing parameter reaches
/// the resolver and gets the same answer as an empty one.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub name: Option<String>,
}

async fn get_user(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<UserProfile>, ResolveError> {
    let profile = state.resolver.resolve(params.name.as_deref()).await?;
    Ok(Json(profile))
}

impl ResolveError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::MissingParameter => StatusCode::BAD_REQUEST,
            ResolveError::NotFound | ResolveError::ArtifactNotFound => StatusCode::NOT_FOUND,
            ResolveError::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Display never includes backend detail, so it is safe to return as-is.
impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
