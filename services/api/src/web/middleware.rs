//! services/api/src/web/middleware.rs
//!
//! Authentication middleware. Both layers put a [`Viewer`] into the request
//! extensions; `require_auth` additionally rejects anonymous requests.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chapter_map_core::viewer::{CurrentUser, Viewer};
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::AppState;

/// Reads the auth session id out of the `session` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Resolves the cookie to a signed-in viewer, or `None`.
async fn lookup_viewer(state: &AppState, headers: &HeaderMap) -> Option<CurrentUser> {
    let auth_session_id = session_cookie(headers)?;

    let user_id = match state.users.validate_auth_session(auth_session_id).await {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Failed to validate auth session: {:?}", e);
            return None;
        }
    };

    match state.users.get_user(user_id).await {
        Ok(user) => Some(CurrentUser::from(user)),
        Err(e) => {
            error!("Auth session points at a missing user {}: {:?}", user_id, e);
            None
        }
    }
}

/// Middleware that validates the auth session cookie and inserts the viewer.
///
/// If invalid or missing, returns 401 Unauthorized so the client can prompt
/// for sign-in.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = lookup_viewer(&state, req.headers())
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(Viewer::signed_in(user));
    Ok(next.run(req).await)
}

/// Middleware for routes readable by anyone: inserts the signed-in viewer
/// when the cookie is valid and an anonymous one otherwise.
pub async fn resolve_viewer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let viewer = match lookup_viewer(&state, req.headers()).await {
        Some(user) => Viewer::signed_in(user),
        None => Viewer::anonymous(),
    };

    req.extensions_mut().insert(viewer);
    next.run(req).await
}
