//! services/api/src/web/router.rs
//!
//! Assembles the HTTP router: public routes, routes that adapt to whoever is
//! viewing, and routes that require a signed-in user.

use crate::error::ApiError;
use crate::web::{
    auth::{login_handler, logout_handler, me_handler, signup_handler},
    middleware::{require_auth, resolve_viewer},
    rest::{self, ApiDoc},
    state::AppState,
    ws_handler::ws_handler,
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no viewer needed)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/chapters", get(rest::list_chapters_handler))
        .route("/themes", get(rest::list_themes_handler))
        .route("/graph", post(rest::graph_preview_handler));

    // Viewer-aware routes. Anonymous viewers can read public maps; the map
    // service rejects their writes with 401.
    let viewer_routes = Router::new()
        .route("/maps/public", get(rest::list_public_maps_handler))
        .route(
            "/maps/{id}",
            get(rest::get_map_handler)
                .patch(rest::update_map_handler)
                .delete(rest::delete_map_handler),
        )
        .route("/maps/{id}/graph", get(rest::map_graph_handler))
        .route("/maps", post(rest::create_map_handler))
        .route("/maps/{id}/like", post(rest::toggle_like_handler))
        .route("/maps/{id}/comments", post(rest::add_comment_handler))
        .route(
            "/maps/{id}/comments/{comment_id}/like",
            post(rest::toggle_comment_like_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_viewer,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/maps/mine", get(rest::list_my_maps_handler))
        .route("/ws/editor", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
