//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the map REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, AuthResponse, LoginRequest, SignupRequest};
use crate::web::dto::{
    parse_chapters, AddCommentRequest, AnnotationDto, ChapterInfo, CommentResponse,
    CreateMapRequest, GraphNodeDto, GraphPreviewRequest, GraphResponse, LikeResponse, LinkDto,
    MapResponse, RelationshipDto, UpdateMapRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chapter_map_core::chapter::Chapter;
use chapter_map_core::domain::Theme;
use chapter_map_core::graph;
use chapter_map_core::ports::PortError;
use chapter_map_core::viewer::Viewer;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        list_public_maps_handler,
        list_my_maps_handler,
        get_map_handler,
        create_map_handler,
        update_map_handler,
        delete_map_handler,
        toggle_like_handler,
        add_comment_handler,
        toggle_comment_like_handler,
        map_graph_handler,
        graph_preview_handler,
        list_chapters_handler,
        list_themes_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, AuthResponse,
            CreateMapRequest, UpdateMapRequest, MapResponse, AnnotationDto, CommentResponse,
            LikeResponse, AddCommentRequest,
            GraphResponse, GraphNodeDto, LinkDto, GraphPreviewRequest, RelationshipDto,
            ChapterInfo,
        )
    ),
    tags(
        (name = "Chapter Maps API", description = "Build, share and discuss annotated maps of Moby-Dick chapters.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error mapping
//=========================================================================================

/// Maps a port failure to the HTTP status the client sees. Every failure is
/// logged here; nothing is retried.
pub fn port_error_response(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::NOT_FOUND, msg)
        }
        PortError::Unauthorized => {
            warn!("{}: sign in required", context);
            (StatusCode::UNAUTHORIZED, "Sign in required".to_string())
        }
        PortError::Forbidden(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::FORBIDDEN, msg)
        }
        PortError::Invalid(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        PortError::Conflict(msg) => {
            warn!("{}: {}", context, msg);
            (StatusCode::CONFLICT, msg)
        }
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// Map Handlers
//=========================================================================================

/// List every public map, newest first.
#[utoipa::path(
    get,
    path = "/maps/public",
    responses(
        (status = 200, description = "Public maps", body = [MapResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_public_maps_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let maps = app_state
        .maps
        .list_public_maps()
        .await
        .map_err(|e| port_error_response("Failed to load public maps", e))?;

    let body: Vec<MapResponse> = maps.into_iter().map(|m| MapResponse::new(m, &viewer)).collect();
    Ok(Json(body))
}

/// List the signed-in user's own maps, newest first.
#[utoipa::path(
    get,
    path = "/maps/mine",
    responses(
        (status = 200, description = "The viewer's maps", body = [MapResponse]),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn list_my_maps_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let maps = app_state
        .maps
        .list_my_maps(&viewer)
        .await
        .map_err(|e| port_error_response("Failed to load user maps", e))?;

    let body: Vec<MapResponse> = maps.into_iter().map(|m| MapResponse::new(m, &viewer)).collect();
    Ok(Json(body))
}

/// Fetch one map. Private maps are only visible to their owner.
#[utoipa::path(
    get,
    path = "/maps/{id}",
    params(("id" = Uuid, Path, description = "Map id")),
    responses(
        (status = 200, description = "The map", body = MapResponse),
        (status = 404, description = "No such map, or not visible to the viewer")
    )
)]
pub async fn get_map_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let map = app_state
        .maps
        .get_map(&viewer, map_id)
        .await
        .map_err(|e| port_error_response("Failed to load map", e))?;
    Ok(Json(MapResponse::new(map, &viewer)))
}

/// Create a map owned by the signed-in user.
///
/// Blank citations are dropped and chapters left with neither text nor
/// citations are removed before the map is stored.
#[utoipa::path(
    post,
    path = "/maps",
    request_body = CreateMapRequest,
    responses(
        (status = 201, description = "Map created", body = MapResponse),
        (status = 400, description = "Empty name, no chapters, or bad input"),
        (status = 401, description = "Sign in required")
    )
)]
pub async fn create_map_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateMapRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new_map = req.into_new_map()?;
    let map = app_state
        .maps
        .create_map(&viewer, new_map)
        .await
        .map_err(|e| port_error_response("Failed to save map", e))?;

    info!("Created map {} for user {}", map.id, map.user_id);
    Ok((StatusCode::CREATED, Json(MapResponse::new(map, &viewer))))
}

/// Partially update one of the viewer's maps.
#[utoipa::path(
    patch,
    path = "/maps/{id}",
    params(("id" = Uuid, Path, description = "Map id")),
    request_body = UpdateMapRequest,
    responses(
        (status = 200, description = "Updated map", body = MapResponse),
        (status = 400, description = "Invalid update"),
        (status = 401, description = "Sign in required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such map")
    )
)]
pub async fn update_map_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
    Json(req): Json<UpdateMapRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let patch = req.into_patch()?;
    let map = app_state
        .maps
        .update_map(&viewer, map_id, patch)
        .await
        .map_err(|e| port_error_response("Failed to update map", e))?;
    Ok(Json(MapResponse::new(map, &viewer)))
}

/// Delete one of the viewer's maps.
#[utoipa::path(
    delete,
    path = "/maps/{id}",
    params(("id" = Uuid, Path, description = "Map id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Sign in required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such map")
    )
)]
pub async fn delete_map_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .maps
        .delete_map(&viewer, map_id)
        .await
        .map_err(|e| port_error_response("Failed to delete map", e))?;

    info!("Deleted map {}", map_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Like the map, or take the like back if the viewer already liked it.
#[utoipa::path(
    post,
    path = "/maps/{id}/like",
    params(("id" = Uuid, Path, description = "Map id")),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Sign in required"),
        (status = 404, description = "No such map")
    )
)]
pub async fn toggle_like_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let likes = app_state
        .maps
        .toggle_like(&viewer, map_id)
        .await
        .map_err(|e| port_error_response("Failed to toggle like", e))?;
    Ok(Json(LikeResponse::new(likes, &viewer)))
}

/// Append a comment to a map.
#[utoipa::path(
    post,
    path = "/maps/{id}/comments",
    params(("id" = Uuid, Path, description = "Map id")),
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 401, description = "Sign in required"),
        (status = 404, description = "No such map")
    )
)]
pub async fn add_comment_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let comment = app_state
        .maps
        .add_comment(&viewer, map_id, &req.text)
        .await
        .map_err(|e| port_error_response("Failed to add comment", e))?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// Like a comment, or take the like back.
#[utoipa::path(
    post,
    path = "/maps/{id}/comments/{comment_id}/like",
    params(
        ("id" = Uuid, Path, description = "Map id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Sign in required"),
        (status = 404, description = "No such map or comment")
    )
)]
pub async fn toggle_comment_like_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path((map_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let likes = app_state
        .maps
        .toggle_comment_like(&viewer, map_id, comment_id)
        .await
        .map_err(|e| port_error_response("Failed to toggle comment like", e))?;
    Ok(Json(LikeResponse::new(likes, &viewer)))
}

//=========================================================================================
// Graph and Catalogue Handlers
//=========================================================================================

/// The map drawn as a hub (the map name) with one spoke per selected chapter.
#[utoipa::path(
    get,
    path = "/maps/{id}/graph",
    params(("id" = Uuid, Path, description = "Map id")),
    responses(
        (status = 200, description = "Graph data with positions", body = GraphResponse),
        (status = 404, description = "No such map")
    )
)]
pub async fn map_graph_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(map_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let graph = app_state
        .maps
        .map_graph(&viewer, map_id)
        .await
        .map_err(|e| port_error_response("Failed to build map graph", e))?;
    Ok(Json(GraphResponse::from(graph)))
}

/// Build graph data from unsaved input, for previews while editing.
#[utoipa::path(
    post,
    path = "/graph",
    request_body = GraphPreviewRequest,
    responses(
        (status = 200, description = "Graph data", body = GraphResponse),
        (status = 400, description = "Bad chapter numbers")
    )
)]
pub async fn graph_preview_handler(
    Json(req): Json<GraphPreviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut graph = match req.relationships {
        Some(relationships) => {
            let relationships = relationships
                .into_iter()
                .map(RelationshipDto::into_domain)
                .collect::<Result<Vec<_>, _>>()?;
            graph::from_relationships(&relationships)
        }
        None => {
            let selected = parse_chapters(req.selected_chapters.as_deref().unwrap_or_default())?;
            graph::from_selection(req.map_name.as_deref().unwrap_or("Theme"), &selected)
        }
    };

    if let Some(size) = req.layout_size.filter(|s| s.is_finite() && *s > 0.0) {
        graph.radial_layout(size, size);
    }
    Ok(Json(GraphResponse::from(graph)))
}

/// The chapter catalogue, in reading order.
#[utoipa::path(
    get,
    path = "/chapters",
    responses((status = 200, description = "All chapters", body = [ChapterInfo]))
)]
pub async fn list_chapters_handler() -> Json<Vec<ChapterInfo>> {
    Json(Chapter::all().map(ChapterInfo::from).collect())
}

/// The themes a map can be tagged with.
#[utoipa::path(
    get,
    path = "/themes",
    responses((status = 200, description = "Available themes", body = [String]))
)]
pub async fn list_themes_handler() -> Json<Vec<&'static str>> {
    Json(Theme::ALL.iter().map(|t| t.as_str()).collect())
}
