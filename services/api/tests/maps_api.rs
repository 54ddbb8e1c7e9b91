//! services/api/tests/maps_api.rs
//!
//! Drives the full router over the in-memory store.

use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::in_memory(Arc::new(Config::in_memory()));
    build_router(Arc::new(state)).unwrap()
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, set_cookie, json)
}

async fn sign_up(app: &Router, email: &str, name: &str) -> String {
    let (status, cookie, body) = call(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({"email": email, "password": "call-me-ishmael", "display_name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["display_name"], name);
    cookie.expect("signup sets a session cookie")
}

async fn create_map(app: &Router, cookie: &str, is_public: bool) -> String {
    let (status, _, body) = call(
        app,
        "POST",
        "/maps",
        Some(cookie),
        Some(json!({
            "name": "  Whiteness  ",
            "description": "On the colour of the whale",
            "is_public": is_public,
            "theme": "Ishmael",
            "selected_chapters": [42, 1, -1],
            "relationships": [{"source_chapter": 42, "related_chapters": [1, 99]}],
            "annotations": {
                "42": {"annotation": "", "citations": ["", "the whale breached"]},
                "1": {"annotation": "   ", "citations": ["  "]},
                "99": {"annotation": "not selected", "citations": []}
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn signup_login_and_me() {
    let app = app();
    let cookie = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;

    let (status, _, me) = call(&app, "GET", "/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ishmael@pequod.org");

    let (status, _, _) = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({"email": "ISHMAEL@pequod.org", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "ishmael@pequod.org", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login_cookie, _) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "ishmael@pequod.org", "password": "call-me-ishmael"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_cookie = login_cookie.unwrap();

    let (status, _, _) = call(&app, "POST", "/auth/logout", Some(&login_cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = call(&app, "GET", "/auth/me", Some(&login_cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_maps_are_normalized() {
    let app = app();
    let cookie = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let map_id = create_map(&app, &cookie, true).await;

    let (status, _, map) = call(&app, "GET", &format!("/maps/{}", map_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["name"], "Whiteness");
    assert_eq!(map["theme"], "Ishmael");
    assert_eq!(map["user_name"], "Ishmael");
    assert_eq!(map["selected_chapters"], json!([-1, 1, 42]));
    assert_eq!(map["annotations"]["42"]["citations"], json!(["the whale breached"]));
    assert!(map["annotations"].get("1").is_none());
    assert!(map["annotations"].get("99").is_none());
    assert_eq!(
        map["relationships"],
        json!([{"source_chapter": 42, "related_chapters": [1]}])
    );
    assert_eq!(map["is_owner"], false);
}

#[tokio::test]
async fn invalid_maps_are_rejected() {
    let app = app();
    let cookie = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;

    let (status, _, _) = call(
        &app,
        "POST",
        "/maps",
        Some(&cookie),
        Some(json!({"name": "Empty", "selected_chapters": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = call(
        &app,
        "POST",
        "/maps",
        Some(&cookie),
        Some(json!({"name": "Out of range", "selected_chapters": [137]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = call(
        &app,
        "POST",
        "/maps",
        Some(&cookie),
        Some(json!({"name": "Mate", "theme": "Starbuck", "selected_chapters": [26]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_viewers_can_read_but_not_write() {
    let app = app();
    let cookie = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let map_id = create_map(&app, &cookie, true).await;

    let (status, _, maps) = call(&app, "GET", "/maps/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(maps.as_array().unwrap().len(), 1);

    let like = format!("/maps/{}/like", map_id);
    let (status, _, _) = call(&app, "POST", &like, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let comments = format!("/maps/{}/comments", map_id);
    let (status, _, _) = call(&app, "POST", &comments, None, Some(json!({"text": "Aye"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = call(&app, "GET", "/maps/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_owner_can_change_a_map() {
    let app = app();
    let owner = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let other = sign_up(&app, "ahab@pequod.org", "Ahab").await;
    let map_id = create_map(&app, &owner, true).await;
    let uri = format!("/maps/{}", map_id);

    let (status, _, _) = call(&app, "PATCH", &uri, Some(&other), Some(json!({"name": "Mine now"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = call(&app, "DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, map) = call(
        &app,
        "PATCH",
        &uri,
        Some(&owner),
        Some(json!({"name": "Whiteness, revised", "theme": "", "selected_chapters": [42]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["name"], "Whiteness, revised");
    assert_eq!(map["theme"], Value::Null);
    assert_eq!(map["selected_chapters"], json!([42]));
    assert_eq!(map["is_owner"], true);

    let (status, _, _) = call(&app, "DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = call(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_maps_are_hidden_from_others() {
    let app = app();
    let owner = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let other = sign_up(&app, "ahab@pequod.org", "Ahab").await;
    let map_id = create_map(&app, &owner, false).await;
    let uri = format!("/maps/{}", map_id);

    let (status, _, _) = call(&app, "GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = call(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, public) = call(&app, "GET", "/maps/public", None, None).await;
    assert!(public.as_array().unwrap().is_empty());
    let (_, _, mine) = call(&app, "GET", "/maps/mine", Some(&owner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn likes_toggle_and_comments_append() {
    let app = app();
    let owner = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let reader = sign_up(&app, "queequeg@pequod.org", "Queequeg").await;
    let map_id = create_map(&app, &owner, true).await;

    let like = format!("/maps/{}/like", map_id);
    let (_, _, first) = call(&app, "POST", &like, Some(&reader), None).await;
    assert_eq!(first["liked"], true);
    assert_eq!(first["like_count"], 1);
    let (_, _, second) = call(&app, "POST", &like, Some(&reader), None).await;
    assert_eq!(second["liked"], false);
    assert_eq!(second["like_count"], 0);

    let comments = format!("/maps/{}/comments", map_id);
    let (status, _, _) = call(&app, "POST", &comments, Some(&reader), Some(json!({"text": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, comment) = call(
        &app,
        "POST",
        &comments,
        Some(&reader),
        Some(json!({"text": " Queequeg was a native of Rokovoko "})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["text"], "Queequeg was a native of Rokovoko");
    assert_eq!(comment["user_name"], "Queequeg");

    let comment_like = format!("/maps/{}/comments/{}/like", map_id, comment["id"].as_str().unwrap());
    let (status, _, liked) = call(&app, "POST", &comment_like, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["like_count"], 1);

    let (_, _, map) = call(&app, "GET", &format!("/maps/{}", map_id), None, None).await;
    assert_eq!(map["comments"].as_array().unwrap().len(), 1);
    assert_eq!(map["comments"][0]["like_count"], 1);
}

#[tokio::test]
async fn map_graph_is_a_laid_out_wheel() {
    let app = app();
    let cookie = sign_up(&app, "ishmael@pequod.org", "Ishmael").await;
    let map_id = create_map(&app, &cookie, true).await;

    let (status, _, graph) = call(&app, "GET", &format!("/maps/{}/graph", map_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["empty"], false);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(graph["links"].as_array().unwrap().len(), 3);
    assert_eq!(graph["nodes"][0]["id"], "hub");
    assert_eq!(graph["nodes"][0]["connections"], 3);
    assert!(graph["nodes"][1]["x"].is_number());
}

#[tokio::test]
async fn graph_preview_counts_connections() {
    let app = app();
    let (status, _, graph) = call(
        &app,
        "POST",
        "/graph",
        None,
        Some(json!({
            "relationships": [
                {"source_chapter": 1, "related_chapters": [2, 3]},
                {"source_chapter": 2, "related_chapters": [3]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(graph["links"].as_array().unwrap().len(), 3);
    assert!(graph["nodes"][0].get("x").is_none());

    let (_, _, empty) = call(&app, "POST", "/graph", None, Some(json!({"relationships": []}))).await;
    assert_eq!(empty["empty"], true);
}

#[tokio::test]
async fn catalogue_lists_chapters_and_themes() {
    let app = app();
    let (_, _, chapters) = call(&app, "GET", "/chapters", None, None).await;
    let chapters = chapters.as_array().unwrap();
    assert_eq!(chapters.len(), 138);
    assert_eq!(chapters[0]["title"], "Extracts");
    assert_eq!(chapters[0]["is_special"], true);

    let (_, _, themes) = call(&app, "GET", "/themes", None, None).await;
    assert_eq!(themes, json!(["Ahab", "Ishmael", "Ishmael & Ahab", "Queequeeg"]));
}
