//! End-to-end account and post flow against a live database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p quill-server -- --ignored

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use quill_server::auth::TokenIssuer;
use quill_server::config::DatabaseSettings;
use quill_server::{build_router, db, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let settings = DatabaseSettings::from_env().expect("DATABASE_URL required");
    let bootstrap = db::bootstrap(&settings);
    let pool = bootstrap.acquire().await.expect("bootstrap failed");
    let tokens = TokenIssuer::new(b"api-flow-secret", chrono::Duration::hours(1));

    build_router(AppState { pool, tokens }, &ServerConfig::default()).expect("router")
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}@example.com")
}

async fn register(app: &Router, name: &str, email: &str) -> (i64, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": name, "email": email, "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["id"].as_i64().unwrap(), body["token"].as_str().unwrap().to_owned())
}

#[tokio::test]
#[ignore = "requires database"]
async fn account_and_post_lifecycle() {
    let app = app().await;

    let alice_email = unique_email("alice");
    let (alice_id, _) = register(&app, "Alice", &alice_email).await;

    // duplicate registration
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Alice", "email": alice_email, "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    // login
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": alice_email, "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], alice_id);
    let alice = body["token"].as_str().unwrap().to_owned();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": alice_email, "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice");

    // create and read back
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/posts",
        Some(&alice),
        Some(json!({"title": "Hello", "content": "First post"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["id"].as_i64().unwrap();
    let post_uri = format!("/api/posts/{post_id}");

    let (status, body) = call(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author_name"], "Alice");
    assert_eq!(body["user_id"], alice_id);

    let (_, body) = call(&app, Method::GET, "/api/posts/user/me", Some(&alice), None).await;
    assert_eq!(body[0]["id"], post_id);

    // someone else cannot touch it
    let (_, bob) = register(&app, "Bob", &unique_email("bob")).await;
    let (status, body) = call(&app, Method::DELETE, &post_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found or unauthorized");

    let (status, _) = call(
        &app,
        Method::PUT,
        &post_uri,
        Some(&bob),
        Some(json!({"title": "Mine", "content": "now"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // owner edits and deletes
    let (status, body) = call(
        &app,
        Method::PUT,
        &post_uri,
        Some(&alice),
        Some(json!({"title": "Hello again", "content": "Edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hello again");

    let (status, body) = call(&app, Method::DELETE, &post_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post deleted successfully");

    let (status, _) = call(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn protected_routes_require_token() {
    let app = app().await;

    let (status, _) = call(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/posts",
        None,
        Some(json!({"title": "x", "content": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn listing_reports_page_counts() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/posts?page=1&limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentPage"], 1);
    assert!(body["posts"].as_array().unwrap().len() <= 5);

    let total = body["totalPosts"].as_i64().unwrap();
    let pages = body["totalPages"].as_i64().unwrap();
    assert_eq!(pages, (total + 4) / 5);
}
