use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::build_router;
use crate::app::build_state;
use crate::config::Config;
use crate::db::repositories::{SessionRepository, SqlxSessionRepository};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::Session;

async fn test_app() -> (Router, TempDir) {
    let (app, _pool, dir) = test_app_with(|_| {}).await;
    (app, dir)
}

async fn test_app_with(configure: impl FnOnce(&mut Config)) -> (Router, DynDatabasePool, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.path = dir.path().to_path_buf();
    configure(&mut config);

    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let state = build_state(&config, pool.clone()).expect("Failed to build state");
    (build_router(state, &config.server.cors_origin), pool, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (status, body.to_vec())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "hr-companion-test-boundary";

fn upload(uri: &str, token: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\n\
         Content-Type: {}\r\n\r\n",
        BOUNDARY, content_type
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

fn token(auth: &Value) -> String {
    auth["token"].as_str().unwrap().to_string()
}

fn error_code(body: &[u8]) -> String {
    let error: Value = serde_json::from_slice(body).unwrap();
    error["error"]["code"].as_str().unwrap_or_default().to_string()
}

async fn register(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": email,
                "password": "correct-horse-battery",
                "full_name": "Test User"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_home_api_returns_empty_sections() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get("/api/v1/home", None)).await;
    assert_eq!(status, StatusCode::OK);
    let home: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(home["featured_mentors"], json!([]));
    assert_eq!(home["latest_posts"], json!([]));
}

#[tokio::test]
async fn test_unknown_api_path_is_json_404() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get("/api/v1/does-not-exist", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_routes_require_login() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, get("/api/v1/admin/dashboard", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_user_is_admin_second_is_not() {
    let (app, _dir) = test_app().await;

    let first = register(&app, "first@example.com").await;
    assert_eq!(first["user"]["role"], "admin");
    assert!(first["user"].get("password_hash").is_none());
    let admin_token = first["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/v1/auth/me", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    let me: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(me["email"], "first@example.com");

    let (status, _) = send(&app, get("/api/v1/admin/dashboard", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);

    let second = register(&app, "second@example.com").await;
    assert_eq!(second["user"]["role"], "user");
    let user_token = second["token"].as_str().unwrap();
    let (status, body) = send(&app, get("/api/v1/admin/dashboard", Some(user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _dir) = test_app().await;
    register(&app, "dup@example.com").await;

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({
                "email": "DUP@example.com",
                "password": "correct-horse-battery",
                "full_name": "Someone Else"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, get("/api/v1/auth/me", Some("not-a-session"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mentor_directory_rejects_unknown_sort() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, get("/api/v1/mentors?sort=salary", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/v1/mentors?sort=rating&order=desc", None)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["total"], 0);
}

#[tokio::test]
async fn test_unknown_rpc_procedure_is_404() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, post_json("/api/v1/rpc/drop_tables", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/v1/rpc", None)).await;
    assert_eq!(status, StatusCode::OK);
    let procedures: Value = serde_json::from_slice(&body).unwrap();
    assert!(procedures
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["name"] == "search_mentors"));
}

#[tokio::test]
async fn test_admin_rpc_needs_session() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(
        &app,
        post_json("/api/v1/rpc/toggle_post_published", json!({ "id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pages_render_html() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("HR Companion"));

    let (status, _) = send(&app, get("/mentors?sort=bogus", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_page_and_missing_mentor_are_html_404() {
    let (app, _dir) = test_app().await;

    for uri in ["/no/such/page", "/mentors/nobody-here"] {
        let (status, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("<html"), "{}", uri);
    }
}

#[tokio::test]
async fn test_public_submission_is_accepted() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/submissions",
            json!({
                "full_name": "Jane Mentor",
                "email": "jane@example.com",
                "title": "People partner",
                "bio": "Ten years in talent acquisition",
                "skills": ["Recruiting", "Onboarding"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
    let submission: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(submission["status"], "pending");
}

#[tokio::test]
async fn test_wrong_codes_are_rate_limited_per_account() {
    let (app, _dir) = test_app().await;
    register(&app, "ana@example.com").await;

    let attempt = |code: &str| {
        post_json(
            "/api/v1/auth/code/exchange",
            json!({ "email": "ana@example.com", "code": code }),
        )
    };
    for guess in 0..5 {
        let (status, _) = send(&app, attempt(&format!("{:06}", guess))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = send(&app, attempt("000005")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMITED");

    // Password sign-in keeps its own budget
    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "ana@example.com", "password": "correct-horse-battery" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_recovery_session_only_reaches_password_endpoints() {
    let (app, pool, _dir) = test_app_with(|_| {}).await;
    let auth = register(&app, "ana@example.com").await;
    let user_id = auth["user"]["id"].as_i64().unwrap();

    let now = chrono::Utc::now();
    let recovery = SqlxSessionRepository::new(pool)
        .create(&Session {
            id: "recovery-token".to_string(),
            user_id,
            is_recovery: true,
            expires_at: now + chrono::Duration::minutes(30),
            created_at: now,
        })
        .await
        .unwrap();

    let (status, _) = send(&app, get("/api/v1/auth/me", Some(&recovery.id))).await;
    assert_eq!(status, StatusCode::OK);

    for uri in ["/api/v1/bookings", "/api/v1/admin/dashboard"] {
        let (status, body) = send(&app, get(uri, Some(&recovery.id))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(error_code(&body), "FORBIDDEN", "{}", uri);
    }

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/v1/auth/password",
            &recovery.id,
            json!({ "new_password": "a-brand-new-secret" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_member_uploads_limited_to_avatars() {
    let (app, _dir) = test_app().await;
    let admin = token(&register(&app, "admin@example.com").await);
    let member = token(&register(&app, "member@example.com").await);

    let (status, body) = send(
        &app,
        upload("/api/v1/storage/avatars", &member, "image/png", b"\x89PNG avatar"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));

    let (status, _) = send(
        &app,
        upload("/api/v1/storage/content", &member, "image/png", b"\x89PNG banner"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#;
    for bucket in ["avatars", "content"] {
        let uri = format!("/api/v1/storage/{}", bucket);
        let (status, body) = send(&app, upload(&uri, &admin, "image/svg+xml", svg)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bucket);
        assert_eq!(error_code(&body), "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_oversized_upload_is_413() {
    let (app, _pool, _dir) = test_app_with(|config| config.storage.max_file_size = 1024).await;
    let admin = token(&register(&app, "admin@example.com").await);

    // Well past the body limit, so the multipart stream is cut off mid-file
    let data = vec![0u8; 256 * 1024];
    let (status, body) = send(
        &app,
        upload("/api/v1/storage/avatars", &admin, "image/png", &data),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(error["error"]["details"]["max_bytes"], 1024);
}

#[tokio::test]
async fn test_invalid_content_block_is_not_saved() {
    let (app, _dir) = test_app().await;
    let admin = token(&register(&app, "admin@example.com").await);

    // Statistics need a value
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/admin/content",
            &admin,
            json!({ "kind": "statistic", "title": "Mentors" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    assert!(error["error"]["message"].as_str().unwrap().contains("value"));

    let (status, body) = send(&app, get("/api/v1/admin/content?kind=statistic", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let blocks: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(blocks, json!([]));
}

#[tokio::test]
async fn test_comment_moderation_round_trip() {
    let (app, _dir) = test_app().await;
    let admin = token(&register(&app, "admin@example.com").await);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/admin/posts",
            &admin,
            json!({
                "title": "Onboarding checklist",
                "content": "Day one essentials",
                "is_published": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
    let post: Value = serde_json::from_slice(&body).unwrap();
    let post_id = post["id"].as_i64().unwrap();
    let comments_uri = format!("/api/v1/posts/{}/comments", post_id);

    let (status, body) = send(
        &app,
        post_json(
            &comments_uri,
            json!({ "author_name": "Visitor", "content": "Very helpful" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
    let comment: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(comment["status"], "pending");
    let comment_id = comment["id"].as_i64().unwrap();

    let (_, body) = send(&app, get(&comments_uri, None)).await;
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["comments"], json!([]));

    let (_, body) = send(&app, get("/api/v1/admin/comments?status=pending", Some(&admin))).await;
    let queue: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(queue["total"], 1);

    let status_uri = format!("/api/v1/admin/comments/{}/status", comment_id);
    for _ in 0..2 {
        let (status, body) = send(
            &app,
            json_request("PUT", &status_uri, &admin, json!({ "status": "approved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(updated["status"], "approved");
    }

    let (_, body) = send(&app, get(&comments_uri, None)).await;
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["comments"].as_array().unwrap().len(), 1);

    let post_uri = format!("/api/v1/admin/posts/{}", post_id);
    let (_, body) = send(&app, get(&post_uri, Some(&admin))).await;
    let post: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(post["comment_count"], 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/admin/comments/{}", comment_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get(&post_uri, Some(&admin))).await;
    let post: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(post["comment_count"], 0);
}
