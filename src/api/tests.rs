//! Router-level tests: full requests through middleware, extractors and services

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{build_router, AppState};
use crate::cache::MemoryCache;
use crate::config::Config;
use crate::db::repositories::test_support::migrated_pool;

struct Harness {
    server: TestServer,
    _uploads: tempfile::TempDir,
}

async fn harness() -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();

    let state = AppState::new(migrated_pool().await, Arc::new(MemoryCache::new()), &config);
    let app = build_router(state, &config.server.cors_origin).unwrap();
    Harness {
        server: TestServer::new(app).unwrap(),
        _uploads: uploads,
    }
}

/// Register an account and return its session token
async fn register(server: &TestServer, name: &str) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": format!("{}@example.com", name),
            "password": "correct horse",
            "display_name": name,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

/// Create and submit a profile; returns the artist JSON
async fn submitted_artist(server: &TestServer, token: &str, name: &str, medium: &str) -> Value {
    server
        .post("/api/v1/me/artist")
        .authorization_bearer(token)
        .json(&json!({
            "name": name,
            "primary_medium": medium,
            "location": "george_town",
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let response = server
        .post("/api/v1/me/artist/submit")
        .authorization_bearer(token)
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

async fn approve(server: &TestServer, admin: &str, artist_id: i64) {
    server
        .put(&format!("/api/v1/admin/artists/{}/status", artist_id))
        .authorization_bearer(admin)
        .json(&json!({ "status": "approved" }))
        .await
        .assert_status_ok();
}

fn error_code(response: &axum_test::TestResponse) -> String {
    response.json::<Value>()["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_first_user_is_admin_and_session_works() {
    let h = harness().await;
    let token = register(&h.server, "founder").await;

    let response = h.server.get("/api/v1/auth/me").authorization_bearer(&token).await;
    response.assert_status_ok();
    let me = response.json::<Value>();
    assert_eq!(me["user"]["role"], "admin");
    assert!(me["user"].get("password_hash").is_none());
    assert!(me["artist"].is_null());

    let second = register(&h.server, "member").await;
    let me = h
        .server
        .get("/api/v1/auth/me")
        .authorization_bearer(&second)
        .await
        .json::<Value>();
    assert_eq!(me["user"]["role"], "member");
}

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let h = harness().await;
    let response = h
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "cookie@example.com",
            "password": "correct horse",
            "display_name": "Cookie",
        }))
        .await;
    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let h = harness().await;
    let token = register(&h.server, "leaver").await;
    h.server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = h.server.get("/api/v1/auth/me").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_error_envelope() {
    let h = harness().await;

    let response = h.server.get("/api/v1/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response), "UNAUTHORIZED");

    let response = h
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "nope", "password": "short", "display_name": "" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    for field in ["email", "password", "display_name"] {
        assert!(body["error"]["details"][field].is_array(), "missing details for {}", field);
    }

    let response = h
        .server
        .post("/api/v1/auth/login")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "BAD_REQUEST");

    let response = h.server.get("/api/v1/artists/nobody").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response), "NOT_FOUND");

    let response = h.server.get("/api/v1/artists?medium=opera").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let h = harness().await;
    register(&h.server, "ana").await;
    let response = h
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "ana@example.com", "password": "wrong password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let h = harness().await;
    let _admin = register(&h.server, "admin").await;
    let member = register(&h.server, "member").await;

    let response = h.server.get("/api/v1/admin/dashboard").authorization_bearer(&member).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_code(&response), "FORBIDDEN");

    h.server
        .get("/api/v1/admin/dashboard")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_moderation_controls_visibility() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    let painter = register(&h.server, "painter").await;
    let artist = submitted_artist(&h.server, &painter, "Lim Hui Wen", "painting").await;
    assert_eq!(artist["status"], "pending");
    let slug = artist["slug"].as_str().unwrap().to_string();

    // Pending: owner and admin see it, the public does not
    h.server
        .get(&format!("/api/v1/artists/{}", slug))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .get(&format!("/api/v1/artists/{}", slug))
        .authorization_bearer(&painter)
        .await
        .assert_status_ok();
    let directory = h.server.get("/api/v1/artists").await.json::<Value>();
    assert_eq!(directory["total"], 0);

    approve(&h.server, &admin, artist["id"].as_i64().unwrap()).await;

    h.server
        .get(&format!("/api/v1/artists/{}", slug))
        .await
        .assert_status_ok();
    let directory = h.server.get("/api/v1/artists?medium=painting").await.json::<Value>();
    assert_eq!(directory["total"], 1);
    assert_eq!(directory["items"][0]["slug"], slug);

    // Approving twice is a no-op transition
    let response = h
        .server
        .put(&format!("/api/v1/admin/artists/{}/status", artist["id"]))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "approved" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let dashboard = h
        .server
        .get("/api/v1/admin/dashboard")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(dashboard["counts"]["artists"]["approved"], 1);
    assert!(dashboard["system"]["total_requests"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_bulk_reports_partial_failure() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    let one = register(&h.server, "one").await;
    let two = register(&h.server, "two").await;
    let first = submitted_artist(&h.server, &one, "First", "drawing").await;
    let second = submitted_artist(&h.server, &two, "Second", "drawing").await;
    approve(&h.server, &admin, second["id"].as_i64().unwrap()).await;

    let response = h
        .server
        .post("/api/v1/admin/artists/bulk")
        .authorization_bearer(&admin)
        .json(&json!({ "action": "approve", "ids": [first["id"], second["id"], 9999] }))
        .await;
    response.assert_status_ok();
    let result = response.json::<Value>();
    assert_eq!(result["succeeded"], json!([first["id"]]));
    assert_eq!(result["failed"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_follow_like_and_feed() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    let fan_token = register(&h.server, "fan").await;
    let star_token = register(&h.server, "star").await;
    let fan = submitted_artist(&h.server, &fan_token, "Fan", "photography").await;
    let star = submitted_artist(&h.server, &star_token, "Star", "photography").await;
    approve(&h.server, &admin, fan["id"].as_i64().unwrap()).await;
    approve(&h.server, &admin, star["id"].as_i64().unwrap()).await;

    // Following is idempotent
    for _ in 0..2 {
        let state = h
            .server
            .post(&format!("/api/v1/follows/{}", star["id"]))
            .authorization_bearer(&fan_token)
            .await
            .json::<Value>();
        assert_eq!(state, json!({ "following": true, "follower_count": 1 }));
    }
    let response = h
        .server
        .post(&format!("/api/v1/follows/{}", fan["id"]))
        .authorization_bearer(&fan_token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let item = h
        .server
        .post("/api/v1/portfolio")
        .authorization_bearer(&star_token)
        .json(&json!({
            "title": "Armenian Street at dusk",
            "image_url": "/uploads/dusk.jpg",
            "medium": "photography",
            "year": 2023,
        }))
        .await;
    item.assert_status(StatusCode::CREATED);
    let item_id = item.json::<Value>()["id"].as_i64().unwrap();

    let like = h
        .server
        .post(&format!("/api/v1/likes/{}", item_id))
        .authorization_bearer(&fan_token)
        .await
        .json::<Value>();
    assert_eq!(like, json!({ "liked": true, "like_count": 1 }));

    let feed = h
        .server
        .get("/api/v1/feed")
        .authorization_bearer(&fan_token)
        .await
        .json::<Value>();
    let items = feed["items"].as_array().unwrap();
    let added = items
        .iter()
        .find(|i| i["kind"] == "portfolio_added")
        .expect("portfolio activity in feed");
    assert_eq!(added["like_count"], 1);
    assert_eq!(added["liked"], true);
    assert_eq!(added["author"]["slug"], star["slug"]);

    // Star was notified of the follow and the like
    let count = h
        .server
        .get("/api/v1/notifications/unread-count")
        .authorization_bearer(&star_token)
        .await
        .json::<Value>();
    // Plus the moderation notice from approval
    assert_eq!(count["count"], 3);
    let marked = h
        .server
        .post("/api/v1/notifications/read-all")
        .authorization_bearer(&star_token)
        .await
        .json::<Value>();
    assert_eq!(marked["updated"], 3);

    let followers = h
        .server
        .get(&format!("/api/v1/artists/{}/followers", star["slug"].as_str().unwrap()))
        .await
        .json::<Value>();
    assert_eq!(followers["items"][0]["slug"], fan["slug"]);

    let unfollowed = h
        .server
        .delete(&format!("/api/v1/follows/{}", star["id"]))
        .authorization_bearer(&fan_token)
        .await
        .json::<Value>();
    assert_eq!(unfollowed, json!({ "following": false, "follower_count": 0 }));
}

#[tokio::test]
async fn test_social_routes_need_a_profile() {
    let h = harness().await;
    let _admin = register(&h.server, "admin").await;
    let visitor = register(&h.server, "visitor").await;
    let response = h.server.get("/api/v1/feed").authorization_bearer(&visitor).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_inquiry_to_active_service() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    let maker = register(&h.server, "maker").await;
    let artist = submitted_artist(&h.server, &maker, "Maker", "ceramics").await;
    approve(&h.server, &admin, artist["id"].as_i64().unwrap()).await;

    let service = h
        .server
        .post("/api/v1/services")
        .authorization_bearer(&maker)
        .json(&json!({ "title": "Wheel throwing class", "price_cents": 12000, "price_unit": "fixed" }))
        .await;
    service.assert_status(StatusCode::CREATED);
    let service_id = service.json::<Value>()["id"].as_i64().unwrap();

    let response = h
        .server
        .post(&format!("/api/v1/services/{}/inquiries", service_id))
        .json(&json!({
            "name": "Visitor",
            "email": "visitor@example.com",
            "message": "Any slots next Saturday?",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let inbox = h
        .server
        .get("/api/v1/me/inquiries")
        .authorization_bearer(&maker)
        .await
        .json::<Value>();
    assert_eq!(inbox["total"], 1);
    assert_eq!(inbox["items"][0]["status"], "new");
    assert_eq!(inbox["total_pages"], 1);
    assert_eq!(inbox["has_next"], false);
}

#[tokio::test]
async fn test_forwarded_header_does_not_reset_inquiry_limit() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    let maker = register(&h.server, "maker").await;
    let artist = submitted_artist(&h.server, &maker, "Maker", "ceramics").await;
    approve(&h.server, &admin, artist["id"].as_i64().unwrap()).await;
    let service_id = h
        .server
        .post("/api/v1/services")
        .authorization_bearer(&maker)
        .json(&json!({ "title": "Glazing workshop", "price_cents": 8000, "price_unit": "fixed" }))
        .await
        .json::<Value>()["id"]
        .as_i64()
        .unwrap();

    let limit = Config::default().rate_limit.inquiries;
    let mut created = 0;
    let mut limited = 0;
    for i in 0..(limit + 5) {
        let response = h
            .server
            .post(&format!("/api/v1/services/{}/inquiries", service_id))
            .add_header(
                HeaderName::from_static("x-forwarded-for"),
                HeaderValue::from_str(&format!("198.51.100.{}", i)).unwrap(),
            )
            .json(&json!({
                "name": "Visitor",
                "email": "visitor@example.com",
                "message": "Do you take commissions?",
            }))
            .await;
        match response.status_code() {
            StatusCode::CREATED => created += 1,
            StatusCode::TOO_MANY_REQUESTS => {
                assert_eq!(error_code(&response), "RATE_LIMITED");
                limited += 1;
            }
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(created, limit);
    assert_eq!(limited, 5);
}

#[tokio::test]
async fn test_public_settings_and_taxonomy() {
    let h = harness().await;
    let settings = h.server.get("/api/v1/settings").await.json::<Value>();
    assert_eq!(settings["registration_open"], true);
    assert!(settings.get("feed_page_size").is_none());

    let taxonomy = h.server.get("/api/v1/taxonomy").await.json::<Value>();
    assert_eq!(taxonomy["media"].as_array().unwrap().len(), 13);
    assert_eq!(taxonomy["locations"][0]["label"], "George Town");
}

#[tokio::test]
async fn test_closed_registration_blocks_new_accounts() {
    let h = harness().await;
    let admin = register(&h.server, "admin").await;
    h.server
        .put("/api/v1/admin/settings")
        .authorization_bearer(&admin)
        .json(&json!({ "registration_open": false }))
        .await
        .assert_status_ok();

    let response = h
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "late@example.com",
            "password": "correct horse",
            "display_name": "Late",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_type() {
    use axum_test::multipart::{MultipartForm, Part};

    let h = harness().await;
    let token = register(&h.server, "uploader").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"#!/bin/sh".to_vec()).file_name("run.sh").mime_type("text/x-shellscript"),
    );
    let response = h
        .server
        .post("/api/v1/upload/image")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0x89, b'P', b'N', b'G']).file_name("tiny.png").mime_type("image/png"),
    );
    let response = h
        .server
        .post("/api/v1/upload/image")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let url = response.json::<Value>()["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    h.server.get(&url).await.assert_status_ok();
}
