use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::TestServer;

async fn post_json(
    client: &reqwest::Client,
    url: String,
    body: Value,
) -> (StatusCode, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledger"], "ok");
    assert_eq!(body["storage"], "ok");
}

#[tokio::test]
async fn test_health_reports_missing_storage() {
    let server = TestServer::start().await;
    std::fs::remove_dir_all(server.state.files.namespace().root()).unwrap();

    let response = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ledger"], "ok");
    assert_eq!(body["storage"], "unavailable");
}

#[tokio::test]
async fn test_signup_then_login() {
    let server = TestServer::start().await;
    let client = server.client();

    let (status, body) = post_json(
        &client,
        server.url("/auth/signup"),
        json!({ "username": "carol", "password": "password123", "email": "carol@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["username"], "carol");
    assert_eq!(body["user"]["email"], "carol@example.com");
    assert!(body["user"].get("password").is_none());
    let id = body["user"]["id"].clone();

    let (status, body) = post_json(
        &server.client(),
        server.url("/auth/login"),
        json!({ "username": "carol", "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], id);

    let (status, body) = post_json(
        &server.client(),
        server.url("/auth/login"),
        json!({ "username": "carol", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_signup_creates_storage_directory() {
    let server = TestServer::start().await;
    server.signed_up("dave").await;
    assert!(server.dir.path().join("storage").join("dave").is_dir());
    assert!(server.dir.path().join("users.enc").is_file());
}

#[tokio::test]
async fn test_signup_validation() {
    let server = TestServer::start().await;
    let client = server.client();

    let cases = [
        json!({ "username": "erin" }),
        json!({ "password": "password123" }),
        json!({ "username": "", "password": "password123" }),
        json!({ "username": "erin", "password": "12345" }),
        json!({ "username": "../erin", "password": "password123" }),
        json!({ "username": "..", "password": "password123" }),
    ];
    for case in cases {
        let (status, body) = post_json(&client, server.url("/auth/signup"), case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert!(body["message"].is_string());
    }

    let (_, body) = post_json(
        &client,
        server.url("/auth/signup"),
        json!({ "username": "erin", "password": "12345" }),
    )
    .await;
    assert_eq!(body["message"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = TestServer::start().await;
    let response = server
        .client()
        .post(server.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let server = TestServer::start().await;
    server.signed_up("frank").await;

    let (status, body) = post_json(
        &server.client(),
        server.url("/auth/signup"),
        json!({ "username": "frank", "password": "another-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_status_and_logout() {
    let server = TestServer::start().await;
    let anonymous = server.client();
    let body: Value = anonymous
        .get(server.url("/auth/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "loggedIn": false }));

    let client = server.signed_up("grace").await;
    let body: Value = client
        .get(server.url("/auth/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["loggedIn"], true);
    assert_eq!(body["user"]["username"], "grace");
    assert!(body["user"]["id"].is_string());

    let response = client.post(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.state.sessions.session_count().await, 0);

    let body: Value = client
        .get(server.url("/auth/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["loggedIn"], false);

    // Logging out again is harmless.
    let response = client.post(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let server = TestServer::start().await;
    let response = server
        .client()
        .post(server.url("/auth/signup"))
        .json(&json!({ "username": "heidi", "password": "password123" }))
        .send()
        .await
        .unwrap();

    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("shelfs_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_session_expires() {
    let server = TestServer::start().await;
    let client = server.signed_up("ivan").await;

    let response = client.get(server.url("/files/list")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.clock.advance(24 * 60 * 60 * 1000);
    let response = client.get(server.url("/files/list")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
