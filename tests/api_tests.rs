use std::sync::Arc;

use subject_registry::{
    AppConfig, AppState, MockRepository, auth, create_router, repository::RepositoryState,
};
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub config: AppConfig,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MockRepository::new()) as RepositoryState;
    let config = AppConfig::default();

    let state = AppState {
        repo,
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, config }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(&format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_user_registration_end_to_end() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Register with a mixed-case username.
    let response = client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "A", "lastName": "B", "username": "Ab", "password": "p"
        }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);

    // The list must show the lowercased username and no password field.
    let list: Vec<serde_json::Value> = client
        .get(&format!("{}/api/users", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["username"], "ab");
    assert!(list[0].get("password").is_none());
    assert!(list[0].get("createdAt").is_some());

    // Login is case-insensitive on the username and must return a token the
    // verifier accepts.
    let login: serde_json::Value = client
        .post(&format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "AB", "password": "p" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(login["username"], "ab");
    assert_eq!(login["firstname"], "A");

    let token = login["access_token"].as_str().expect("token missing");
    let claims = auth::verify_token(token, &app.config.jwt_secret).expect("token must verify");
    assert_eq!(claims.username, "ab");
}

#[tokio::test]
async fn test_duplicate_username_differs_only_in_case() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let first = client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "A", "lastName": "B", "username": "alice", "password": "p"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "C", "lastName": "D", "username": "ALICE", "password": "q"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["message"], "Username already taken");
}

#[tokio::test]
async fn test_create_with_missing_fields_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "A", "lastName": "", "username": "ab", "password": "p"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Missing fields");
}

#[tokio::test]
async fn test_create_with_omitted_field_is_400_json() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Leaving a required key out of the body entirely must behave the same as
    // sending it empty: a 400 with the standard JSON message shape.
    let response = client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "A", "lastName": "B", "username": "ab"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Missing fields");
}

#[tokio::test]
async fn test_login_with_omitted_password_is_400_json() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "ab" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Missing username or password");
}

#[tokio::test]
async fn test_wrong_method_on_create_is_405() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/users/create", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Method GET not allowed on /api/users/create"
    );
}

#[tokio::test]
async fn test_unmatched_route_is_json_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/nothing/here", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_login_failures() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(&format!("{}/api/users/create", app.address))
        .json(&serde_json::json!({
            "firstName": "A", "lastName": "B", "username": "ab", "password": "p"
        }))
        .send()
        .await
        .unwrap();

    // Wrong password and unknown username answer identically.
    let wrong_pw = client
        .post(&format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "ab", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_pw.status(), 401);
    let body: serde_json::Value = wrong_pw.json().await.unwrap();
    assert_eq!(body["message"], "Invalid username or password");

    let unknown = client
        .post(&format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "nobody", "password": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 401);

    // Missing credentials are a validation failure, not an auth failure.
    let missing = client
        .post(&format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "ab", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);
}
