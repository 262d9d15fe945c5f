//! Shared harness: the real router on an ephemeral port over an in-memory store.

#![allow(dead_code)]

use game_catalog::crypto::token::TokenKeys;
use game_catalog::transport::http::{create_router, AppState};
use game_catalog::MemoryStore;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: MemoryStore,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    let store = MemoryStore::new();
    let tokens = TokenKeys::new(JWT_SECRET, Duration::from_secs(3600));
    let state = AppState::new(Arc::new(store.clone()), tokens);
    let router = create_router(state.clone(), Duration::from_secs(30));

    // Bind to an ephemeral port so tests can run in parallel.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://127.0.0.1:{}/api/v1", port),
        client: reqwest::Client::new(),
        store,
        state,
    }
}

impl TestApp {
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    pub fn authed(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(token)
    }

    pub async fn register(&self, email: &str, username: &str, age: i32) -> Response {
        self.request(Method::POST, "/users")
            .json(&json!({
                "user": {
                    "email": email,
                    "username": username,
                    "age": age,
                    "password": PASSWORD,
                }
            }))
            .send()
            .await
            .unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.request(Method::POST, "/users/login")
            .json(&json!({ "user": { "email": email, "password": password } }))
            .send()
            .await
            .unwrap()
    }

    /// Registers a user and returns a token for it.
    pub async fn signed_up(&self, email: &str, username: &str, age: i32) -> String {
        let created = self.register(email, username, age).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body(self.login(email, PASSWORD).await).await;
        body["data"]["user"]["token"].as_str().unwrap().to_string()
    }

    pub async fn create_game(&self, token: &str, title: &str, age_rating: i32) -> Value {
        let response = self
            .authed(Method::POST, "/games", token)
            .json(&json!({ "game": { "title": title, "ageRating": age_rating } }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body(response).await["data"]["game"].clone()
    }

    pub async fn link(&self, token: &str, username: &str, title: &str) -> Response {
        self.authed(Method::POST, "/games/link", token)
            .json(&json!({ "user": { "username": username }, "game": { "title": title } }))
            .send()
            .await
            .unwrap()
    }
}

pub async fn body(response: Response) -> Value {
    response.json::<Value>().await.unwrap()
}
