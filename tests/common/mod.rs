#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use user_service::auth::TokenCodec;
use user_service::configuration::JwtSettings;
use user_service::startup::run;
use user_service::store::InMemoryUserStore;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-characters";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub codec: TokenCodec,
    pub client: reqwest::Client,
}

pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryUserStore::new());
    let jwt_config = JwtSettings {
        secret: JWT_SECRET.to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    };

    // Lowest bcrypt cost keeps the suite fast
    let server = run(listener, store.clone(), jwt_config, 4).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        codec: TokenCodec::new(JWT_SECRET.as_bytes()),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, full_name: &str, username: &str) -> Session {
        let response = self
            .post_json(
                "/users/auth/register",
                &json!({
                    "fullName": full_name,
                    "username": username,
                    "password": PASSWORD
                }),
            )
            .await;
        assert_eq!(201, response.status().as_u16(), "registration failed");

        let body: Value = response.json().await.expect("Failed to parse response");
        Session {
            user_id: body["user"]["id"].as_str().unwrap().to_string(),
            access_token: body["accessToken"].as_str().unwrap().to_string(),
            refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json(
            "/users/auth/refresh",
            &json!({ "refreshToken": refresh_token }),
        )
        .await
    }
}

/// Status and envelope message of an error response
pub async fn error_of(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"].as_u64(), Some(status as u64));
    (status, body["message"].as_str().unwrap_or_default().to_string())
}
