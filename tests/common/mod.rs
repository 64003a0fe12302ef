#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

use agri_api_rust::auth::{SocialIdentity, SocialIdentityProvider, SocialLoginError};
use agri_api_rust::config::AppConfig;
use agri_api_rust::database::Database;
use agri_api_rust::{app, AppState};

/// Connection string for database-backed tests, if one is configured.
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
}

/// Resolves WeChat codes locally: `code` maps to open id `openid-<code>`,
/// and the code `rejected` fails the way an invalid code does upstream.
pub struct StubSocial;

#[async_trait]
impl SocialIdentityProvider for StubSocial {
    async fn exchange_code(&self, code: &str) -> Result<SocialIdentity, SocialLoginError> {
        if code == "rejected" {
            return Err(SocialLoginError::Rejected {
                code: 40029,
                message: "invalid code".to_string(),
            });
        }
        Ok(SocialIdentity {
            open_id: format!("openid-{code}"),
            union_id: None,
        })
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub db: Database,
}

/// Start the full router on a free port. Returns `None` (and the caller
/// should return early) when no test database is configured.
pub async fn spawn_app() -> Result<Option<TestApp>> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL to run database tests");
        return Ok(None);
    };

    let config = AppConfig::for_tests(url);
    let db = Database::connect(&config.database).await.context("connect test database")?;
    db.migrate().await.context("migrate test database")?;

    let state = AppState::new(config, db.clone(), Arc::new(StubSocial))?;
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app(state)).await {
            eprintln!("test server stopped: {e}");
        }
    });

    Ok(Some(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client: Client::new(),
        db,
    }))
}

/// A name no other test run has used.
pub fn unique_name(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}_{}_{}", prefix, nanos % 1_000_000_000_000, COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// A signed-in account created through the public API.
pub struct Account {
    pub username: String,
    pub password: String,
    pub token: String,
    pub id: i64,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    pub async fn register(&self, prefix: &str) -> Result<Account> {
        let username = unique_name(prefix);
        let password = "s3cret-pass".to_string();
        let (status, body) = self
            .post("/register", None, json!({ "username": username, "password": password }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {status} {body}");

        let token = body["data"]["token"].as_str().context("token missing")?.to_string();
        let id = body["data"]["customerId"].as_i64().context("customerId missing")?;
        Ok(Account { username, password, token, id })
    }

    /// Grant the admin role directly in the database.
    pub async fn make_admin(&self, account: &Account) -> Result<()> {
        sqlx::query("UPDATE users SET role = 1 WHERE id = $1")
            .bind(account.id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
