#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use reqwest::{header, RequestBuilder, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use cemse_api::config::{AppConfig, Environment};
use cemse_api::database::{
    AuditEntry, AuditFilter, AuditStore, MemoryStore, NewProfile, Profile, ProfileStore,
};
use cemse_api::permissions::Role;
use cemse_api::session::{issue_token, JwtSessionProvider, Session, SessionError, SessionProvider};
use cemse_api::storage::LocalFileStorage;
use cemse_api::{app, AppState};

pub const MAX_FILE_BYTES: usize = 1024;
pub const MAX_BATCH_FILES: usize = 3;

/// JWT sessions plus an in-memory record of password changes.
pub struct TestSessions {
    inner: JwtSessionProvider,
    pub passwords: Mutex<Vec<(Uuid, String)>>,
}

#[async_trait]
impl SessionProvider for TestSessions {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        self.inner.get_session(headers).await
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<(), SessionError> {
        self.passwords
            .lock()
            .unwrap()
            .push((session.user_id, new_password.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub base_url: String,
    pub config: AppConfig,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<TestSessions>,
    pub upload_dir: PathBuf,
    pub client: reqwest::Client,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.uploads.dir = std::env::temp_dir().join(format!("cemse-uploads-{}", Uuid::new_v4().simple()));
    config.uploads.max_file_bytes = MAX_FILE_BYTES;
    config.uploads.max_batch_files = MAX_BATCH_FILES;
    config.security.enable_audit_logging = true;
    config
}

pub async fn spawn() -> Result<TestApp> {
    spawn_with(|_| {}).await
}

/// Start the router in-process on a free port. `customize` may swap any
/// collaborator in the state before the server starts.
pub async fn spawn_with(customize: impl FnOnce(&mut AppState)) -> Result<TestApp> {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let sessions = Arc::new(TestSessions {
        inner: JwtSessionProvider::new(&config.session),
        passwords: Mutex::new(Vec::new()),
    });
    let files = Arc::new(LocalFileStorage::new(&config.uploads.dir));

    let mut state = AppState::with_store(config.clone(), sessions.clone(), store.clone(), files);
    customize(&mut state);

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test port")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let test_app = TestApp {
        base_url,
        upload_dir: config.uploads.dir.clone(),
        config,
        store,
        sessions,
        client,
    };
    test_app.wait_ready(Duration::from_secs(5)).await?;
    Ok(test_app)
}

impl TestApp {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, auth_user_id: Uuid, email: &str) -> String {
        issue_token(&self.config.session, auth_user_id, email).expect("token")
    }

    /// Insert a profile directly into the store and return it with a valid token.
    pub async fn seed(&self, role: Role, email: &str) -> (Profile, String) {
        let auth_user_id = Uuid::new_v4();
        let profile = self
            .store
            .create_profile(NewProfile {
                auth_user_id,
                email: email.to_string(),
                name: format!("Test {}", role),
                role,
                school_id: None,
                force_password_change: false,
            })
            .await
            .expect("seed profile");
        let token = self.token_for(auth_user_id, email);
        (profile, token)
    }

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_session(self.client.get(self.url(path)), token)
    }

    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_session(self.client.post(self.url(path)), token)
    }

    pub fn patch(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_session(self.client.patch(self.url(path)), token)
    }

    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_session(self.client.delete(self.url(path)), token)
    }

    /// Audit writes are detached tasks; poll until `min` matching entries exist.
    pub async fn audit_entries(&self, filter: AuditFilter, min: usize) -> Vec<AuditEntry> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let entries = self.store.list_audit(&filter).await.expect("list audit");
            if entries.len() >= min || Instant::now() > deadline {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

fn with_session(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.header(header::COOKIE, format!("cemse_session={}", token)),
        None => builder,
    }
}

pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookies(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

pub async fn json_body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("json body")
}
