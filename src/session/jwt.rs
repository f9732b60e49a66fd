use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{extract_token, Session, SessionError, SessionProvider};
use crate::config::{SessionConfig, MAX_SESSION_EXPIRY_HOURS};

/// Claims carried by session tokens from the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.min(MAX_SESSION_EXPIRY_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            sub: user_id,
            email: email.into(),
            exp,
            iat: now.timestamp(),
        }
    }

    fn into_session(self) -> Session {
        Session {
            user_id: self.sub,
            email: self.email,
            issued_at: timestamp(self.iat),
            expires_at: timestamp(self.exp),
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// Sign a session token. Used by the `token` CLI command and by tests; in
/// deployment the auth service issues tokens with the shared secret.
pub fn issue_token(config: &SessionConfig, user_id: Uuid, email: &str) -> Result<String, SessionError> {
    if config.jwt_secret.is_empty() {
        return Err(SessionError::Misconfigured("JWT secret not configured".to_string()));
    }

    let claims = Claims::new(user_id, email, config.expiry_hours);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| SessionError::Misconfigured(format!("JWT generation error: {}", e)))
}

/// Verifies HS256 session tokens and forwards password changes to the auth
/// service admin API.
pub struct JwtSessionProvider {
    cookie_name: String,
    decoding_key: Option<DecodingKey>,
    admin_url: Option<url::Url>,
    service_key: Option<String>,
    client: reqwest::Client,
}

impl JwtSessionProvider {
    pub fn new(config: &SessionConfig) -> Self {
        let decoding_key = if config.jwt_secret.is_empty() {
            None
        } else {
            Some(DecodingKey::from_secret(config.jwt_secret.as_bytes()))
        };

        // Trailing slash so `join` appends rather than replaces the last segment
        let admin_url = config.auth_admin_url.as_deref().and_then(|raw| {
            let normalized = if raw.ends_with('/') {
                raw.to_string()
            } else {
                format!("{}/", raw)
            };
            url::Url::parse(&normalized)
                .map_err(|e| tracing::warn!("Ignoring invalid AUTH_ADMIN_URL '{}': {}", raw, e))
                .ok()
        });

        Self {
            cookie_name: config.cookie_name.clone(),
            decoding_key,
            admin_url,
            service_key: config.auth_service_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn validate(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| SessionError::Misconfigured("JWT secret not configured".to_string()))?;

        match decode::<Claims>(token, key, &Validation::default()) {
            Ok(data) => Ok(Some(data.claims.into_session())),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        match extract_token(headers, &self.cookie_name) {
            Some(token) => self.validate(&token),
            None => Ok(None),
        }
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<(), SessionError> {
        let base = self.admin_url.as_ref().ok_or(SessionError::Unsupported)?;
        let url = base
            .join(&format!("users/{}", session.user_id))
            .map_err(|e| SessionError::Misconfigured(format!("invalid admin url: {}", e)))?;

        let mut request = self.client.put(url).json(&json!({ "password": new_password }));
        if let Some(key) = &self.service_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(SessionError::Rejected(format!("Password rejected by auth service: {}", body)))
        } else {
            Err(SessionError::Provider(format!("auth service returned {}: {}", status, body)))
        }
    }
}
