//! Session provider seam.
//!
//! Sessions are issued by the external auth service. This crate only verifies
//! them and reads the identity they carry; the provider is consulted through
//! the [`SessionProvider`] trait so the guard never depends on a concrete
//! implementation.

mod jwt;

pub use jwt::{issue_token, Claims, JwtSessionProvider};

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated actor as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identity id at the auth service; profiles reference it as `auth_user_id`.
    pub user_id: Uuid,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session provider misconfigured: {0}")]
    Misconfigured(String),

    #[error("operation not supported by this session provider")]
    Unsupported,

    /// The provider refused the request (e.g. a password it considers weak).
    #[error("{0}")]
    Rejected(String),

    #[error("session provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current session for the request, or `None` when there is no valid one.
    ///
    /// Missing, malformed and expired tokens are all `Ok(None)`; `Err` is kept
    /// for provider failures.
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError>;

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<(), SessionError>;
}

/// Read a cookie value from the `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next()?;
            if key == name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
}

/// Session token from the session cookie, falling back to a bearer header.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = cookie_value(headers, cookie_name) {
        return Some(token);
    }

    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// `Set-Cookie` value scoped to the whole site. `max_age: None` makes a
/// browser-session cookie.
pub fn set_cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool, http_only: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; SameSite=Lax", name, value);
    if let Some(seconds) = max_age {
        cookie.push_str(&format!("; Max-Age={}", seconds));
    }
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", Some(0), secure, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_attributes() {
        assert_eq!(
            set_cookie("cemse_session", "tok", Some(3600), true, true),
            "cemse_session=tok; Path=/; SameSite=Lax; Max-Age=3600; HttpOnly; Secure"
        );
        assert_eq!(set_cookie("cemse_theme", "dark", None, false, false), "cemse_theme=dark; Path=/; SameSite=Lax");
        assert!(clear_cookie("cemse_session", false).contains("Max-Age=0"));
    }

    #[test]
    fn finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("cemse_theme=dark; cemse_session=abc.def; other=1"),
        );
        assert_eq!(cookie_value(&headers, "cemse_session").as_deref(), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "cemse_theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("cemse_session="));
        assert_eq!(extract_token(&headers, "cemse_session"), None);
    }

    #[test]
    fn bearer_header_is_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_token(&headers, "cemse_session").as_deref(), Some("tok"));

        headers.insert(header::COOKIE, HeaderValue::from_static("cemse_session=cookie-tok"));
        assert_eq!(extract_token(&headers, "cemse_session").as_deref(), Some("cookie-tok"));
    }

    #[test]
    fn non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers, "cemse_session"), None);
    }
}
