// handlers/public/session.rs - Session establishment and sign-out (/auth/*)

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Uri},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::database::{AuditAction, EntityType, NewAuditEntry, NewProfile, Profile, StoreError};
use crate::error::AccessError;
use crate::guard::{self, DASHBOARD_PATH, SIGN_IN_PATH};
use crate::permissions::Role;
use crate::session::{clear_cookie, set_cookie, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub token: Option<String>,
    pub next: Option<String>,
}

/// Only same-site absolute paths that are valid `Location` values are
/// followed after sign-in.
fn local_path(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains(char::is_control)
                && HeaderValue::from_str(path).is_ok()
                && path.parse::<Uri>().is_ok() =>
        {
            path
        }
        _ => DASHBOARD_PATH,
    }
}

fn invalid_session() -> Response {
    Redirect::temporary(&format!("{}?error=invalid_session", SIGN_IN_PATH)).into_response()
}

fn display_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email).trim();
    if local.chars().count() >= 2 {
        local.to_string()
    } else {
        email.to_string()
    }
}

/// First sign-in of an identity registers a `USER` profile for it.
async fn find_or_register(state: &AppState, session: &Session) -> Result<Profile, StoreError> {
    if let Some(profile) = state.profiles.find_profile_by_session_id(session.user_id).await? {
        return Ok(profile);
    }

    let profile = state
        .profiles
        .create_profile(NewProfile {
            auth_user_id: session.user_id,
            email: session.email.trim().to_ascii_lowercase(),
            name: display_name(&session.email),
            role: Role::User,
            school_id: None,
            force_password_change: false,
        })
        .await?;

    tracing::info!("Registered profile {} for identity {}", profile.id, session.user_id);
    state.audit.record(
        NewAuditEntry::new(Some(profile.id), AuditAction::Create, EntityType::Profile)
            .entity(profile.id)
            .metadata(json!({ "source": "registration", "email": profile.email })),
    );
    Ok(profile)
}

/// GET /auth/callback?token=<jwt>&next=<path>
///
/// Verifies the token issued by the auth service, registers a profile on
/// first sign-in, sets the session cookie and redirects to `next`.
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let Some(token) = query.token.as_deref().filter(|t| !t.is_empty()) else {
        return invalid_session();
    };
    let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) else {
        return invalid_session();
    };
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, bearer);

    let session = match state.sessions.get_session(&headers).await {
        Ok(Some(session)) => session,
        Ok(None) => return invalid_session(),
        Err(e) => {
            tracing::error!("Session provider failed during callback: {}", e);
            return Redirect::temporary(&format!("{}?error=session_error", SIGN_IN_PATH)).into_response();
        }
    };

    let profile = match find_or_register(&state, &session).await {
        Ok(profile) => profile,
        // A deactivated profile still owns the identity.
        Err(StoreError::Conflict(detail)) => {
            tracing::warn!("Sign-in refused for identity {}: {}", session.user_id, detail);
            return invalid_session();
        }
        Err(e) => {
            tracing::error!("Profile lookup failed during callback: {}", e);
            return Redirect::temporary(&format!("{}?error=session_error", SIGN_IN_PATH)).into_response();
        }
    };

    state.audit.record(
        NewAuditEntry::new(Some(profile.id), AuditAction::Login, EntityType::Session).entity(session.user_id),
    );

    let config = &state.config.session;
    let max_age = (session.expires_at - chrono::Utc::now()).num_seconds().max(0);
    let cookie = set_cookie(&config.cookie_name, token, Some(max_age), config.secure_cookie, true);

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::temporary(local_path(query.next.as_deref())),
    )
        .into_response()
}

/// POST /auth/sign-out - Clear the session cookie
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match guard::resolve_actor(&headers, state.sessions.as_ref(), state.profiles.as_ref()).await {
        Ok(actor) => state.audit.record(
            NewAuditEntry::new(Some(actor.id()), AuditAction::Logout, EntityType::Session)
                .entity(actor.session.user_id),
        ),
        Err(AccessError::Upstream(detail)) => tracing::warn!("Sign-out without session lookup: {}", detail),
        Err(_) => {}
    }

    let config = &state.config.session;
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie(&config.cookie_name, config.secure_cookie))]),
        Redirect::to(SIGN_IN_PATH),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(local_path(Some("/users")), "/users");
        assert_eq!(local_path(Some("https://evil.example")), DASHBOARD_PATH);
        assert_eq!(local_path(Some("//evil.example")), DASHBOARD_PATH);
        assert_eq!(local_path(None), DASHBOARD_PATH);
        assert_eq!(local_path(Some("/\nevil")), DASHBOARD_PATH);
        assert_eq!(local_path(Some("/users\r\nSet-Cookie: x=1")), DASHBOARD_PATH);
        assert_eq!(local_path(Some("/caso acta")), DASHBOARD_PATH);
        assert_eq!(local_path(Some("/users?page=2")), "/users?page=2");
    }

    #[test]
    fn display_name_from_email() {
        assert_eq!(display_name("ana.perez@cemse.org"), "ana.perez");
        assert_eq!(display_name("a@cemse.org"), "a@cemse.org");
    }
}
