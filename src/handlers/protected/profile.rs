// handlers/protected/profile.rs - Self-service profile endpoints (/api/profile)

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::{validate_name, validate_password};
use crate::audit::changes_between;
use crate::database::{AuditAction, EntityType, NewAuditEntry, Profile, ProfileChanges};
use crate::error::ApiError;
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::{cookie_value, set_cookie};
use crate::state::AppState;
use crate::ui::{reduce_theme, Theme, ThemeAction};

#[derive(Debug, Deserialize)]
pub struct UpdateOwnProfile {
    pub name: Option<String>,
    // Accepted only to reject them explicitly.
    pub role: Option<Value>,
    pub school_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePassword {
    pub new_password: String,
    pub confirm_password: String,
}

/// GET /api/profile - Current user's profile
pub async fn profile_get(actor: Actor) -> ApiResult<Profile> {
    Ok(ApiResponse::success(actor.profile))
}

/// PATCH /api/profile - Update own display name
///
/// Role and school assignments go through /api/users and are refused here.
pub async fn profile_patch(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<UpdateOwnProfile>,
) -> ApiResult<Profile> {
    if payload.role.is_some() || payload.school_id.is_some() {
        return Err(ApiError::forbidden(
            "Role and school can only be changed by an administrator",
        ));
    }
    let name = payload
        .name
        .as_deref()
        .ok_or_else(|| ApiError::field_error("name", "Name is required"))
        .and_then(validate_name)?;

    let before = actor.profile;
    let updated = state
        .profiles
        .update_profile(
            before.id,
            ProfileChanges {
                name: Some(name),
                ..Default::default()
            },
        )
        .await?;

    let mut entry = NewAuditEntry::new(Some(before.id), AuditAction::Update, EntityType::Profile).entity(before.id);
    if let Some(changes) = changes_between(&before, &updated) {
        entry = entry.changes(changes);
    }
    state.audit.record(entry);

    Ok(ApiResponse::success(updated))
}

/// POST /api/profile/password - Change own password
///
/// Expected Input:
/// ```json
/// { "new_password": "string (min 8)", "confirm_password": "string" }
/// ```
///
/// The new password is forwarded to the auth service; on success the
/// profile's `force_password_change` flag is cleared.
pub async fn password_post(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ChangePassword>,
) -> ApiResult<Profile> {
    validate_password(&payload.new_password, &payload.confirm_password)?;

    state
        .sessions
        .update_password(&actor.session, &payload.new_password)
        .await?;

    let profile = if actor.profile.force_password_change {
        state
            .profiles
            .update_profile(
                actor.profile.id,
                ProfileChanges {
                    force_password_change: Some(false),
                    ..Default::default()
                },
            )
            .await?
    } else {
        actor.profile
    };

    tracing::info!("Password changed for profile {}", profile.id);
    state.audit.record(
        NewAuditEntry::new(Some(profile.id), AuditAction::PasswordChange, EntityType::Profile).entity(profile.id),
    );

    Ok(ApiResponse::success(profile))
}

fn current_theme(state: &AppState, headers: &HeaderMap) -> Theme {
    cookie_value(headers, &state.config.session.theme_cookie_name)
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

/// GET /api/profile/preferences/theme
pub async fn theme_get(State(state): State<AppState>, _actor: Actor, headers: HeaderMap) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "theme": current_theme(&state, &headers) })))
}

/// POST /api/profile/preferences/theme - Apply a theme action
///
/// Body is a `ThemeAction`: `{"type":"set","theme":"dark"}` or `{"type":"toggle"}`.
/// The result is stored in a browser-session cookie.
pub async fn theme_post(
    State(state): State<AppState>,
    _actor: Actor,
    headers: HeaderMap,
    Json(action): Json<ThemeAction>,
) -> impl IntoResponse {
    let theme = reduce_theme(current_theme(&state, &headers), action);
    let cookie = set_cookie(
        &state.config.session.theme_cookie_name,
        theme.as_str(),
        None,
        state.config.session.secure_cookie,
        false,
    );

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::success(json!({ "theme": theme })),
    )
}
