// handlers/protected/users.rs - User administration (/api/users)
//
// The route guard already limits these routes to administrators; each handler
// checks again with the same permission predicates before touching the store.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::utils::{double_option, validate_email, validate_name};
use crate::audit::changes_between;
use crate::database::{
    AuditAction, EntityType, NewAuditEntry, NewProfile, Profile, ProfileChanges, ProfileFilter,
};
use crate::error::ApiError;
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions::{self, Role};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub auth_user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub school_id: Option<Option<Uuid>>,
}

async fn load_target(state: &AppState, id: Uuid) -> Result<Profile, ApiError> {
    state
        .profiles
        .find_profile(id)
        .await?
        .filter(Profile::is_active)
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))
}

async fn ensure_school_exists(state: &AppState, school_id: Uuid) -> Result<(), ApiError> {
    match state.schools.find_school(school_id).await? {
        Some(school) if school.is_active => Ok(()),
        _ => Err(ApiError::field_error("school_id", "School does not exist")),
    }
}

/// GET /api/users - List profiles
///
/// Query: `school_id`, `role`, `include_inactive`.
pub async fn users_list(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<ProfileFilter>,
) -> ApiResult<Vec<Profile>> {
    permissions::require_admin(actor.role())?;
    let profiles = state.profiles.list_profiles(&filter).await?;
    Ok(ApiResponse::success(profiles))
}

/// GET /api/users/:id
pub async fn user_get(State(state): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Profile> {
    permissions::require_admin(actor.role())?;
    let profile = state
        .profiles
        .find_profile(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    Ok(ApiResponse::success(profile))
}

/// POST /api/users - Create a profile for an existing auth identity
///
/// Expected Input:
/// ```json
/// {
///   "auth_user_id": "uuid",
///   "email": "string",
///   "name": "string",
///   "role": "USER | DIRECTOR | PROFESOR | ADMIN | SUPER_ADMIN",
///   "school_id": "uuid (optional)"
/// }
/// ```
///
/// Admins may only create `USER` profiles. New profiles must change their
/// password on first sign-in.
pub async fn user_create(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateUser>,
) -> ApiResult<Profile> {
    permissions::require_admin(actor.role())?;
    if !permissions::can_create_user_with_role(actor.role(), payload.role) {
        return Err(ApiError::forbidden(format!(
            "You cannot create users with role {}",
            payload.role
        )));
    }

    let email = validate_email(&payload.email)?;
    let name = validate_name(&payload.name)?;
    if let Some(school_id) = payload.school_id {
        ensure_school_exists(&state, school_id).await?;
    }

    let profile = state
        .profiles
        .create_profile(NewProfile {
            auth_user_id: payload.auth_user_id,
            email,
            name,
            role: payload.role,
            school_id: payload.school_id,
            force_password_change: true,
        })
        .await?;

    tracing::info!(
        "Profile {} created with role {} by {}",
        profile.id,
        profile.role,
        actor.id()
    );
    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Create, EntityType::Profile)
            .entity(profile.id)
            .metadata(json!({ "email": profile.email, "role": profile.role, "school_id": profile.school_id })),
    );

    Ok(ApiResponse::created(profile))
}

/// PATCH /api/users/:id - Update name, role or school
///
/// `school_id: null` clears the assignment. Role changes require the actor to
/// be allowed to create users with the new role, and nobody changes their own
/// role.
pub async fn user_update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Profile> {
    permissions::require_admin(actor.role())?;
    let target = load_target(&state, id).await?;

    if !permissions::can_modify_user(actor.role(), target.role, Some(actor.id()), target.id) {
        return Err(ApiError::forbidden("You cannot modify this user"));
    }

    let mut changes = ProfileChanges::default();

    if let Some(name) = payload.name.as_deref() {
        changes.name = Some(validate_name(name)?);
    }

    if let Some(role) = payload.role.filter(|role| *role != target.role) {
        if target.id == actor.id() {
            return Err(ApiError::forbidden("You cannot change your own role"));
        }
        if !permissions::can_create_user_with_role(actor.role(), role) {
            return Err(ApiError::forbidden(format!("You cannot assign role {}", role)));
        }
        changes.role = Some(role);
    }

    if let Some(school_id) = payload.school_id {
        if let Some(school_id) = school_id {
            ensure_school_exists(&state, school_id).await?;
        }
        changes.school_id = Some(school_id);
    }

    if changes.is_empty() {
        return Err(ApiError::validation_error("No changes provided", None));
    }

    let updated = state.profiles.update_profile(target.id, changes).await?;

    let actor_id = Some(actor.id());
    let mut entry = NewAuditEntry::new(actor_id, AuditAction::Update, EntityType::Profile).entity(updated.id);
    if let Some(diff) = changes_between(&target, &updated) {
        entry = entry.changes(diff);
    }
    state.audit.record(entry);

    if target.role != updated.role {
        state.audit.record(
            NewAuditEntry::new(actor_id, AuditAction::RoleAssign, EntityType::Profile)
                .entity(updated.id)
                .changes(json!({ "role": { "from": target.role, "to": updated.role } })),
        );
    }
    if target.school_id != updated.school_id {
        state.audit.record(
            NewAuditEntry::new(actor_id, AuditAction::SchoolAssign, EntityType::Profile)
                .entity(updated.id)
                .changes(json!({ "school_id": { "from": target.school_id, "to": updated.school_id } })),
        );
    }

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/users/:id - Deactivate a profile
pub async fn user_deactivate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Profile> {
    permissions::require_admin(actor.role())?;
    let target = load_target(&state, id).await?;

    if target.id == actor.id() {
        return Err(ApiError::forbidden("You cannot deactivate your own account"));
    }
    if !permissions::can_modify_user(actor.role(), target.role, Some(actor.id()), target.id) {
        return Err(ApiError::forbidden("You cannot deactivate this user"));
    }

    let profile = state.profiles.deactivate_profile(target.id).await?;

    tracing::info!("Profile {} deactivated by {}", profile.id, actor.id());
    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Delete, EntityType::Profile)
            .entity(profile.id)
            .metadata(json!({ "email": profile.email })),
    );

    Ok(ApiResponse::success(profile))
}
