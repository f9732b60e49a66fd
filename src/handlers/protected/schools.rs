// handlers/protected/schools.rs - School registry (/api/schools)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::utils::{double_option, validate_school_code};
use crate::audit::changes_between;
use crate::database::{AuditAction, EntityType, NewAuditEntry, NewSchool, School, SchoolChanges};
use crate::error::ApiError;
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SchoolListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSchool {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchool {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn validate_school_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.chars().count() < 2 || name.chars().count() > 200 {
        return Err(ApiError::field_error("name", "School name must be between 2 and 200 characters"));
    }
    Ok(name.to_string())
}

fn normalize_address(address: Option<String>) -> Option<String> {
    address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())
}

/// GET /api/schools - Active schools; administrators may include inactive ones
pub async fn schools_list(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<SchoolListQuery>,
) -> ApiResult<Vec<School>> {
    let include_inactive = query.include_inactive && permissions::is_admin(actor.role());
    Ok(ApiResponse::success(state.schools.list_schools(include_inactive).await?))
}

/// GET /api/schools/:id
pub async fn school_get(State(state): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<School> {
    let school = state
        .schools
        .find_school(id)
        .await?
        .filter(|s| s.is_active || permissions::is_admin(actor.role()))
        .ok_or_else(|| ApiError::not_found(format!("School {} not found", id)))?;
    Ok(ApiResponse::success(school))
}

/// POST /api/schools - Register a school (admin)
pub async fn school_create(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateSchool>,
) -> ApiResult<School> {
    permissions::require_admin(actor.role())?;

    let school = state
        .schools
        .create_school(NewSchool {
            name: validate_school_name(&payload.name)?,
            code: validate_school_code(&payload.code)?,
            address: normalize_address(payload.address),
        })
        .await?;

    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Create, EntityType::School)
            .entity(school.id)
            .metadata(json!({ "code": school.code, "name": school.name })),
    );

    Ok(ApiResponse::created(school))
}

/// PATCH /api/schools/:id (admin)
pub async fn school_update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSchool>,
) -> ApiResult<School> {
    permissions::require_admin(actor.role())?;

    let before = state
        .schools
        .find_school(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("School {} not found", id)))?;

    let changes = SchoolChanges {
        name: payload.name.as_deref().map(validate_school_name).transpose()?,
        code: payload.code.as_deref().map(validate_school_code).transpose()?,
        address: payload.address.map(normalize_address),
        is_active: payload.is_active,
    };
    if changes.is_empty() {
        return Err(ApiError::validation_error("No changes provided", None));
    }

    let updated = state.schools.update_school(id, changes).await?;

    let mut entry = NewAuditEntry::new(Some(actor.id()), AuditAction::Update, EntityType::School).entity(id);
    if let Some(diff) = changes_between(&before, &updated) {
        entry = entry.changes(diff);
    }
    state.audit.record(entry);

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/schools/:id - Deactivate (super admin)
pub async fn school_deactivate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<School> {
    permissions::require_super_admin(actor.role())?;

    let school = state
        .schools
        .update_school(
            id,
            SchoolChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Delete, EntityType::School)
            .entity(school.id)
            .metadata(json!({ "code": school.code })),
    );

    Ok(ApiResponse::success(school))
}
