// handlers/protected/audit.rs - Audit trail (/api/audit)

use axum::extract::{Query, State};

use crate::database::{AuditEntry, AuditFilter};
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions;
use crate::state::AppState;

/// GET /api/audit - Newest entries first
///
/// Query: `entity_type`, `entity_id`, `actor_id`, `limit` (default 50, max 200).
pub async fn audit_list(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<AuditFilter>,
) -> ApiResult<Vec<AuditEntry>> {
    permissions::require_admin(actor.role())?;
    Ok(ApiResponse::success(state.audit.list(&filter).await?))
}
