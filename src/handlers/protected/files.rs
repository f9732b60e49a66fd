// handlers/protected/files.rs - File uploads and case evidence (/api/files)

use axum::extract::{
    multipart::{Field, MultipartError},
    Multipart, Path, Query, State,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::{AuditAction, EntityType, Evidence, NewAuditEntry, NewEvidence};
use crate::error::ApiError;
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions;
use crate::state::AppState;
use crate::storage::{
    is_safe_relative_path, sanitize_file_name, validate_upload, StoredFile, UploadRejection,
};

const UPLOAD_FOLDERS: &[&str] = &["avatars", "documents"];
const DEFAULT_FOLDER: &str = "documents";

#[derive(Debug, Deserialize)]
pub struct DeleteFileQuery {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct EvidenceBatch {
    pub case_id: Uuid,
    pub uploaded: Vec<Evidence>,
    pub skipped: Vec<SkippedFile>,
}

struct UploadedPart {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

enum CappedRead {
    Complete(Vec<u8>),
    TooLarge(usize),
}

/// Read a field chunk by chunk, giving up as soon as it passes `max` bytes.
/// The unread remainder is skipped by the next `next_field` call.
async fn read_capped(field: &mut Field<'_>, max: usize) -> Result<CappedRead, MultipartError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > max {
            return Ok(CappedRead::TooLarge(buf.len() + chunk.len()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(CappedRead::Complete(buf))
}

fn field_meta(field: &Field<'_>) -> (String, String) {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    (file_name, content_type)
}

fn storage_name(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name))
}

fn rejection_error(rejection: UploadRejection) -> ApiError {
    if rejection.is_size() {
        ApiError::payload_too_large(rejection.to_string())
    } else {
        ApiError::field_error("file", rejection.to_string())
    }
}

/// POST /api/files - Upload a single file
///
/// Multipart fields:
/// - `file`: the file (required)
/// - `folder`: `avatars` or `documents` (default `documents`)
///
/// Stored as `<folder>/<uuid>-<sanitized name>`.
pub async fn file_upload(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> ApiResult<StoredFile> {
    let mut folder = DEFAULT_FOLDER.to_string();
    let mut upload: Option<UploadedPart> = None;

    let max = state.config.uploads.max_file_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("folder") => folder = field.text().await?.trim().to_string(),
            Some("file") => {
                let (file_name, content_type) = field_meta(&field);
                let bytes = match read_capped(&mut field, max).await? {
                    CappedRead::Complete(bytes) => bytes,
                    CappedRead::TooLarge(size) => {
                        return Err(rejection_error(UploadRejection::TooLarge { size, max }));
                    }
                };
                upload = Some(UploadedPart {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    if !UPLOAD_FOLDERS.contains(&folder.as_str()) {
        return Err(ApiError::field_error(
            "folder",
            format!("Folder must be one of: {}", UPLOAD_FOLDERS.join(", ")),
        ));
    }
    let upload = upload.ok_or_else(|| ApiError::field_error("file", "No file provided"))?;

    validate_upload(
        &upload.file_name,
        &upload.content_type,
        upload.bytes.len(),
        &state.config.uploads,
    )
    .map_err(rejection_error)?;

    let path = format!("{}/{}", folder, storage_name(&upload.file_name));
    let stored = state.files.put(&path, &upload.bytes, &upload.content_type).await?;

    tracing::info!("Uploaded {} ({} bytes) for profile {}", stored.path, stored.size, actor.id());
    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Upload, EntityType::File)
            .entity(&stored.path)
            .metadata(json!({
                "file_name": upload.file_name,
                "content_type": stored.content_type,
                "size": stored.size,
                "sha256": stored.sha256,
            })),
    );

    Ok(ApiResponse::created(stored))
}

/// DELETE /api/files?path=<relative path> (admin)
pub async fn file_delete(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<DeleteFileQuery>,
) -> ApiResult<Value> {
    permissions::require_admin(actor.role())?;
    if !is_safe_relative_path(&query.path) {
        return Err(ApiError::field_error("path", "Invalid file path"));
    }

    state.files.delete(&query.path).await?;

    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Delete, EntityType::File).entity(&query.path),
    );

    Ok(ApiResponse::success(json!({ "deleted": query.path })))
}

/// POST /api/files/evidence/:case_id - Bulk evidence upload
///
/// Every `files` field is processed independently. Files that fail validation,
/// exceed the batch size or cannot be stored are reported under `skipped`
/// and the rest of the batch continues. If the body breaks off after the first
/// file, the files handled so far are still reported.
pub async fn evidence_upload(
    State(state): State<AppState>,
    actor: Actor,
    Path(case_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<EvidenceBatch> {
    let limits = &state.config.uploads;
    let mut uploaded = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = 0usize;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if seen > 0 => {
                tracing::warn!("Evidence batch for case {} ended early: {}", case_id, e);
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if field.name() != Some("files") {
            continue;
        }
        seen += 1;

        let (file_name, content_type) = field_meta(&field);

        if seen > limits.max_batch_files {
            skipped.push(SkippedFile {
                file_name,
                reason: UploadRejection::BatchLimit {
                    max: limits.max_batch_files,
                }
                .to_string(),
            });
            continue;
        }

        let bytes = match read_capped(&mut field, limits.max_file_bytes).await {
            Ok(CappedRead::Complete(bytes)) => bytes,
            Ok(CappedRead::TooLarge(size)) => {
                let rejection = UploadRejection::TooLarge {
                    size,
                    max: limits.max_file_bytes,
                };
                tracing::debug!("Skipping evidence '{}': {}", file_name, rejection);
                skipped.push(SkippedFile {
                    file_name,
                    reason: rejection.to_string(),
                });
                continue;
            }
            Err(e) => {
                tracing::warn!("Evidence '{}' for case {} was cut off: {}", file_name, case_id, e);
                skipped.push(SkippedFile {
                    file_name,
                    reason: "upload interrupted".to_string(),
                });
                break;
            }
        };

        if let Err(rejection) = validate_upload(&file_name, &content_type, bytes.len(), limits) {
            tracing::debug!("Skipping evidence '{}': {}", file_name, rejection);
            skipped.push(SkippedFile {
                file_name,
                reason: rejection.to_string(),
            });
            continue;
        }

        match store_evidence(&state, &actor, case_id, &file_name, &content_type, &bytes).await {
            Ok(evidence) => uploaded.push(evidence),
            Err(reason) => skipped.push(SkippedFile { file_name, reason }),
        }
    }

    if seen == 0 {
        return Err(ApiError::field_error("files", "No files provided"));
    }

    tracing::info!(
        "Evidence batch for case {}: {} stored, {} skipped",
        case_id,
        uploaded.len(),
        skipped.len()
    );

    Ok(ApiResponse::created(EvidenceBatch {
        case_id,
        uploaded,
        skipped,
    }))
}

/// Store one evidence file and its metadata row. Failures come back as a
/// skip reason; the bytes are removed again if the row cannot be written.
async fn store_evidence(
    state: &AppState,
    actor: &Actor,
    case_id: Uuid,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<Evidence, String> {
    let path = format!("evidence/{}/{}", case_id, storage_name(file_name));

    let stored = state.files.put(&path, bytes, content_type).await.map_err(|e| {
        tracing::error!("Failed to store evidence '{}': {}", file_name, e);
        "storage error".to_string()
    })?;

    let evidence = state
        .evidence
        .insert_evidence(NewEvidence {
            case_id,
            file_name: file_name.to_string(),
            storage_path: stored.path.clone(),
            content_type: stored.content_type.clone(),
            size_bytes: stored.size as i64,
            sha256: stored.sha256.clone(),
            uploaded_by: actor.id(),
        })
        .await;

    let evidence = match evidence {
        Ok(evidence) => evidence,
        Err(e) => {
            tracing::error!("Failed to record evidence '{}': {}", file_name, e);
            if let Err(e) = state.files.delete(&stored.path).await {
                tracing::warn!("Failed to remove orphaned evidence {}: {}", stored.path, e);
            }
            return Err("database error".to_string());
        }
    };

    state.audit.record(
        NewAuditEntry::new(Some(actor.id()), AuditAction::Upload, EntityType::Evidence)
            .entity(evidence.id)
            .metadata(json!({
                "case_id": case_id,
                "file_name": evidence.file_name,
                "size": evidence.size_bytes,
                "sha256": evidence.sha256,
            })),
    );

    Ok(evidence)
}

/// GET /api/files/evidence/:case_id
pub async fn evidence_list(
    State(state): State<AppState>,
    _actor: Actor,
    Path(case_id): Path<Uuid>,
) -> ApiResult<Vec<Evidence>> {
    Ok(ApiResponse::success(state.evidence.list_evidence(case_id).await?))
}
