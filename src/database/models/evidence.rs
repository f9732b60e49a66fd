use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file attached to an incident case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Evidence {
    pub id: Uuid,
    pub case_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Hex SHA-256 of the stored bytes
    pub sha256: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvidence {
    pub case_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_by: Uuid,
}

impl NewEvidence {
    pub(crate) fn into_evidence(self, now: DateTime<Utc>) -> Evidence {
        Evidence {
            id: Uuid::new_v4(),
            case_id: self.case_id,
            file_name: self.file_name,
            storage_path: self.storage_path,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            sha256: self.sha256,
            uploaded_by: self.uploaded_by,
            created_at: now,
        }
    }
}
