//! Persistence seams.
//!
//! Each record family has its own store trait so collaborators can be swapped
//! independently (the route guard only needs [`ProfileStore`]). [`PgStore`] and
//! [`MemoryStore`] implement all of them.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value failed to decode (e.g. an unknown role string).
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Active profile linked to the given auth identity.
    async fn find_profile_by_session_id(&self, auth_user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Profile by id, including deactivated ones.
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError>;

    async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError>;

    /// Last write wins; fails with `NotFound` for missing or deactivated profiles.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError>;

    /// Soft delete. Deactivating an already inactive profile returns it unchanged.
    async fn deactivate_profile(&self, id: Uuid) -> Result<Profile, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn list_schools(&self, include_inactive: bool) -> Result<Vec<School>, StoreError>;

    async fn find_school(&self, id: Uuid) -> Result<Option<School>, StoreError>;

    async fn create_school(&self, new: NewSchool) -> Result<School, StoreError>;

    async fn update_school(&self, id: Uuid, changes: SchoolChanges) -> Result<School, StoreError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    /// Newest first, capped at the filter's effective limit.
    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError>;
}

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn insert_evidence(&self, new: NewEvidence) -> Result<Evidence, StoreError>;

    async fn list_evidence(&self, case_id: Uuid) -> Result<Vec<Evidence>, StoreError>;
}
