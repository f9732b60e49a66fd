use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::models::audit::AuditRow;
use super::models::profile::ProfileRow;
use super::{
    AuditEntry, AuditFilter, AuditStore, Evidence, EvidenceStore, NewAuditEntry, NewEvidence,
    NewProfile, NewSchool, Profile, ProfileChanges, ProfileFilter, ProfileStore, School,
    SchoolChanges, SchoolStore, StoreError,
};
use crate::config::DatabaseConfig;

const PROFILE_COLUMNS: &str = "id, auth_user_id, email, name, role, school_id, \
     force_password_change, created_at, updated_at, deleted_at";

const SCHOOL_COLUMNS: &str = "id, name, code, address, is_active, created_at, updated_at";

const EVIDENCE_COLUMNS: &str =
    "id, case_id, file_name, storage_path, content_type, size_bytes, sha256, uploaded_by, created_at";

const AUDIT_COLUMNS: &str =
    "id, actor_id, action, entity_type, entity_id, changes, metadata, created_at";

/// Postgres-backed store. Table layout is in `sql/schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations become conflicts; everything else stays a driver error.
fn map_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::Sqlx(err),
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile_by_session_id(&self, auth_user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let sql = format!(
            "SELECT {} FROM profiles WHERE auth_user_id = $1 AND deleted_at IS NULL",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(auth_user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM profiles
            WHERE ($1::uuid IS NULL OR school_id = $1)
              AND ($2::text IS NULL OR role = $2)
              AND ($3 OR deleted_at IS NULL)
            ORDER BY name, email
            "#,
            PROFILE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(filter.school_id)
            .bind(filter.role.map(|r| r.as_str()))
            .bind(filter.include_inactive)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, auth_user_id, email, name, role, school_id, force_password_change)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let email = new.email.clone();
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.auth_user_id)
            .bind(&new.email)
            .bind(&new.name)
            .bind(new.role.as_str())
            .bind(new.school_id)
            .bind(new.force_password_change)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, || format!("email '{}' or identity already registered", email)))?;
        Profile::try_from(row)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                school_id = CASE WHEN $4 THEN $5 ELSE school_id END,
                force_password_change = COALESCE($6, force_password_change),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.role.map(|r| r.as_str()))
            .bind(changes.school_id.is_some())
            .bind(changes.school_id.flatten())
            .bind(changes.force_password_change)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;
        Profile::try_from(row)
    }

    async fn deactivate_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                updated_at = CASE WHEN deleted_at IS NULL THEN now() ELSE updated_at END,
                deleted_at = COALESCE(deleted_at, now())
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;
        Profile::try_from(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SchoolStore for PgStore {
    async fn list_schools(&self, include_inactive: bool) -> Result<Vec<School>, StoreError> {
        let sql = format!(
            "SELECT {} FROM schools WHERE ($1 OR is_active) ORDER BY name",
            SCHOOL_COLUMNS
        );
        Ok(sqlx::query_as::<_, School>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_school(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        let sql = format!("SELECT {} FROM schools WHERE id = $1", SCHOOL_COLUMNS);
        Ok(sqlx::query_as::<_, School>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_school(&self, new: NewSchool) -> Result<School, StoreError> {
        let sql = format!(
            "INSERT INTO schools (id, name, code, address) VALUES ($1, $2, $3, $4) RETURNING {}",
            SCHOOL_COLUMNS
        );
        let code = new.code.clone();
        sqlx::query_as::<_, School>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.code)
            .bind(&new.address)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, || format!("school code '{}' already in use", code)))
    }

    async fn update_school(&self, id: Uuid, changes: SchoolChanges) -> Result<School, StoreError> {
        let sql = format!(
            r#"
            UPDATE schools SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                address = CASE WHEN $4 THEN $5 ELSE address END,
                is_active = COALESCE($6, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SCHOOL_COLUMNS
        );
        let code = changes.code.clone().unwrap_or_default();
        sqlx::query_as::<_, School>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.code.as_deref())
            .bind(changes.address.is_some())
            .bind(changes.address.clone().flatten())
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, || format!("school code '{}' already in use", code)))?
            .ok_or_else(|| StoreError::NotFound(format!("school {}", id)))
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, changes, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        );
        let row = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.actor_id)
            .bind(entry.action.as_str())
            .bind(entry.entity_type.as_str())
            .bind(&entry.entity_id)
            .bind(&entry.changes)
            .bind(&entry.metadata)
            .fetch_one(&self.pool)
            .await?;
        AuditEntry::try_from(row)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::text IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR actor_id = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
            AUDIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(filter.entity_type.map(|t| t.as_str()))
            .bind(filter.entity_id.as_deref())
            .bind(filter.actor_id)
            .bind(filter.effective_limit())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}

#[async_trait]
impl EvidenceStore for PgStore {
    async fn insert_evidence(&self, new: NewEvidence) -> Result<Evidence, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO case_evidence
                (id, case_id, file_name, storage_path, content_type, size_bytes, sha256, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            EVIDENCE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Evidence>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.case_id)
            .bind(&new.file_name)
            .bind(&new.storage_path)
            .bind(&new.content_type)
            .bind(new.size_bytes)
            .bind(&new.sha256)
            .bind(new.uploaded_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_evidence(&self, case_id: Uuid) -> Result<Vec<Evidence>, StoreError> {
        let sql = format!(
            "SELECT {} FROM case_evidence WHERE case_id = $1 ORDER BY created_at",
            EVIDENCE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Evidence>(&sql)
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
