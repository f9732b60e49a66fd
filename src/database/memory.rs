use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuditEntry, AuditFilter, AuditStore, Evidence, EvidenceStore, NewAuditEntry, NewEvidence,
    NewProfile, NewSchool, Profile, ProfileChanges, ProfileFilter, ProfileStore, School,
    SchoolChanges, SchoolStore, StoreError,
};

/// Process-local store for development without a database and for tests.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<Uuid, Profile>>,
    schools: RwLock<HashMap<Uuid, School>>,
    audit: RwLock<Vec<AuditEntry>>,
    evidence: RwLock<Vec<Evidence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile_by_session_id(&self, auth_user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .find(|p| p.auth_user_id == auth_user_id && p.is_active())
            .cloned())
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.profiles.read().await;
        let mut found: Vec<Profile> = profiles.values().filter(|p| filter.matches(p)).cloned().collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.email.cmp(&b.email)));
        Ok(found)
    }

    async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;

        if profiles.values().any(|p| p.email.eq_ignore_ascii_case(&new.email)) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", new.email)));
        }
        if profiles.values().any(|p| p.auth_user_id == new.auth_user_id) {
            return Err(StoreError::Conflict(format!(
                "identity {} already has a profile",
                new.auth_user_id
            )));
        }

        let profile = new.into_profile(Utc::now());
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&id)
            .filter(|p| p.is_active())
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;

        changes.apply(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn deactivate_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;

        if profile.deleted_at.is_none() {
            let now = Utc::now();
            profile.deleted_at = Some(now);
            profile.updated_at = now;
        }
        Ok(profile.clone())
    }
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn list_schools(&self, include_inactive: bool) -> Result<Vec<School>, StoreError> {
        let schools = self.schools.read().await;
        let mut found: Vec<School> = schools
            .values()
            .filter(|s| include_inactive || s.is_active)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn find_school(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        Ok(self.schools.read().await.get(&id).cloned())
    }

    async fn create_school(&self, new: NewSchool) -> Result<School, StoreError> {
        let mut schools = self.schools.write().await;
        if schools.values().any(|s| s.code == new.code) {
            return Err(StoreError::Conflict(format!("school code '{}' already in use", new.code)));
        }

        let school = new.into_school(Utc::now());
        schools.insert(school.id, school.clone());
        Ok(school)
    }

    async fn update_school(&self, id: Uuid, changes: SchoolChanges) -> Result<School, StoreError> {
        let mut schools = self.schools.write().await;

        if let Some(code) = &changes.code {
            if schools.values().any(|s| s.id != id && &s.code == code) {
                return Err(StoreError::Conflict(format!("school code '{}' already in use", code)));
            }
        }

        let school = schools
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("school {}", id)))?;
        changes.apply(school);
        school.updated_at = Utc::now();
        Ok(school.clone())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let entry = entry.into_entry(Utc::now());
        self.audit.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.effective_limit() as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EvidenceStore for MemoryStore {
    async fn insert_evidence(&self, new: NewEvidence) -> Result<Evidence, StoreError> {
        let evidence = new.into_evidence(Utc::now());
        self.evidence.write().await.push(evidence.clone());
        Ok(evidence)
    }

    async fn list_evidence(&self, case_id: Uuid) -> Result<Vec<Evidence>, StoreError> {
        let evidence = self.evidence.read().await;
        Ok(evidence.iter().filter(|e| e.case_id == case_id).cloned().collect())
    }
}
