use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::StoreError;
use crate::permissions::Role;

/// Application-level user record, linked to an auth identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub auth_user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub force_password_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub auth_user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub force_password_change: bool,
}

impl NewProfile {
    pub(crate) fn into_profile(self, now: DateTime<Utc>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            auth_user_id: self.auth_user_id,
            email: self.email,
            name: self.name,
            role: self.role,
            school_id: self.school_id,
            force_password_change: self.force_password_change,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Partial update. `school_id: Some(None)` clears the school assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub school_id: Option<Option<Uuid>>,
    pub force_password_change: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.school_id.is_none()
            && self.force_password_change.is_none()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(school_id) = self.school_id {
            profile.school_id = school_id;
        }
        if let Some(flag) = self.force_password_change {
            profile.force_password_change = flag;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    pub school_id: Option<Uuid>,
    pub role: Option<Role>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProfileFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        (self.include_inactive || profile.is_active())
            && self.school_id.map_or(true, |id| profile.school_id == Some(id))
            && self.role.map_or(true, |role| profile.role == role)
    }
}

/// Row shape of the `profiles` table; `role` is stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub auth_user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub school_id: Option<Uuid>,
    pub force_password_change: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(format!("profile {}: {}", row.id, e)))?;

        Ok(Profile {
            id: row.id,
            auth_user_id: row.auth_user_id,
            email: row.email,
            name: row.name,
            role,
            school_id: row.school_id,
            force_password_change: row.force_password_change,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}
