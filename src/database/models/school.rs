use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
}

impl NewSchool {
    pub(crate) fn into_school(self, now: DateTime<Utc>) -> School {
        School {
            id: Uuid::new_v4(),
            name: self.name,
            code: self.code,
            address: self.address,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl SchoolChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.code.is_none() && self.address.is_none() && self.is_active.is_none()
    }

    pub fn apply(&self, school: &mut School) {
        if let Some(name) = &self.name {
            school.name = name.clone();
        }
        if let Some(code) = &self.code {
            school.code = code.clone();
        }
        if let Some(address) = &self.address {
            school.address = address.clone();
        }
        if let Some(active) = self.is_active {
            school.is_active = active;
        }
    }
}
