use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::database::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    PasswordChange,
    Login,
    Logout,
    RoleAssign,
    SchoolAssign,
    Upload,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::PasswordChange => "PASSWORD_CHANGE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::RoleAssign => "ROLE_ASSIGN",
            AuditAction::SchoolAssign => "SCHOOL_ASSIGN",
            AuditAction::Upload => "UPLOAD",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CREATE" => AuditAction::Create,
            "UPDATE" => AuditAction::Update,
            "DELETE" => AuditAction::Delete,
            "PASSWORD_CHANGE" => AuditAction::PasswordChange,
            "LOGIN" => AuditAction::Login,
            "LOGOUT" => AuditAction::Logout,
            "ROLE_ASSIGN" => AuditAction::RoleAssign,
            "SCHOOL_ASSIGN" => AuditAction::SchoolAssign,
            "UPLOAD" => AuditAction::Upload,
            other => return Err(format!("unknown audit action: {}", other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Profile,
    School,
    File,
    Evidence,
    Session,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Profile => "PROFILE",
            EntityType::School => "SCHOOL",
            EntityType::File => "FILE",
            EntityType::Evidence => "EVIDENCE",
            EntityType::Session => "SESSION",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PROFILE" => EntityType::Profile,
            "SCHOOL" => EntityType::School,
            "FILE" => EntityType::File,
            "EVIDENCE" => EntityType::Evidence,
            "SESSION" => EntityType::Session,
            other => return Err(format!("unknown entity type: {}", other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    /// Uuid for records, storage path for plain files
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
    pub metadata: Option<Value>,
}

impl NewAuditEntry {
    pub fn new(actor_id: Option<Uuid>, action: AuditAction, entity_type: EntityType) -> Self {
        Self {
            actor_id,
            action,
            entity_type,
            entity_id: None,
            changes: None,
            metadata: None,
        }
    }

    pub fn entity(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn into_entry(self, now: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            changes: self.changes,
            metadata: self.metadata,
            created_at: now,
        }
    }
}

pub const DEFAULT_AUDIT_LIMIT: i64 = 50;
pub const MAX_AUDIT_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl AuditFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT)
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.map_or(true, |t| entry.entity_type == t)
            && self
                .entity_id
                .as_ref()
                .map_or(true, |id| entry.entity_id.as_ref() == Some(id))
            && self.actor_id.map_or(true, |id| entry.actor_id == Some(id))
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AuditRow {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub changes: Option<Value>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action.parse().map_err(StoreError::Corrupt)?,
            entity_type: row.entity_type.parse().map_err(StoreError::Corrupt)?,
            entity_id: row.entity_id,
            changes: row.changes,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let mut filter = AuditFilter::default();
        assert_eq!(filter.effective_limit(), DEFAULT_AUDIT_LIMIT);
        filter.limit = Some(10_000);
        assert_eq!(filter.effective_limit(), MAX_AUDIT_LIMIT);
        filter.limit = Some(0);
        assert_eq!(filter.effective_limit(), 1);
    }

    #[test]
    fn action_strings_match_serde() {
        let json = serde_json::to_string(&AuditAction::PasswordChange).unwrap();
        assert_eq!(json, format!("\"{}\"", AuditAction::PasswordChange.as_str()));
        assert_eq!("SCHOOL_ASSIGN".parse::<AuditAction>(), Ok(AuditAction::SchoolAssign));
        assert!("DROP".parse::<AuditAction>().is_err());
    }
}
