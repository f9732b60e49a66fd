//! Best-effort audit trail.
//!
//! Recording never fails the operation being audited: write errors are logged
//! and dropped.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::database::{AuditEntry, AuditFilter, AuditStore, NewAuditEntry, StoreError};

/// Fields that change on every write and carry no audit value.
const IGNORED_FIELDS: &[&str] = &["updated_at"];

#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Fire-and-forget: the write runs on its own task.
    pub fn record(&self, entry: NewAuditEntry) {
        if !self.enabled {
            return;
        }
        let logger = self.clone();
        tokio::spawn(async move {
            logger.write(entry).await;
        });
    }

    /// Awaitable variant of [`record`](Self::record) with the same error swallowing.
    pub async fn write(&self, entry: NewAuditEntry) {
        if !self.enabled {
            return;
        }
        let action = entry.action;
        let entity_type = entry.entity_type;
        if let Err(e) = self.store.insert_audit(entry).await {
            tracing::warn!(
                "Failed to write audit record {} {}: {}",
                action.as_str(),
                entity_type.as_str(),
                e
            );
        }
    }

    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        self.store.list_audit(filter).await
    }
}

/// Field-level diff `{ field: { from, to } }` between two serialized records.
///
/// Returns `None` when nothing changed or either side is not a JSON object.
pub fn changes_between<T: Serialize>(before: &T, after: &T) -> Option<Value> {
    let before = serde_json::to_value(before).ok()?;
    let after = serde_json::to_value(after).ok()?;
    diff(&before, &after)
}

pub fn diff(before: &Value, after: &Value) -> Option<Value> {
    let (Value::Object(before), Value::Object(after)) = (before, after) else {
        return None;
    };

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    let mut changes = Map::new();
    for key in keys {
        if IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let old_value = before.get(key).unwrap_or(&Value::Null);
        let new_value = after.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            changes.insert(key.clone(), json!({ "from": old_value, "to": new_value }));
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(Value::Object(changes))
    }
}
