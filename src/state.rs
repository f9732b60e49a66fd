use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::config::AppConfig;
use crate::database::{AuditStore, EvidenceStore, ProfileStore, SchoolStore};
use crate::session::SessionProvider;
use crate::storage::FileStorage;

/// Shared handles passed to every handler and to the route guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub schools: Arc<dyn SchoolStore>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub files: Arc<dyn FileStorage>,
    pub audit: AuditLogger,
}

impl AppState {
    /// Wire every store seam to one backend (Postgres or in-memory).
    pub fn with_store<S>(
        config: AppConfig,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<S>,
        files: Arc<dyn FileStorage>,
    ) -> Self
    where
        S: ProfileStore + SchoolStore + AuditStore + EvidenceStore + 'static,
    {
        let audit = AuditLogger::new(store.clone(), config.security.enable_audit_logging);
        Self {
            config: Arc::new(config),
            sessions,
            profiles: store.clone(),
            schools: store.clone(),
            evidence: store,
            files,
            audit,
        }
    }
}
