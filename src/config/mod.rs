use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Secret used when nothing is configured. Production refuses to run with it.
pub const DEVELOPMENT_JWT_SECRET: &str = "cemse-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub uploads: UploadConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. Without one the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Upper bound for `SESSION_EXPIRY_HOURS` (one year).
pub const MAX_SESSION_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub cookie_name: String,
    pub theme_cookie_name: String,
    pub expiry_hours: u64,
    pub secure_cookie: bool,
    /// Admin endpoint of the auth service, used for password changes.
    pub auth_admin_url: Option<String>,
    pub auth_service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_file_bytes: usize,
    pub max_batch_files: usize,
    pub allowed_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is required in {0:?}")]
    MissingDatabase(Environment),
    #[error("SESSION_JWT_SECRET must be set to a non-default value in {0:?}")]
    DefaultSecret(Environment),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        Self::for_environment(environment).with_env_overrides()
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Checks that must pass before serving traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment == Environment::Development {
            return Ok(());
        }
        if self.database.url.is_none() {
            return Err(ConfigError::MissingDatabase(self.environment));
        }
        if self.session.jwt_secret.is_empty() || self.session.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err(ConfigError::DefaultSecret(self.environment));
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("SERVER_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(v);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_JWT_SECRET") {
            self.session.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_COOKIE_SECURE") {
            self.session.secure_cookie = v.parse().unwrap_or(self.session.secure_cookie);
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.session.expiry_hours = v
                .parse::<u64>()
                .map(|hours| hours.min(MAX_SESSION_EXPIRY_HOURS))
                .unwrap_or(self.session.expiry_hours);
        }
        if let Ok(v) = env::var("AUTH_ADMIN_URL") {
            self.session.auth_admin_url = Some(v);
        }
        if let Ok(v) = env::var("AUTH_SERVICE_KEY") {
            self.session.auth_service_key = Some(v);
        }

        // Upload overrides
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("UPLOAD_MAX_FILE_BYTES") {
            self.uploads.max_file_bytes = v.parse().unwrap_or(self.uploads.max_file_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_MAX_BATCH_FILES") {
            self.uploads.max_batch_files = v.parse().unwrap_or(self.uploads.max_batch_files);
        }
        if let Ok(v) = env::var("UPLOAD_ALLOWED_TYPES") {
            self.uploads.allowed_types = split_list(&v);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                static_dir: PathBuf::from("public"),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            session: SessionConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                cookie_name: "cemse_session".to_string(),
                theme_cookie_name: "cemse_theme".to_string(),
                expiry_hours: 24 * 7, // 1 week
                secure_cookie: false,
                auth_admin_url: None,
                auth_service_key: None,
            },
            uploads: UploadConfig {
                dir: PathBuf::from("uploads"),
                max_file_bytes: 10 * 1024 * 1024, // 10MB
                max_batch_files: 20,
                allowed_types: default_allowed_types(),
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string()],
                enable_audit_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                static_dir: PathBuf::from("public"),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            session: SessionConfig {
                jwt_secret: String::new(),
                cookie_name: "cemse_session".to_string(),
                theme_cookie_name: "cemse_theme".to_string(),
                expiry_hours: 24,
                secure_cookie: true,
                auth_admin_url: None,
                auth_service_key: None,
            },
            uploads: UploadConfig {
                dir: PathBuf::from("/var/lib/cemse/uploads"),
                max_file_bytes: 10 * 1024 * 1024,
                max_batch_files: 20,
                allowed_types: default_allowed_types(),
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.cemse-ia.org".to_string()],
                enable_audit_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                static_dir: PathBuf::from("public"),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            session: SessionConfig {
                jwt_secret: String::new(),
                cookie_name: "cemse_session".to_string(),
                theme_cookie_name: "cemse_theme".to_string(),
                expiry_hours: 8,
                secure_cookie: true,
                auth_admin_url: None,
                auth_service_key: None,
            },
            uploads: UploadConfig {
                dir: PathBuf::from("/var/lib/cemse/uploads"),
                max_file_bytes: 5 * 1024 * 1024, // 5MB
                max_batch_files: 10,
                allowed_types: default_allowed_types(),
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.cemse-ia.org".to_string()],
                enable_audit_logging: true,
            },
        }
    }
}

fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp", "application/pdf"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
