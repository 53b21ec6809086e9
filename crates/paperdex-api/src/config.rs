//! Environment-driven configuration for the API server.
//!
//! Each field corresponds to an environment variable (upper snake case);
//! values with sensible defaults fall back to them, secrets are required.

use std::path::PathBuf;

use anyhow::Context;
use paperdex_auth::AuthConfig;
use paperdex_core::PathConfig;

/// Maximum number of files accepted by one upload request.
pub const DEFAULT_MAX_UPLOAD_LIMIT: usize = 10;

/// Runtime configuration collected from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// PostgreSQL connection URL (`DATABASE_URL`).
    pub database_url: String,
    /// Port the server listens on (`SERVER_PORT`).
    pub server_port: u16,
    /// Root of the static-files tree on disk (`STATIC_FILES_PATH`).
    pub storage_root: PathBuf,
    /// Base URL of the static-files server (`STATIC_FILES_URL`).
    pub static_files_url: String,
    /// Directory slug for library papers (`LIBRARY_DIR`).
    pub library_dir: String,
    /// Directory slug for uploaded papers (`UPLOADED_DIR`).
    pub uploaded_dir: String,
    /// Comma-separated list of allowed CORS origins (`CORS_ALLOWED_ORIGINS`).
    pub cors_allowed_origins: String,
    /// Maximum number of files per upload request (`MAX_UPLOAD_LIMIT`).
    pub max_upload_limit: usize,
    /// Identity provider and credential settings (`GH_*`, `JWT_SECRET`).
    pub auth: AuthConfig,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} must be set", name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ApiConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let auth = AuthConfig {
            client_id: required("GH_CLIENT_ID")?,
            client_secret: required("GH_CLIENT_SECRET")?,
            admin_usernames: optional("GH_ADMIN_USERNAMES", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            org_name: required("GH_ORG_NAME")?,
            team_slug: required("GH_ORG_TEAM_SLUG")?,
            org_admin_token: required("GH_ORG_ADMIN_TOKEN")?,
            jwt_secret: required("JWT_SECRET")?,
            ..AuthConfig::default()
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a port number")?,
            storage_root: PathBuf::from(optional("STATIC_FILES_PATH", "/srv/static")),
            static_files_url: optional("STATIC_FILES_URL", "https://static.paperdex.org"),
            library_dir: optional("LIBRARY_DIR", "library"),
            uploaded_dir: optional("UPLOADED_DIR", "uploaded"),
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS", "http://localhost:5173"),
            max_upload_limit: optional("MAX_UPLOAD_LIMIT", "10")
                .parse()
                .unwrap_or(DEFAULT_MAX_UPLOAD_LIMIT),
            auth,
        })
    }

    /// Path resolver settings derived from this configuration.
    pub fn path_config(&self) -> PathConfig {
        PathConfig {
            static_base_url: self.static_files_url.clone(),
            library_dir: self.library_dir.clone(),
            uploaded_dir: self.uploaded_dir.clone(),
        }
    }
}
