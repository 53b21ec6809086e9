//! Application state shared across handlers.

use std::sync::Arc;

use paperdex_auth::AuthVerifier;
use paperdex_db::Database;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthVerifier>,
    /// Maximum number of files accepted by one upload request.
    pub max_upload_limit: usize,
}
