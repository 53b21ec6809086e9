//! Authorization configuration.

use std::time::Duration;

/// Default credential lifetime: one week.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Immutable configuration for [`crate::AuthVerifier`].
///
/// Passed explicitly at construction rather than read from ambient state,
/// so tests can run against fixture configurations (and a mock provider,
/// via the base-URL overrides).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth app client id.
    pub client_id: String,
    /// OAuth app client secret.
    pub client_secret: String,
    /// Statically allow-listed admin usernames.
    pub admin_usernames: Vec<String>,
    /// GitHub organization name.
    pub org_name: String,
    /// Slug of the org team whose members get admin access.
    pub team_slug: String,
    /// An org admin's token with `read:org` scope. Team-membership
    /// visibility needs elevated scope, so the user's own token is not
    /// enough. Used exclusively for membership checks; never exposed.
    pub org_admin_token: String,
    /// Secret for signing session credentials.
    pub jwt_secret: String,
    /// Credential lifetime.
    pub token_ttl: Duration,
    /// OAuth web endpoint base (code exchange).
    pub oauth_base_url: String,
    /// REST API endpoint base (identity and membership lookups).
    pub api_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            admin_usernames: Vec::new(),
            org_name: String::new(),
            team_slug: String::new(),
            org_admin_token: String::new(),
            jwt_secret: String::new(),
            token_ttl: DEFAULT_TOKEN_TTL,
            oauth_base_url: "https://github.com".to_string(),
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

impl AuthConfig {
    /// Override both provider base URLs (tests point these at a mock
    /// server).
    pub fn with_base_urls(
        mut self,
        oauth_base_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        self.oauth_base_url = oauth_base_url.into();
        self.api_base_url = api_base_url.into();
        self
    }

    /// Override the credential lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}
