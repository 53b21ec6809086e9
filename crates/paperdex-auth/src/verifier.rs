//! GitHub-backed credential issuance and local verification.
//!
//! `exchange_code` performs the full login flow:
//! 1. exchange the OAuth code for a user access token,
//! 2. look up the authenticated login,
//! 3. authorize it (allow-list, or active org-team membership checked with
//!    the privileged org token),
//! 4. issue a signed, time-bound credential.
//!
//! `verify` never re-contacts the provider: the membership cost is paid
//! once at login, so per-request validation is pure signature + expiry.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// GitHub rejects requests without a User-Agent.
const USER_AGENT: &str = "paperdex";

/// A validated admin identity extracted from a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// A signed, time-bound proof of verified admin identity.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCredential {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Deserialize)]
struct MembershipResponse {
    state: String,
}

/// Validates OAuth codes against the identity provider and issues/verifies
/// session credentials.
pub struct AuthVerifier {
    config: AuthConfig,
    client: Client,
}

impl AuthVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Exchange an OAuth authorization code for a session credential.
    ///
    /// Fails with [`AuthError::InvalidCode`] if the provider rejects the
    /// code itself, [`AuthError::Unauthorized`] if the identity matches
    /// neither the allow-list nor the team, and
    /// [`AuthError::UpstreamFailure`] when the provider is unreachable or
    /// answers with an unexpected shape. No credential is issued on any
    /// failure path.
    pub async fn exchange_code(&self, code: &str) -> Result<SessionCredential, AuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let username = self.fetch_username(&access_token).await?;

        let allow_listed = self
            .config
            .admin_usernames
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(&username));

        if !allow_listed && !self.check_team_membership(&username).await? {
            info!(
                subsystem = "auth",
                op = "exchange_code",
                "Identity denied admin access"
            );
            return Err(AuthError::Unauthorized);
        }

        info!(
            subsystem = "auth",
            op = "exchange_code",
            allow_listed,
            "Issued admin credential"
        );
        self.issue(&username)
    }

    /// Validate a credential's signature and expiry. Side-effect-free;
    /// does not re-contact the identity provider.
    pub fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            credential,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid,
        })?;

        Ok(Identity {
            username: data.claims.sub,
        })
    }

    /// Sign a credential embedding the identity's stable handle.
    fn issue(&self, username: &str) -> Result<SessionCredential, AuthError> {
        let now = Utc::now();
        let expires_at = now + ChronoDuration::seconds(self.config.token_ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|_| AuthError::Invalid)?;

        Ok(SessionCredential {
            token,
            username: username.to_string(),
            expires_at,
        })
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(format!(
                "{}/login/oauth/access_token",
                self.config.oauth_base_url
            ))
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;

        if !response.status().is_success() {
            error!(
                subsystem = "auth",
                op = "access_token",
                status = response.status().as_u16(),
                "Identity provider rejected the token exchange request"
            );
            return Err(AuthError::UpstreamFailure(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;

        // The provider answers 200 with an error body for a bad code.
        if body.error.is_some() {
            return Err(AuthError::InvalidCode);
        }
        body.access_token.ok_or(AuthError::InvalidCode)
    }

    async fn fetch_username(&self, access_token: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.config.api_base_url))
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;

        if !response.status().is_success() {
            error!(
                subsystem = "auth",
                op = "fetch_username",
                status = response.status().as_u16(),
                "Identity lookup failed"
            );
            return Err(AuthError::UpstreamFailure(format!(
                "identity lookup returned {}",
                response.status()
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;
        Ok(user.login)
    }

    /// Check active membership of the configured org team, using the
    /// privileged org token (the user's own token cannot see memberships).
    async fn check_team_membership(&self, username: &str) -> Result<bool, AuthError> {
        let response = self
            .client
            .get(format!(
                "{}/orgs/{}/teams/{}/memberships/{}",
                self.config.api_base_url, self.config.org_name, self.config.team_slug, username
            ))
            .header(
                "Authorization",
                format!("Bearer {}", self.config.org_admin_token),
            )
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;

        match response.status() {
            // Not a member at all
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                let membership: MembershipResponse = response
                    .json()
                    .await
                    .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;
                Ok(membership.state == "active")
            }
            status => {
                error!(
                    subsystem = "auth",
                    op = "team_membership",
                    status = status.as_u16(),
                    "Membership lookup failed"
                );
                Err(AuthError::UpstreamFailure(format!(
                    "membership lookup returned {}",
                    status
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn verifier(secret: &str) -> AuthVerifier {
        AuthVerifier::new(AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let v = verifier("test-secret");
        let credential = v.issue("octocat").unwrap();
        assert_eq!(credential.username, "octocat");

        let identity = v.verify(&credential.token).unwrap();
        assert_eq!(identity.username, "octocat");
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let v = verifier("test-secret");
        assert!(matches!(v.verify("not-a-jwt"), Err(AuthError::Invalid)));
        assert!(matches!(v.verify(""), Err(AuthError::Invalid)));
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let v = verifier("test-secret");
        let credential = v.issue("octocat").unwrap();
        let mut tampered = credential.token.clone();
        tampered.push('x');
        assert!(matches!(v.verify(&tampered), Err(AuthError::Invalid)));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let issued_by = verifier("secret-a");
        let checked_by = verifier("secret-b");
        let credential = issued_by.issue("octocat").unwrap();
        assert!(matches!(
            checked_by.verify(&credential.token),
            Err(AuthError::Invalid)
        ));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let v = verifier("test-secret");
        let past = Utc::now() - ChronoDuration::hours(2);
        let claims = Claims {
            sub: "octocat".to_string(),
            iat: past.timestamp(),
            exp: (past + ChronoDuration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(v.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_expiry_honors_configured_ttl() {
        let v = AuthVerifier::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl: Duration::from_secs(3600),
            ..AuthConfig::default()
        });
        let credential = v.issue("octocat").unwrap();
        let remaining = credential.expires_at - Utc::now();
        assert!(remaining <= ChronoDuration::seconds(3600));
        assert!(remaining > ChronoDuration::seconds(3500));
    }
}
