//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use paperdex_auth::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that requires a valid admin credential.
///
/// Reads the `Authorization: Bearer` header and validates it locally
/// against the verifier; the identity provider is never contacted on the
/// request path.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub identity: Identity,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match header {
            Some(header) if header.starts_with("Bearer ") => {
                header.trim_start_matches("Bearer ").trim()
            }
            _ => {
                return Err(ApiError::Unauthorized(
                    "Authentication required".to_string(),
                ))
            }
        };

        let identity = state.auth.verify(token)?;
        Ok(RequireAuth { identity })
    }
}
