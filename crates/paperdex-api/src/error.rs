//! Mapping from typed errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use paperdex_auth::AuthError;
use paperdex_core::{StoreError, ValidationError};

/// The error surface of every handler.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Auth(AuthError),
    Validation(ValidationError),
    BadRequest(String),
    Unauthorized(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(err) => match &err {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                StoreError::Conflict(_) | StoreError::InvalidTransition(_) => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                StoreError::RelocationFailed(_)
                | StoreError::StorageUnavailable(_)
                | StoreError::Database(_) => {
                    tracing::error!(subsystem = "api", error = %err, "Store error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                    )
                }
            },
            ApiError::Auth(err) => match &err {
                AuthError::InvalidCode
                | AuthError::Unauthorized
                | AuthError::Invalid
                | AuthError::Expired => (StatusCode::UNAUTHORIZED, err.to_string()),
                AuthError::UpstreamFailure(_) => {
                    tracing::error!(subsystem = "api", error = %err, "Identity provider failure");
                    (StatusCode::BAD_GATEWAY, err.to_string())
                }
            },
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::from(StoreError::NotFound(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_transition_maps_to_409() {
        let response =
            ApiError::from(StoreError::InvalidTransition("library".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_failures_hide_detail() {
        let response =
            ApiError::from(StoreError::RelocationFailed("disk full".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_unauthorized_maps_to_401() {
        let response = ApiError::from(AuthError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upstream_failure_maps_to_502() {
        let response =
            ApiError::from(AuthError::UpstreamFailure("timeout".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = ApiError::from(ValidationError::Year(3000)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
