//! Authentication and authorization error taxonomy.

use thiserror::Error;

/// Errors raised while issuing or validating admin credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider rejected the OAuth code exchange.
    #[error("OAuth code exchange rejected")]
    InvalidCode,

    /// The identity is neither allow-listed nor an active member of the
    /// configured team. No credential is issued.
    #[error("Identity is not authorized for admin access")]
    Unauthorized,

    /// The identity provider was unreachable or returned an unexpected
    /// shape.
    #[error("Identity provider failure: {0}")]
    UpstreamFailure(String),

    /// The credential is malformed or its signature does not verify.
    #[error("Invalid credential")]
    Invalid,

    /// The credential's validity window has passed.
    #[error("Credential expired")]
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(AuthError::InvalidCode.to_string(), "OAuth code exchange rejected");
        assert_eq!(AuthError::Expired.to_string(), "Credential expired");
        assert_eq!(
            AuthError::UpstreamFailure("timeout".into()).to_string(),
            "Identity provider failure: timeout"
        );
    }
}
