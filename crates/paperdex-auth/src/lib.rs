//! # paperdex-auth
//!
//! Admin authorization for paperdex.
//!
//! Converts a GitHub OAuth authorization code into a signed, time-bound
//! session credential. Authorization is granted to identities on a static
//! allow-list or to active members of a configured org team; the
//! membership check runs once at credential issuance, so per-request
//! verification stays cheap and local.

pub mod config;
pub mod error;
pub mod verifier;

pub use config::AuthConfig;
pub use error::AuthError;
pub use verifier::{AuthVerifier, Identity, SessionCredential};
