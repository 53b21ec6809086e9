//! paperdex-api: HTTP shell for the paperdex backend.
//!
//! The interesting contracts live in `paperdex-core`, `paperdex-db`, and
//! `paperdex-auth`; this crate is routing, boundary validation, and the
//! mapping from typed errors to HTTP responses.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use state::AppState;
