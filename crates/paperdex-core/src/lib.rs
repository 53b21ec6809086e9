//! # paperdex-core
//!
//! Core types and pure logic for the paperdex question-paper index.
//!
//! This crate holds everything that needs no I/O: the paper data model and
//! its enumerations, metadata validation, the error taxonomy, the canonical
//! metadata ↔ path ↔ URL mapping, and the search ranker.

pub mod error;
pub mod logging;
pub mod models;
pub mod paths;
pub mod ranking;

// Re-export commonly used types at crate root
pub use error::{Result, StoreError, ValidationError};
pub use models::{
    normalize_course_code, validate_year, ApprovalStatus, Exam, ExamFilter, HardDeleteOutcome,
    NewPaper, Origin, Paper, PaperPatch, SearchHit, Semester,
};
pub use paths::{PaperLocation, PathConfig, PathResolver};
pub use ranking::{rank, RankedPaper, SearchQuery, SEARCH_RESULT_LIMIT};
