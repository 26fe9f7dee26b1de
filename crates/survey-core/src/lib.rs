//! Shared domain types for the survey dashboard.
//!
//! Holds the in-memory relation model, the result-table types produced by the
//! aggregation pipeline, the fixed input schema, join-date parsing, settings
//! and the error taxonomy used by every other crate in the workspace.

pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;
