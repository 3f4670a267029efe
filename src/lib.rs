//! FHIR Query Builder Library
//!
//! Discovers what a FHIR server supports from its capability statement and
//! turns structured search criteria into search URLs that can be previewed or
//! executed.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
