//! Server authentication
//!
//! This module turns a server's stored credentials into request headers and
//! resolves secrets referenced from configuration.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fhir_query_builder::app::ServerProfile;
//! use fhir_query_builder::auth::{AuthDescriptor, AuthStrategy};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ServerProfile::new("HAPI", "https://hapi.fhir.org/baseR4")?
//!     .with_auth(AuthDescriptor::Bearer { token: "abc".to_string() });
//! let headers = AuthStrategy::headers_for(&server)?;
//! assert!(headers.contains_key("authorization"));
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod headers;

// Re-export main public API
pub use credentials::{prompt_missing_password, resolve_secret, AuthDescriptor};
pub use headers::AuthStrategy;
