//! Prelude module for the FHIR query builder library
//!
//! Re-exports the items most integrations need, so a single
//! `use fhir_query_builder::prelude::*;` covers the typical flow.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fhir_query_builder::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = ServerProfile::new("HAPI", "https://hapi.fhir.org/baseR4")?;
//!     let cache = Arc::new(CapabilityCache::new(CacheConfig::default()));
//!     let client = CapabilityClient::new(ClientConfig::default(), cache)?;
//!     let statement = client.fetch_capabilities(&server, false).await?;
//!
//!     let catalog = ParameterCatalog::parameters_for(&statement, "Patient");
//!     let mut model = QueryModel::for_resource("Patient");
//!     let index = model.add_parameter();
//!     model.update_parameter(index, ParameterUpdate::Name("birthdate".into()), &catalog)?;
//!     model.update_parameter(index, ParameterUpdate::Value("1990-01-01".into()), &catalog)?;
//!
//!     if let Some(query) = QueryCompiler::compile(&model, Some(&server)) {
//!         println!("{}", query);
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    CacheConfig, CapabilityCache, CapabilityClient, CapabilityDocument, ClientConfig,
    CompiledQuery, ComparisonPrefix, ParameterBinding, ParameterCatalog, ParameterUpdate,
    QueryCompiler, QueryExecutor, QueryModel, ResultBundle, SearchParamType,
    SearchParameterDefinition, ServerId, ServerProfile, ServerRegistry,
};

// Authentication
pub use crate::auth::{AuthDescriptor, AuthStrategy};

// Configuration
pub use crate::config::AppConfig;

// Standard library re-exports that are commonly needed
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
