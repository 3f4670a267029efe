//! Core application logic for the FHIR query builder
//!
//! This module contains the capability cache and client, the parameter
//! catalog, query modelling and compilation, and query execution.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fhir_query_builder::app::{
//!     CapabilityCache, CapabilityClient, ClientConfig, ParameterCatalog, QueryCompiler,
//!     QueryExecutor, QueryModel, ServerProfile,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ServerProfile::new("HAPI", "https://hapi.fhir.org/baseR4")?;
//! let cache = Arc::new(CapabilityCache::default());
//! let client = CapabilityClient::new(ClientConfig::default(), cache)?;
//!
//! let statement = client.fetch_capabilities(&server, false).await?;
//! for param in ParameterCatalog::parameters_for(&statement, "Patient") {
//!     println!("{} ({})", param.name, param.param_type);
//! }
//!
//! let model = QueryModel::for_resource("Patient");
//! if let Some(query) = QueryCompiler::compile(&model, Some(&server)) {
//!     let bundle = QueryExecutor::new(ClientConfig::default())?
//!         .execute(&query, &server)
//!         .await?;
//!     println!("{} entries", bundle.entry_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod client;
pub mod executor;
pub mod models;
pub mod query;
pub mod registry;

// Re-export main public API
pub use cache::{CacheConfig, CapabilityCache};
pub use catalog::{CatalogDegradation, CatalogLookup, ParameterCatalog};
pub use client::{CapabilityClient, ClientConfig};
pub use executor::QueryExecutor;
pub use models::{
    CapabilityDocument, ComparisonPrefix, ResultBundle, SearchParamType,
    SearchParameterDefinition, ServerId, ServerProfile,
};
pub use query::{
    CompiledQuery, Include, Pagination, ParameterBinding, ParameterUpdate, QueryCompiler,
    QueryModel, SortOption, SortOrder,
};
pub use registry::ServerRegistry;
