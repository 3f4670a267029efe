//! Time-bounded capability statement cache
//!
//! One [`CapabilityCache`] is created per application session and handed to
//! the capability client; there is no process-wide instance.
//!
//! # Module Organization
//!
//! - [`config`] - Freshness window configuration
//! - [`clock`] - Injectable time source
//! - [`store`] - The cache itself
//!
//! # Examples
//!
//! ```rust,no_run
//! use fhir_query_builder::app::cache::{CacheConfig, CapabilityCache};
//! use fhir_query_builder::app::models::{CapabilityDocument, ServerId};
//!
//! # async fn example() {
//! let cache = CapabilityCache::new(CacheConfig::default());
//! let id = ServerId::new("hapi");
//! cache.put(id.clone(), CapabilityDocument::default()).await;
//! assert!(cache.get(&id).await.is_some());
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod store;

// Re-export main public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use store::CapabilityCache;
