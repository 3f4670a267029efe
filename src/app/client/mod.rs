//! Capability statement retrieval
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: rate-limited request plumbing shared with the query executor
//!
//! [`CapabilityClient`] fetches `{base}/metadata` once per freshness window and
//! keeps the result in the session's [`CapabilityCache`]. Failures are never
//! cached and never fall back to an older statement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::app::cache::CapabilityCache;
use crate::app::catalog::ParameterCatalog;
use crate::app::models::{CapabilityDocument, ServerId, ServerProfile};
use crate::auth::AuthStrategy;
use crate::errors::{CapabilityError, CapabilityResult, Result};

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpHandler;

/// Fetches and caches capability statements
#[derive(Debug)]
pub struct CapabilityClient {
    http_handler: HttpHandler,
    cache: Arc<CapabilityCache>,
    // One gate per server so concurrent misses trigger a single fetch
    in_flight: Mutex<HashMap<ServerId, Arc<Mutex<()>>>>,
}

impl CapabilityClient {
    /// Creates a client that stores statements in `cache`
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    /// * `cache` - Session cache, usually shared with other components
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the HTTP client cannot be built
    pub fn new(config: ClientConfig, cache: Arc<CapabilityCache>) -> Result<Self> {
        let http_handler = HttpHandler::from_config(&config)?;
        tracing::info!(
            "Created capability client (cache window {:?})",
            cache.ttl()
        );
        Ok(Self {
            http_handler,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Capability statement for `server`
    ///
    /// Returns the cached statement while it is fresh unless `force_refresh`
    /// is set. A successful fetch replaces the cache entry; a failed one leaves
    /// the cache untouched.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError` if:
    /// - Credentials cannot be turned into headers
    /// - The request cannot be sent or times out
    /// - The server answers with a non-2xx status
    /// - The body is not a JSON object
    pub async fn fetch_capabilities(
        &self,
        server: &ServerProfile,
        force_refresh: bool,
    ) -> CapabilityResult<Arc<CapabilityDocument>> {
        if !force_refresh {
            if let Some(document) = self.cache.get(server.id()).await {
                tracing::debug!("Capability cache hit for {}", server.name());
                return Ok(document);
            }
        }

        let gate = self.gate_for(server.id()).await;
        let _guard = gate.lock().await;

        // Another caller may have populated the cache while we waited
        if !force_refresh {
            if let Some(document) = self.cache.get(server.id()).await {
                tracing::debug!("Capability statement for {} fetched concurrently", server.name());
                return Ok(document);
            }
        }

        let document = self.fetch_remote(server).await?;
        Ok(self.cache.put(server.id().clone(), document).await)
    }

    /// Resource types the server declares, in document order
    pub fn resource_types(document: &CapabilityDocument) -> Vec<String> {
        ParameterCatalog::resource_types(document)
    }

    /// The cache this client populates
    pub fn cache(&self) -> &Arc<CapabilityCache> {
        &self.cache
    }

    async fn gate_for(&self, server_id: &ServerId) -> Arc<Mutex<()>> {
        let mut gates = self.in_flight.lock().await;
        Arc::clone(gates.entry(server_id.clone()).or_default())
    }

    async fn fetch_remote(&self, server: &ServerProfile) -> CapabilityResult<CapabilityDocument> {
        let raw_url = server.metadata_url();
        let url = Url::parse(&raw_url).map_err(|e| CapabilityError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;
        let headers = AuthStrategy::headers_for(server)?;

        tracing::info!("Fetching capability statement from {}", url);
        let response = self
            .http_handler
            .get(&url, headers)
            .await
            .map_err(|source| CapabilityError::Transport {
                url: raw_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Capability fetch for {} failed with HTTP {}",
                server.name(),
                status.as_u16()
            );
            return Err(CapabilityError::FetchFailed {
                status: status.as_u16(),
                server_id: server.id().clone(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| CapabilityError::Transport {
                url: raw_url.clone(),
                source,
            })?;
        let document: CapabilityDocument =
            serde_json::from_str(&body).map_err(|source| CapabilityError::Decode {
                url: raw_url,
                source,
            })?;

        tracing::debug!(
            "Capability statement for {}: status {:?}, FHIR {:?}",
            server.name(),
            document.status,
            document.fhir_version
        );
        Ok(document)
    }
}
