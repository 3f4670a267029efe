//! Rate-limited GET requests shared by capability fetches and searches

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use url::Url;

use crate::errors::{ConfigError, ConfigResult};

use super::config::ClientConfig;

/// HTTP operations handler with outbound rate limiting
///
/// Performs exactly one attempt per call; status handling is left to the caller.
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `rate_limit_rps` - Requests per second rate limit
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> ConfigResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Build the reqwest client and limiter from one configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the client cannot be built or the rate limit is zero
    pub fn from_config(config: &ClientConfig) -> crate::errors::Result<Self> {
        let client = config.build_http_client()?;
        Ok(Self::new(client, config.rate_limit_rps)?)
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ConfigResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| ConfigError::InvalidValue {
            field: "client.rate_limit_rps".to_string(),
            value: rate_limit_rps.to_string(),
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Issue a GET with the given headers once the limiter allows it
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the request could not be sent or timed out
    pub async fn get(&self, url: &Url, headers: HeaderMap) -> Result<Response, reqwest::Error> {
        // Jitter spreads out bursts of queued requests
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        tracing::debug!("GET {}", url);
        self.client.get(url.as_str()).headers(headers).send().await
    }
}
