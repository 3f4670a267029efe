//! Application constants for the FHIR query builder
//!
//! Constants are grouped by functional domain.

use std::time::Duration;

/// FHIR wire-format constants
pub mod fhir {
    /// Media type used for both `Accept` and `Content-Type`
    pub const JSON_MEDIA_TYPE: &str = "application/fhir+json";

    /// Path of the capability statement relative to the server base
    pub const METADATA_PATH: &str = "metadata";

    /// Default FHIR version tag for newly registered servers
    pub const DEFAULT_VERSION: &str = "R4";

    /// Separator between comparison prefix and value
    pub const PREFIX_SEPARATOR: char = '|';

    /// Search result parameters rendered after the bindings
    pub const INCLUDE_PARAM: &str = "_include";
    pub const REV_INCLUDE_PARAM: &str = "_revinclude";
    pub const SORT_PARAM: &str = "_sort";
    pub const COUNT_PARAM: &str = "_count";
    pub const OFFSET_PARAM: &str = "_offset";
}

/// Capability cache constants
pub mod cache {
    use super::Duration;

    /// Freshness window for cached capability statements
    pub const CAPABILITY_TTL: Duration = Duration::from_secs(60 * 60);
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("fhir-query-builder/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Default outbound rate limit (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE: &str = "fhir-query.toml";

    /// Directory name under the user config dir
    pub const APP_DIR: &str = "fhir-query";

    /// File name under [`APP_DIR`]
    pub const FILE_NAME: &str = "config.toml";

    /// Marker for secrets that are read from the environment
    pub const ENV_SECRET_PREFIX: &str = "env:";
}

// Re-export commonly used constants at module level
pub use cache::CAPABILITY_TTL;
pub use fhir::JSON_MEDIA_TYPE;
pub use http::{DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_window_is_one_hour() {
        assert_eq!(CAPABILITY_TTL, Duration::from_secs(3600));
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("fhir-query-builder/"));
        assert!(USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
