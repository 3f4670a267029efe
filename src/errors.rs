//! Error types for the FHIR query builder
//!
//! Each component gets its own error enum so callers can match on the failure
//! class they care about. Everything funnels into [`AppError`] at the CLI edge.

use thiserror::Error;

use crate::app::models::ServerId;

/// Authentication and credential errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Auth kind is accepted in configuration but not implemented
    #[error("Unsupported auth type: {kind}")]
    Unsupported { kind: String },

    /// Basic auth without a username or password
    #[error("Incomplete {kind} credentials: missing {field}")]
    IncompleteCredentials {
        kind: &'static str,
        field: &'static str,
    },

    /// Credential contains characters that cannot go into an HTTP header
    #[error("Credential for header {header} is not a valid header value")]
    InvalidHeaderValue { header: &'static str },

    /// Interactive prompt failed
    #[error("Failed to read credentials from terminal")]
    Prompt(#[from] std::io::Error),
}

/// Capability statement retrieval errors
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// Server answered `/metadata` with a non-2xx status
    #[error("Failed to fetch capability statement for server {server_id}: HTTP {status}")]
    FetchFailed { status: u16, server_id: ServerId },

    /// The request never completed (DNS, refused connection, timeout)
    #[error("Transport error while requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Body was not a JSON capability statement
    #[error("Capability statement from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Base URL could not be joined with the metadata path
    #[error("Invalid server URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request headers could not be produced
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Query model editing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// Parameter index outside the current binding list
    #[error("Parameter index {index} out of bounds (query has {len} parameters)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Prefix not permitted for the binding's semantic type
    #[error("Prefix '{prefix}' is not allowed for {param_type} parameters")]
    PrefixNotAllowed { prefix: String, param_type: String },

    /// Unrecognised comparison prefix code
    #[error("Unknown comparison prefix: {code}")]
    UnknownPrefix { code: String },
}

/// Query execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Server answered the search with a non-2xx status
    #[error("Query execution failed for {url}: HTTP {status}")]
    QueryFailed { status: u16, url: String },

    /// The request never completed (DNS, refused connection, timeout)
    #[error("Transport error while requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Body was not a JSON bundle
    #[error("Search result from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Compiled URL is not a valid absolute URL
    #[error("Invalid query URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request headers could not be produced
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl CapabilityError {
    /// True when the request timed out rather than failing outright
    pub fn is_timeout(&self) -> bool {
        matches!(self, CapabilityError::Transport { source, .. } if source.is_timeout())
    }
}

impl ExecutionError {
    /// True when the request timed out rather than failing outright
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Transport { source, .. } if source.is_timeout())
    }

    /// HTTP status of a failed search, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ExecutionError::QueryFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: std::path::PathBuf },

    /// Configuration file could not be read or written
    #[error("Configuration file I/O failed: {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Environment variable referenced by `env:NAME` is not set
    #[error("Environment variable expansion failed: {var}")]
    EnvExpansionFailed { var: String },

    /// No server matches the requested id or name
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// User config directory could not be determined
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Capability fetch error
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Query editing error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Query execution error
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client construction error
    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient and worth retrying by the caller
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Capability(CapabilityError::Transport { .. })
            | AppError::Execution(ExecutionError::Transport { .. }) => true,
            AppError::Capability(CapabilityError::FetchFailed { status, .. })
            | AppError::Execution(ExecutionError::QueryFailed { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// True when a capability fetch or search timed out
    pub fn is_timeout(&self) -> bool {
        match self {
            AppError::Capability(e) => e.is_timeout(),
            AppError::Execution(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Capability(_) => "capability",
            AppError::Query(_) => "query",
            AppError::Execution(_) => "execution",
            AppError::Config(_) => "config",
            AppError::HttpClient(_) => "http",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Capability fetch result type alias
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Query editing result type alias
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Query execution result type alias
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
