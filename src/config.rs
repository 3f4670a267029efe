//! Configuration management for the FHIR query builder
//!
//! This module provides configuration loading with first-run initialization,
//! file discovery, and zero-config defaults. Registered servers live in the
//! same file as `[[servers]]` tables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, ServerId, ServerProfile, ServerRegistry};
use crate::auth::AuthDescriptor;
use crate::constants::{config as paths, fhir, http, CAPABILITY_TTL};
use crate::errors::{ConfigError, ConfigResult};

/// Application configuration as written in TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Capability cache settings
    pub cache: CacheConfigToml,
    /// Registered servers
    pub servers: Vec<ServerConfigToml>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Whole-request timeout, e.g. `30s`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout, e.g. `10s`
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
            user_agent: None,
        }
    }
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Capability statement freshness window, e.g. `1h`
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            ttl: CAPABILITY_TTL,
        }
    }
}

/// One `[[servers]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigToml {
    /// Stable id; generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub base_url: String,
    /// FHIR version tag, `R4` when omitted
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub auth: AuthDescriptor,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (ClientConfig, CacheConfig) {
        (
            self.client.to_runtime_config(),
            self.cache.to_runtime_config(),
        )
    }

    /// Build the server registry, resolving `env:NAME` secrets
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a base URL is invalid, a secret variable is
    /// unset, or two servers share an id
    pub fn registry(&self) -> ConfigResult<ServerRegistry> {
        let mut registry = ServerRegistry::new();
        for server in &self.servers {
            registry.add(server.to_profile()?)?;
        }
        Ok(registry)
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, else project-local, else user config dir)
    ///
    /// Secrets from `.env` are merged into the environment by the binary
    /// before this is called and resolved when the registry is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if an explicitly given file is missing,
    /// or a read/parse error for the file that was found
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default configuration file unless one already exists
    ///
    /// Returns the path of the user configuration file and whether it was
    /// created by this call.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be determined or
    /// the file cannot be written
    pub async fn initialize_first_run() -> ConfigResult<(PathBuf, bool)> {
        let config_path = Self::get_default_config_path()?;
        let created = Self::initialize_at(&config_path).await?;
        Ok((config_path, created))
    }

    /// Write the default configuration to `path` if it does not exist
    ///
    /// Returns whether a file was created.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the directory or file cannot be written
    pub async fn initialize_at(path: &Path) -> ConfigResult<bool> {
        if path.exists() {
            debug!("Config file already exists: {}", path.display());
            return Ok(false);
        }

        info!("Creating default configuration file...");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(true)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(paths::LOCAL_FILE)];
        if let Ok(user_path) = Self::get_default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(ref path) = found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(paths::APP_DIR).join(paths::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# FHIR Query Builder Configuration
# You can customize any of these settings to suit your needs.

[client]
request_timeout = "{}s"
connect_timeout = "{}s"
pool_max_per_host = {}
rate_limit_rps = {}

[cache]
# How long a capability statement is reused before it is fetched again
ttl = "1h"

# Registered servers. Secrets may be written as "env:VARIABLE_NAME".
[[servers]]
id = "hapi"
name = "HAPI FHIR (public)"
base_url = "https://hapi.fhir.org/baseR4"
version = "{}"

# [[servers]]
# name = "Local"
# base_url = "http://localhost:8080/fhir"
# auth = {{ type = "basic", username = "admin", password = "env:FHIR_PASSWORD" }}

[logging]
level = "warn"  # error, warn, info, debug, trace
"#,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            http::POOL_MAX_PER_HOST,
            http::DEFAULT_RATE_LIMIT_RPS,
            fhir::DEFAULT_VERSION,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            pool_max_per_host: self.pool_max_per_host,
            rate_limit_rps: self.rate_limit_rps,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            ..defaults
        }
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig::default().with_ttl(self.ttl)
    }
}

impl ServerConfigToml {
    /// Convert to a validated profile with secrets resolved
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid base URL or unset secret variable
    pub fn to_profile(&self) -> ConfigResult<ServerProfile> {
        let mut profile = ServerProfile::new(self.name.clone(), &self.base_url)?
            .with_auth(self.auth.clone().resolve_env_secrets()?);
        if let Some(ref id) = self.id {
            profile = profile.with_id(ServerId::new(id.clone()));
        }
        if let Some(ref version) = self.version {
            profile = profile.with_version(version.clone());
        }
        Ok(profile)
    }
}
