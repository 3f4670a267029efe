//! Data models for the FHIR query builder
//!
//! Server identity, the capability statement as published by a server, the
//! semantic types of search parameters, and the search result bundle.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;

use crate::auth::AuthDescriptor;
use crate::constants::fhir;
use crate::errors::{ConfigError, ConfigResult, QueryError};

/// Opaque identity of a registered server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A FHIR server the user has registered
#[derive(Debug, Clone, PartialEq)]
pub struct ServerProfile {
    id: ServerId,
    name: String,
    base_url: String,
    version: String,
    auth: AuthDescriptor,
}

impl ServerProfile {
    /// Register a server with a generated id, version `R4` and no auth
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(name: impl Into<String>, base_url: &str) -> ConfigResult<Self> {
        Ok(Self {
            id: ServerId::generate(),
            name: name.into(),
            base_url: normalize_base_url(base_url)?,
            version: fhir::DEFAULT_VERSION.to_string(),
            auth: AuthDescriptor::None,
        })
    }

    /// Replace the generated id with a caller-chosen one
    pub fn with_id(mut self, id: ServerId) -> Self {
        self.id = id;
        self
    }

    /// Set the protocol version tag
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the initial auth descriptor
    pub fn with_auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = auth;
        self
    }

    /// Replace the auth descriptor; the only mutation a profile supports
    pub fn set_auth(&mut self, auth: AuthDescriptor) {
        self.auth = auth;
    }

    pub fn id(&self) -> &ServerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn auth(&self) -> &AuthDescriptor {
        &self.auth
    }

    /// Absolute URL of the capability statement
    pub fn metadata_url(&self) -> String {
        format!("{}/{}", self.base_url, fhir::METADATA_PATH)
    }
}

/// Validate a base URL and strip any trailing slashes
fn normalize_base_url(raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        field: "base_url".to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            field: "base_url".to_string(),
            value: raw.to_string(),
            reason: "Expected an absolute http(s) URL".to_string(),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Deserialize a field, treating a wrongly-shaped value as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserialize an array element by element, dropping elements of the wrong shape
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Deserialize an array element by element, keeping an empty placeholder for
/// elements of the wrong shape so they can still be counted
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

/// Server-published description of supported resources and search parameters
///
/// Every nested field is optional and tolerant of the wrong JSON shape:
/// capability statements come from third parties and are often incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDocument {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec", skip_serializing_if = "Option::is_none")]
    pub rest: Option<Vec<RestComponent>>,
}

/// One REST mode declared by a server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestComponent {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec", skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<ResourceDescriptor>>,
}

/// A resource type the server exposes, with its declared search parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries", skip_serializing_if = "Option::is_none")]
    pub search_param: Option<Vec<DeclaredSearchParam>>,
}

/// A search parameter entry exactly as declared in the capability statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredSearchParam {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub param_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Semantic type of a search parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamType {
    Number,
    Date,
    #[default]
    String,
    Token,
    Reference,
    Composite,
    Quantity,
    Uri,
    Special,
    #[serde(other)]
    Unknown,
}

impl SearchParamType {
    /// Map a capability statement type code; unrecognised codes map to `Unknown`
    pub fn from_code(code: &str) -> Self {
        match code {
            "number" => Self::Number,
            "date" => Self::Date,
            "string" => Self::String,
            "token" => Self::Token,
            "reference" => Self::Reference,
            "composite" => Self::Composite,
            "quantity" => Self::Quantity,
            "uri" => Self::Uri,
            "special" => Self::Special,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Date => "date",
            Self::String => "string",
            Self::Token => "token",
            Self::Reference => "reference",
            Self::Composite => "composite",
            Self::Quantity => "quantity",
            Self::Uri => "uri",
            Self::Special => "special",
            Self::Unknown => "unknown",
        }
    }

    /// Whether comparison prefixes are meaningful for this type
    pub fn supports_prefixes(&self) -> bool {
        matches!(self, Self::Number | Self::Date | Self::Quantity)
    }
}

impl fmt::Display for SearchParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A legal search parameter for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchParameterDefinition {
    pub name: String,
    pub param_type: SearchParamType,
    pub documentation: Option<String>,
}

impl SearchParameterDefinition {
    pub fn new(name: impl Into<String>, param_type: SearchParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            documentation: None,
        }
    }
}

/// Comparison prefix for number, date and quantity parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPrefix {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Sa,
    Eb,
}

impl ComparisonPrefix {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::Sa => "sa",
            Self::Eb => "eb",
        }
    }
}

impl FromStr for ComparisonPrefix {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "ge" => Ok(Self::Ge),
            "le" => Ok(Self::Le),
            "sa" => Ok(Self::Sa),
            "eb" => Ok(Self::Eb),
            other => Err(QueryError::UnknownPrefix {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ComparisonPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Search result bundle; entries are kept as raw JSON resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBundle {
    pub resource_type: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,
}

/// One matched record in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
}

impl ResultBundle {
    /// Number of entries actually returned in this page
    pub fn entry_count(&self) -> usize {
        self.entry.as_ref().map_or(0, Vec::len)
    }

    /// Iterate the raw resources carried by the entries
    pub fn resources(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.entry
            .iter()
            .flatten()
            .filter_map(|entry| entry.resource.as_ref())
    }
}
