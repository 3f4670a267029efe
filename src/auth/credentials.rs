//! Server credentials and their resolution
//!
//! [`AuthDescriptor`] carries one payload shape per auth kind. Secrets may be
//! written in configuration as `env:NAME` and are resolved from the process
//! environment (which `.env` has already been merged into by the binary).

use std::env;
use std::fmt;
use std::io::{self, IsTerminal};

use serde::{Deserialize, Serialize};

use crate::constants::config::ENV_SECRET_PREFIX;
use crate::errors::{AuthError, AuthResult, ConfigError, ConfigResult};

/// How requests to a server are authenticated
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthDescriptor {
    /// No credentials, content negotiation headers only
    #[default]
    None,
    /// HTTP basic authentication
    Basic {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
    /// Static bearer token
    Bearer { token: String },
    /// Client credentials; accepted in configuration but not implemented
    #[serde(rename = "oauth2")]
    OAuth2 {
        #[serde(default)]
        client_id: Option<String>,
        #[serde(default)]
        client_secret: Option<String>,
    },
}

impl AuthDescriptor {
    /// Short name of the auth kind, as written in configuration
    pub fn kind(&self) -> &'static str {
        match self {
            AuthDescriptor::None => "none",
            AuthDescriptor::Basic { .. } => "basic",
            AuthDescriptor::Bearer { .. } => "bearer",
            AuthDescriptor::OAuth2 { .. } => "oauth2",
        }
    }

    /// Basic auth with a username but no password yet
    pub fn needs_password(&self) -> bool {
        matches!(
            self,
            AuthDescriptor::Basic { username: Some(user), password }
                if !user.is_empty() && password.as_deref().map_or(true, str::is_empty)
        )
    }

    /// Replace every `env:NAME` secret with the value of that variable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvExpansionFailed` if a referenced variable is unset.
    pub fn resolve_env_secrets(self) -> ConfigResult<Self> {
        Ok(match self {
            AuthDescriptor::Basic { username, password } => AuthDescriptor::Basic {
                username: username.map(resolve_secret).transpose()?,
                password: password.map(resolve_secret).transpose()?,
            },
            AuthDescriptor::Bearer { token } => AuthDescriptor::Bearer {
                token: resolve_secret(token)?,
            },
            AuthDescriptor::OAuth2 {
                client_id,
                client_secret,
            } => AuthDescriptor::OAuth2 {
                client_id,
                client_secret: client_secret.map(resolve_secret).transpose()?,
            },
            AuthDescriptor::None => AuthDescriptor::None,
        })
    }
}

// Secrets stay out of logs and panic messages
impl fmt::Debug for AuthDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthDescriptor::None => f.write_str("None"),
            AuthDescriptor::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &password.as_ref().map(|_| "<redacted>"))
                .finish(),
            AuthDescriptor::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            AuthDescriptor::OAuth2 {
                client_id,
                client_secret,
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &client_secret.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Resolve a single `env:NAME` reference; plain values pass through
pub fn resolve_secret(value: String) -> ConfigResult<String> {
    match value.strip_prefix(ENV_SECRET_PREFIX) {
        Some(var) => env::var(var).map_err(|_| ConfigError::EnvExpansionFailed {
            var: var.to_string(),
        }),
        None => Ok(value),
    }
}

/// Prompt for a basic-auth password when one is missing
///
/// Only prompts when stdin is a terminal; otherwise the descriptor is returned
/// unchanged and header construction reports the missing field.
pub fn prompt_missing_password(server_name: &str, auth: AuthDescriptor) -> AuthResult<AuthDescriptor> {
    if !auth.needs_password() || !io::stdin().is_terminal() {
        return Ok(auth);
    }

    match auth {
        AuthDescriptor::Basic { username, .. } => {
            let prompt = format!(
                "Password for {}@{}: ",
                username.as_deref().unwrap_or_default(),
                server_name
            );
            let password = rpassword::prompt_password(prompt).map_err(AuthError::Prompt)?;
            Ok(AuthDescriptor::Basic {
                username,
                password: Some(password),
            })
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            auth: AuthDescriptor,
        }

        let parsed: Wrapper =
            toml::from_str("[auth]\ntype = \"basic\"\nusername = \"u\"\npassword = \"p\"\n")
                .unwrap();
        assert_eq!(
            parsed.auth,
            AuthDescriptor::Basic {
                username: Some("u".to_string()),
                password: Some("p".to_string()),
            }
        );

        let parsed: Wrapper = toml::from_str("[auth]\ntype = \"oauth2\"\nclient_id = \"c\"\n").unwrap();
        assert_eq!(parsed.auth.kind(), "oauth2");

        let parsed: Wrapper = toml::from_str("[auth]\ntype = \"none\"\n").unwrap();
        assert_eq!(parsed.auth, AuthDescriptor::None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthDescriptor::Bearer {
            token: "super-secret".to_string(),
        };
        let rendered = format!("{:?}", auth);
        assert!(!rendered.contains("super-secret"));

        let auth = AuthDescriptor::Basic {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
        };
        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_needs_password() {
        let missing = AuthDescriptor::Basic {
            username: Some("alice".to_string()),
            password: None,
        };
        assert!(missing.needs_password());

        let complete = AuthDescriptor::Basic {
            username: Some("alice".to_string()),
            password: Some("pw".to_string()),
        };
        assert!(!complete.needs_password());
        assert!(!AuthDescriptor::None.needs_password());
    }

    #[test]
    fn test_env_secret_resolution() {
        let var = "FHIR_QUERY_TEST_TOKEN_RESOLUTION";
        unsafe {
            env::set_var(var, "from-env");
        }

        let auth = AuthDescriptor::Bearer {
            token: format!("env:{}", var),
        }
        .resolve_env_secrets()
        .unwrap();
        assert_eq!(
            auth,
            AuthDescriptor::Bearer {
                token: "from-env".to_string()
            }
        );

        unsafe {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_missing_env_secret_fails() {
        let result = resolve_secret("env:FHIR_QUERY_TEST_SURELY_UNSET".to_string());
        assert!(matches!(
            result,
            Err(ConfigError::EnvExpansionFailed { var }) if var == "FHIR_QUERY_TEST_SURELY_UNSET"
        ));

        assert_eq!(resolve_secret("plain".to_string()).unwrap(), "plain");
    }
}
