//! Request header construction from server credentials
//!
//! `headers_for` is pure: it reads the profile's [`AuthDescriptor`] and never
//! performs I/O. Unsupported or incomplete credentials fail instead of
//! silently producing an unauthenticated request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::app::models::ServerProfile;
use crate::auth::AuthDescriptor;
use crate::constants::fhir::JSON_MEDIA_TYPE;
use crate::errors::{AuthError, AuthResult};

/// Produces the headers every request to a server must carry
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthStrategy;

impl AuthStrategy {
    /// Build content negotiation and authorization headers for `server`
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unsupported` for OAuth2, and
    /// `AuthError::IncompleteCredentials` for basic auth without a username or
    /// password.
    pub fn headers_for(server: &ServerProfile) -> AuthResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let media_type = HeaderValue::from_static(JSON_MEDIA_TYPE);
        headers.insert(ACCEPT, media_type.clone());
        headers.insert(CONTENT_TYPE, media_type);

        if let Some(value) = Self::authorization(server.auth())? {
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    fn authorization(auth: &AuthDescriptor) -> AuthResult<Option<HeaderValue>> {
        match auth {
            AuthDescriptor::None => Ok(None),
            AuthDescriptor::Basic { username, password } => {
                let username = required(username, "basic", "username")?;
                let password = required(password, "basic", "password")?;
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                sensitive_value(&format!("Basic {}", encoded)).map(Some)
            }
            AuthDescriptor::Bearer { token } => {
                if token.is_empty() {
                    return Err(AuthError::IncompleteCredentials {
                        kind: "bearer",
                        field: "token",
                    });
                }
                sensitive_value(&format!("Bearer {}", token)).map(Some)
            }
            AuthDescriptor::OAuth2 { .. } => Err(AuthError::Unsupported {
                kind: auth.kind().to_string(),
            }),
        }
    }
}

fn required<'a>(
    field: &'a Option<String>,
    kind: &'static str,
    name: &'static str,
) -> AuthResult<&'a str> {
    match field.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AuthError::IncompleteCredentials { kind, field: name }),
    }
}

fn sensitive_value(raw: &str) -> AuthResult<HeaderValue> {
    let mut value = HeaderValue::from_str(raw).map_err(|_| AuthError::InvalidHeaderValue {
        header: "Authorization",
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with(auth: AuthDescriptor) -> ServerProfile {
        ServerProfile::new("test", "https://example.org/fhir")
            .unwrap()
            .with_auth(auth)
    }

    #[test]
    fn test_no_auth_only_content_negotiation() {
        let headers = AuthStrategy::headers_for(&server_with(AuthDescriptor::None)).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/fhir+json");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/fhir+json");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_basic_auth_header() {
        let headers = AuthStrategy::headers_for(&server_with(AuthDescriptor::Basic {
            username: Some("u".to_string()),
            password: Some("p".to_string()),
        }))
        .unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dTpw");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/fhir+json");
    }

    #[test]
    fn test_basic_auth_missing_password_fails_fast() {
        let result = AuthStrategy::headers_for(&server_with(AuthDescriptor::Basic {
            username: Some("u".to_string()),
            password: None,
        }));
        assert!(matches!(
            result,
            Err(AuthError::IncompleteCredentials {
                kind: "basic",
                field: "password"
            })
        ));

        let result = AuthStrategy::headers_for(&server_with(AuthDescriptor::Basic {
            username: Some(String::new()),
            password: Some("p".to_string()),
        }));
        assert!(matches!(
            result,
            Err(AuthError::IncompleteCredentials {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn test_bearer_auth_header() {
        let headers = AuthStrategy::headers_for(&server_with(AuthDescriptor::Bearer {
            token: "abc.def".to_string(),
        }))
        .unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def");
    }

    #[test]
    fn test_oauth2_is_unsupported() {
        let result = AuthStrategy::headers_for(&server_with(AuthDescriptor::OAuth2 {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        }));
        match result {
            Err(AuthError::Unsupported { kind }) => assert_eq!(kind, "oauth2"),
            other => panic!("Expected AuthError::Unsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_token_with_newline_rejected() {
        let result = AuthStrategy::headers_for(&server_with(AuthDescriptor::Bearer {
            token: "bad\ntoken".to_string(),
        }));
        assert!(matches!(result, Err(AuthError::InvalidHeaderValue { .. })));
    }
}
