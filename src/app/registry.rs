//! Registered servers for the current session

use crate::app::models::{ServerId, ServerProfile};
use crate::auth::AuthDescriptor;
use crate::errors::{ConfigError, ConfigResult};

/// Ordered set of server profiles plus the active selection
///
/// Profiles are only added; nothing is evicted or persisted from here.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Vec<ServerProfile>,
    active: Option<ServerId>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile; the first one added becomes active
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the id is already registered
    pub fn add(&mut self, server: ServerProfile) -> ConfigResult<()> {
        if self.get(server.id()).is_some() {
            return Err(ConfigError::InvalidValue {
                field: "servers.id".to_string(),
                value: server.id().to_string(),
                reason: "Server ids must be unique".to_string(),
            });
        }
        if self.active.is_none() {
            self.active = Some(server.id().clone());
        }
        tracing::debug!("Registered server {} ({})", server.name(), server.base_url());
        self.servers.push(server);
        Ok(())
    }

    pub fn get(&self, id: &ServerId) -> Option<&ServerProfile> {
        self.servers.iter().find(|s| s.id() == id)
    }

    /// Look a server up by id, falling back to a case-insensitive name match
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownServer` if nothing matches
    pub fn find(&self, key: &str) -> ConfigResult<&ServerProfile> {
        self.servers
            .iter()
            .find(|s| s.id().as_str() == key)
            .or_else(|| self.servers.iter().find(|s| s.name().eq_ignore_ascii_case(key)))
            .ok_or_else(|| ConfigError::UnknownServer(key.to_string()))
    }

    /// # Errors
    ///
    /// Returns `ConfigError::UnknownServer` if `id` is not registered
    pub fn set_active(&mut self, id: &ServerId) -> ConfigResult<()> {
        if self.get(id).is_none() {
            return Err(ConfigError::UnknownServer(id.to_string()));
        }
        self.active = Some(id.clone());
        Ok(())
    }

    pub fn active(&self) -> Option<&ServerProfile> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Replace the credentials of a registered server
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownServer` if `id` is not registered
    pub fn update_auth(&mut self, id: &ServerId, auth: AuthDescriptor) -> ConfigResult<()> {
        let server = self
            .servers
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| ConfigError::UnknownServer(id.to_string()))?;
        server.set_auth(auth);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerProfile> {
        self.servers.iter()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
