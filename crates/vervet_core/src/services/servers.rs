//! Server lookup for the connection manager.
//!
//! The server registry itself (tree editing, persistence) lives outside this
//! crate. The connection manager only needs to turn an ID into a
//! [`RegisteredServer`].

use crate::error::{Result, VervetError};
use crate::models::RegisteredServer;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

/// Resolves server IDs to registry entries.
pub trait ServerProvider: Send + Sync {
    /// Look up a connectable server. Unknown IDs and groups are `ServerNotFound`.
    fn resolve(&self, server_id: &str) -> Result<RegisteredServer>;
}

/// Server provider backed by an in-memory map.
#[derive(Debug, Default)]
pub struct InMemoryServerProvider {
    servers: RwLock<HashMap<String, RegisteredServer>>,
}

impl InMemoryServerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from a list of entries.
    pub fn with_servers(servers: impl IntoIterator<Item = RegisteredServer>) -> Self {
        let provider = Self::new();
        for server in servers {
            provider.insert(server);
        }
        provider
    }

    /// Load entries from a JSON array of servers.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| VervetError::Config {
            message: format!("Failed to read server list '{}': {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        let servers: Vec<RegisteredServer> = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), count = servers.len(), "Server list loaded");
        Ok(Self::with_servers(servers))
    }

    /// Add or replace an entry.
    pub fn insert(&self, server: RegisteredServer) {
        self.servers.write().insert(server.id.clone(), server);
    }

    /// Remove an entry.
    pub fn remove(&self, server_id: &str) -> Option<RegisteredServer> {
        self.servers.write().remove(server_id)
    }
}

impl ServerProvider for InMemoryServerProvider {
    fn resolve(&self, server_id: &str) -> Result<RegisteredServer> {
        match self.servers.read().get(server_id) {
            Some(server) if !server.is_group => Ok(server.clone()),
            Some(_) => {
                tracing::debug!(server_id, "Refusing to resolve a group entry");
                Err(VervetError::server_not_found(server_id))
            }
            None => Err(VervetError::server_not_found(server_id)),
        }
    }
}
