//! Secure storage of connection strings.
//!
//! Connection URIs embed credentials, so they live in the OS keychain rather
//! than in the server registry file. Each registered server has at most one
//! stored URI, keyed by its ID.

use crate::error::{Result, VervetError};

use keyring::Entry;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage backend for connection URIs keyed by server ID.
pub trait CredentialStore: Send + Sync {
    /// Store (or replace) the URI for a server.
    fn set(&self, server_id: &str, uri: &str) -> Result<()>;

    /// Get the URI for a server. A missing entry is a `Credential` error.
    fn get(&self, server_id: &str) -> Result<String>;

    /// Delete the URI for a server. Deleting a missing entry succeeds.
    fn delete(&self, server_id: &str) -> Result<()>;

    /// Store name for logging.
    fn name(&self) -> &'static str;
}

/// Keychain entry name for a server.
fn entry_key(server_id: &str) -> String {
    format!("conn_{server_id}")
}

/// Map a keychain failure. An unreachable backend is a `Keyring` error; anything
/// else concerns this server's entry.
fn keychain_error(server_id: &str, message: &str, err: keyring::Error) -> VervetError {
    match err {
        e @ (keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)) => e.into(),
        other => VervetError::credential_with_source(server_id, message, other),
    }
}

// ============================================================================
// KeychainCredentialStore
// ============================================================================

/// OS keychain storage (macOS Keychain, Windows Credential Manager, Linux Secret Service).
#[derive(Debug)]
pub struct KeychainCredentialStore {
    service: String,
}

impl Default for KeychainCredentialStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KEYRING_SERVICE)
    }
}

impl KeychainCredentialStore {
    /// Create a store using the given keychain service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn entry(&self, server_id: &str) -> Result<Entry> {
        Entry::new(&self.service, &entry_key(server_id)).map_err(|e| {
            VervetError::credential_with_source(server_id, "Invalid keychain entry", e)
        })
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn set(&self, server_id: &str, uri: &str) -> Result<()> {
        self.entry(server_id)?.set_password(uri).map_err(|e| {
            tracing::error!(server_id, error = %e, "Failed to store connection string");
            keychain_error(server_id, "Failed to store connection string securely", e)
        })?;
        tracing::debug!(server_id, "Connection string stored in keychain");
        Ok(())
    }

    fn get(&self, server_id: &str) -> Result<String> {
        match self.entry(server_id)?.get_password() {
            Ok(uri) => Ok(uri),
            Err(keyring::Error::NoEntry) => {
                Err(VervetError::credential(server_id, "No connection string stored"))
            }
            Err(e) => {
                tracing::error!(server_id, error = %e, "Failed to retrieve connection string");
                Err(keychain_error(server_id, "Failed to retrieve connection string", e))
            }
        }
    }

    fn delete(&self, server_id: &str) -> Result<()> {
        match self.entry(server_id)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(server_id, "Connection string deleted from keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                tracing::error!(server_id, error = %e, "Failed to delete connection string");
                Err(keychain_error(server_id, "Failed to delete connection string", e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "KeychainCredentialStore"
    }
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// In-memory storage for when the keychain is unavailable.
///
/// Connection strings are lost when the application exits.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    uris: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored connection strings.
    pub fn len(&self) -> usize {
        self.uris.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, server_id: &str, uri: &str) -> Result<()> {
        self.uris.write().insert(server_id.to_string(), uri.to_string());
        tracing::debug!(server_id, "Connection string stored in session");
        Ok(())
    }

    fn get(&self, server_id: &str) -> Result<String> {
        self.uris
            .read()
            .get(server_id)
            .cloned()
            .ok_or_else(|| VervetError::credential(server_id, "No connection string stored"))
    }

    fn delete(&self, server_id: &str) -> Result<()> {
        self.uris.write().remove(server_id);
        tracing::debug!(server_id, "Connection string deleted from session");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemoryCredentialStore"
    }
}

/// Pick the keychain when it is usable, otherwise fall back to memory.
///
/// Probes the keychain with a lookup of a key that never exists; only
/// `NoEntry` (or success) proves the backend is reachable.
pub fn select_store(service: &str) -> Box<dyn CredentialStore> {
    let keychain = KeychainCredentialStore::new(service);
    let probe = Entry::new(service, "__vervet_probe__").and_then(|entry| entry.get_password());

    match probe {
        Ok(_) | Err(keyring::Error::NoEntry) => {
            tracing::info!(store = keychain.name(), "Credential store initialized");
            Box::new(keychain)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Keychain unavailable, falling back to session storage");
            Box::new(MemoryCredentialStore::new())
        }
    }
}
