//! A single live connection to a registered server.

use crate::error::{Result, VervetError};
use crate::models::ConnectionDescriptor;
use crate::services::driver::DatabaseHandle;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Owns the client handle for one server.
///
/// The handle is present from construction until the first `disconnect`, after
/// which it is gone for good: the connection is never reused or reopened.
pub struct ActiveConnection {
    server_id: String,
    name: String,
    connected_at: DateTime<Utc>,
    handle: Mutex<Option<Arc<dyn DatabaseHandle>>>,
}

impl ActiveConnection {
    /// Wrap a handle that has already passed its liveness probe.
    pub fn new(
        server_id: impl Into<String>,
        name: impl Into<String>,
        handle: Box<dyn DatabaseHandle>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            name: name.into(),
            connected_at: Utc::now(),
            handle: Mutex::new(Some(Arc::from(handle))),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Display name cached at connect time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the handle is still held.
    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            server_id: self.server_id.clone(),
            name: self.name.clone(),
            connected_at: self.connected_at,
        }
    }

    /// Release the client handle.
    ///
    /// The handle is cleared before the driver is asked to close it, so the
    /// connection is unusable afterwards whether or not the close succeeds.
    pub async fn disconnect(&self, timeout: Duration) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .take()
            .ok_or_else(|| VervetError::not_connected(self.server_id.as_str()))?;

        handle.close(timeout).await.map_err(|e| e.for_server(&self.server_id))?;
        tracing::debug!(server_id = %self.server_id, "Client handle closed");
        Ok(())
    }

    /// List database names on the live handle.
    pub async fn list_database_names(&self, timeout: Duration) -> Result<Vec<String>> {
        let handle = self.live_handle()?;
        handle.list_database_names(timeout).await.map_err(|e| e.for_server(&self.server_id))
    }

    /// List collection names in one database on the live handle.
    pub async fn list_collection_names(
        &self,
        database: &str,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let handle = self.live_handle()?;
        handle
            .list_collection_names(database, timeout)
            .await
            .map_err(|e| e.for_server(&self.server_id))
    }

    /// Clone the handle out so no lock is held across the driver call.
    fn live_handle(&self) -> Result<Arc<dyn DatabaseHandle>> {
        self.handle.lock().clone().ok_or_else(|| {
            VervetError::query(self.server_id.as_str(), "connection has been closed")
        })
    }
}

impl std::fmt::Debug for ActiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveConnection")
            .field("server_id", &self.server_id)
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
