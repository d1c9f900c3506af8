//! Connection lifecycle management.
//!
//! [`ConnectionManager`] is the single source of truth for which servers have a
//! live connection. It keeps at most one connection per server ID and runs every
//! network call (dial, ping, list, close) outside the registry lock.
//!
//! ## Connect protocol
//!
//! A connect first reserves the server's slot under the write lock. The slot is
//! a `Connecting` placeholder, so a second connect for the same ID is rejected
//! with `AlreadyConnected` for the whole duration of the dial, while connects to
//! other servers dial in parallel. Once dial and ping succeed, the placeholder
//! is replaced by the live connection. Any failure, or dropping the connect
//! future, releases the placeholder.
//!
//! `disconnect_all` drains placeholders too. A connect whose placeholder was
//! drained closes its fresh handle and returns `Cancelled`.

use crate::config::ConnectionTimeouts;
use crate::error::{Result, VervetError};
use crate::models::{ConnectionDescriptor, ConnectionEvent};
use crate::redact::redact_uri;
use crate::services::connection::ActiveConnection;
use crate::services::credentials::CredentialStore;
use crate::services::driver::{with_deadline, DatabaseDriver, DatabaseHandle};
use crate::services::events::EventSink;
use crate::services::servers::ServerProvider;

use futures_util::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

enum Slot {
    /// A connect holding this token is dialing.
    Connecting(u64),
    Live(Arc<ActiveConnection>),
}

/// Map from server ID to its connection slot.
///
/// Every read-check-then-write happens under one write-lock acquisition.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: RwLock<HashMap<String, Slot>>,
    next_token: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a server, failing if anything already occupies it.
    fn reserve(&self, server_id: &str) -> Result<u64> {
        let mut slots = self.slots.write();
        if slots.contains_key(server_id) {
            return Err(VervetError::already_connected(server_id));
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slots.insert(server_id.to_string(), Slot::Connecting(token));
        Ok(token)
    }

    /// Swap a placeholder for its live connection.
    ///
    /// Hands the connection back if the placeholder is no longer there.
    fn commit(
        &self,
        server_id: &str,
        token: u64,
        connection: Arc<ActiveConnection>,
    ) -> std::result::Result<(), Arc<ActiveConnection>> {
        let mut slots = self.slots.write();
        if matches!(slots.get(server_id), Some(Slot::Connecting(t)) if *t == token) {
            slots.insert(server_id.to_string(), Slot::Live(connection));
            Ok(())
        } else {
            Err(connection)
        }
    }

    /// Drop a placeholder, if it is still ours.
    fn release(&self, server_id: &str, token: u64) {
        let mut slots = self.slots.write();
        if matches!(slots.get(server_id), Some(Slot::Connecting(t)) if *t == token) {
            slots.remove(server_id);
        }
    }

    /// Get the live connection for a server.
    pub fn get(&self, server_id: &str) -> Option<Arc<ActiveConnection>> {
        match self.slots.read().get(server_id) {
            Some(Slot::Live(connection)) => Some(connection.clone()),
            _ => None,
        }
    }

    /// Remove and return the live connection for a server.
    ///
    /// A server that is still connecting is left alone.
    pub fn remove(&self, server_id: &str) -> Option<Arc<ActiveConnection>> {
        let mut slots = self.slots.write();
        if !matches!(slots.get(server_id), Some(Slot::Live(_))) {
            return None;
        }
        match slots.remove(server_id) {
            Some(Slot::Live(connection)) => Some(connection),
            _ => None,
        }
    }

    /// Empty the registry, returning the live connections it held.
    pub fn drain(&self) -> Vec<Arc<ActiveConnection>> {
        let drained = std::mem::take(&mut *self.slots.write());
        drained
            .into_values()
            .filter_map(|slot| match slot {
                Slot::Live(connection) => Some(connection),
                Slot::Connecting(_) => None,
            })
            .collect()
    }

    /// Descriptors of all live connections, ordered by server ID.
    pub fn descriptors(&self) -> Vec<ConnectionDescriptor> {
        let mut descriptors: Vec<ConnectionDescriptor> = self
            .slots
            .read()
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(connection) => Some(connection.descriptor()),
                Slot::Connecting(_) => None,
            })
            .collect();
        descriptors.sort_by(|a, b| a.server_id.cmp(&b.server_id));
        descriptors
    }

    /// Whether a server has a live connection.
    pub fn contains(&self, server_id: &str) -> bool {
        matches!(self.slots.read().get(server_id), Some(Slot::Live(_)))
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.slots.read().values().filter(|slot| matches!(slot, Slot::Live(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of connects currently dialing.
    pub fn pending(&self) -> usize {
        self.slots.read().values().filter(|slot| matches!(slot, Slot::Connecting(_))).count()
    }
}

/// Placeholder claim on a registry slot, released on drop unless committed.
struct Reservation<'a> {
    registry: &'a ConnectionRegistry,
    server_id: &'a str,
    token: u64,
    committed: bool,
}

impl<'a> Reservation<'a> {
    fn new(registry: &'a ConnectionRegistry, server_id: &'a str) -> Result<Self> {
        let token = registry.reserve(server_id)?;
        Ok(Self { registry, server_id, token, committed: false })
    }

    fn commit(
        mut self,
        connection: Arc<ActiveConnection>,
    ) -> std::result::Result<(), Arc<ActiveConnection>> {
        self.committed = true;
        self.registry.commit(self.server_id, self.token, connection)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.release(self.server_id, self.token);
        }
    }
}

/// Orchestrates connect, disconnect and metadata queries for registered servers.
pub struct ConnectionManager {
    registry: Arc<ConnectionRegistry>,
    servers: Arc<dyn ServerProvider>,
    credentials: Arc<dyn CredentialStore>,
    driver: Arc<dyn DatabaseDriver>,
    events: Arc<dyn EventSink>,
    timeouts: ConnectionTimeouts,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        servers: Arc<dyn ServerProvider>,
        credentials: Arc<dyn CredentialStore>,
        driver: Arc<dyn DatabaseDriver>,
        events: Arc<dyn EventSink>,
        timeouts: ConnectionTimeouts,
    ) -> Self {
        Self {
            registry,
            servers,
            credentials,
            driver,
            events,
            timeouts,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn timeouts(&self) -> ConnectionTimeouts {
        self.timeouts
    }

    /// Connect to a registered server using its stored connection string.
    ///
    /// Dial and ping share one deadline of `timeouts.connect`.
    pub async fn connect(&self, server_id: &str) -> Result<ConnectionDescriptor> {
        if self.shutdown.is_cancelled() {
            return Err(VervetError::cancelled(server_id));
        }

        let reservation = Reservation::new(&self.registry, server_id).inspect_err(|_| {
            tracing::debug!(server_id, "Connect rejected, server already connected");
        })?;

        let server = self.servers.resolve(server_id)?;
        let uri = self.credentials.get(server_id)?;

        tracing::debug!(server_id, uri = %redact_uri(&uri), "Connecting");
        let handle = self.establish(server_id, &uri).await?;

        let connection = Arc::new(ActiveConnection::new(server_id, server.name, handle));
        let descriptor = connection.descriptor();

        if let Err(orphan) = reservation.commit(connection) {
            tracing::warn!(server_id, "Registry drained during connect, closing new connection");
            if let Err(e) = self.teardown(&orphan).await {
                tracing::warn!(server_id, error = %e, "Failed to close abandoned connection");
            }
            return Err(VervetError::cancelled(server_id));
        }

        tracing::info!(server_id, name = %descriptor.name, "Connected to MongoDB");
        self.events.emit(&ConnectionEvent::Connected(server_id.to_string()));
        Ok(descriptor)
    }

    /// Dial and ping, closing the handle if the ping fails or shutdown interrupts it.
    async fn establish(&self, server_id: &str, uri: &str) -> Result<Box<dyn DatabaseHandle>> {
        let timeout = self.timeouts.connect;
        let deadline = Instant::now() + timeout;

        let dial = with_deadline(timeout, self.driver.connect(uri, timeout), || {
            VervetError::dial(server_id, format!("timed out after {}s", timeout.as_secs_f32()))
        });
        let handle = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(VervetError::cancelled(server_id)),
            result = dial => result.map_err(|e| {
                tracing::warn!(server_id, error = %e, "Dial failed");
                e.for_server(server_id)
            })?,
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let ping = with_deadline(remaining, handle.ping(remaining), || {
            VervetError::ping(server_id, format!("timed out after {}s", timeout.as_secs_f32()))
        });
        let probe = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(VervetError::cancelled(server_id)),
            result = ping => result.map_err(|e| e.for_server(server_id)),
        };

        if let Err(e) = probe {
            tracing::warn!(server_id, error = %e, "Ping failed, closing handle");
            self.close_quietly(server_id, handle.as_ref()).await;
            return Err(e);
        }
        Ok(handle)
    }

    /// Check that a connection string works without registering anything.
    ///
    /// Dials, pings and lists databases under one `timeouts.test_connect`
    /// deadline. The handle is always closed before returning.
    pub async fn test_connection(&self, uri: &str) -> Result<()> {
        let target = redact_uri(uri);
        let timeout = self.timeouts.test_connect;
        let deadline = Instant::now() + timeout;
        let elapsed = || format!("timed out after {}s", timeout.as_secs_f32());

        tracing::debug!(uri = %target, "Testing connection");
        let handle = with_deadline(timeout, self.driver.connect(uri, timeout), || {
            VervetError::dial(target.as_str(), elapsed())
        })
        .await
        .inspect_err(|e| tracing::warn!(uri = %target, error = %e, "Test dial failed"))?;

        let checks = async {
            let remaining = deadline.saturating_duration_since(Instant::now());
            with_deadline(remaining, handle.ping(remaining), || {
                VervetError::ping(target.as_str(), elapsed())
            })
            .await?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            with_deadline(remaining, handle.list_database_names(remaining), || {
                VervetError::query(target.as_str(), elapsed())
            })
            .await
        };
        let result = checks.await;

        self.close_quietly(&target, handle.as_ref()).await;

        match result {
            Ok(databases) => {
                let databases = databases.len();
                tracing::debug!(uri = %target, databases, "Connection test passed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(uri = %target, error = %e, "Connection test failed");
                Err(e)
            }
        }
    }

    /// Disconnect one server.
    ///
    /// The entry leaves the registry before teardown starts, so it is gone even
    /// when the driver fails to close the handle; that failure is still returned.
    pub async fn disconnect(&self, server_id: &str) -> Result<()> {
        let connection = self
            .registry
            .remove(server_id)
            .ok_or_else(|| VervetError::not_connected(server_id))?;

        let result = self.teardown(&connection).await;
        self.events.emit(&ConnectionEvent::Disconnected(server_id.to_string()));

        match result {
            Ok(()) => {
                tracing::info!(server_id, "Disconnected from MongoDB");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(server_id, error = %e, "Error while disconnecting");
                Err(e)
            }
        }
    }

    /// Disconnect every server.
    ///
    /// Teardowns run concurrently after the registry has been emptied.
    /// Individual failures are logged and do not fail the call.
    pub async fn disconnect_all(&self) -> Result<()> {
        let drained = self.registry.drain();
        if drained.is_empty() {
            tracing::debug!("No active connections to disconnect");
            return Ok(());
        }

        let teardowns = drained.iter().map(|connection| async move {
            (connection.server_id(), self.teardown(connection).await)
        });

        let mut failures = 0usize;
        for (server_id, result) in join_all(teardowns).await {
            if let Err(e) = result {
                failures += 1;
                tracing::warn!(server_id, error = %e, "Error while disconnecting");
            }
            self.events.emit(&ConnectionEvent::Disconnected(server_id.to_string()));
        }

        tracing::info!(count = drained.len(), failures, "All active connections disconnected");
        Ok(())
    }

    /// Cancel in-flight connects, reject new ones, and disconnect everything.
    ///
    /// This is the cleanup path to run before process exit.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Connection manager shutting down");
        self.shutdown.cancel();
        self.disconnect_all().await
    }

    /// Descriptors for all live connections.
    pub fn get_connections(&self) -> Vec<ConnectionDescriptor> {
        self.registry.descriptors()
    }

    /// Whether a server has a live connection.
    pub fn is_connected(&self, server_id: &str) -> bool {
        self.registry.contains(server_id)
    }

    /// List database names on a connected server.
    ///
    /// Only the lookup holds the registry lock. A disconnect racing with the
    /// query surfaces as a `Query` error.
    pub async fn get_databases(&self, server_id: &str) -> Result<Vec<String>> {
        let connection = self.lookup(server_id)?;
        let timeout = self.timeouts.query;
        with_deadline(timeout, connection.list_database_names(timeout), || {
            VervetError::query(server_id, format!("timed out after {}s", timeout.as_secs_f32()))
        })
        .await
    }

    /// List collection names in a database on a connected server.
    pub async fn get_collections(&self, server_id: &str, database: &str) -> Result<Vec<String>> {
        let connection = self.lookup(server_id)?;
        let timeout = self.timeouts.query;
        with_deadline(timeout, connection.list_collection_names(database, timeout), || {
            VervetError::query(server_id, format!("timed out after {}s", timeout.as_secs_f32()))
        })
        .await
    }

    fn lookup(&self, server_id: &str) -> Result<Arc<ActiveConnection>> {
        self.registry.get(server_id).ok_or_else(|| VervetError::not_connected(server_id))
    }

    async fn teardown(&self, connection: &ActiveConnection) -> Result<()> {
        let timeout = self.timeouts.query;
        with_deadline(timeout, connection.disconnect(timeout), || {
            VervetError::teardown(connection.server_id(), "timed out closing client")
        })
        .await
    }

    /// Close a handle that never made it into the registry. Errors are only logged.
    async fn close_quietly(&self, target: &str, handle: &dyn DatabaseHandle) {
        let timeout = self.timeouts.query;
        let close = with_deadline(timeout, handle.close(timeout), || {
            VervetError::teardown(target, "timed out closing client")
        });
        if let Err(e) = close.await {
            tracing::warn!(target, error = %e, "Failed to close client handle");
        }
    }
}

/// Debug output lists server IDs only.
impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.registry.len())
            .field("pending", &self.registry.pending())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
