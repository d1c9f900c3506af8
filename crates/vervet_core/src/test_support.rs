//! Test doubles shared by unit and verification tests.

use crate::config::ConnectionTimeouts;
use crate::error::{Result, VervetError};
use crate::models::{ConnectionEvent, RegisteredServer};
use crate::redact::redact_uri;
use crate::services::credentials::{CredentialStore, MemoryCredentialStore};
use crate::services::driver::{DatabaseDriver, DatabaseHandle};
use crate::services::events::EventSink;
use crate::services::manager::{ConnectionManager, ConnectionRegistry};
use crate::services::servers::InMemoryServerProvider;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    databases: HashMap<String, Vec<String>>,
    collections: HashMap<(String, String), Vec<String>>,
    dial_delays: HashMap<String, Duration>,
    ping_delays: HashMap<String, Duration>,
    failing_dials: HashSet<String>,
    failing_pings: HashSet<String>,
    failing_closes: HashSet<String>,
    failing_queries: HashSet<String>,
    dials: usize,
    opened: usize,
    closed: usize,
}

/// Scripted driver. Behaviour is configured per URI; anything not configured succeeds.
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_databases(&self, uri: &str, names: &[&str]) {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.state.lock().databases.insert(uri.to_string(), names);
    }

    pub fn set_collections(&self, uri: &str, database: &str, names: &[&str]) {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.state.lock().collections.insert((uri.to_string(), database.to_string()), names);
    }

    /// Make `connect` sleep before answering. The driver itself ignores its timeout.
    pub fn delay_dial(&self, uri: &str, delay: Duration) {
        self.state.lock().dial_delays.insert(uri.to_string(), delay);
    }

    pub fn delay_ping(&self, uri: &str, delay: Duration) {
        self.state.lock().ping_delays.insert(uri.to_string(), delay);
    }

    pub fn fail_dial(&self, uri: &str) {
        self.state.lock().failing_dials.insert(uri.to_string());
    }

    pub fn fail_ping(&self, uri: &str) {
        self.state.lock().failing_pings.insert(uri.to_string());
    }

    pub fn fail_close(&self, uri: &str) {
        self.state.lock().failing_closes.insert(uri.to_string());
    }

    pub fn fail_queries(&self, uri: &str) {
        self.state.lock().failing_queries.insert(uri.to_string());
    }

    /// Number of `connect` calls, successful or not.
    pub fn dial_count(&self) -> usize {
        self.state.lock().dials
    }

    /// Number of handles handed out.
    pub fn opened_count(&self) -> usize {
        self.state.lock().opened
    }

    /// Number of `close` calls, successful or not.
    pub fn closed_count(&self) -> usize {
        self.state.lock().closed
    }

    /// Handles handed out and never closed.
    pub fn open_handles(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    async fn connect(&self, uri: &str, _timeout: Duration) -> Result<Box<dyn DatabaseHandle>> {
        let delay = {
            let mut state = self.state.lock();
            state.dials += 1;
            state.dial_delays.get(uri).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.failing_dials.contains(uri) {
            return Err(VervetError::dial(redact_uri(uri), "connection refused"));
        }
        state.opened += 1;
        Ok(Box::new(FakeHandle { uri: uri.to_string(), state: self.state.clone() }))
    }
}

struct FakeHandle {
    uri: String,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl DatabaseHandle for FakeHandle {
    async fn ping(&self, _timeout: Duration) -> Result<()> {
        let delay = self.state.lock().ping_delays.get(&self.uri).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.lock().failing_pings.contains(&self.uri) {
            return Err(VervetError::ping(redact_uri(&self.uri), "authentication failed"));
        }
        Ok(())
    }

    async fn list_database_names(&self, _timeout: Duration) -> Result<Vec<String>> {
        let state = self.state.lock();
        if state.failing_queries.contains(&self.uri) {
            return Err(VervetError::query(redact_uri(&self.uri), "not authorized"));
        }
        Ok(state.databases.get(&self.uri).cloned().unwrap_or_default())
    }

    async fn list_collection_names(
        &self,
        database: &str,
        _timeout: Duration,
    ) -> Result<Vec<String>> {
        let state = self.state.lock();
        if state.failing_queries.contains(&self.uri) {
            return Err(VervetError::query(redact_uri(&self.uri), "not authorized"));
        }
        let key = (self.uri.clone(), database.to_string());
        Ok(state.collections.get(&key).cloned().unwrap_or_default())
    }

    async fn close(&self, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.closed += 1;
        if state.failing_closes.contains(&self.uri) {
            return Err(VervetError::teardown(redact_uri(&self.uri), "socket already closed"));
        }
        Ok(())
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &ConnectionEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A manager wired to fakes, with handles on every collaborator.
pub struct Harness {
    pub manager: Arc<ConnectionManager>,
    pub registry: Arc<ConnectionRegistry>,
    pub driver: FakeDriver,
    pub servers: Arc<InMemoryServerProvider>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub events: Arc<RecordingEventSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeouts(ConnectionTimeouts::default())
    }

    pub fn with_timeouts(timeouts: ConnectionTimeouts) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let driver = FakeDriver::new();
        let servers = Arc::new(InMemoryServerProvider::new());
        let credentials = Arc::new(MemoryCredentialStore::new());
        let events = Arc::new(RecordingEventSink::default());

        let manager = Arc::new(ConnectionManager::new(
            registry.clone(),
            servers.clone(),
            credentials.clone(),
            Arc::new(driver.clone()),
            events.clone(),
            timeouts,
        ));

        Self { manager, registry, driver, servers, credentials, events }
    }

    /// Register a server and store its connection string.
    pub fn add_server(&self, id: &str, name: &str, uri: &str) {
        self.servers.insert(RegisteredServer::new(id, name));
        self.credentials.set(id, uri).unwrap();
    }

    /// Server IDs currently listed by the manager, sorted.
    pub fn connected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.manager.get_connections().into_iter().map(|d| d.server_id).collect();
        ids.sort();
        ids
    }
}
