//! Application state management.
//!
//! [`VervetState`] is the composition root: it builds the collaborators the
//! connection manager needs, owns the tokio runtime the manager's I/O runs on,
//! and provides the shutdown path that releases every live connection.

use crate::api::ConnectionsProxy;
use crate::config::{self, VervetConfig, CONFIG_FILE_NAME};
use crate::error::{Result, VervetError};
use crate::logging::LogConfig;
use crate::services::{
    credentials, ConnectionManager, ConnectionRegistry, CredentialStore, DatabaseDriver,
    EventSink, InMemoryServerProvider, MongoDriver, ServerProvider,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Central application state.
pub struct VervetState {
    config: VervetConfig,
    data_dir: PathBuf,
    credentials: Arc<dyn CredentialStore>,
    manager: Arc<ConnectionManager>,
    tokio_runtime: tokio::runtime::Runtime,
}

impl VervetState {
    /// Create state using the default data directory, the OS keychain and the MongoDB driver.
    pub fn new(servers: Arc<dyn ServerProvider>, events: Arc<dyn EventSink>) -> Result<Self> {
        Self::with_data_dir(config::default_data_dir(), servers, events)
    }

    /// Create state with a custom data directory.
    pub fn with_data_dir(
        data_dir: PathBuf,
        servers: Arc<dyn ServerProvider>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config::init_data_dir(&data_dir)?;
        let config = VervetConfig::load(&data_dir.join(CONFIG_FILE_NAME))?;
        let credentials: Arc<dyn CredentialStore> =
            Arc::from(credentials::select_store(&config.keyring_service));

        let driver = Arc::new(MongoDriver::new());
        Self::with_parts(data_dir, config, servers, credentials, driver, events)
    }

    /// Create state from explicit parts.
    pub fn with_parts(
        data_dir: PathBuf,
        config: VervetConfig,
        servers: Arc<dyn ServerProvider>,
        credentials: Arc<dyn CredentialStore>,
        driver: Arc<dyn DatabaseDriver>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("vervet-io")
            .enable_all()
            .build()
            .map_err(|e| VervetError::internal(format!("Failed to create tokio runtime: {e}")))?;

        let manager = Arc::new(ConnectionManager::new(
            Arc::new(ConnectionRegistry::new()),
            servers,
            credentials.clone(),
            driver,
            events,
            config.timeouts,
        ));

        tracing::info!(data_dir = %data_dir.display(), "VervetState initialized");

        Ok(Self { config, data_dir, credentials, manager, tokio_runtime })
    }

    /// Create state whose server list comes from a JSON file.
    pub fn from_server_file(path: &Path, events: Arc<dyn EventSink>) -> Result<Self> {
        let servers = Arc::new(InMemoryServerProvider::from_json_file(path)?);
        Self::new(servers, events)
    }

    // ========== Service Accessors ==========

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// UI-facing proxy over the connection manager.
    pub fn connections(&self) -> ConnectionsProxy {
        ConnectionsProxy::new(self.manager.clone())
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn config(&self) -> &VervetConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Logging settings for this state's data directory and configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig::for_data_dir(&self.data_dir, &self.config)
    }

    pub fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.tokio_runtime
    }

    /// Spawn a future on the tokio runtime.
    pub fn spawn<F, T>(&self, future: F) -> tokio::task::JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.tokio_runtime.spawn(future)
    }

    /// Block on a future using the tokio runtime.
    ///
    /// Must not be called from inside the runtime.
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.tokio_runtime.block_on(future)
    }

    /// Release every live connection. Call before process exit.
    pub fn shutdown(&self) -> Result<()> {
        let manager = self.manager.clone();
        self.block_on(async move { manager.shutdown().await })
    }
}
