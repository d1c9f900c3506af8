//! Result envelopes and the proxy the UI bridge calls into.
//!
//! The frontend never sees a Rust `Err`. Every call resolves to a
//! [`CommandResult`] or [`EmptyResult`] carrying either data or a
//! human-readable message.

use crate::error::VervetError;
use crate::models::ConnectionDescriptor;
use crate::services::ConnectionManager;

use serde::Serialize;
use std::sync::Arc;

/// Outcome of a call that returns data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T> {
    pub is_success: bool,
    pub data: Option<T>,
    pub error: String,
}

impl<T> CommandResult<T> {
    pub fn success(data: T) -> Self {
        Self { is_success: true, data: Some(data), error: String::new() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { is_success: false, data: None, error: error.into() }
    }
}

/// Outcome of a call that returns nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyResult {
    pub is_success: bool,
    pub error: String,
}

impl EmptyResult {
    pub fn success() -> Self {
        Self { is_success: true, error: String::new() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { is_success: false, error: error.into() }
    }
}

fn empty(result: Result<(), VervetError>, context: &str) -> EmptyResult {
    match result {
        Ok(()) => EmptyResult::success(),
        Err(e) => EmptyResult::failure(format!("{context}: {e}")),
    }
}

fn with_data<T>(result: Result<T, VervetError>, context: &str) -> CommandResult<T> {
    match result {
        Ok(data) => CommandResult::success(data),
        Err(e) => CommandResult::failure(format!("{context}: {e}")),
    }
}

/// Connection operations exposed to the UI layer.
#[derive(Debug, Clone)]
pub struct ConnectionsProxy {
    manager: Arc<ConnectionManager>,
}

impl ConnectionsProxy {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub async fn connect(&self, server_id: &str) -> CommandResult<ConnectionDescriptor> {
        with_data(self.manager.connect(server_id).await, "Error connecting to mongo instance")
    }

    pub async fn test_connection(&self, uri: &str) -> EmptyResult {
        empty(self.manager.test_connection(uri).await, "Failed to connect to mongo server")
    }

    pub async fn disconnect(&self, server_id: &str) -> EmptyResult {
        empty(self.manager.disconnect(server_id).await, "Error disconnecting from mongo instance")
    }

    pub async fn disconnect_all(&self) -> EmptyResult {
        empty(self.manager.disconnect_all().await, "Error disconnecting from all connections")
    }

    pub fn get_connections(&self) -> CommandResult<Vec<ConnectionDescriptor>> {
        CommandResult::success(self.manager.get_connections())
    }

    pub async fn get_databases(&self, server_id: &str) -> CommandResult<Vec<String>> {
        with_data(self.manager.get_databases(server_id).await, "Error listing databases")
    }

    pub async fn get_collections(
        &self,
        server_id: &str,
        database: &str,
    ) -> CommandResult<Vec<String>> {
        with_data(
            self.manager.get_collections(server_id, database).await,
            "Error listing collections",
        )
    }
}
