//! Core connection management for the Vervet MongoDB client.
//!
//! This crate tracks live database connections for registered servers:
//!
//! - **error**: Error kinds callers can branch on
//! - **models**: Servers, connection descriptors and lifecycle events
//! - **services**: Connection manager, driver seam, credential store, event sinks
//! - **api**: Result envelopes for the UI bridge
//! - **state**: Application composition and shutdown
//! - **config** / **logging**: Timeouts, data directory and tracing setup

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod redact;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use api::{CommandResult, ConnectionsProxy, EmptyResult};
pub use config::{ConnectionTimeouts, VervetConfig};
pub use error::{Result, VervetError};
pub use models::{ConnectionDescriptor, ConnectionEvent, RegisteredServer};
pub use redact::redact_uri;
pub use services::{
    ActiveConnection, ChannelEventSink, ConnectionManager, ConnectionRegistry, CredentialStore,
    DatabaseDriver, DatabaseHandle, EventSink, InMemoryServerProvider, KeychainCredentialStore,
    LogEventSink, MemoryCredentialStore, MongoDriver, ServerProvider,
};
pub use state::VervetState;
