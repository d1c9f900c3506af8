//! Backend services for the Vervet connection core.
//!
//! This module contains the connection lifecycle and its collaborators:
//! - `manager` - Connection registry and lifecycle orchestration
//! - `connection` - A single live connection
//! - `driver` - Database driver seam with the MongoDB implementation
//! - `credentials` - OS keychain storage for connection strings
//! - `servers` - Server lookup
//! - `events` - Lifecycle notifications

pub mod connection;
pub mod credentials;
pub mod driver;
pub mod events;
pub mod manager;
pub mod servers;

pub use connection::ActiveConnection;
pub use credentials::{CredentialStore, KeychainCredentialStore, MemoryCredentialStore};
pub use driver::{DatabaseDriver, DatabaseHandle, MongoDriver};
pub use events::{ChannelEventSink, EventSink, LogEventSink};
pub use manager::{ConnectionManager, ConnectionRegistry};
pub use servers::{InMemoryServerProvider, ServerProvider};
