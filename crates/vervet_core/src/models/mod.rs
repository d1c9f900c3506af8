//! Data models for the Vervet connection core.
//!
//! - `server` - RegisteredServer, as held by the server registry
//! - `connection` - ConnectionDescriptor, ConnectionEvent

pub mod connection;
pub mod server;

pub use connection::{ConnectionDescriptor, ConnectionEvent};
pub use server::RegisteredServer;
