//! Connection descriptor and lifecycle event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event name emitted when a server becomes connected.
pub const CONNECTED_EVENT: &str = "connection-connected";

/// Event name emitted when a server's connection is torn down.
pub const DISCONNECTED_EVENT: &str = "connection-disconnected";

/// Informational view of a live connection.
///
/// Holds no reference to the underlying client handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    /// ID of the connected server.
    #[serde(rename = "serverID")]
    pub server_id: String,
    /// Display name, cached from the server registry at connect time.
    pub name: String,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
}

/// Lifecycle notification delivered to an [`crate::services::EventSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "serverID")]
pub enum ConnectionEvent {
    /// A connection was established and registered.
    #[serde(rename = "connection-connected")]
    Connected(String),
    /// A connection was removed from the registry.
    #[serde(rename = "connection-disconnected")]
    Disconnected(String),
}

impl ConnectionEvent {
    /// Event name as seen by the UI layer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => CONNECTED_EVENT,
            Self::Disconnected(_) => DISCONNECTED_EVENT,
        }
    }

    /// Server ID payload.
    pub fn server_id(&self) -> &str {
        match self {
            Self::Connected(id) | Self::Disconnected(id) => id,
        }
    }
}
