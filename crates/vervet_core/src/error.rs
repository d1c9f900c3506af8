//! Error types for the Vervet connection core.
//!
//! Every failure a caller can branch on has its own variant. Driver errors are
//! wrapped with the server ID they relate to and never carry a raw connection
//! URI in their message.

use thiserror::Error;

/// Boxed underlying cause attached to driver-level errors.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VervetError>;

/// Main error type for the connection core.
#[derive(Debug, Error)]
pub enum VervetError {
    /// A live connection (or an in-flight connect) already exists for this server.
    #[error("Already connected to server {server_id}")]
    AlreadyConnected {
        /// Server the connect was attempted for.
        server_id: String,
    },

    /// No live connection exists for this server.
    #[error("No active connection for server {server_id}")]
    NotConnected {
        /// Server the operation was attempted for.
        server_id: String,
    },

    /// The server registry does not know this ID.
    #[error("Server not found: {server_id}")]
    ServerNotFound {
        /// ID that failed to resolve.
        server_id: String,
    },

    /// The connection URI could not be read from (or written to) the credential store.
    #[error("Credential error for server {server_id}: {message}")]
    Credential {
        /// Server the credential belongs to.
        server_id: String,
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The driver could not establish a client handle.
    #[error("Failed to connect to {target}: {message}")]
    Dial {
        /// Server ID, or the redacted URI for ad-hoc connection tests.
        target: String,
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The handle was created but the liveness probe failed.
    #[error("Ping failed for {target}, connection invalid: {message}")]
    Ping {
        /// Server ID, or the redacted URI for ad-hoc connection tests.
        target: String,
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The driver reported an error while closing a handle.
    #[error("Error disconnecting from server {server_id}: {message}")]
    Teardown {
        /// Server the handle belonged to.
        server_id: String,
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A metadata query on a live handle failed.
    #[error("Query failed on {target}: {message}")]
    Query {
        /// Server ID, or the redacted URI for ad-hoc connection tests.
        target: String,
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// An in-flight connect was abandoned because the registry was drained.
    #[error("Connection attempt to server {server_id} was cancelled")]
    Cancelled {
        /// Server the connect was attempted for.
        server_id: String,
    },

    /// OS keychain error.
    #[error("Keyring error: {message}")]
    Keyring {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
    },

    /// Configuration could not be loaded or saved.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<BoxedSource>,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl VervetError {
    // ========== Constructors ==========

    /// Create an already-connected error.
    pub fn already_connected(server_id: impl Into<String>) -> Self {
        Self::AlreadyConnected { server_id: server_id.into() }
    }

    /// Create a not-connected error.
    pub fn not_connected(server_id: impl Into<String>) -> Self {
        Self::NotConnected { server_id: server_id.into() }
    }

    /// Create a server-not-found error.
    pub fn server_not_found(server_id: impl Into<String>) -> Self {
        Self::ServerNotFound { server_id: server_id.into() }
    }

    /// Create a credential error.
    pub fn credential(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Credential { server_id: server_id.into(), message: message.into(), source: None }
    }

    /// Create a credential error with source.
    pub fn credential_with_source(
        server_id: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Credential {
            server_id: server_id.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a dial error.
    pub fn dial(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dial { target: target.into(), message: message.into(), source: None }
    }

    /// Create a dial error with source.
    pub fn dial_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Dial { target: target.into(), message: message.into(), source: Some(source.into()) }
    }

    /// Create a ping error.
    pub fn ping(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ping { target: target.into(), message: message.into(), source: None }
    }

    /// Create a ping error with source.
    pub fn ping_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Ping { target: target.into(), message: message.into(), source: Some(source.into()) }
    }

    /// Create a teardown error.
    pub fn teardown(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Teardown { server_id: server_id.into(), message: message.into(), source: None }
    }

    /// Create a query error.
    pub fn query(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query { target: target.into(), message: message.into(), source: None }
    }

    /// Create a query error with source.
    pub fn query_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Query { target: target.into(), message: message.into(), source: Some(source.into()) }
    }

    /// Create a cancelled-connect error.
    pub fn cancelled(server_id: impl Into<String>) -> Self {
        Self::Cancelled { server_id: server_id.into() }
    }

    /// Create a new keyring error.
    pub fn keyring(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Keyring { message: message.into(), hint: hint.map(String::from) }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Re-target a driver error produced against a URI so it names the server instead.
    pub(crate) fn for_server(self, server_id: &str) -> Self {
        let target = server_id.to_string();
        match self {
            Self::Dial { message, source, .. } => Self::Dial { target, message, source },
            Self::Ping { message, source, .. } => Self::Ping { target, message, source },
            Self::Query { message, source, .. } => Self::Query { target, message, source },
            Self::Teardown { message, source, .. } => {
                Self::Teardown { server_id: target, message, source }
            }
            other => other,
        }
    }

    // ========== Methods ==========

    /// Check if this error means the server has no live connection.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected { .. })
    }

    /// Check if this error means a connection already exists.
    pub fn is_already_connected(&self) -> bool {
        matches!(self, Self::AlreadyConnected { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::AlreadyConnected { .. } | Self::NotConnected { .. } => "Connection State",
            Self::ServerNotFound { .. } => "Server",
            Self::Credential { .. } => "Credential",
            Self::Dial { .. } => "Connection",
            Self::Ping { .. } => "Connection",
            Self::Teardown { .. } => "Disconnect",
            Self::Query { .. } => "Query",
            Self::Cancelled { .. } => "Cancelled",
            Self::Keyring { .. } => "Keyring",
            Self::Config { .. } => "Config",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::AlreadyConnected { .. } => Some("Disconnect before connecting again"),
            Self::NotConnected { .. } => Some("Connect to the server first"),
            Self::ServerNotFound { .. } => Some("The server may have been removed"),
            Self::Credential { .. } => Some("Edit the server and re-enter its connection string"),
            Self::Dial { .. } => Some("Check that the MongoDB server is running and reachable"),
            Self::Ping { .. } => Some("Check the credentials and authentication database"),
            Self::Teardown { .. } => None,
            Self::Query { .. } => Some("Check that the user has the listDatabases privilege"),
            Self::Cancelled { .. } => None,
            Self::Keyring { hint, .. } => hint.as_deref(),
            Self::Config { .. } => Some("Fix or delete the configuration file"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            error_type: format!("{} Error", self.category()),
            message: self.to_string(),
            hint: self.hint().map(String::from),
        }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Category name (e.g., "Connection Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from keyring::Error to VervetError.
impl From<keyring::Error> for VervetError {
    fn from(err: keyring::Error) -> Self {
        let hint = if cfg!(target_os = "linux") {
            "Make sure a Secret Service provider (GNOME Keyring or KWallet) is running and unlocked"
        } else {
            "Grant Vervet access to the system keychain"
        };
        VervetError::keyring(err.to_string(), Some(hint))
    }
}

/// Convert from std::io::Error to VervetError.
impl From<std::io::Error> for VervetError {
    fn from(err: std::io::Error) -> Self {
        VervetError::Config { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from serde_json::Error to VervetError.
impl From<serde_json::Error> for VervetError {
    fn from(err: serde_json::Error) -> Self {
        VervetError::Config { message: format!("JSON error: {err}"), source: Some(Box::new(err)) }
    }
}
