//! Runtime configuration for the connection core.
//!
//! Configuration is a small JSON document in the application data directory.
//! A missing file yields the defaults; a malformed one is reported rather than
//! silently replaced.

use crate::error::{Result, VervetError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the configuration document inside the data directory.
pub const CONFIG_FILE_NAME: &str = "vervet.json";

/// Default keychain service name for stored connection strings.
pub const DEFAULT_KEYRING_SERVICE: &str = "Vervet";

/// Deadlines applied to driver calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionTimeouts {
    /// Dial + ping for a registered server.
    #[serde(with = "duration_secs", rename = "connectSecs")]
    pub connect: Duration,
    /// Dial + ping + list-databases for an ad-hoc connection test.
    #[serde(with = "duration_secs", rename = "testConnectSecs")]
    pub test_connect: Duration,
    /// Metadata queries (list databases/collections) and handle teardown.
    #[serde(with = "duration_secs", rename = "querySecs")]
    pub query: Duration,
}

impl ConnectionTimeouts {
    /// Default deadline for connecting to a registered server.
    pub const DEFAULT_CONNECT: Duration = Duration::from_secs(10);
    /// Default deadline for testing a connection string.
    pub const DEFAULT_TEST_CONNECT: Duration = Duration::from_secs(30);
    /// Default deadline for metadata queries.
    pub const DEFAULT_QUERY: Duration = Duration::from_secs(5);
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        Self {
            connect: Self::DEFAULT_CONNECT,
            test_connect: Self::DEFAULT_TEST_CONNECT,
            query: Self::DEFAULT_QUERY,
        }
    }
}

/// Application configuration consumed by [`crate::state::VervetState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VervetConfig {
    /// Driver deadlines.
    pub timeouts: ConnectionTimeouts,
    /// Keychain service name connection strings are stored under.
    pub keyring_service: String,
    /// Optional tracing filter overriding the build default.
    pub log_filter: Option<String>,
}

impl Default for VervetConfig {
    fn default() -> Self {
        Self {
            timeouts: ConnectionTimeouts::default(),
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            log_filter: None,
        }
    }
}

impl VervetConfig {
    /// Load configuration from a JSON file, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| VervetError::Config {
            message: format!("Failed to read config file '{}': {e}", path.display()),
            source: Some(Box::new(e)),
        })?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_json::from_str(&contents).map_err(|e| VervetError::Config {
            message: format!("Invalid config file '{}': {e}", path.display()),
            source: Some(Box::new(e)),
        })?;

        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Write configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "Config saved");
        Ok(())
    }
}

/// Get the default data directory.
///
/// Debug builds keep everything next to the working directory so development
/// runs never touch the real profile.
pub fn default_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from("./vervet_data")
    }

    #[cfg(not(debug_assertions))]
    {
        dirs::data_dir()
            .map(|d| {
                #[cfg(target_os = "macos")]
                {
                    d.join("app.vervet.Vervet")
                }
                #[cfg(not(target_os = "macos"))]
                {
                    d.join("vervet")
                }
            })
            .unwrap_or_else(|| PathBuf::from("./vervet_data"))
    }
}

/// Ensure the data directory exists.
pub fn init_data_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(VervetError::config(format!(
                "Data path exists but is not a directory: {}",
                path.display()
            )));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| VervetError::Config {
        message: format!("Failed to create data directory '{}': {e}", path.display()),
        source: Some(Box::new(e)),
    })?;

    tracing::info!(path = %path.display(), "Created data directory");
    Ok(())
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        if secs == 0 {
            return Err(serde::de::Error::custom("timeout must be at least one second"));
        }
        Ok(Duration::from_secs(secs))
    }
}
