//! Registered server model.

use serde::{Deserialize, Serialize};

/// A server entry from the server registry.
///
/// Entries form a tree: groups hold servers (or further groups) through
/// `parent_id`. Only non-group entries can be connected to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredServer {
    /// Stable identifier, also the credential store key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Parent group, empty for top-level entries.
    #[serde(rename = "parentID", default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    /// UI accent colour.
    #[serde(default)]
    pub colour: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_cluster: bool,
    /// Connection string uses the `mongodb+srv` scheme.
    #[serde(default)]
    pub is_srv: bool,
}

impl RegisteredServer {
    /// Create a top-level, connectable server entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Default::default() }
    }

    /// Create a group entry.
    pub fn group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { is_group: true, ..Self::new(id, name) }
    }

    /// Place this entry under a group.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }
}
