//! Serializable mount configuration.
//!
//! A composite store is configured with a list of named mounts:
//! ```json
//! {
//!   "mounts": [
//!     {"name": "libs", "paths": ["/libs", "/apps"], "fragmentPaths": ["/content"]}
//!   ]
//! }
//! ```
//!
//! Everything not claimed by a mount belongs to the default mount.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Configuration of one named mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    pub name: String,
    /// Roots of the subtrees owned by the mount.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Paths below which fragment-named nodes belong to the mount.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragment_paths: Vec<String>,
}

impl MountConfig {
    pub fn new(name: impl Into<String>, paths: &[&str]) -> Self {
        Self {
            name: name.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            fragment_paths: Vec::new(),
        }
    }

    /// Builder-style setter for fragment paths.
    #[must_use]
    pub fn with_fragment_paths(mut self, paths: &[&str]) -> Self {
        self.fragment_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Configuration of a composite store's mount table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompositeConfig {
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

impl CompositeConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(file: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(file)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
