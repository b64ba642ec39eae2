//! State manager configuration
//!
//! The host passes configuration as JSON; every field is optional and falls back to the default.

use serde::{Deserialize, Serialize};

use crate::document::Settings;
use crate::error::ConfigError;

/// Number of undo steps kept when the host does not say otherwise
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Configuration of a [`crate::handlers::StateManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateManagerConfig {
    /// Maximum depth of the undo stack; the oldest entries are discarded beyond it
    pub undo_limit: usize,
    /// Name given to the initial empty document
    pub document_name: String,
    /// Settings of the initial empty document
    pub settings: Settings,
}

impl Default for StateManagerConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            document_name: "Untitled".to_string(),
            settings: Settings::default(),
        }
    }
}

impl StateManagerConfig {
    /// Parse a configuration object sent by the host
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_undo_limit(mut self, undo_limit: usize) -> Self {
        self.undo_limit = undo_limit;
        self
    }
}
