//! Persisted diagram document
//!
//! The document is the file-on-disk and message-payload contract with the host editor. Field
//! names are camelCase in JSON. Undo history is never part of a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::{Edge, Node};
use crate::error::{DocumentError, DocumentResult};
use crate::value_objects::{DocumentId, LayerId};

/// Document format version written by this crate
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// Smallest zoom factor a viewport may take
pub const MIN_SCALE: f64 = 0.1;
/// Largest zoom factor a viewport may take
pub const MAX_SCALE: f64 = 5.0;

/// Descriptive information about a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Semantic version of the document format
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl DocumentMetadata {
    /// Metadata for a brand new document
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            name: name.into(),
            description: String::new(),
            version: DOCUMENT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            author: None,
            tags: Vec::new(),
        }
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Partial update of [`DocumentMetadata`]; id and timestamps are managed internally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// A named stacking layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub order: i32,
}

impl Layer {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            locked: false,
            order,
        }
    }
}

/// Pan and zoom applied when rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Viewport {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    /// Copy with the scale clamped into the supported zoom range
    pub fn clamped(self) -> Self {
        let scale = if self.scale.is_finite() {
            self.scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        Self { scale, ..self }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Color scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Editor settings persisted with the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub grid_size: f64,
    pub show_grid: bool,
    pub snap_to_grid: bool,
    pub show_minimap: bool,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            show_grid: true,
            snap_to_grid: false,
            show_minimap: true,
            theme: Theme::System,
        }
    }
}

/// Partial update of [`Settings`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub grid_size: Option<f64>,
    pub show_grid: Option<bool>,
    pub snap_to_grid: Option<bool>,
    pub show_minimap: Option<bool>,
    pub theme: Option<Theme>,
}

impl Settings {
    pub fn merged(&self, update: &SettingsUpdate) -> Settings {
        Settings {
            grid_size: update.grid_size.filter(|g| *g > 0.0).unwrap_or(self.grid_size),
            show_grid: update.show_grid.unwrap_or(self.show_grid),
            snap_to_grid: update.snap_to_grid.unwrap_or(self.snap_to_grid),
            show_minimap: update.show_minimap.unwrap_or(self.show_minimap),
            theme: update.theme.unwrap_or(self.theme),
        }
    }
}

/// Complete persisted snapshot of a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub settings: Settings,
}

impl Document {
    /// Empty document with a single default layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: DocumentMetadata::new(name),
            nodes: Vec::new(),
            edges: Vec::new(),
            layers: vec![Layer::new("Default", 0)],
            viewport: Viewport::default(),
            settings: Settings::default(),
        }
    }

    /// Parse and validate a document
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let document: Document = serde_json::from_str(json)?;
        document.check_version()?;
        Ok(document)
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject documents written by an incompatible major version
    pub fn check_version(&self) -> DocumentResult<()> {
        let supported = major_version(DOCUMENT_VERSION);
        match major_version(&self.metadata.version) {
            Some(major) if Some(major) == supported => Ok(()),
            _ => Err(DocumentError::UnsupportedVersion(self.metadata.version.clone())),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn major_version(version: &str) -> Option<u64> {
    version.split('.').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NodeType;
    use crate::factories::{create_node, NodeOptions};
    use crate::value_objects::Position2D;
    use serde_json::json;

    #[test]
    fn test_new_document_has_default_layer() {
        let doc = Document::new("Flow");
        assert_eq!(doc.metadata.name, "Flow");
        assert_eq!(doc.metadata.version, DOCUMENT_VERSION);
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].name, "Default");
        assert_eq!(doc.viewport, Viewport::default());
    }

    #[test]
    fn test_json_contract_field_names() {
        let doc = Document::new("Flow");
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["viewport"], json!({"x": 0.0, "y": 0.0, "scale": 1.0}));
        assert_eq!(value["settings"]["gridSize"], json!(20.0));
        assert_eq!(value["settings"]["showMinimap"], json!(true));
        assert_eq!(value["settings"]["theme"], json!("system"));
        assert!(value["metadata"]["createdAt"].is_string());
        assert!(value["nodes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let mut doc = Document::new("Flow");
        let node = create_node(NodeOptions::new(NodeType::Circle, Position2D::new(1.0, 2.0)).with_label("Start"));
        doc.nodes.push(node);
        doc.metadata.tags = vec!["ops".to_string()];

        let parsed = Document::from_json(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_rejects_malformed_and_future_versions() {
        assert!(matches!(Document::from_json("{\"nodes\": 3}"), Err(DocumentError::Malformed(_))));

        let mut doc = Document::new("Flow");
        doc.metadata.version = "2.0.0".to_string();
        let json = doc.to_json().unwrap();
        assert!(matches!(Document::from_json(&json), Err(DocumentError::UnsupportedVersion(v)) if v == "2.0.0"));

        doc.metadata.version = "1.4.2".to_string();
        assert!(Document::from_json(&doc.to_json().unwrap()).is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let meta = serde_json::to_value(DocumentMetadata::new("Bare")).unwrap();
        let json = json!({ "metadata": meta }).to_string();
        let doc = Document::from_json(&json).unwrap();
        assert_eq!(doc.settings, Settings::default());
        assert!(doc.layers.is_empty());
    }

    #[test]
    fn test_viewport_clamp_and_settings_merge() {
        assert_eq!(Viewport::new(1.0, 2.0, 50.0).clamped().scale, MAX_SCALE);
        assert_eq!(Viewport::new(1.0, 2.0, 0.0).clamped().scale, MIN_SCALE);
        assert_eq!(Viewport::new(1.0, 2.0, f64::NAN).clamped().scale, 1.0);

        let merged = Settings::default().merged(&SettingsUpdate {
            theme: Some(Theme::Dark),
            grid_size: Some(-4.0),
            ..Default::default()
        });
        assert_eq!(merged.theme, Theme::Dark);
        assert_eq!(merged.grid_size, 20.0);
    }
}
