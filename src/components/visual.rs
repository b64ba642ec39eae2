//! Visual style records for nodes, edges and edge labels
//!
//! Each style has a matching `*Update` type whose fields are all optional. Merging an update
//! always produces a new style value; the original is never touched.

use serde::{Deserialize, Serialize};
use crate::value_objects::Color;

/// Line pattern for borders and edge strokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Font weight for node text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Horizontal alignment of node text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Visual properties of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    pub border_radius: f64,
    pub opacity: f64,
    pub font_size: f64,
    pub font_family: String,
    pub font_color: Color,
    pub font_weight: FontWeight,
    pub text_align: TextAlign,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill_color: Color::WHITE,
            stroke_color: Color::SLATE,
            stroke_width: 2.0,
            stroke_style: StrokeStyle::Solid,
            border_radius: 0.0,
            opacity: 1.0,
            font_size: 14.0,
            font_family: "sans-serif".to_string(),
            font_color: Color::SLATE,
            font_weight: FontWeight::Normal,
            text_align: TextAlign::Center,
        }
    }
}

/// Partial update of a [`NodeStyle`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeStyleUpdate {
    pub fill_color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<StrokeStyle>,
    pub border_radius: Option<f64>,
    pub opacity: Option<f64>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub font_color: Option<Color>,
    pub font_weight: Option<FontWeight>,
    pub text_align: Option<TextAlign>,
}

impl NodeStyle {
    /// Produce a new style with every present field of `update` applied
    pub fn merged(&self, update: &NodeStyleUpdate) -> NodeStyle {
        NodeStyle {
            fill_color: update.fill_color.unwrap_or(self.fill_color),
            stroke_color: update.stroke_color.unwrap_or(self.stroke_color),
            stroke_width: update.stroke_width.map_or(self.stroke_width, |w| w.max(0.0)),
            stroke_style: update.stroke_style.unwrap_or(self.stroke_style),
            border_radius: update.border_radius.map_or(self.border_radius, |r| r.max(0.0)),
            opacity: update.opacity.map_or(self.opacity, |o| o.clamp(0.0, 1.0)),
            font_size: update.font_size.unwrap_or(self.font_size),
            font_family: update
                .font_family
                .clone()
                .unwrap_or_else(|| self.font_family.clone()),
            font_color: update.font_color.unwrap_or(self.font_color),
            font_weight: update.font_weight.unwrap_or(self.font_weight),
            text_align: update.text_align.unwrap_or(self.text_align),
        }
    }
}

/// Visual properties of an edge stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    pub opacity: f64,
    pub animated: bool,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            stroke_color: Color::GRAY,
            stroke_width: 2.0,
            stroke_style: StrokeStyle::Solid,
            opacity: 1.0,
            animated: false,
        }
    }
}

/// Partial update of an [`EdgeStyle`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeStyleUpdate {
    pub stroke_color: Option<Color>,
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<StrokeStyle>,
    pub opacity: Option<f64>,
    pub animated: Option<bool>,
}

impl EdgeStyle {
    /// Produce a new style with every present field of `update` applied
    pub fn merged(&self, update: &EdgeStyleUpdate) -> EdgeStyle {
        EdgeStyle {
            stroke_color: update.stroke_color.unwrap_or(self.stroke_color),
            stroke_width: update.stroke_width.map_or(self.stroke_width, |w| w.max(0.0)),
            stroke_style: update.stroke_style.unwrap_or(self.stroke_style),
            opacity: update.opacity.map_or(self.opacity, |o| o.clamp(0.0, 1.0)),
            animated: update.animated.unwrap_or(self.animated),
        }
    }
}

/// Text style of an edge label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    pub font_size: f64,
    pub font_color: Color,
    pub background_color: Color,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_color: Color::SLATE,
            background_color: Color::WHITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_style_merge_keeps_unset_fields() {
        let base = NodeStyle::default();
        let update = NodeStyleUpdate {
            fill_color: Some(Color::BLACK),
            opacity: Some(1.7),
            ..Default::default()
        };

        let merged = base.merged(&update);
        assert_eq!(merged.fill_color, Color::BLACK);
        assert_eq!(merged.opacity, 1.0);
        assert_eq!(merged.stroke_color, base.stroke_color);
        assert_eq!(merged.font_family, base.font_family);
        // the source value is untouched
        assert_eq!(base.fill_color, Color::WHITE);
    }

    #[test]
    fn test_edge_style_merge() {
        let merged = EdgeStyle::default().merged(&EdgeStyleUpdate {
            stroke_style: Some(StrokeStyle::Dashed),
            stroke_width: Some(-3.0),
            ..Default::default()
        });
        assert_eq!(merged.stroke_style, StrokeStyle::Dashed);
        assert_eq!(merged.stroke_width, 0.0);
    }

    #[test]
    fn test_style_serialization_is_camel_case() {
        let json = serde_json::to_value(NodeStyle::default()).unwrap();
        assert_eq!(json["fillColor"], "#ffffff");
        assert_eq!(json["strokeStyle"], "solid");
        assert_eq!(json["textAlign"], "center");

        let update: NodeStyleUpdate = serde_json::from_str(r##"{"fillColor":"#ff0000"}"##).unwrap();
        assert_eq!(update.fill_color, Some(Color::rgb(255, 0, 0)));
        assert!(update.stroke_color.is_none());
    }
}
