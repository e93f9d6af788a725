//! Visual styling shared by every diagram generator.

use serde::Deserialize;

/// Style configuration applied to a diagram's graph, node, and edge
/// defaults.
///
/// The `*_color` hints are picked up by individual generators for
/// stereotype, abstract, and interface accents; everything else feeds the
/// graph-wide defaults set by [`crate::graph::DotGraph::new`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagramStyle {
    pub font_name: String,
    pub font_size: u32,
    pub node_shape: String,
    pub node_style: String,
    pub edge_style: String,
    pub background_color: String,
    pub border_color: String,
    pub text_color: String,
    pub stereotype_color: String,
    pub abstract_color: String,
    pub interface_color: String,
    pub relationship_color: String,
}

impl Default for DiagramStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 10,
            node_shape: "box".to_string(),
            node_style: "rounded".to_string(),
            edge_style: "solid".to_string(),
            background_color: "white".to_string(),
            border_color: "black".to_string(),
            text_color: "black".to_string(),
            stereotype_color: "#6A8759".to_string(),
            abstract_color: "#A9B7C6".to_string(),
            interface_color: "#CC7832".to_string(),
            relationship_color: "#808080".to_string(),
        }
    }
}
