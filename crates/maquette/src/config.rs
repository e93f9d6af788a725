//! Configuration types for Maquette diagram generation.
//!
//! [`AppConfig`] is the root loaded from external sources (the CLI reads it
//! from TOML); today it carries only the [`DiagramStyle`] section, with room
//! for further sections as they appear.

use serde::Deserialize;

use crate::style::DiagramStyle;

/// Top-level application configuration.
///
/// # Example
///
/// ```
/// # use maquette::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.style().font_name, "Arial");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Diagram style section.
    #[serde(default)]
    style: DiagramStyle,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the given style.
    pub fn new(style: DiagramStyle) -> Self {
        Self { style }
    }

    /// Returns the configured diagram style.
    pub fn style(&self) -> &DiagramStyle {
        &self.style
    }
}
