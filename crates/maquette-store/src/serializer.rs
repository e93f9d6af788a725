//! Multi-format model serialization.
//!
//! [`ModelSerializer`] renders a model into JSON, YAML, or XMI text;
//! [`ModelDeserializer`] parses it back. JSON and YAML share one envelope
//! and one schema-validation path; XMI has its own reader and writer in
//! [`crate::xmi`]. The round-trip contract holds for all three formats:
//! deserializing a serialized model reproduces it structurally, ids
//! included.

use log::warn;
use serde_json::Value;

use maquette_core::Model;

use crate::document::{self, ModelDocument};
use crate::error::StoreError;
use crate::{schema, xmi};

/// Version tag written into every serialized document.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Serializes models to JSON, YAML, and XMI.
#[derive(Debug, Default)]
pub struct ModelSerializer;

impl ModelSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Builds the document envelope as a JSON value, validated against the
    /// schema.
    ///
    /// # Errors
    ///
    /// [`StoreError::Schema`] when the produced envelope does not conform —
    /// a model carrying values the schema rejects (bad names, malformed
    /// multiplicities) fails here rather than writing a bad document.
    pub fn to_value(
        &self,
        model: &Model,
        author: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value, StoreError> {
        let doc = document::from_model(model, author, description);
        let value = serde_json::to_value(&doc)?;
        schema::validate_document(&value)?;
        Ok(value)
    }

    /// Renders the model as pretty-printed JSON.
    pub fn to_json(
        &self,
        model: &Model,
        author: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, StoreError> {
        let value = self.to_value(model, author, description)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Renders the model as YAML.
    pub fn to_yaml(
        &self,
        model: &Model,
        author: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, StoreError> {
        let value = self.to_value(model, author, description)?;
        Ok(serde_yaml::to_string(&value)?)
    }

    /// Renders the model as XMI 2.1.
    pub fn to_xmi(
        &self,
        model: &Model,
        author: Option<&str>,
        description: Option<&str>,
    ) -> Result<String, StoreError> {
        xmi::write_model(model, author, description)
    }
}

/// Deserializes models from JSON, YAML, and XMI.
#[derive(Debug, Default)]
pub struct ModelDeserializer;

impl ModelDeserializer {
    pub fn new() -> Self {
        Self
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Json`] for malformed text, [`StoreError::Schema`] for
    /// structural violations.
    pub fn from_json(&self, text: &str) -> Result<Model, StoreError> {
        let value: Value = serde_json::from_str(text)?;
        self.from_value(value)
    }

    /// Parses a YAML document through the same schema-validation path as
    /// JSON.
    pub fn from_yaml(&self, text: &str) -> Result<Model, StoreError> {
        let value: Value = serde_yaml::from_str(text)?;
        self.from_value(value)
    }

    /// Parses an XMI 2.1 document.
    pub fn from_xmi(&self, text: &str) -> Result<Model, StoreError> {
        xmi::read_model(text)
    }

    fn from_value(&self, value: Value) -> Result<Model, StoreError> {
        schema::validate_document(&value)?;

        // Older-version documents are tolerated, not rejected.
        if let Some(version) = value.get("version").and_then(Value::as_str) {
            if version != FORMAT_VERSION {
                warn!(
                    expected = FORMAT_VERSION,
                    found = version;
                    "Model version mismatch"
                );
            }
        }

        let doc: ModelDocument = serde_json::from_value(value)?;
        document::to_model(doc)
    }
}
