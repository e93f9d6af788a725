//! Error types for serialization and persistence.

use std::{io, path::PathBuf};

use thiserror::Error;

/// A structural mismatch between a document and the model schema.
///
/// Raised — never silently ignored — whenever a document misses a required
/// field, uses a wrong enum value, or fails a pattern check. `path` is a
/// JSON-path-style locator into the offending document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at {path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the serializer and the repository.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("version not found: {model_id}/{version_id}")]
    VersionNotFound {
        model_id: String,
        version_id: String,
    },

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed XMI: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to {operation} '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wraps an I/O error with the operation and path it failed on.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
