//! Serialization and versioned persistence for Maquette UML models.
//!
//! The serializer converts a [`maquette_core::Model`] losslessly to and from
//! JSON, YAML, and XMI 2.1 text, validating JSON and YAML documents against
//! the published schema. The repository stores, versions, and backs up
//! serialized models under a caller-supplied base directory.
//!
//! Everything here is synchronous, fail-fast, and retry-free: operations
//! either complete or return a typed [`StoreError`]; recovery policy belongs
//! to the caller.

pub mod document;
pub mod repository;
pub mod schema;
pub mod serializer;
pub mod xmi;

mod error;

pub use error::{SchemaViolation, StoreError};
pub use repository::{BackupInfo, Format, ModelRepository, VersionInfo};
pub use serializer::{FORMAT_VERSION, ModelDeserializer, ModelSerializer};
