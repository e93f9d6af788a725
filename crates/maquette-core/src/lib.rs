//! Core types and validation for Maquette UML models.
//!
//! This crate defines the in-memory architectural model: packages, classes
//! with attributes and operations, and the relationships between them. A
//! [`Model`] is the root aggregate; it owns its packages and relationships
//! exclusively and is built incrementally with permissive `add_*` calls.
//! Consistency rules are deliberately *not* enforced at construction time —
//! [`Model::validate`] reports them as structured issues and the caller
//! decides whether they are fatal.

pub mod element;
pub mod model;
pub mod relationship;

pub use element::{
    Attribute, Class, ElementId, Operation, Package, PackageElement, Parameter, Properties,
    Stereotypes, UmlElement, Visibility,
};
pub use model::{ElementRef, Model, ValidationIssue};
pub use relationship::{AssociationEnds, Relationship, RelationshipKind};
