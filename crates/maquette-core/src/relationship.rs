//! UML relationships as a tagged union.
//!
//! The relationship kind is a single enum rather than a subclass hierarchy,
//! so kind identity and payload can never disagree: only the association
//! family (association, aggregation, composition) carries multiplicity and
//! navigability ends.

use std::fmt;

use crate::element::{ElementId, Properties, Stereotypes};

/// Multiplicity and navigability for both ends of an association-family
/// relationship.
///
/// Multiplicities are free-form strings matching `(\d+|\*)(\.\.(\d+|\*))?`;
/// the pattern is enforced by the serializer's schema validation, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationEnds {
    multiplicity_source: String,
    multiplicity_target: String,
    navigability_source: bool,
    navigability_target: bool,
}

impl AssociationEnds {
    /// Creates ends with the given multiplicities, navigable both ways.
    pub fn new(
        multiplicity_source: impl Into<String>,
        multiplicity_target: impl Into<String>,
    ) -> Self {
        Self {
            multiplicity_source: multiplicity_source.into(),
            multiplicity_target: multiplicity_target.into(),
            navigability_source: true,
            navigability_target: true,
        }
    }

    pub fn with_navigability(mut self, source: bool, target: bool) -> Self {
        self.navigability_source = source;
        self.navigability_target = target;
        self
    }

    pub fn multiplicity_source(&self) -> &str {
        &self.multiplicity_source
    }

    pub fn multiplicity_target(&self) -> &str {
        &self.multiplicity_target
    }

    pub fn navigability_source(&self) -> bool {
        self.navigability_source
    }

    pub fn navigability_target(&self) -> bool {
        self.navigability_target
    }
}

impl Default for AssociationEnds {
    /// `1` to `1`, navigable both ways.
    fn default() -> Self {
        Self::new("1", "1")
    }
}

/// Kind of a relationship between two model elements.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipKind {
    Association(AssociationEnds),
    Aggregation(AssociationEnds),
    Composition(AssociationEnds),
    Generalization,
    Realization,
    Dependency,
}

impl RelationshipKind {
    /// The lowercase kind keyword used in serialized documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Association(_) => "association",
            RelationshipKind::Aggregation(_) => "aggregation",
            RelationshipKind::Composition(_) => "composition",
            RelationshipKind::Generalization => "generalization",
            RelationshipKind::Realization => "realization",
            RelationshipKind::Dependency => "dependency",
        }
    }

    /// The association-family payload, if this kind carries one.
    pub fn ends(&self) -> Option<&AssociationEnds> {
        match self {
            RelationshipKind::Association(ends)
            | RelationshipKind::Aggregation(ends)
            | RelationshipKind::Composition(ends) => Some(ends),
            _ => None,
        }
    }

    /// Reassembles a kind from its keyword and an optional payload.
    ///
    /// Association-family kinds fall back to default `1`/`1` ends when the
    /// payload is absent, mirroring the permissive deserialization of the
    /// document formats. Unknown keywords are rejected.
    pub fn from_parts(kind: &str, ends: Option<AssociationEnds>) -> Result<Self, String> {
        match kind {
            "association" => Ok(RelationshipKind::Association(ends.unwrap_or_default())),
            "aggregation" => Ok(RelationshipKind::Aggregation(ends.unwrap_or_default())),
            "composition" => Ok(RelationshipKind::Composition(ends.unwrap_or_default())),
            "generalization" => Ok(RelationshipKind::Generalization),
            "realization" => Ok(RelationshipKind::Realization),
            "dependency" => Ok(RelationshipKind::Dependency),
            other => Err(format!("unknown relationship type: {other}")),
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relationship between two elements, referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    name: String,
    id: ElementId,
    source: ElementId,
    target: ElementId,
    kind: RelationshipKind,
    stereotypes: Stereotypes,
    properties: Properties,
}

impl Relationship {
    /// Creates a relationship with a fresh id.
    pub fn new(
        name: impl Into<String>,
        source: ElementId,
        target: ElementId,
        kind: RelationshipKind,
    ) -> Self {
        Self::with_id(name, ElementId::new(), source, target, kind)
    }

    /// Creates a relationship with a caller-supplied id (used when
    /// re-hydrating serialized models).
    pub fn with_id(
        name: impl Into<String>,
        id: ElementId,
        source: ElementId,
        target: ElementId,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            source,
            target,
            kind,
            stereotypes: Stereotypes::new(),
            properties: Properties::new(),
        }
    }

    /// Convenience constructor for an association with the given
    /// multiplicities, navigable both ways.
    pub fn association(
        name: impl Into<String>,
        source: ElementId,
        target: ElementId,
        multiplicity_source: impl Into<String>,
        multiplicity_target: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            source,
            target,
            RelationshipKind::Association(AssociationEnds::new(
                multiplicity_source,
                multiplicity_target,
            )),
        )
    }

    /// Convenience constructor for a generalization (inheritance).
    pub fn generalization(name: impl Into<String>, source: ElementId, target: ElementId) -> Self {
        Self::new(name, source, target, RelationshipKind::Generalization)
    }

    /// Convenience constructor for a dependency.
    pub fn dependency(name: impl Into<String>, source: ElementId, target: ElementId) -> Self {
        Self::new(name, source, target, RelationshipKind::Dependency)
    }

    /// Adds a stereotype to the relationship.
    pub fn add_stereotype(&mut self, stereotype: impl Into<String>) {
        self.stereotypes.insert(stereotype.into());
    }

    /// Sets a property on the relationship.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn source(&self) -> ElementId {
        self.source
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn kind(&self) -> &RelationshipKind {
        &self.kind
    }

    pub fn stereotypes(&self) -> &Stereotypes {
        &self.stereotypes
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keywords_roundtrip() {
        for keyword in [
            "association",
            "aggregation",
            "composition",
            "generalization",
            "realization",
            "dependency",
        ] {
            let kind = RelationshipKind::from_parts(keyword, None).expect("known keyword");
            assert_eq!(kind.as_str(), keyword);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(RelationshipKind::from_parts("friendship", None).is_err());
    }

    #[test]
    fn test_only_association_family_carries_ends() {
        let assoc = RelationshipKind::Association(AssociationEnds::new("1", "*"));
        assert_eq!(assoc.ends().map(|e| e.multiplicity_target()), Some("*"));
        assert!(RelationshipKind::Generalization.ends().is_none());
        assert!(RelationshipKind::Dependency.ends().is_none());
    }

    #[test]
    fn test_association_defaults() {
        let ends = AssociationEnds::default();
        assert_eq!(ends.multiplicity_source(), "1");
        assert_eq!(ends.multiplicity_target(), "1");
        assert!(ends.navigability_source());
        assert!(ends.navigability_target());
    }

    #[test]
    fn test_association_constructor() {
        let source = ElementId::new();
        let target = ElementId::new();
        let rel = Relationship::association("order_customer", source, target, "1", "*");

        assert_eq!(rel.kind().as_str(), "association");
        let ends = rel.kind().ends().expect("association ends");
        assert_eq!(ends.multiplicity_source(), "1");
        assert_eq!(ends.multiplicity_target(), "*");
        assert_eq!(rel.source(), source);
        assert_eq!(rel.target(), target);
    }
}
