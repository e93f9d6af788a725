//! The serialized document envelope and its conversion to and from the
//! in-memory model.
//!
//! The envelope shape is shared by the JSON and YAML formats:
//! `{version, id?, metadata, name, packages, relationships}`. Field names
//! and nesting match the published schema in [`crate::schema`] exactly;
//! operation parameters serialize as `[name, type]` pairs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use maquette_core::{
    AssociationEnds, Attribute, Class, ElementId, Model, Operation, Package, Relationship,
    RelationshipKind, UmlElement, Visibility,
};

use crate::error::StoreError;

/// Envelope metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub description: String,
}

/// Top-level serialized model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub metadata: Metadata,
    pub name: String,
    pub packages: Vec<PackageDoc>,
    pub relationships: Vec<RelationshipDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDoc {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub stereotypes: Vec<String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    pub elements: Vec<ElementDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub stereotypes: Vec<String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,
    #[serde(default)]
    pub operations: Vec<OperationDoc>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_interface: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDoc {
    pub name: String,
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<(String, String)>,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDoc {
    pub name: String,
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship_type: String,
    #[serde(default)]
    pub stereotypes: Vec<String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigability_source: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigability_target: Option<bool>,
}

/// Builds the envelope for a model.
///
/// Both timestamps are set to the serialization instant; stereotype sets
/// serialize in sorted order and properties in insertion order, so the
/// output is deterministic for a given model and instant.
pub fn from_model(model: &Model, author: Option<&str>, description: Option<&str>) -> ModelDocument {
    let now = chrono::Utc::now().to_rfc3339();
    ModelDocument {
        version: crate::serializer::FORMAT_VERSION.to_string(),
        id: model.id().map(|id| id.to_string()),
        metadata: Metadata {
            author: author.unwrap_or("unknown").to_string(),
            created_at: now.clone(),
            updated_at: now,
            description: description.unwrap_or_default().to_string(),
        },
        name: model.name().to_string(),
        packages: model.packages().iter().map(package_to_doc).collect(),
        relationships: model
            .relationships()
            .iter()
            .map(relationship_to_doc)
            .collect(),
    }
}

fn package_to_doc(package: &Package) -> PackageDoc {
    PackageDoc {
        name: package.name().to_string(),
        id: package.id().to_string(),
        stereotypes: package.stereotypes().iter().cloned().collect(),
        properties: package.properties().clone(),
        elements: package.classes().map(class_to_doc).collect(),
    }
}

fn class_to_doc(class: &Class) -> ElementDoc {
    ElementDoc {
        kind: "class".to_string(),
        name: class.name().to_string(),
        id: class.id().to_string(),
        stereotypes: class.stereotypes().iter().cloned().collect(),
        properties: class.properties().clone(),
        attributes: class
            .attributes()
            .iter()
            .map(|attr| AttributeDoc {
                name: attr.name().to_string(),
                type_name: attr.type_name().to_string(),
                visibility: attr.visibility(),
                default_value: attr.default_value().map(str::to_string),
                is_static: attr.is_static(),
                is_final: attr.is_final(),
            })
            .collect(),
        operations: class
            .operations()
            .iter()
            .map(|op| OperationDoc {
                name: op.name().to_string(),
                return_type: op.return_type().map(str::to_string),
                parameters: op
                    .parameters()
                    .iter()
                    .map(|p| (p.name().to_string(), p.type_name().to_string()))
                    .collect(),
                visibility: op.visibility(),
                is_static: op.is_static(),
                is_abstract: op.is_abstract(),
            })
            .collect(),
        is_abstract: class.is_abstract(),
        is_interface: class.is_interface(),
    }
}

fn relationship_to_doc(relationship: &Relationship) -> RelationshipDoc {
    let ends = relationship.kind().ends();
    RelationshipDoc {
        name: relationship.name().to_string(),
        id: relationship.id().to_string(),
        source: relationship.source().to_string(),
        target: relationship.target().to_string(),
        relationship_type: relationship.kind().as_str().to_string(),
        stereotypes: relationship.stereotypes().iter().cloned().collect(),
        properties: relationship.properties().clone(),
        multiplicity_source: ends.map(|e| e.multiplicity_source().to_string()),
        multiplicity_target: ends.map(|e| e.multiplicity_target().to_string()),
        navigability_source: ends.map(AssociationEnds::navigability_source),
        navigability_target: ends.map(AssociationEnds::navigability_target),
    }
}

/// Reconstructs a model from its envelope, re-hydrating UUIDs from their
/// string form.
pub fn to_model(doc: ModelDocument) -> Result<Model, StoreError> {
    let mut model = Model::new(doc.name);
    if let Some(id) = doc.id {
        model.set_id(parse_id(&id)?);
    }

    for package_doc in doc.packages {
        let mut package = Package::with_id(package_doc.name, parse_id(&package_doc.id)?);
        for stereotype in package_doc.stereotypes {
            package.add_stereotype(stereotype);
        }
        for (key, value) in package_doc.properties {
            package.set_property(key, value);
        }
        for element_doc in package_doc.elements {
            package.add_element(element_to_class(element_doc)?);
        }
        model.add_package(package);
    }

    for relationship_doc in doc.relationships {
        model.add_relationship(doc_to_relationship(relationship_doc)?);
    }

    Ok(model)
}

fn element_to_class(doc: ElementDoc) -> Result<Class, StoreError> {
    let mut class = Class::with_id(doc.name, parse_id(&doc.id)?)
        .with_abstract(doc.is_abstract)
        .with_interface(doc.is_interface);

    for stereotype in doc.stereotypes {
        class.add_stereotype(stereotype);
    }
    for (key, value) in doc.properties {
        class.set_property(key, value);
    }
    for attribute in doc.attributes {
        let mut attr = Attribute::new(attribute.name, attribute.type_name)
            .with_visibility(attribute.visibility)
            .with_static(attribute.is_static)
            .with_final(attribute.is_final);
        if let Some(default_value) = attribute.default_value {
            attr = attr.with_default_value(default_value);
        }
        class.add_attribute(attr);
    }
    for operation in doc.operations {
        let mut op = Operation::new(operation.name, operation.return_type)
            .with_visibility(operation.visibility)
            .with_static(operation.is_static)
            .with_abstract(operation.is_abstract);
        for (param_name, param_type) in operation.parameters {
            op = op.with_parameter(param_name, param_type);
        }
        class.add_operation(op);
    }

    Ok(class)
}

fn doc_to_relationship(doc: RelationshipDoc) -> Result<Relationship, StoreError> {
    let ends = match (&doc.multiplicity_source, &doc.multiplicity_target) {
        (Some(source), Some(target)) => Some(
            AssociationEnds::new(source.clone(), target.clone()).with_navigability(
                doc.navigability_source.unwrap_or(true),
                doc.navigability_target.unwrap_or(true),
            ),
        ),
        _ => None,
    };

    let kind = RelationshipKind::from_parts(&doc.relationship_type, ends)
        .map_err(StoreError::InvalidDocument)?;

    let mut relationship = Relationship::with_id(
        doc.name,
        parse_id(&doc.id)?,
        parse_id(&doc.source)?,
        parse_id(&doc.target)?,
        kind,
    );
    for stereotype in doc.stereotypes {
        relationship.add_stereotype(stereotype);
    }
    for (key, value) in doc.properties {
        relationship.set_property(key, value);
    }

    Ok(relationship)
}

fn parse_id(raw: &str) -> Result<ElementId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::InvalidDocument(format!("invalid UUID: {raw}")))
}
