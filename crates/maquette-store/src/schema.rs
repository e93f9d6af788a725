//! Schema validation for serialized model documents.
//!
//! Validates the JSON/YAML envelope against the published model schema:
//! required fields, type checks, visibility and relationship-type enums,
//! UUID formats, and the name/multiplicity patterns. Association-family
//! relationships (association, aggregation, composition) must carry both
//! multiplicities. Violations are fatal; a malformed document is never
//! silently accepted.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::SchemaViolation;

/// Schema version, kept in lockstep with the serializer's format version.
pub const SCHEMA_VERSION: &str = "1.0.0";

const VISIBILITIES: [&str; 4] = ["public", "private", "protected", "package"];
const RELATIONSHIP_TYPES: [&str; 6] = [
    "association",
    "generalization",
    "dependency",
    "aggregation",
    "composition",
    "realization",
];
const ASSOCIATION_FAMILY: [&str; 3] = ["association", "aggregation", "composition"];
const ELEMENT_TYPES: [&str; 2] = ["class", "interface"];

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid pattern"))
}

/// Model and package names additionally allow dotted namespaces
/// (`com.example`).
fn namespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("valid pattern"))
}

fn type_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_<>,\[\] ]*$").expect("valid pattern"))
}

fn multiplicity_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+|\*)(\.\.(\d+|\*))?$").expect("valid pattern"))
}

fn semver_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid pattern"))
}

/// Validates a serialized model document.
///
/// # Errors
///
/// The first [`SchemaViolation`] found, carrying a JSON-path-style locator
/// and a human-readable message.
pub fn validate_document(root: &Value) -> Result<(), SchemaViolation> {
    let obj = as_object(root, "$")?;

    let version = require_str(obj, "$", "version")?;
    check_pattern(version, semver_pattern(), "$.version", "a semantic version")?;

    if let Some(id) = obj.get("id") {
        require_uuid_value(id, "$.id")?;
    }

    let metadata = as_object(require(obj, "$", "metadata")?, "$.metadata")?;
    validate_metadata(metadata)?;

    let name = require_str(obj, "$", "name")?;
    check_pattern(name, namespace_pattern(), "$.name", "an identifier")?;

    let packages = as_array(require(obj, "$", "packages")?, "$.packages")?;
    for (index, package) in packages.iter().enumerate() {
        validate_package(package, &format!("$.packages[{index}]"))?;
    }

    let relationships = as_array(require(obj, "$", "relationships")?, "$.relationships")?;
    for (index, relationship) in relationships.iter().enumerate() {
        validate_relationship(relationship, &format!("$.relationships[{index}]"))?;
    }

    Ok(())
}

fn validate_metadata(metadata: &Map<String, Value>) -> Result<(), SchemaViolation> {
    require_str(metadata, "$.metadata", "created_at")?;
    require_str(metadata, "$.metadata", "updated_at")?;
    optional_str(metadata, "$.metadata", "author")?;
    optional_str(metadata, "$.metadata", "description")?;
    Ok(())
}

fn validate_package(package: &Value, path: &str) -> Result<(), SchemaViolation> {
    let obj = as_object(package, path)?;

    let name = require_str(obj, path, "name")?;
    check_pattern(name, namespace_pattern(), &format!("{path}.name"), "an identifier")?;
    require_uuid(obj, path, "id")?;
    validate_stereotypes(obj, path)?;
    validate_properties(obj, path)?;

    let elements = as_array(require(obj, path, "elements")?, &format!("{path}.elements"))?;
    for (index, element) in elements.iter().enumerate() {
        validate_element(element, &format!("{path}.elements[{index}]"))?;
    }

    Ok(())
}

fn validate_element(element: &Value, path: &str) -> Result<(), SchemaViolation> {
    let obj = as_object(element, path)?;

    let kind = require_str(obj, path, "type")?;
    check_enum(kind, &ELEMENT_TYPES, &format!("{path}.type"))?;

    let name = require_str(obj, path, "name")?;
    check_pattern(name, name_pattern(), &format!("{path}.name"), "an identifier")?;
    require_uuid(obj, path, "id")?;
    validate_stereotypes(obj, path)?;
    validate_properties(obj, path)?;
    optional_bool(obj, path, "is_abstract")?;
    optional_bool(obj, path, "is_interface")?;

    if let Some(attributes) = obj.get("attributes") {
        let attributes = as_array(attributes, &format!("{path}.attributes"))?;
        for (index, attribute) in attributes.iter().enumerate() {
            validate_attribute(attribute, &format!("{path}.attributes[{index}]"))?;
        }
    }

    if let Some(operations) = obj.get("operations") {
        let operations = as_array(operations, &format!("{path}.operations"))?;
        for (index, operation) in operations.iter().enumerate() {
            validate_operation(operation, &format!("{path}.operations[{index}]"))?;
        }
    }

    Ok(())
}

fn validate_attribute(attribute: &Value, path: &str) -> Result<(), SchemaViolation> {
    let obj = as_object(attribute, path)?;

    let name = require_str(obj, path, "name")?;
    check_pattern(name, name_pattern(), &format!("{path}.name"), "an identifier")?;

    let type_name = require_str(obj, path, "type")?;
    check_pattern(type_name, type_pattern(), &format!("{path}.type"), "a type name")?;

    let visibility = require_str(obj, path, "visibility")?;
    check_enum(visibility, &VISIBILITIES, &format!("{path}.visibility"))?;

    if let Some(default_value) = obj.get("default_value") {
        if !default_value.is_null() && !default_value.is_string() {
            return Err(SchemaViolation::new(
                format!("{path}.default_value"),
                "expected a string or null",
            ));
        }
    }
    optional_bool(obj, path, "is_static")?;
    optional_bool(obj, path, "is_final")?;

    Ok(())
}

fn validate_operation(operation: &Value, path: &str) -> Result<(), SchemaViolation> {
    let obj = as_object(operation, path)?;

    let name = require_str(obj, path, "name")?;
    check_pattern(name, name_pattern(), &format!("{path}.name"), "an identifier")?;

    let visibility = require_str(obj, path, "visibility")?;
    check_enum(visibility, &VISIBILITIES, &format!("{path}.visibility"))?;

    if let Some(return_type) = obj.get("return_type") {
        if !return_type.is_null() && !return_type.is_string() {
            return Err(SchemaViolation::new(
                format!("{path}.return_type"),
                "expected a string or null",
            ));
        }
    }

    if let Some(parameters) = obj.get("parameters") {
        let parameters = as_array(parameters, &format!("{path}.parameters"))?;
        for (index, parameter) in parameters.iter().enumerate() {
            let pair_path = format!("{path}.parameters[{index}]");
            let pair = as_array(parameter, &pair_path)?;
            if pair.len() != 2 || !pair.iter().all(Value::is_string) {
                return Err(SchemaViolation::new(
                    pair_path,
                    "expected a [name, type] string pair",
                ));
            }
        }
    }
    optional_bool(obj, path, "is_static")?;
    optional_bool(obj, path, "is_abstract")?;

    Ok(())
}

fn validate_relationship(relationship: &Value, path: &str) -> Result<(), SchemaViolation> {
    let obj = as_object(relationship, path)?;

    require_str(obj, path, "name")?;
    require_uuid(obj, path, "id")?;
    require_uuid(obj, path, "source")?;
    require_uuid(obj, path, "target")?;

    let kind = require_str(obj, path, "relationship_type")?;
    check_enum(kind, &RELATIONSHIP_TYPES, &format!("{path}.relationship_type"))?;

    validate_stereotypes(obj, path)?;
    validate_properties(obj, path)?;

    for key in ["multiplicity_source", "multiplicity_target"] {
        match obj.get(key) {
            Some(value) => {
                let field_path = format!("{path}.{key}");
                let multiplicity = value
                    .as_str()
                    .ok_or_else(|| SchemaViolation::new(&field_path, "expected a string"))?;
                check_pattern(
                    multiplicity,
                    multiplicity_pattern(),
                    &field_path,
                    "a multiplicity",
                )?;
            }
            None if ASSOCIATION_FAMILY.contains(&kind) => {
                return Err(SchemaViolation::new(
                    format!("{path}.{key}"),
                    format!("required for relationship type '{kind}'"),
                ));
            }
            None => {}
        }
    }
    optional_bool(obj, path, "navigability_source")?;
    optional_bool(obj, path, "navigability_target")?;

    Ok(())
}

fn validate_stereotypes(obj: &Map<String, Value>, path: &str) -> Result<(), SchemaViolation> {
    if let Some(stereotypes) = obj.get("stereotypes") {
        let stereotypes = as_array(stereotypes, &format!("{path}.stereotypes"))?;
        for (index, stereotype) in stereotypes.iter().enumerate() {
            if !stereotype.is_string() {
                return Err(SchemaViolation::new(
                    format!("{path}.stereotypes[{index}]"),
                    "expected a string",
                ));
            }
        }
    }
    Ok(())
}

fn validate_properties(obj: &Map<String, Value>, path: &str) -> Result<(), SchemaViolation> {
    if let Some(properties) = obj.get("properties") {
        let properties = as_object(properties, &format!("{path}.properties"))?;
        for (key, value) in properties {
            if !value.is_string() {
                return Err(SchemaViolation::new(
                    format!("{path}.properties.{key}"),
                    "expected a string value",
                ));
            }
        }
    }
    Ok(())
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, "expected an object"))
}

fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, SchemaViolation> {
    value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(path, "expected an array"))
}

fn require<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Value, SchemaViolation> {
    obj.get(key)
        .ok_or_else(|| SchemaViolation::new(format!("{path}.{key}"), "missing required field"))
}

fn require_str<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a str, SchemaViolation> {
    require(obj, path, key)?
        .as_str()
        .ok_or_else(|| SchemaViolation::new(format!("{path}.{key}"), "expected a string"))
}

fn optional_str(obj: &Map<String, Value>, path: &str, key: &str) -> Result<(), SchemaViolation> {
    match obj.get(key) {
        None => Ok(()),
        Some(value) if value.is_string() => Ok(()),
        Some(_) => Err(SchemaViolation::new(
            format!("{path}.{key}"),
            "expected a string",
        )),
    }
}

fn optional_bool(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), SchemaViolation> {
    match obj.get(key) {
        None => Ok(()),
        Some(value) if value.is_boolean() => Ok(()),
        Some(_) => Err(SchemaViolation::new(
            format!("{path}.{key}"),
            "expected a boolean",
        )),
    }
}

fn require_uuid(obj: &Map<String, Value>, path: &str, key: &str) -> Result<(), SchemaViolation> {
    let raw = require_str(obj, path, key)?;
    Uuid::parse_str(raw)
        .map(|_| ())
        .map_err(|_| SchemaViolation::new(format!("{path}.{key}"), format!("'{raw}' is not a UUID")))
}

fn require_uuid_value(value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let raw = value
        .as_str()
        .ok_or_else(|| SchemaViolation::new(path, "expected a string"))?;
    Uuid::parse_str(raw)
        .map(|_| ())
        .map_err(|_| SchemaViolation::new(path, format!("'{raw}' is not a UUID")))
}

fn check_pattern(
    value: &str,
    pattern: &Regex,
    path: &str,
    expectation: &str,
) -> Result<(), SchemaViolation> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("'{value}' is not {expectation}"),
        ))
    }
}

fn check_enum(value: &str, allowed: &[&str], path: &str) -> Result<(), SchemaViolation> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("'{value}' is not one of {allowed:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "version": "1.0.0",
            "metadata": {
                "author": "tester",
                "created_at": "2025-01-01T00:00:00Z",
                "updated_at": "2025-01-01T00:00:00Z",
                "description": ""
            },
            "name": "Shop",
            "packages": [{
                "name": "core",
                "id": "4a3a83f5-9f07-4b4f-8a6c-2f3d6d6e9b01",
                "stereotypes": [],
                "properties": {},
                "elements": [{
                    "type": "class",
                    "name": "Order",
                    "id": "4a3a83f5-9f07-4b4f-8a6c-2f3d6d6e9b02",
                    "stereotypes": [],
                    "properties": {},
                    "attributes": [{
                        "name": "total",
                        "type": "float",
                        "visibility": "public",
                        "default_value": null,
                        "is_static": false,
                        "is_final": false
                    }],
                    "operations": [{
                        "name": "checkout",
                        "return_type": null,
                        "parameters": [["cart", "Cart"]],
                        "visibility": "public",
                        "is_static": false,
                        "is_abstract": false
                    }],
                    "is_abstract": false,
                    "is_interface": false
                }]
            }],
            "relationships": [{
                "name": "order_customer",
                "id": "4a3a83f5-9f07-4b4f-8a6c-2f3d6d6e9b03",
                "source": "4a3a83f5-9f07-4b4f-8a6c-2f3d6d6e9b02",
                "target": "4a3a83f5-9f07-4b4f-8a6c-2f3d6d6e9b02",
                "relationship_type": "association",
                "stereotypes": [],
                "properties": {},
                "multiplicity_source": "1",
                "multiplicity_target": "*",
                "navigability_source": true,
                "navigability_target": true
            }]
        })
    }

    #[test]
    fn test_valid_document_accepted() {
        assert!(validate_document(&valid_document()).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("name");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.name");
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_bad_version_pattern() {
        let mut doc = valid_document();
        doc["version"] = json!("1.0");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.version");
    }

    #[test]
    fn test_bad_visibility_enum() {
        let mut doc = valid_document();
        doc["packages"][0]["elements"][0]["attributes"][0]["visibility"] = json!("friend");
        let err = validate_document(&doc).unwrap_err();
        assert!(err.path.ends_with("visibility"));
    }

    #[test]
    fn test_bad_multiplicity_pattern() {
        let mut doc = valid_document();
        doc["relationships"][0]["multiplicity_target"] = json!("many");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.relationships[0].multiplicity_target");
    }

    #[test]
    fn test_association_family_requires_multiplicities() {
        let mut doc = valid_document();
        doc["relationships"][0]["relationship_type"] = json!("aggregation");
        doc["relationships"][0]
            .as_object_mut()
            .unwrap()
            .remove("multiplicity_source");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.relationships[0].multiplicity_source");

        // A dependency without multiplicities is fine.
        let mut doc = valid_document();
        let relationship = doc["relationships"][0].as_object_mut().unwrap();
        relationship.insert("relationship_type".to_string(), json!("dependency"));
        relationship.remove("multiplicity_source");
        relationship.remove("multiplicity_target");
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_bad_uuid() {
        let mut doc = valid_document();
        doc["packages"][0]["id"] = json!("nope");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.packages[0].id");
    }

    #[test]
    fn test_unknown_relationship_type() {
        let mut doc = valid_document();
        doc["relationships"][0]["relationship_type"] = json!("friendship");
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.path, "$.relationships[0].relationship_type");
    }

    #[test]
    fn test_unknown_element_type() {
        let mut doc = valid_document();
        doc["packages"][0]["elements"][0]["type"] = json!("actor");
        assert!(validate_document(&doc).is_err());
    }

    #[test]
    fn test_dotted_package_names_allowed() {
        let mut doc = valid_document();
        doc["packages"][0]["name"] = json!("com.example.core");
        assert!(validate_document(&doc).is_ok());

        // Element names stay plain identifiers.
        doc["packages"][0]["elements"][0]["name"] = json!("com.example.Order");
        assert!(validate_document(&doc).is_err());
    }

    #[test]
    fn test_parameter_pair_shape() {
        let mut doc = valid_document();
        doc["packages"][0]["elements"][0]["operations"][0]["parameters"] =
            json!([["only_name"]]);
        let err = validate_document(&doc).unwrap_err();
        assert!(err.message.contains("[name, type]"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn multiplicity_pattern_accepts_ranges(
                lower in prop_oneof![Just("*".to_string()), "[0-9]{1,3}"],
                upper in proptest::option::of(
                    prop_oneof![Just("*".to_string()), "[0-9]{1,3}"]
                ),
            ) {
                let multiplicity = match upper {
                    Some(upper) => format!("{lower}..{upper}"),
                    None => lower,
                };
                prop_assert!(multiplicity_pattern().is_match(&multiplicity));
            }

            #[test]
            fn multiplicity_pattern_rejects_words(word in "[a-zA-Z]+") {
                prop_assert!(!multiplicity_pattern().is_match(&word));
            }
        }
    }
}
