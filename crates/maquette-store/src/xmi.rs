//! XMI 2.1 reading and writing.
//!
//! The writer emits an `xmi:XMI` document with XMI/UML 2.1 namespaces:
//! `xmi:Documentation` (exporter, version, author, description), a
//! `uml:Model`, and `packagedElement` entries typed `uml:Package`,
//! `uml:Class`, `uml:Association`, `uml:Generalization`, `uml:Dependency`,
//! or `uml:Realization`. Aggregation and composition ride on
//! `uml:Association` with the standard `aggregation` attribute; stereotypes
//! and tagged-value properties travel in an `xmi:Extension` block so the
//! format round-trips losslessly.
//!
//! The reader is an event-driven state machine over `quick_xml` events,
//! rebuilding the model incrementally.

use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use maquette_core::{
    AssociationEnds, Attribute, Class, ElementId, Model, Operation, Package, Relationship,
    RelationshipKind, UmlElement, Visibility,
};

use crate::error::StoreError;
use crate::serializer::FORMAT_VERSION;

const XMI_NS: &str = "http://schema.omg.org/spec/XMI/2.1";
const UML_NS: &str = "http://schema.omg.org/spec/UML/2.1";
const PRIMITIVE_TYPE_BASE: &str = "http://schema.omg.org/spec/UML/2.1";
const EXPORTER: &str = "Maquette UML Modeler";

type XmlWriter = Writer<Vec<u8>>;

fn w(result: std::io::Result<()>) -> Result<(), StoreError> {
    result.map_err(|source| StoreError::io("write", "<xmi buffer>", source))
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), StoreError> {
    w(writer.write_event(Event::Start(BytesStart::new(name))))?;
    w(writer.write_event(Event::Text(BytesText::new(text))))?;
    w(writer.write_event(Event::End(BytesEnd::new(name))))?;
    Ok(())
}

/// Renders a model as XMI 2.1 text.
pub fn write_model(
    model: &Model,
    author: Option<&str>,
    description: Option<&str>,
) -> Result<String, StoreError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut root = BytesStart::new("xmi:XMI");
    root.push_attribute(("xmlns:xmi", XMI_NS));
    root.push_attribute(("xmlns:uml", UML_NS));
    root.push_attribute(("xmi:version", "2.1"));
    w(writer.write_event(Event::Start(root)))?;

    w(writer.write_event(Event::Start(BytesStart::new("xmi:Documentation"))))?;
    text_element(&mut writer, "xmi:exporter", EXPORTER)?;
    text_element(&mut writer, "xmi:exporterVersion", FORMAT_VERSION)?;
    if let Some(author) = author {
        text_element(&mut writer, "xmi:author", author)?;
    }
    if let Some(description) = description {
        text_element(&mut writer, "xmi:description", description)?;
    }
    w(writer.write_event(Event::End(BytesEnd::new("xmi:Documentation"))))?;

    let mut model_start = BytesStart::new("uml:Model");
    model_start.push_attribute(("xmi:type", "uml:Model"));
    if let Some(id) = model.id() {
        model_start.push_attribute(("xmi:id", id.to_string().as_str()));
    }
    model_start.push_attribute(("name", model.name()));
    w(writer.write_event(Event::Start(model_start)))?;

    for package in model.packages() {
        write_package(&mut writer, package)?;
    }
    for relationship in model.relationships() {
        write_relationship(&mut writer, relationship)?;
    }

    w(writer.write_event(Event::End(BytesEnd::new("uml:Model"))))?;
    w(writer.write_event(Event::End(BytesEnd::new("xmi:XMI"))))?;

    String::from_utf8(writer.into_inner())
        .map_err(|_| StoreError::InvalidDocument("produced non-UTF-8 XMI".to_string()))
}

fn write_package(writer: &mut XmlWriter, package: &Package) -> Result<(), StoreError> {
    let mut start = BytesStart::new("packagedElement");
    start.push_attribute(("xmi:type", "uml:Package"));
    start.push_attribute(("xmi:id", package.id().to_string().as_str()));
    start.push_attribute(("name", package.name()));
    w(writer.write_event(Event::Start(start)))?;

    write_extension(writer, package.stereotypes(), package.properties())?;

    for class in package.classes() {
        write_class(writer, class)?;
    }

    w(writer.write_event(Event::End(BytesEnd::new("packagedElement"))))?;
    Ok(())
}

fn write_class(writer: &mut XmlWriter, class: &Class) -> Result<(), StoreError> {
    let mut start = BytesStart::new("packagedElement");
    start.push_attribute(("xmi:type", "uml:Class"));
    start.push_attribute(("xmi:id", class.id().to_string().as_str()));
    start.push_attribute(("name", class.name()));
    if class.is_abstract() {
        start.push_attribute(("isAbstract", "true"));
    }
    if class.is_interface() {
        start.push_attribute(("isInterface", "true"));
    }
    w(writer.write_event(Event::Start(start)))?;

    write_extension(writer, class.stereotypes(), class.properties())?;

    for attribute in class.attributes() {
        write_attribute(writer, attribute)?;
    }
    for operation in class.operations() {
        write_operation(writer, operation)?;
    }

    w(writer.write_event(Event::End(BytesEnd::new("packagedElement"))))?;
    Ok(())
}

fn write_attribute(writer: &mut XmlWriter, attribute: &Attribute) -> Result<(), StoreError> {
    let mut start = BytesStart::new("ownedAttribute");
    start.push_attribute(("xmi:type", "uml:Property"));
    start.push_attribute(("name", attribute.name()));
    start.push_attribute(("visibility", attribute.visibility().as_str()));
    if attribute.is_static() {
        start.push_attribute(("isStatic", "true"));
    }
    if attribute.is_final() {
        start.push_attribute(("isFinal", "true"));
    }
    if let Some(default_value) = attribute.default_value() {
        start.push_attribute(("defaultValue", default_value));
    }
    w(writer.write_event(Event::Start(start)))?;
    write_type_ref(writer, attribute.type_name())?;
    w(writer.write_event(Event::End(BytesEnd::new("ownedAttribute"))))?;
    Ok(())
}

fn write_operation(writer: &mut XmlWriter, operation: &Operation) -> Result<(), StoreError> {
    let mut start = BytesStart::new("ownedOperation");
    start.push_attribute(("xmi:type", "uml:Operation"));
    start.push_attribute(("name", operation.name()));
    start.push_attribute(("visibility", operation.visibility().as_str()));
    if operation.is_static() {
        start.push_attribute(("isStatic", "true"));
    }
    if operation.is_abstract() {
        start.push_attribute(("isAbstract", "true"));
    }
    w(writer.write_event(Event::Start(start)))?;

    if let Some(return_type) = operation.return_type() {
        write_type_ref(writer, return_type)?;
    }

    for parameter in operation.parameters() {
        let mut param = BytesStart::new("ownedParameter");
        param.push_attribute(("xmi:type", "uml:Parameter"));
        param.push_attribute(("name", parameter.name()));
        w(writer.write_event(Event::Start(param)))?;
        write_type_ref(writer, parameter.type_name())?;
        w(writer.write_event(Event::End(BytesEnd::new("ownedParameter"))))?;
    }

    w(writer.write_event(Event::End(BytesEnd::new("ownedOperation"))))?;
    Ok(())
}

fn write_type_ref(writer: &mut XmlWriter, type_name: &str) -> Result<(), StoreError> {
    let mut type_ref = BytesStart::new("type");
    type_ref.push_attribute(("xmi:type", "uml:PrimitiveType"));
    type_ref.push_attribute(("href", format!("{PRIMITIVE_TYPE_BASE}/{type_name}").as_str()));
    w(writer.write_event(Event::Empty(type_ref)))?;
    Ok(())
}

fn write_relationship(
    writer: &mut XmlWriter,
    relationship: &Relationship,
) -> Result<(), StoreError> {
    let (xmi_type, aggregation) = match relationship.kind() {
        RelationshipKind::Association(_) => ("uml:Association", None),
        RelationshipKind::Aggregation(_) => ("uml:Association", Some("shared")),
        RelationshipKind::Composition(_) => ("uml:Association", Some("composite")),
        RelationshipKind::Generalization => ("uml:Generalization", None),
        RelationshipKind::Realization => ("uml:Realization", None),
        RelationshipKind::Dependency => ("uml:Dependency", None),
    };

    let mut start = BytesStart::new("packagedElement");
    start.push_attribute(("xmi:type", xmi_type));
    start.push_attribute(("xmi:id", relationship.id().to_string().as_str()));
    start.push_attribute(("name", relationship.name()));
    if let Some(aggregation) = aggregation {
        start.push_attribute(("aggregation", aggregation));
    }
    w(writer.write_event(Event::Start(start)))?;

    write_extension(writer, relationship.stereotypes(), relationship.properties())?;

    let ends = relationship.kind().ends();
    write_end_ref(writer, "source", relationship.source(), ends, true)?;
    write_end_ref(writer, "target", relationship.target(), ends, false)?;

    w(writer.write_event(Event::End(BytesEnd::new("packagedElement"))))?;
    Ok(())
}

fn write_end_ref(
    writer: &mut XmlWriter,
    tag: &str,
    id: ElementId,
    ends: Option<&AssociationEnds>,
    is_source: bool,
) -> Result<(), StoreError> {
    let mut start = BytesStart::new(tag);
    start.push_attribute(("xmi:idref", id.to_string().as_str()));
    if let Some(ends) = ends {
        let (multiplicity, navigable) = if is_source {
            (ends.multiplicity_source(), ends.navigability_source())
        } else {
            (ends.multiplicity_target(), ends.navigability_target())
        };
        start.push_attribute(("multiplicity", multiplicity));
        if !navigable {
            start.push_attribute(("navigable", "false"));
        }
    }
    w(writer.write_event(Event::Empty(start)))?;
    Ok(())
}

/// Writes the `xmi:Extension` block carrying stereotypes and tagged-value
/// properties, skipped entirely when both are empty.
fn write_extension(
    writer: &mut XmlWriter,
    stereotypes: &maquette_core::Stereotypes,
    properties: &maquette_core::Properties,
) -> Result<(), StoreError> {
    if stereotypes.is_empty() && properties.is_empty() {
        return Ok(());
    }

    let mut start = BytesStart::new("xmi:Extension");
    start.push_attribute(("extender", EXPORTER));
    w(writer.write_event(Event::Start(start)))?;

    for stereotype in stereotypes {
        let mut element = BytesStart::new("stereotype");
        element.push_attribute(("name", stereotype.as_str()));
        w(writer.write_event(Event::Empty(element)))?;
    }
    for (key, value) in properties {
        let mut element = BytesStart::new("taggedValue");
        element.push_attribute(("key", key.as_str()));
        element.push_attribute(("value", value.as_str()));
        w(writer.write_event(Event::Empty(element)))?;
    }

    w(writer.write_event(Event::End(BytesEnd::new("xmi:Extension"))))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PendingAttribute {
    name: String,
    visibility: Visibility,
    is_static: bool,
    is_final: bool,
    default_value: Option<String>,
    type_name: Option<String>,
}

#[derive(Debug, Default)]
struct PendingOperation {
    name: String,
    visibility: Visibility,
    is_static: bool,
    is_abstract: bool,
    return_type: Option<String>,
    parameters: Vec<(String, String)>,
}

#[derive(Debug)]
struct PendingParameter {
    name: String,
    type_name: Option<String>,
}

#[derive(Debug)]
struct PendingRelationship {
    xmi_type: String,
    name: String,
    id: ElementId,
    aggregation: Option<String>,
    source: Option<ElementId>,
    target: Option<ElementId>,
    multiplicity_source: Option<String>,
    multiplicity_target: Option<String>,
    navigability_source: bool,
    navigability_target: bool,
    stereotypes: Vec<String>,
    properties: Vec<(String, String)>,
}

#[derive(Default)]
struct XmiParser {
    model: Option<Model>,
    package: Option<Package>,
    class: Option<Class>,
    attribute: Option<PendingAttribute>,
    operation: Option<PendingOperation>,
    parameter: Option<PendingParameter>,
    relationship: Option<PendingRelationship>,
}

struct Attrs {
    pairs: Vec<(String, String)>,
}

impl Attrs {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let pairs = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                let value = attr
                    .unescape_value()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
                (key, value)
            })
            .collect();
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    fn id(&self, key: &str) -> Result<ElementId, StoreError> {
        let raw = self
            .get(key)
            .ok_or_else(|| StoreError::InvalidDocument(format!("missing attribute {key}")))?;
        raw.parse()
            .map_err(|_| StoreError::InvalidDocument(format!("invalid UUID: {raw}")))
    }
}

impl XmiParser {
    fn handle_start(&mut self, start: &BytesStart<'_>, is_empty: bool) -> Result<(), StoreError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let attrs = Attrs::from_start(start);

        match tag.as_str() {
            "uml:Model" => {
                let name = attrs.get("name").unwrap_or("Unnamed Model");
                let mut model = Model::new(name);
                if let Some(raw) = attrs.get("xmi:id") {
                    model.set_id(raw.parse().map_err(|_| {
                        StoreError::InvalidDocument(format!("invalid UUID: {raw}"))
                    })?);
                }
                self.model = Some(model);
            }
            "packagedElement" => {
                self.open_packaged_element(&attrs)?;
                if is_empty {
                    self.close_packaged_element()?;
                }
            }
            "ownedAttribute" => {
                self.attribute = Some(PendingAttribute {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    visibility: parse_visibility(attrs.get("visibility")),
                    is_static: attrs.flag("isStatic"),
                    is_final: attrs.flag("isFinal"),
                    default_value: attrs.get("defaultValue").map(str::to_string),
                    type_name: None,
                });
                if is_empty {
                    self.close_attribute();
                }
            }
            "ownedOperation" => {
                self.operation = Some(PendingOperation {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    visibility: parse_visibility(attrs.get("visibility")),
                    is_static: attrs.flag("isStatic"),
                    is_abstract: attrs.flag("isAbstract"),
                    return_type: None,
                    parameters: Vec::new(),
                });
                if is_empty {
                    self.close_operation();
                }
            }
            "ownedParameter" => {
                self.parameter = Some(PendingParameter {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    type_name: None,
                });
                if is_empty {
                    self.close_parameter();
                }
            }
            "type" => {
                let type_name = attrs
                    .get("href")
                    .and_then(|href| href.rsplit('/').next())
                    .unwrap_or_default()
                    .to_string();
                if let Some(parameter) = &mut self.parameter {
                    parameter.type_name = Some(type_name);
                } else if let Some(attribute) = &mut self.attribute {
                    attribute.type_name = Some(type_name);
                } else if let Some(operation) = &mut self.operation {
                    operation.return_type = Some(type_name);
                }
            }
            "source" | "target" => {
                if let Some(relationship) = &mut self.relationship {
                    let id = attrs.id("xmi:idref")?;
                    let multiplicity = attrs.get("multiplicity").map(str::to_string);
                    let navigable = attrs.get("navigable") != Some("false");
                    if tag == "source" {
                        relationship.source = Some(id);
                        relationship.multiplicity_source = multiplicity;
                        relationship.navigability_source = navigable;
                    } else {
                        relationship.target = Some(id);
                        relationship.multiplicity_target = multiplicity;
                        relationship.navigability_target = navigable;
                    }
                }
            }
            "stereotype" => {
                if let Some(name) = attrs.get("name") {
                    self.apply_stereotype(name);
                }
            }
            "taggedValue" => {
                if let (Some(key), Some(value)) = (attrs.get("key"), attrs.get("value")) {
                    self.apply_property(key, value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_end(&mut self, end: &BytesEnd<'_>) -> Result<(), StoreError> {
        let tag = String::from_utf8_lossy(end.name().as_ref()).to_string();
        match tag.as_str() {
            "packagedElement" => self.close_packaged_element()?,
            "ownedAttribute" => self.close_attribute(),
            "ownedOperation" => self.close_operation(),
            "ownedParameter" => self.close_parameter(),
            _ => {}
        }
        Ok(())
    }

    fn open_packaged_element(&mut self, attrs: &Attrs) -> Result<(), StoreError> {
        let xmi_type = attrs.get("xmi:type").unwrap_or_default().to_string();
        let name = attrs.get("name").unwrap_or_default().to_string();

        match xmi_type.as_str() {
            "uml:Package" => {
                self.package = Some(Package::with_id(name, attrs.id("xmi:id")?));
            }
            "uml:Class" => {
                self.class = Some(
                    Class::with_id(name, attrs.id("xmi:id")?)
                        .with_abstract(attrs.flag("isAbstract"))
                        .with_interface(attrs.flag("isInterface")),
                );
            }
            "uml:Association" | "uml:Generalization" | "uml:Dependency" | "uml:Realization" => {
                self.relationship = Some(PendingRelationship {
                    xmi_type,
                    name,
                    id: attrs.id("xmi:id")?,
                    aggregation: attrs.get("aggregation").map(str::to_string),
                    source: None,
                    target: None,
                    multiplicity_source: None,
                    multiplicity_target: None,
                    navigability_source: true,
                    navigability_target: true,
                    stereotypes: Vec::new(),
                    properties: Vec::new(),
                });
            }
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "unsupported packagedElement type: {other}"
                )));
            }
        }
        Ok(())
    }

    fn close_packaged_element(&mut self) -> Result<(), StoreError> {
        if let Some(class) = self.class.take() {
            let package = self.package.as_mut().ok_or_else(|| {
                StoreError::InvalidDocument("class outside of a package".to_string())
            })?;
            package.add_element(class);
        } else if let Some(package) = self.package.take() {
            let model = self.model.as_mut().ok_or_else(|| {
                StoreError::InvalidDocument("package outside of uml:Model".to_string())
            })?;
            model.add_package(package);
        } else if let Some(pending) = self.relationship.take() {
            let model = self.model.as_mut().ok_or_else(|| {
                StoreError::InvalidDocument("relationship outside of uml:Model".to_string())
            })?;
            model.add_relationship(finish_relationship(pending)?);
        }
        Ok(())
    }

    fn close_attribute(&mut self) {
        if let (Some(pending), Some(class)) = (self.attribute.take(), self.class.as_mut()) {
            let mut attribute =
                Attribute::new(pending.name, pending.type_name.unwrap_or_default())
                    .with_visibility(pending.visibility)
                    .with_static(pending.is_static)
                    .with_final(pending.is_final);
            if let Some(default_value) = pending.default_value {
                attribute = attribute.with_default_value(default_value);
            }
            class.add_attribute(attribute);
        }
    }

    fn close_operation(&mut self) {
        if let (Some(pending), Some(class)) = (self.operation.take(), self.class.as_mut()) {
            let mut operation = Operation::new(pending.name, pending.return_type)
                .with_visibility(pending.visibility)
                .with_static(pending.is_static)
                .with_abstract(pending.is_abstract);
            for (param_name, param_type) in pending.parameters {
                operation = operation.with_parameter(param_name, param_type);
            }
            class.add_operation(operation);
        }
    }

    fn close_parameter(&mut self) {
        if let (Some(pending), Some(operation)) = (self.parameter.take(), self.operation.as_mut())
        {
            operation
                .parameters
                .push((pending.name, pending.type_name.unwrap_or_default()));
        }
    }

    fn apply_stereotype(&mut self, name: &str) {
        if let Some(class) = &mut self.class {
            class.add_stereotype(name);
        } else if let Some(package) = &mut self.package {
            package.add_stereotype(name);
        } else if let Some(relationship) = &mut self.relationship {
            relationship.stereotypes.push(name.to_string());
        }
    }

    fn apply_property(&mut self, key: &str, value: &str) {
        if let Some(class) = &mut self.class {
            class.set_property(key, value);
        } else if let Some(package) = &mut self.package {
            package.set_property(key, value);
        } else if let Some(relationship) = &mut self.relationship {
            relationship
                .properties
                .push((key.to_string(), value.to_string()));
        }
    }
}

fn parse_visibility(raw: Option<&str>) -> Visibility {
    raw.and_then(|v| v.parse().ok()).unwrap_or_default()
}

fn finish_relationship(pending: PendingRelationship) -> Result<Relationship, StoreError> {
    let source = pending
        .source
        .ok_or_else(|| StoreError::InvalidDocument("relationship without source".to_string()))?;
    let target = pending
        .target
        .ok_or_else(|| StoreError::InvalidDocument("relationship without target".to_string()))?;

    let kind = match pending.xmi_type.as_str() {
        "uml:Generalization" => RelationshipKind::Generalization,
        "uml:Dependency" => RelationshipKind::Dependency,
        "uml:Realization" => RelationshipKind::Realization,
        _ => {
            let ends = AssociationEnds::new(
                pending.multiplicity_source.unwrap_or_else(|| "1".to_string()),
                pending.multiplicity_target.unwrap_or_else(|| "1".to_string()),
            )
            .with_navigability(pending.navigability_source, pending.navigability_target);
            match pending.aggregation.as_deref() {
                Some("shared") => RelationshipKind::Aggregation(ends),
                Some("composite") => RelationshipKind::Composition(ends),
                _ => RelationshipKind::Association(ends),
            }
        }
    };

    let mut relationship =
        Relationship::with_id(pending.name, pending.id, source, target, kind);
    for stereotype in pending.stereotypes {
        relationship.add_stereotype(stereotype);
    }
    for (key, value) in pending.properties {
        relationship.set_property(key, value);
    }
    Ok(relationship)
}

/// Parses an XMI 2.1 document into a model.
pub fn read_model(text: &str) -> Result<Model, StoreError> {
    let mut reader = Reader::from_str(text);
    let mut parser = XmiParser::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref start) => parser.handle_start(start, false)?,
            Event::Empty(ref start) => parser.handle_start(start, true)?,
            Event::End(ref end) => parser.handle_end(end)?,
            Event::Eof => break,
            _ => {}
        }
    }

    parser
        .model
        .ok_or_else(|| StoreError::InvalidDocument("missing uml:Model element".to_string()))
}
