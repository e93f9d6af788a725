//! UML element types: identity, classes, attributes, operations, packages.
//!
//! Every modeled entity carries the same identity quartet — name, UUID,
//! stereotypes, properties — exposed uniformly through the [`UmlElement`]
//! trait. Elements are built with permissive constructors and `add_*`/`with_*`
//! calls; invariants such as "interfaces have no attributes" are checked by
//! [`crate::Model::validate`], never at construction.

use std::{collections::BTreeSet, fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stereotype set for an element (`<<entity>>`, `<<service>>`, ...).
///
/// Kept sorted so serialized output is deterministic.
pub type Stereotypes = BTreeSet<String>;

/// Free-form key/value tags attached to an element, in insertion order.
pub type Properties = IndexMap<String, String>;

/// Unique, immutable identity of a model element.
///
/// Generated at creation and never changed afterwards. Relationships and
/// diagram entities reference elements by this id, never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ElementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for ElementId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Access level of an attribute or operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
    Package,
}

impl Visibility {
    /// The lowercase keyword used in serialized documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
        }
    }

    /// The single-character UML prefix (`+`, `-`, `#`, `~`).
    pub fn symbol(&self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Private => '-',
            Visibility::Protected => '#',
            Visibility::Package => '~',
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "protected" => Ok(Visibility::Protected),
            "package" => Ok(Visibility::Package),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform access to the identity quartet shared by all model elements.
pub trait UmlElement {
    /// Element name.
    fn name(&self) -> &str;

    /// Immutable element id.
    fn id(&self) -> ElementId;

    /// Stereotypes attached to the element.
    fn stereotypes(&self) -> &Stereotypes;

    /// Key/value properties attached to the element.
    fn properties(&self) -> &Properties;
}

/// A class attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    type_name: String,
    visibility: Visibility,
    default_value: Option<String>,
    is_static: bool,
    is_final: bool,
}

impl Attribute {
    /// Creates a public, non-static, non-final attribute.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            visibility: Visibility::default(),
            default_value: None,
            is_static: false,
            is_final: false,
        }
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the default value.
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Marks the attribute static.
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Marks the attribute final.
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The free-form type name (`string`, `List<Order>`, ...).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// A named, typed operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    type_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// A class operation (method).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    return_type: Option<String>,
    parameters: Vec<Parameter>,
    visibility: Visibility,
    is_static: bool,
    is_abstract: bool,
}

impl Operation {
    /// Creates a public, concrete operation without parameters.
    pub fn new(name: impl Into<String>, return_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            visibility: Visibility::default(),
            is_static: false,
            is_abstract: false,
        }
    }

    /// Appends a parameter, preserving declaration order.
    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(name, type_name));
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// A UML class (or interface, when `is_interface` is set).
///
/// The interface invariants — no attributes, abstract operations only — are
/// reported by [`crate::Model::validate`], so a half-built interface can be
/// assembled freely and checked once.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    name: String,
    id: ElementId,
    stereotypes: Stereotypes,
    properties: Properties,
    attributes: Vec<Attribute>,
    operations: Vec<Operation>,
    is_abstract: bool,
    is_interface: bool,
}

impl Class {
    /// Creates an empty concrete class with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(name, ElementId::new())
    }

    /// Creates an empty class with a caller-supplied id (used when
    /// re-hydrating serialized models).
    pub fn with_id(name: impl Into<String>, id: ElementId) -> Self {
        Self {
            name: name.into(),
            id,
            stereotypes: Stereotypes::new(),
            properties: Properties::new(),
            attributes: Vec::new(),
            operations: Vec::new(),
            is_abstract: false,
            is_interface: false,
        }
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_interface(mut self, is_interface: bool) -> Self {
        self.is_interface = is_interface;
        self
    }

    /// Appends an attribute, preserving declaration order.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Appends an operation, preserving declaration order.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Adds a stereotype to the class.
    pub fn add_stereotype(&mut self, stereotype: impl Into<String>) {
        self.stereotypes.insert(stereotype.into());
    }

    /// Sets a property on the class.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }
}

impl UmlElement for Class {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> ElementId {
        self.id
    }

    fn stereotypes(&self) -> &Stereotypes {
        &self.stereotypes
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// A member of a package.
///
/// Classes are the only member kind today; the enum leaves room for
/// enumerations or nested packages without changing the package API.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageElement {
    Class(Class),
}

impl PackageElement {
    /// Returns the contained class, if this member is one.
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            PackageElement::Class(class) => Some(class),
        }
    }
}

impl UmlElement for PackageElement {
    fn name(&self) -> &str {
        match self {
            PackageElement::Class(class) => class.name(),
        }
    }

    fn id(&self) -> ElementId {
        match self {
            PackageElement::Class(class) => class.id(),
        }
    }

    fn stereotypes(&self) -> &Stereotypes {
        match self {
            PackageElement::Class(class) => class.stereotypes(),
        }
    }

    fn properties(&self) -> &Properties {
        match self {
            PackageElement::Class(class) => class.properties(),
        }
    }
}

impl From<Class> for PackageElement {
    fn from(class: Class) -> Self {
        PackageElement::Class(class)
    }
}

/// A UML package: a named, ordered collection of elements.
///
/// Element-name uniqueness inside a package is validated by
/// [`crate::Model::validate`], not enforced on insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    name: String,
    id: ElementId,
    stereotypes: Stereotypes,
    properties: Properties,
    elements: Vec<PackageElement>,
}

impl Package {
    /// Creates an empty package with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(name, ElementId::new())
    }

    /// Creates an empty package with a caller-supplied id.
    pub fn with_id(name: impl Into<String>, id: ElementId) -> Self {
        Self {
            name: name.into(),
            id,
            stereotypes: Stereotypes::new(),
            properties: Properties::new(),
            elements: Vec::new(),
        }
    }

    /// Appends an element, preserving insertion order.
    pub fn add_element(&mut self, element: impl Into<PackageElement>) {
        self.elements.push(element.into());
    }

    /// Adds a stereotype to the package.
    pub fn add_stereotype(&mut self, stereotype: impl Into<String>) {
        self.stereotypes.insert(stereotype.into());
    }

    /// Sets a property on the package.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn elements(&self) -> &[PackageElement] {
        &self.elements
    }

    /// Iterates over the classes contained in this package.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.elements.iter().filter_map(PackageElement::as_class)
    }
}

impl UmlElement for Package {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> ElementId {
        self.id
    }

    fn stereotypes(&self) -> &Stereotypes {
        &self.stereotypes
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id_roundtrip() {
        let id = ElementId::new();
        let parsed: ElementId = id.to_string().parse().expect("valid uuid string");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_element_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<ElementId>().is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
        assert_eq!("package".parse::<Visibility>(), Ok(Visibility::Package));
        assert!("friend".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_visibility_symbols() {
        assert_eq!(Visibility::Public.symbol(), '+');
        assert_eq!(Visibility::Private.symbol(), '-');
        assert_eq!(Visibility::Protected.symbol(), '#');
        assert_eq!(Visibility::Package.symbol(), '~');
    }

    #[test]
    fn test_attribute_builder() {
        let attr = Attribute::new("total", "float")
            .with_visibility(Visibility::Private)
            .with_default_value("0.0")
            .with_final(true);

        assert_eq!(attr.name(), "total");
        assert_eq!(attr.type_name(), "float");
        assert_eq!(attr.visibility(), Visibility::Private);
        assert_eq!(attr.default_value(), Some("0.0"));
        assert!(!attr.is_static());
        assert!(attr.is_final());
    }

    #[test]
    fn test_operation_parameters_keep_order() {
        let op = Operation::new("transfer", Some("bool".to_string()))
            .with_parameter("from", "Account")
            .with_parameter("to", "Account")
            .with_parameter("amount", "float");

        let names: Vec<&str> = op.parameters().iter().map(Parameter::name).collect();
        assert_eq!(names, ["from", "to", "amount"]);
    }

    #[test]
    fn test_class_members_keep_order() {
        let mut class = Class::new("Order");
        class.add_attribute(Attribute::new("id", "string"));
        class.add_attribute(Attribute::new("total", "float"));
        class.add_operation(Operation::new("checkout", None));

        assert_eq!(class.attributes().len(), 2);
        assert_eq!(class.attributes()[0].name(), "id");
        assert_eq!(class.attributes()[1].name(), "total");
        assert_eq!(class.operations()[0].name(), "checkout");
    }

    #[test]
    fn test_package_classes_iterator() {
        let mut package = Package::new("core");
        package.add_element(Class::new("Order"));
        package.add_element(Class::new("Customer"));

        let names: Vec<&str> = package.classes().map(|c| c.name()).collect();
        assert_eq!(names, ["Order", "Customer"]);
    }

    #[test]
    fn test_stereotypes_are_deduplicated() {
        let mut class = Class::new("Order");
        class.add_stereotype("entity");
        class.add_stereotype("entity");
        assert_eq!(class.stereotypes().len(), 1);
    }
}
