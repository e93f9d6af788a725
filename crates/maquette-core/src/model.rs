//! The model root aggregate and its validation rules.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::element::{Class, ElementId, Package, UmlElement};
use crate::relationship::Relationship;

/// Location of an element inside the model's package list.
#[derive(Debug, Clone, Copy)]
enum Location {
    Package { package: usize },
    Element { package: usize, element: usize },
}

/// Borrowed view of an element found by id.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Package(&'a Package),
    Class(&'a Class),
}

impl ElementRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            ElementRef::Package(package) => package.name(),
            ElementRef::Class(class) => class.name(),
        }
    }

    pub fn id(&self) -> ElementId {
        match self {
            ElementRef::Package(package) => package.id(),
            ElementRef::Class(class) => class.id(),
        }
    }

    /// Returns the class behind this reference, if it is one.
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            ElementRef::Class(class) => Some(class),
            ElementRef::Package(_) => None,
        }
    }
}

/// A consistency problem reported by [`Model::validate`].
///
/// Issues are descriptive, never fatal by themselves; the caller decides
/// whether to treat them as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Duplicate name '{name}' in package '{package}'")]
    DuplicateName { package: String, name: String },

    #[error("Relationship '{relationship}' has invalid source ID")]
    UnresolvedSource { relationship: String },

    #[error("Relationship '{relationship}' has invalid target ID")]
    UnresolvedTarget { relationship: String },

    #[error("Interface '{class}' must not declare attributes")]
    InterfaceWithAttributes { class: String },

    #[error("Interface '{class}' has non-abstract operation '{operation}'")]
    ConcreteInterfaceOperation { class: String, operation: String },
}

/// Root aggregate owning packages and relationships.
///
/// Models are assembled incrementally: `add_package` and `add_relationship`
/// append without any checking, so a partially-wired model (for instance,
/// mid-import) is representable. [`Model::validate`] reports all
/// inconsistencies at once.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    id: Option<ElementId>,
    packages: Vec<Package>,
    relationships: Vec<Relationship>,
    index: HashMap<ElementId, Location>,
}

impl Model {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            packages: Vec::new(),
            relationships: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the model.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Storage identity, assigned by the repository on first save.
    pub fn id(&self) -> Option<ElementId> {
        self.id
    }

    /// Assigns the storage identity. Once set it should never change; the
    /// repository relies on it to locate versions and backups.
    pub fn set_id(&mut self, id: ElementId) {
        self.id = Some(id);
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Appends a package and indexes it together with its elements.
    ///
    /// No validation happens here; duplicate names are reported later by
    /// [`Model::validate`].
    pub fn add_package(&mut self, package: Package) {
        let package_idx = self.packages.len();
        self.index
            .insert(package.id(), Location::Package { package: package_idx });
        for (element_idx, element) in package.elements().iter().enumerate() {
            self.index.insert(
                element.id(),
                Location::Element {
                    package: package_idx,
                    element: element_idx,
                },
            );
        }
        self.packages.push(package);
    }

    /// Appends a relationship. Endpoint resolution is deferred to
    /// [`Model::validate`].
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Finds a package or element by id.
    ///
    /// Backed by an id index maintained on insertion, so the lookup is
    /// constant-time while keeping the packages-then-elements contract.
    pub fn find_element_by_id(&self, id: ElementId) -> Option<ElementRef<'_>> {
        match *self.index.get(&id)? {
            Location::Package { package } => self.packages.get(package).map(ElementRef::Package),
            Location::Element { package, element } => self
                .packages
                .get(package)
                .and_then(|p| p.elements().get(element))
                .and_then(|e| e.as_class())
                .map(ElementRef::Class),
        }
    }

    /// Checks the model's consistency rules and returns every issue found.
    ///
    /// Never panics and never short-circuits; an empty result means the
    /// model is well-formed.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for package in &self.packages {
            let mut seen = std::collections::HashSet::new();
            for element in package.elements() {
                if !seen.insert(element.name()) {
                    issues.push(ValidationIssue::DuplicateName {
                        package: package.name().to_string(),
                        name: element.name().to_string(),
                    });
                }
            }

            for class in package.classes() {
                if class.is_interface() {
                    if !class.attributes().is_empty() {
                        issues.push(ValidationIssue::InterfaceWithAttributes {
                            class: class.name().to_string(),
                        });
                    }
                    for operation in class.operations() {
                        if !operation.is_abstract() {
                            issues.push(ValidationIssue::ConcreteInterfaceOperation {
                                class: class.name().to_string(),
                                operation: operation.name().to_string(),
                            });
                        }
                    }
                }
            }
        }

        for relationship in &self.relationships {
            if self.find_element_by_id(relationship.source()).is_none() {
                issues.push(ValidationIssue::UnresolvedSource {
                    relationship: relationship.name().to_string(),
                });
            }
            if self.find_element_by_id(relationship.target()).is_none() {
                issues.push(ValidationIssue::UnresolvedTarget {
                    relationship: relationship.name().to_string(),
                });
            }
        }

        debug!(model = self.name, issues = issues.len(); "Model validated");
        issues
    }
}
