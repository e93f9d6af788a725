//! Logical architecture diagram generator.
//!
//! Projects the system decomposition: subsystems, modules, layers, facades,
//! services. With layering enabled, elements carrying a layer index group
//! into per-layer dashed clusters rendered in ascending order.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use maquette_core::{Model, UmlElement};

use crate::error::DiagramError;
use crate::graph::{
    html_table_with, ClusterSpec, DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, NodeSpec,
    TableCell,
};
use crate::style::DiagramStyle;

/// Kind of a logical element, driving its shape and fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalElementType {
    Subsystem,
    Module,
    Layer,
    Facade,
    Service,
    Repository,
    Domain,
    Utility,
}

impl LogicalElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalElementType::Subsystem => "subsystem",
            LogicalElementType::Module => "module",
            LogicalElementType::Layer => "layer",
            LogicalElementType::Facade => "facade",
            LogicalElementType::Service => "service",
            LogicalElementType::Repository => "repository",
            LogicalElementType::Domain => "domain",
            LogicalElementType::Utility => "utility",
        }
    }
}

/// A logical element in the architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalElement {
    id: String,
    name: String,
    element_type: LogicalElementType,
    stereotype: Option<String>,
    responsibilities: Vec<String>,
    subelements: Vec<String>,
    properties: IndexMap<String, String>,
    layer: Option<u32>,
}

impl LogicalElement {
    pub fn new(name: impl Into<String>, element_type: LogicalElementType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            element_type,
            stereotype: None,
            responsibilities: Vec::new(),
            subelements: Vec::new(),
            properties: IndexMap::new(),
            layer: None,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    /// Assigns the element to a layer; layered elements group into per-layer
    /// clusters when layering is shown.
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn add_responsibility(&mut self, responsibility: impl Into<String>) {
        self.responsibilities.push(responsibility.into());
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> LogicalElementType {
        self.element_type
    }

    pub fn responsibilities(&self) -> &[String] {
        &self.responsibilities
    }

    pub fn layer(&self) -> Option<u32> {
        self.layer
    }
}

/// Kind of a relation between logical elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalRelationKind {
    Dependency,
    Composition,
    Aggregation,
}

/// A relation between two registered logical elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRelation {
    source: String,
    target: String,
    kind: LogicalRelationKind,
    stereotype: Option<String>,
    multiplicity: Option<String>,
}

impl LogicalRelation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: LogicalRelationKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            stereotype: None,
            multiplicity: None,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    pub fn with_multiplicity(mut self, multiplicity: impl Into<String>) -> Self {
        self.multiplicity = Some(multiplicity.into());
        self
    }
}

/// Generates logical architecture diagrams.
pub struct LogicalDiagramGenerator {
    style: DiagramStyle,
    elements: IndexMap<String, LogicalElement>,
    relations: Vec<LogicalRelation>,
    show_responsibilities: bool,
    show_layers: bool,
}

impl LogicalDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            elements: IndexMap::new(),
            relations: Vec::new(),
            show_responsibilities: true,
            show_layers: true,
        }
    }

    pub fn set_show_responsibilities(&mut self, show: bool) {
        self.show_responsibilities = show;
    }

    pub fn set_show_layers(&mut self, show: bool) {
        self.show_layers = show;
    }

    /// Registers an element and returns its id.
    pub fn add_element(&mut self, element: LogicalElement) -> String {
        let id = element.id.clone();
        self.elements.insert(id.clone(), element);
        id
    }

    /// Registers a relation between two elements.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownElement`] if either endpoint id is absent.
    pub fn add_relation(&mut self, relation: LogicalRelation) -> Result<(), DiagramError> {
        if !self.elements.contains_key(&relation.source) {
            return Err(DiagramError::UnknownElement(relation.source));
        }
        if !self.elements.contains_key(&relation.target) {
            return Err(DiagramError::UnknownElement(relation.target));
        }
        self.relations.push(relation);
        Ok(())
    }

    /// Nests `child` inside `parent`.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownElement`] if either id is absent.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), DiagramError> {
        if !self.elements.contains_key(child) {
            return Err(DiagramError::UnknownElement(child.to_string()));
        }
        let Some(parent_element) = self.elements.get_mut(parent) else {
            return Err(DiagramError::UnknownElement(parent.to_string()));
        };
        parent_element.subelements.push(child.to_string());
        Ok(())
    }

    /// Derives a logical view from a model: the model becomes a subsystem,
    /// each package a layer composed into it, and each class an element
    /// whose kind is inferred from its shape (interface, accessor-heavy,
    /// plain service), carrying its operation names as responsibilities.
    pub fn from_model(&mut self, model: &Model) -> String {
        let main_id =
            self.add_element(LogicalElement::new(model.name(), LogicalElementType::Subsystem));

        for (layer_index, package) in model.packages().iter().enumerate() {
            let layer_index = layer_index as u32;
            let layer_id = self.add_element(
                LogicalElement::new(package.name(), LogicalElementType::Layer)
                    .with_layer(layer_index),
            );
            let _ = self.add_relation(LogicalRelation::new(
                layer_id.clone(),
                main_id.clone(),
                LogicalRelationKind::Composition,
            ));

            for class in package.classes() {
                let element_type = if class.is_interface() {
                    LogicalElementType::Facade
                } else if class
                    .operations()
                    .iter()
                    .any(|op| op.name().starts_with("get") || op.name().starts_with("set"))
                {
                    LogicalElementType::Repository
                } else {
                    LogicalElementType::Service
                };

                let mut element =
                    LogicalElement::new(class.name(), element_type).with_layer(layer_index);
                for operation in class.operations() {
                    element.add_responsibility(operation.name());
                }
                let element_id = self.add_element(element);

                let _ = self.add_relation(LogicalRelation::new(
                    element_id,
                    layer_id.clone(),
                    LogicalRelationKind::Dependency,
                ));
            }
        }

        main_id
    }

    pub fn elements(&self) -> impl Iterator<Item = &LogicalElement> {
        self.elements.values()
    }

    fn format_label(&self, element: &LogicalElement) -> String {
        let mut rows: Vec<Vec<TableCell>> = Vec::new();

        let mut stereotypes = Vec::new();
        if let Some(stereotype) = &element.stereotype {
            stereotypes.push(stereotype.clone());
        }
        stereotypes.push(element.element_type.as_str().to_string());
        rows.push(vec![TableCell::plain(format!(
            "<<{}>>",
            stereotypes.join(", ")
        ))]);

        rows.push(vec![TableCell::plain(&element.name)]);

        if self.show_responsibilities && !element.responsibilities.is_empty() {
            rows.push(
                element
                    .responsibilities
                    .iter()
                    .map(|r| TableCell::plain(format!("\u{2022} {r}")))
                    .collect(),
            );
        }

        if !element.properties.is_empty() {
            rows.push(
                element
                    .properties
                    .iter()
                    .map(|(key, value)| TableCell::plain(format!("{key}: {value}")))
                    .collect(),
            );
        }

        html_table_with(&rows, &[("cellborder", "0"), ("border", "1")])
    }

    fn node_spec(&self, element: &LogicalElement) -> NodeSpec {
        let spec = NodeSpec::new().with_html(self.format_label(element));
        match element.element_type {
            LogicalElementType::Layer => {
                // spectral9 indices are 1-based.
                let index = element.layer.map(|l| (l + 1).min(9)).unwrap_or(5);
                spec.with_shape("box")
                    .with_style("filled,striped")
                    .with_fill_color(format!("/spectral9/{index}"))
            }
            LogicalElementType::Facade => spec.with_shape("component").with_style("filled"),
            LogicalElementType::Service => spec.with_shape("hexagon").with_style("filled"),
            _ => spec
                .with_shape("box")
                .with_style("rounded,filled")
                .with_fill_color("white"),
        }
    }

    fn emit_element(
        &self,
        graph: &mut DotGraph,
        element: &LogicalElement,
        visited: &mut std::collections::HashSet<String>,
    ) {
        if !visited.insert(element.id.clone()) {
            return;
        }

        graph.add_node(&element.id, self.node_spec(element));

        if !element.subelements.is_empty() {
            graph.open_cluster(
                &element.id,
                ClusterSpec::new()
                    .with_label(&element.name)
                    .with_style("rounded,dashed"),
            );
            for child_id in &element.subelements {
                if let Some(child) = self.elements.get(child_id) {
                    self.emit_element(graph, child, visited);
                }
            }
            graph.close_cluster();
        }
    }
}

impl DiagramGenerator for LogicalDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            elements = self.elements.len(),
            relations = self.relations.len();
            "Building logical diagram"
        );
        let mut graph =
            DotGraph::new("logical_diagram", &self.style).with_graph_attr("compound", "true");

        let nested: std::collections::HashSet<&String> = self
            .elements
            .values()
            .flat_map(|e| e.subelements.iter())
            .collect();

        let mut visited = std::collections::HashSet::new();
        if self.show_layers {
            let mut layers: BTreeMap<u32, Vec<&LogicalElement>> = BTreeMap::new();
            let mut standalone = Vec::new();
            for (id, element) in &self.elements {
                if nested.contains(id) {
                    continue;
                }
                match element.layer {
                    Some(layer) => layers.entry(layer).or_default().push(element),
                    None => standalone.push(element),
                }
            }

            for (layer_number, members) in &layers {
                graph.open_cluster(
                    &format!("layer_{layer_number}"),
                    ClusterSpec::new()
                        .with_label(format!("Layer {layer_number}"))
                        .with_style("rounded,dashed"),
                );
                for element in members {
                    self.emit_element(&mut graph, element, &mut visited);
                }
                graph.close_cluster();
            }

            for element in standalone {
                self.emit_element(&mut graph, element, &mut visited);
            }
        } else {
            for (id, element) in &self.elements {
                if !nested.contains(id) {
                    self.emit_element(&mut graph, element, &mut visited);
                }
            }
        }

        for relation in &self.relations {
            let mut spec = match relation.kind {
                LogicalRelationKind::Dependency => {
                    EdgeSpec::new().with_style("dashed").with_arrowhead("vee")
                }
                LogicalRelationKind::Composition => {
                    EdgeSpec::new().with_style("solid").with_arrowhead("diamond")
                }
                LogicalRelationKind::Aggregation => {
                    EdgeSpec::new().with_style("solid").with_arrowhead("odiamond")
                }
            };

            let mut label_parts = Vec::new();
            if let Some(stereotype) = &relation.stereotype {
                label_parts.push(format!("<<{stereotype}>>"));
            }
            if let Some(multiplicity) = &relation.multiplicity {
                label_parts.push(multiplicity.clone());
            }
            if !label_parts.is_empty() {
                spec = spec.with_label(label_parts.join("\n"));
            }

            graph.add_edge(&relation.source, &relation.target, spec);
        }

        Ok(graph)
    }
}
