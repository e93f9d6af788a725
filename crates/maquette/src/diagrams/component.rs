//! Component diagram generator.
//!
//! Components are registered by id in a flat arena; nesting is expressed by
//! child-id lists and rendered as dashed clusters. Interfaces follow the
//! standard ball-and-socket convention: a filled circle for provided
//! interfaces, a socket for required ones.

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use maquette_core::{Class, Package, UmlElement};

use crate::error::DiagramError;
use crate::graph::{
    html_table_with, ClusterSpec, DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, NodeSpec,
    TableCell,
};
use crate::style::DiagramStyle;

/// An interface exposed or consumed by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    id: String,
    name: String,
    operations: Vec<String>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// Appends an operation name.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operations.push(operation.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }
}

/// A component in the diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: String,
    name: String,
    stereotype: Option<String>,
    provided_interfaces: Vec<Interface>,
    required_interfaces: Vec<Interface>,
    subcomponents: Vec<String>,
    properties: IndexMap<String, String>,
    is_abstract: bool,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            stereotype: None,
            provided_interfaces: Vec::new(),
            required_interfaces: Vec::new(),
            subcomponents: Vec::new(),
            properties: IndexMap::new(),
            is_abstract: false,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn add_provided_interface(&mut self, interface: Interface) {
        self.provided_interfaces.push(interface);
    }

    pub fn add_required_interface(&mut self, interface: Interface) {
        self.required_interfaces.push(interface);
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

    pub fn stereotype(&self) -> Option<&str> {
        self.stereotype.as_deref()
    }

    pub fn subcomponents(&self) -> &[String] {
        &self.subcomponents
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Kind of a component-to-component relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRelationKind {
    Dependency,
    Realization,
    Assembly,
}

/// A relation between two registered components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRelation {
    source: String,
    target: String,
    kind: ComponentRelationKind,
    stereotype: Option<String>,
}

impl ComponentRelation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: ComponentRelationKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            stereotype: None,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }
}

/// Generates component diagrams.
pub struct ComponentDiagramGenerator {
    style: DiagramStyle,
    components: IndexMap<String, Component>,
    relations: Vec<ComponentRelation>,
    show_interfaces: bool,
}

impl ComponentDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            components: IndexMap::new(),
            relations: Vec::new(),
            show_interfaces: true,
        }
    }

    /// Toggles interface (lollipop/socket) rendering.
    pub fn set_show_interfaces(&mut self, show: bool) {
        self.show_interfaces = show;
    }

    /// Registers a component and returns its id.
    pub fn add_component(&mut self, component: Component) -> String {
        let id = component.id.clone();
        self.components.insert(id.clone(), component);
        id
    }

    /// Registers a relation between two components.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownComponent`] if either endpoint id is absent.
    pub fn add_relation(&mut self, relation: ComponentRelation) -> Result<(), DiagramError> {
        if !self.components.contains_key(&relation.source) {
            return Err(DiagramError::UnknownComponent(relation.source));
        }
        if !self.components.contains_key(&relation.target) {
            return Err(DiagramError::UnknownComponent(relation.target));
        }
        self.relations.push(relation);
        Ok(())
    }

    /// Nests `child` inside `parent`; the child renders inside the parent's
    /// dashed cluster.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownComponent`] if either id is absent.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), DiagramError> {
        if !self.components.contains_key(child) {
            return Err(DiagramError::UnknownComponent(child.to_string()));
        }
        let Some(parent_component) = self.components.get_mut(parent) else {
            return Err(DiagramError::UnknownComponent(parent.to_string()));
        };
        parent_component.subcomponents.push(child.to_string());
        Ok(())
    }

    /// Derives a component view from a model package: one component per
    /// class (interfaces contribute a provided interface listing their
    /// operations), each depending on the package's own component.
    pub fn from_package(&mut self, package: &Package) -> String {
        let main_id =
            self.add_component(Component::new(package.name()).with_stereotype("package"));

        for class in package.classes() {
            let component_id = self.add_component(self.class_component(class));
            // Both endpoints were just registered.
            let _ = self.add_relation(ComponentRelation::new(
                component_id,
                main_id.clone(),
                ComponentRelationKind::Dependency,
            ));
        }

        main_id
    }

    fn class_component(&self, class: &Class) -> Component {
        let mut component = Component::new(class.name())
            .with_stereotype("class")
            .with_abstract(class.is_abstract());
        if class.is_interface() {
            let mut interface = Interface::new(class.name());
            for operation in class.operations() {
                interface = interface.with_operation(operation.name());
            }
            component.add_provided_interface(interface);
        }
        component
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    fn format_label(&self, component: &Component) -> String {
        let mut rows: Vec<Vec<TableCell>> = Vec::new();
        if let Some(stereotype) = &component.stereotype {
            rows.push(vec![TableCell::plain(format!("<<{stereotype}>>"))]);
        }
        if component.is_abstract {
            rows.push(vec![TableCell::italic(&component.name)]);
        } else {
            rows.push(vec![TableCell::plain(&component.name)]);
        }
        if !component.properties.is_empty() {
            rows.push(
                component
                    .properties
                    .iter()
                    .map(|(key, value)| TableCell::plain(format!("{key}: {value}")))
                    .collect(),
            );
        }
        html_table_with(&rows, &[("cellborder", "0"), ("border", "1")])
    }

    fn emit_component(
        &self,
        graph: &mut DotGraph,
        component: &Component,
        visited: &mut std::collections::HashSet<String>,
    ) {
        // Each component renders at most once, so a defective nesting cycle
        // cannot recurse forever.
        if !visited.insert(component.id.clone()) {
            return;
        }
        graph.add_node(
            &component.id,
            NodeSpec::new()
                .with_html(self.format_label(component))
                .with_shape("component")
                .with_style("rounded,filled")
                .with_fill_color("white"),
        );

        if self.show_interfaces {
            for interface in &component.provided_interfaces {
                let interface_id = format!("{}_{}", component.id, interface.id);
                // Lollipop notation.
                graph.add_node(
                    &interface_id,
                    NodeSpec::new()
                        .with_label(crate::graph::Label::Empty)
                        .with_shape("circle")
                        .with_style("filled")
                        .with_fill_color("black")
                        .with_size(0.1, 0.1),
                );
                graph.add_edge(&component.id, &interface_id, EdgeSpec::new().with_style("solid"));
            }
            for interface in &component.required_interfaces {
                let interface_id = format!("{}_{}", component.id, interface.id);
                // Socket notation.
                graph.add_node(
                    &interface_id,
                    NodeSpec::new()
                        .with_label(crate::graph::Label::Empty)
                        .with_shape("halfcircle")
                        .with_size(0.2, 0.2),
                );
                graph.add_edge(&interface_id, &component.id, EdgeSpec::new().with_style("solid"));
            }
        }

        if !component.subcomponents.is_empty() {
            graph.open_cluster(
                &component.id,
                ClusterSpec::new()
                    .with_label(&component.name)
                    .with_style("rounded,dashed"),
            );
            for child_id in &component.subcomponents {
                if let Some(child) = self.components.get(child_id) {
                    self.emit_component(graph, child, visited);
                }
            }
            graph.close_cluster();
        }
    }
}

impl DiagramGenerator for ComponentDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            components = self.components.len(),
            relations = self.relations.len();
            "Building component diagram"
        );
        let mut graph = DotGraph::new("component_diagram", &self.style)
            .with_graph_attr("compound", "true");

        let nested: std::collections::HashSet<&String> = self
            .components
            .values()
            .flat_map(|c| c.subcomponents.iter())
            .collect();

        let mut visited = std::collections::HashSet::new();
        for (id, component) in &self.components {
            if !nested.contains(id) {
                self.emit_component(&mut graph, component, &mut visited);
            }
        }

        for relation in &self.relations {
            let mut spec = match relation.kind {
                ComponentRelationKind::Dependency => {
                    EdgeSpec::new().with_style("dashed").with_arrowhead("vee")
                }
                ComponentRelationKind::Realization => {
                    EdgeSpec::new().with_style("dashed").with_arrowhead("empty")
                }
                ComponentRelationKind::Assembly => {
                    EdgeSpec::new().with_style("solid").with_arrowhead("none")
                }
            };
            if let Some(stereotype) = &relation.stereotype {
                spec = spec.with_label(format!("<<{stereotype}>>"));
            }
            graph.add_edge(&relation.source, &relation.target, spec);
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_core::Operation;

    #[test]
    fn test_relation_requires_registered_endpoints() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_component(Component::new("app"));

        let err = diagram
            .add_relation(ComponentRelation::new(
                id.clone(),
                "missing",
                ComponentRelationKind::Dependency,
            ))
            .unwrap_err();
        assert!(matches!(err, DiagramError::UnknownComponent(target) if target == "missing"));

        let err = diagram
            .add_relation(ComponentRelation::new(
                "missing",
                id,
                ComponentRelationKind::Assembly,
            ))
            .unwrap_err();
        assert!(matches!(err, DiagramError::UnknownComponent(_)));
    }

    #[test]
    fn test_relation_styles() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_component(Component::new("a"));
        let b = diagram.add_component(Component::new("b"));
        diagram
            .add_relation(ComponentRelation::new(
                a.clone(),
                b.clone(),
                ComponentRelationKind::Dependency,
            ))
            .unwrap();
        diagram
            .add_relation(ComponentRelation::new(
                a.clone(),
                b.clone(),
                ComponentRelationKind::Realization,
            ))
            .unwrap();
        diagram
            .add_relation(
                ComponentRelation::new(a, b, ComponentRelationKind::Assembly)
                    .with_stereotype("wire"),
            )
            .unwrap();

        let graph = diagram.build().unwrap();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges[0].spec().style(), Some("dashed"));
        assert_eq!(edges[0].spec().arrowhead(), Some("vee"));
        assert_eq!(edges[1].spec().arrowhead(), Some("empty"));
        assert_eq!(edges[2].spec().style(), Some("solid"));
        assert_eq!(edges[2].spec().arrowhead(), Some("none"));
        assert_eq!(edges[2].spec().label(), Some("<<wire>>"));
    }

    #[test]
    fn test_interfaces_render_ball_and_socket() {
        let mut component = Component::new("billing");
        component.add_provided_interface(Interface::new("Invoicing"));
        component.add_required_interface(Interface::new("Ledger"));

        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_component(component);

        let graph = diagram.build().unwrap();
        // Component node plus one node per interface.
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let edges: Vec<_> = graph.edges().collect();
        // Provided: component -> lollipop; required: socket -> component.
        assert_eq!(edges[0].source(), id);
        assert_eq!(edges[1].target(), id);

        let lollipop = graph.nodes().nth(1).unwrap();
        assert_eq!(lollipop.spec().shape(), Some("circle"));
        assert_eq!(lollipop.spec().fill_color(), Some("black"));
        let socket = graph.nodes().nth(2).unwrap();
        assert_eq!(socket.spec().shape(), Some("halfcircle"));
    }

    #[test]
    fn test_subcomponents_render_in_dashed_cluster() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let parent = diagram.add_component(Component::new("platform"));
        let child = diagram.add_component(Component::new("auth"));
        diagram.nest(&parent, &child).unwrap();

        let graph = diagram.build().unwrap();
        assert_eq!(graph.cluster_count(), 1);
        assert_eq!(graph.cluster_labels().next(), Some(Some("platform")));
        // The child is emitted exactly once, inside the cluster.
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_nest_unknown_ids() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_component(Component::new("app"));
        assert!(diagram.nest(&id, "nope").is_err());
        assert!(diagram.nest("nope", &id).is_err());
    }

    #[test]
    fn test_abstract_name_is_italic() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        diagram.add_component(
            Component::new("Codec")
                .with_stereotype("spi")
                .with_abstract(true),
        );

        let graph = diagram.build().unwrap();
        let node = graph.nodes().next().unwrap();
        match node.spec().label() {
            Some(crate::graph::Label::Html(html)) => {
                assert!(html.contains("<i>Codec</i>"));
                assert!(html.contains("&lt;&lt;spi&gt;&gt;"));
            }
            other => panic!("expected html label, got {other:?}"),
        }
    }

    #[test]
    fn test_from_package_builds_components_and_dependencies() {
        let mut order = Class::new("Order");
        order.add_operation(Operation::new("checkout", None));
        let mut repo = Class::new("OrderRepository").with_interface(true);
        repo.add_operation(Operation::new("save", None).with_abstract(true));

        let mut package = Package::new("core");
        package.add_element(order);
        package.add_element(repo);

        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        diagram.from_package(&package);

        // Package component + two class components.
        assert_eq!(diagram.components().count(), 3);
        let interface_component = diagram
            .components()
            .find(|c| c.name() == "OrderRepository")
            .unwrap();
        assert_eq!(interface_component.provided_interfaces.len(), 1);
        assert_eq!(
            interface_component.provided_interfaces[0].operations(),
            ["save"]
        );

        let graph = diagram.build().unwrap();
        // Two dependency edges plus one lollipop edge.
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut diagram = ComponentDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_component(Component::new("a"));
        let b = diagram.add_component(Component::new("b"));
        diagram
            .add_relation(ComponentRelation::new(a, b, ComponentRelationKind::Dependency))
            .unwrap();

        assert_eq!(
            diagram.build().unwrap().source(),
            diagram.build().unwrap().source()
        );
    }
}
