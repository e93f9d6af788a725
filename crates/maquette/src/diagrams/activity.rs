//! Activity diagram generator.
//!
//! Nodes are shaped by their [`ActivityNodeType`]; swimlane partitions group
//! nodes into parallel dashed clusters, and structured nodes nest their
//! subactivities the same way.

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use crate::error::DiagramError;
use crate::graph::{
    html_table_with, ClusterSpec, DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, Label,
    NodeSpec, TableCell,
};
use crate::style::DiagramStyle;

/// Kind of an activity node, driving its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityNodeType {
    Initial,
    Final,
    Action,
    Decision,
    Merge,
    Fork,
    Join,
    Object,
    Partition,
    Signal,
    Time,
}

impl ActivityNodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityNodeType::Initial => "initial",
            ActivityNodeType::Final => "final",
            ActivityNodeType::Action => "action",
            ActivityNodeType::Decision => "decision",
            ActivityNodeType::Merge => "merge",
            ActivityNodeType::Fork => "fork",
            ActivityNodeType::Join => "join",
            ActivityNodeType::Object => "object",
            ActivityNodeType::Partition => "partition",
            ActivityNodeType::Signal => "signal",
            ActivityNodeType::Time => "time",
        }
    }

    /// The graph shape for the node kind.
    pub fn shape(&self) -> &'static str {
        match self {
            ActivityNodeType::Initial => "circle",
            ActivityNodeType::Final => "doublecircle",
            ActivityNodeType::Decision | ActivityNodeType::Merge => "diamond",
            ActivityNodeType::Fork | ActivityNodeType::Join => "rect",
            ActivityNodeType::Signal => "polygon",
            _ => "box",
        }
    }
}

/// A node in the activity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityNode {
    id: String,
    name: String,
    node_type: ActivityNodeType,
    description: Option<String>,
    is_structured: bool,
    subactivities: Vec<String>,
    metadata: IndexMap<String, String>,
}

impl ActivityNode {
    pub fn new(name: impl Into<String>, node_type: ActivityNodeType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            node_type,
            description: None,
            is_structured: false,
            subactivities: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the node structured; with nested subactivities it renders as a
    /// dashed cluster.
    pub fn with_structured(mut self, is_structured: bool) -> Self {
        self.is_structured = is_structured;
        self
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> ActivityNodeType {
        self.node_type
    }

    pub fn subactivities(&self) -> &[String] {
        &self.subactivities
    }
}

/// An edge in the activity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEdge {
    source: String,
    target: String,
    guard: Option<String>,
    weight: Option<String>,
    is_control_flow: bool,
    is_interrupt: bool,
}

impl ActivityEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            guard: None,
            weight: None,
            is_control_flow: true,
            is_interrupt: false,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    /// Object flows (`is_control_flow = false`) render dashed.
    pub fn with_control_flow(mut self, is_control_flow: bool) -> Self {
        self.is_control_flow = is_control_flow;
        self
    }

    /// Interrupting edges render dotted and colored to stand out.
    pub fn with_interrupt(mut self, is_interrupt: bool) -> Self {
        self.is_interrupt = is_interrupt;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A swimlane grouping of activity nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPartition {
    name: String,
    nodes: Vec<String>,
}

impl ActivityPartition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}

/// Generates activity diagrams.
pub struct ActivityDiagramGenerator {
    style: DiagramStyle,
    nodes: IndexMap<String, ActivityNode>,
    edges: Vec<ActivityEdge>,
    partitions: Vec<ActivityPartition>,
    current_partition: Option<String>,
}

impl ActivityDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            partitions: Vec::new(),
            current_partition: None,
        }
    }

    /// Opens a new partition (swimlane); nodes added afterwards belong to it
    /// until another partition is created.
    pub fn create_partition(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.partitions.push(ActivityPartition {
            name: name.clone(),
            nodes: Vec::new(),
        });
        self.current_partition = Some(name);
    }

    /// Registers a node and returns its id.
    pub fn add_node(&mut self, node: ActivityNode) -> String {
        let id = node.id.clone();
        if let Some(current) = &self.current_partition {
            if let Some(partition) = self.partitions.iter_mut().find(|p| p.name == *current) {
                partition.nodes.push(id.clone());
            }
        }
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Registers an edge.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownNode`] if either endpoint id is absent.
    pub fn add_edge(&mut self, edge: ActivityEdge) -> Result<(), DiagramError> {
        if !self.nodes.contains_key(&edge.source) {
            return Err(DiagramError::UnknownNode(edge.source));
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(DiagramError::UnknownNode(edge.target));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Nests `child` as a subactivity of `parent`.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownNode`] if either id is absent.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), DiagramError> {
        if !self.nodes.contains_key(child) {
            return Err(DiagramError::UnknownNode(child.to_string()));
        }
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return Err(DiagramError::UnknownNode(parent.to_string()));
        };
        parent_node.subactivities.push(child.to_string());
        Ok(())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ActivityNode> {
        self.nodes.values()
    }

    pub fn partitions(&self) -> &[ActivityPartition] {
        &self.partitions
    }

    fn format_label(&self, node: &ActivityNode) -> Label {
        if matches!(
            node.node_type,
            ActivityNodeType::Initial | ActivityNodeType::Final
        ) {
            return Label::Empty;
        }

        let mut rows = vec![vec![TableCell::plain(&node.name)]];
        if let Some(description) = &node.description {
            rows.push(vec![TableCell::plain(description)]);
        }
        if !node.metadata.is_empty() {
            rows.push(
                node.metadata
                    .iter()
                    .map(|(key, value)| TableCell::plain(format!("{key}: {value}")))
                    .collect(),
            );
        }

        Label::Html(html_table_with(
            &rows,
            &[("cellborder", "0"), ("border", "1")],
        ))
    }

    fn node_spec(&self, node: &ActivityNode) -> NodeSpec {
        let mut spec = NodeSpec::new()
            .with_label(self.format_label(node))
            .with_shape(node.node_type.shape())
            .with_fill_color("white");

        spec = if node.node_type == ActivityNodeType::Action {
            spec.with_style("rounded,filled")
        } else {
            spec.with_style("filled")
        };

        match node.node_type {
            ActivityNodeType::Initial => {
                spec = spec.with_fill_color("black").with_size(0.3, 0.3);
            }
            ActivityNodeType::Final => {
                spec = spec.with_size(0.3, 0.3);
            }
            ActivityNodeType::Fork | ActivityNodeType::Join => {
                spec = spec.with_size(0.1, 2.0);
            }
            ActivityNodeType::Signal => {
                spec = spec.with_sides(5).with_peripheries(2);
            }
            _ => {}
        }

        spec
    }

    fn emit_node(
        &self,
        graph: &mut DotGraph,
        node: &ActivityNode,
        visited: &mut std::collections::HashSet<String>,
    ) {
        if !visited.insert(node.id.clone()) {
            return;
        }

        graph.add_node(&node.id, self.node_spec(node));

        if node.is_structured && !node.subactivities.is_empty() {
            graph.open_cluster(
                &node.id,
                ClusterSpec::new()
                    .with_label(&node.name)
                    .with_style("rounded,dashed"),
            );
            for child_id in &node.subactivities {
                if let Some(child) = self.nodes.get(child_id) {
                    self.emit_node(graph, child, visited);
                }
            }
            graph.close_cluster();
        }
    }
}

impl DiagramGenerator for ActivityDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            partitions = self.partitions.len();
            "Building activity diagram"
        );
        let mut graph = DotGraph::new("activity_diagram", &self.style)
            .with_graph_attr("compound", "true");

        let nested: std::collections::HashSet<&String> = self
            .nodes
            .values()
            .flat_map(|n| n.subactivities.iter())
            .collect();

        let mut visited = std::collections::HashSet::new();
        if self.partitions.is_empty() {
            for (id, node) in &self.nodes {
                if !nested.contains(id) {
                    self.emit_node(&mut graph, node, &mut visited);
                }
            }
        } else {
            for partition in &self.partitions {
                graph.open_cluster(
                    &partition.name,
                    ClusterSpec::new()
                        .with_label(&partition.name)
                        .with_style("rounded,dashed"),
                );
                for node_id in &partition.nodes {
                    if let Some(node) = self.nodes.get(node_id) {
                        self.emit_node(&mut graph, node, &mut visited);
                    }
                }
                graph.close_cluster();
            }
            // Nodes registered outside any partition still render.
            for (id, node) in &self.nodes {
                if !nested.contains(id) {
                    self.emit_node(&mut graph, node, &mut visited);
                }
            }
        }

        for edge in &self.edges {
            let mut spec = EdgeSpec::new();

            if !edge.is_control_flow {
                spec = spec.with_style("dashed");
            }
            if edge.is_interrupt {
                spec = spec.with_style("dotted").with_color("red");
            }

            let mut parts = Vec::new();
            if let Some(guard) = &edge.guard {
                parts.push(format!("[{guard}]"));
            }
            if let Some(weight) = &edge.weight {
                parts.push(format!("{{{weight}}}"));
            }
            if !parts.is_empty() {
                spec = spec.with_label(parts.join("\n"));
            }

            graph.add_edge(&edge.source, &edge.target, spec);
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_per_node_type() {
        assert_eq!(ActivityNodeType::Initial.shape(), "circle");
        assert_eq!(ActivityNodeType::Final.shape(), "doublecircle");
        assert_eq!(ActivityNodeType::Action.shape(), "box");
        assert_eq!(ActivityNodeType::Decision.shape(), "diamond");
        assert_eq!(ActivityNodeType::Merge.shape(), "diamond");
        assert_eq!(ActivityNodeType::Fork.shape(), "rect");
        assert_eq!(ActivityNodeType::Join.shape(), "rect");
        assert_eq!(ActivityNodeType::Signal.shape(), "polygon");
        assert_eq!(ActivityNodeType::Time.shape(), "box");
    }

    #[test]
    fn test_unknown_edge_endpoint_rejected() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_node(ActivityNode::new("act", ActivityNodeType::Action));

        let err = diagram
            .add_edge(ActivityEdge::new(id, "missing"))
            .unwrap_err();
        assert!(matches!(err, DiagramError::UnknownNode(target) if target == "missing"));
    }

    #[test]
    fn test_edge_styles() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_node(ActivityNode::new("a", ActivityNodeType::Action));
        let b = diagram.add_node(ActivityNode::new("b", ActivityNodeType::Action));
        diagram
            .add_edge(ActivityEdge::new(a.clone(), b.clone()).with_guard("ok").with_weight("2"))
            .unwrap();
        diagram
            .add_edge(ActivityEdge::new(a.clone(), b.clone()).with_control_flow(false))
            .unwrap();
        diagram
            .add_edge(ActivityEdge::new(a, b).with_interrupt(true))
            .unwrap();

        let graph = diagram.build().unwrap();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges[0].spec().label(), Some("[ok]\n{2}"));
        assert_eq!(edges[1].spec().style(), Some("dashed"));
        assert_eq!(edges[2].spec().style(), Some("dotted"));
        assert_eq!(edges[2].spec().color(), Some("red"));
    }

    #[test]
    fn test_fork_renders_as_thin_bar() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_node(ActivityNode::new("split", ActivityNodeType::Fork));

        let graph = diagram.build().unwrap();
        let source = graph.source();
        assert!(graph.find_node(&id).is_some());
        assert!(source.contains("width=\"0.1\""));
        assert!(source.contains("height=\"2.0\""));
    }

    #[test]
    fn test_signal_polygon_attrs() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        diagram.add_node(ActivityNode::new("alarm", ActivityNodeType::Signal));

        let source = diagram.build().unwrap().source();
        assert!(source.contains("shape=\"polygon\""));
        assert!(source.contains("sides=\"5\""));
        assert!(source.contains("peripheries=\"2\""));
    }

    #[test]
    fn test_partitions_group_into_clusters() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        diagram.create_partition("customer");
        let a = diagram.add_node(ActivityNode::new("order", ActivityNodeType::Action));
        diagram.create_partition("warehouse");
        let b = diagram.add_node(ActivityNode::new("pick", ActivityNodeType::Action));
        diagram.add_edge(ActivityEdge::new(a, b)).unwrap();

        let graph = diagram.build().unwrap();
        assert_eq!(graph.cluster_count(), 2);
        let labels: Vec<_> = graph.cluster_labels().collect();
        assert_eq!(labels, [Some("customer"), Some("warehouse")]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_structured_node_nests_subactivities() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let parent = diagram.add_node(
            ActivityNode::new("process", ActivityNodeType::Action).with_structured(true),
        );
        let child = diagram.add_node(ActivityNode::new("step", ActivityNodeType::Action));
        diagram.nest(&parent, &child).unwrap();

        let graph = diagram.build().unwrap();
        assert_eq!(graph.cluster_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_metadata_row_in_label() {
        let mut node = ActivityNode::new("charge", ActivityNodeType::Action)
            .with_description("charge the card");
        node.set_metadata("retries", "3");

        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_node(node);

        let graph = diagram.build().unwrap();
        match graph.find_node(&id).unwrap().spec().label() {
            Some(Label::Html(html)) => {
                assert!(html.contains("charge the card"));
                assert!(html.contains("retries: 3"));
            }
            other => panic!("expected html label, got {other:?}"),
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut diagram = ActivityDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_node(ActivityNode::new("start", ActivityNodeType::Initial));
        let b = diagram.add_node(ActivityNode::new("end", ActivityNodeType::Final));
        diagram.add_edge(ActivityEdge::new(a, b)).unwrap();

        assert_eq!(
            diagram.build().unwrap().source(),
            diagram.build().unwrap().source()
        );
    }
}
