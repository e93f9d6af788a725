//! Deployment diagram generator.
//!
//! Visualizes the physical deployment architecture: nodes shaped by their
//! [`NodeType`], artifacts attached as component-shaped satellites, and
//! nested nodes rendered as dashed clusters.

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use maquette_core::{Package, UmlElement};

use crate::error::DiagramError;
use crate::graph::{
    html_table_with, ClusterSpec, DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, NodeSpec,
    TableCell,
};
use crate::style::DiagramStyle;

/// Kind of a deployment node, driving its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Device,
    ExecutionEnvironment,
    Node,
    Container,
    Cloud,
    Database,
    Network,
}

impl NodeType {
    /// The keyword shown in the node's stereotype compartment.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Device => "device",
            NodeType::ExecutionEnvironment => "executionEnvironment",
            NodeType::Node => "node",
            NodeType::Container => "container",
            NodeType::Cloud => "cloud",
            NodeType::Database => "database",
            NodeType::Network => "network",
        }
    }

    /// The graph shape for the node.
    pub fn shape(&self) -> &'static str {
        match self {
            NodeType::Device => "box3d",
            NodeType::ExecutionEnvironment => "component",
            NodeType::Node => "box3d",
            NodeType::Container => "box",
            NodeType::Cloud => "cloud",
            NodeType::Database => "cylinder",
            NodeType::Network => "diamond",
        }
    }
}

/// Kind of a deployable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactType {
    Executable,
    Library,
    File,
    Database,
    Script,
    Config,
    Service,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Executable => "executable",
            ArtifactType::Library => "library",
            ArtifactType::File => "file",
            ArtifactType::Database => "database",
            ArtifactType::Script => "script",
            ArtifactType::Config => "configuration",
            ArtifactType::Service => "service",
        }
    }
}

/// A deployable artifact hosted on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentArtifact {
    id: String,
    name: String,
    artifact_type: ArtifactType,
    version: Option<String>,
    properties: IndexMap<String, String>,
}

impl DeploymentArtifact {
    pub fn new(name: impl Into<String>, artifact_type: ArtifactType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            artifact_type,
            version: None,
            properties: IndexMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// A node in the deployment topology.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentNode {
    id: String,
    name: String,
    node_type: NodeType,
    stereotype: Option<String>,
    properties: IndexMap<String, String>,
    artifacts: Vec<DeploymentArtifact>,
    subnodes: Vec<String>,
    host: Option<String>,
    port: Option<u16>,
    protocol: Option<String>,
}

impl DeploymentNode {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            node_type,
            stereotype: None,
            properties: IndexMap::new(),
            artifacts: Vec::new(),
            subnodes: Vec::new(),
            host: None,
            port: None,
            protocol: None,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn add_artifact(&mut self, artifact: DeploymentArtifact) {
        self.artifacts.push(artifact);
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

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn artifacts(&self) -> &[DeploymentArtifact] {
        &self.artifacts
    }

    pub fn subnodes(&self) -> &[String] {
        &self.subnodes
    }
}

/// Kind of a relation between deployment nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentRelationKind {
    Communication,
    Deployment,
}

/// A relation between two registered deployment nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRelation {
    source: String,
    target: String,
    kind: DeploymentRelationKind,
    stereotype: Option<String>,
    protocol: Option<String>,
    bandwidth: Option<String>,
}

impl DeploymentRelation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: DeploymentRelationKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            stereotype: None,
            protocol: None,
            bandwidth: None,
        }
    }

    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: impl Into<String>) -> Self {
        self.bandwidth = Some(bandwidth.into());
        self
    }
}

/// Generates deployment diagrams.
pub struct DeploymentDiagramGenerator {
    style: DiagramStyle,
    nodes: IndexMap<String, DeploymentNode>,
    relations: Vec<DeploymentRelation>,
    show_properties: bool,
    show_stereotypes: bool,
    show_protocols: bool,
}

impl DeploymentDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            nodes: IndexMap::new(),
            relations: Vec::new(),
            show_properties: true,
            show_stereotypes: true,
            show_protocols: true,
        }
    }

    pub fn set_show_properties(&mut self, show: bool) {
        self.show_properties = show;
    }

    pub fn set_show_stereotypes(&mut self, show: bool) {
        self.show_stereotypes = show;
    }

    pub fn set_show_protocols(&mut self, show: bool) {
        self.show_protocols = show;
    }

    /// Registers a deployment node and returns its id.
    pub fn add_node(&mut self, node: DeploymentNode) -> String {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Registers a relation between two nodes.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownNode`] if either endpoint id is absent.
    pub fn add_relation(&mut self, relation: DeploymentRelation) -> Result<(), DiagramError> {
        if !self.nodes.contains_key(&relation.source) {
            return Err(DiagramError::UnknownNode(relation.source));
        }
        if !self.nodes.contains_key(&relation.target) {
            return Err(DiagramError::UnknownNode(relation.target));
        }
        self.relations.push(relation);
        Ok(())
    }

    /// Nests `child` inside `parent`; the child renders inside the parent's
    /// dashed cluster.
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
        parent_node.subnodes.push(child.to_string());
        Ok(())
    }

    /// Derives a deployment view from a model package: one node hosting an
    /// artifact per class, with the artifact kind inferred from the class
    /// shape (interface, persistence-flavored operations, plain service).
    pub fn from_package(&mut self, package: &Package) -> String {
        let mut node = DeploymentNode::new(package.name(), NodeType::Node);

        for class in package.classes() {
            let artifact_type = if class.is_interface() {
                ArtifactType::Library
            } else if class.operations().iter().any(|op| {
                let name = op.name().to_lowercase();
                name.starts_with("save") || name.starts_with("load") || name.starts_with("query")
            }) {
                ArtifactType::Database
            } else {
                ArtifactType::Service
            };

            let mut artifact = DeploymentArtifact::new(class.name(), artifact_type);
            artifact.set_property("operations", class.operations().len().to_string());
            artifact.set_property("attributes", class.attributes().len().to_string());
            node.add_artifact(artifact);
        }

        self.add_node(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DeploymentNode> {
        self.nodes.values()
    }

    fn format_artifact_label(&self, artifact: &DeploymentArtifact) -> String {
        let mut rows: Vec<Vec<TableCell>> = Vec::new();

        let mut header = format!("<<{}>>", artifact.artifact_type.as_str());
        if let Some(version) = &artifact.version {
            header.push_str(&format!(" v{version}"));
        }
        rows.push(vec![TableCell::plain(header)]);
        rows.push(vec![TableCell::plain(&artifact.name)]);

        if self.show_properties && !artifact.properties.is_empty() {
            rows.push(
                artifact
                    .properties
                    .iter()
                    .map(|(key, value)| TableCell::plain(format!("{key}: {value}")))
                    .collect(),
            );
        }

        html_table_with(&rows, &[("cellborder", "0"), ("border", "1")])
    }

    fn format_node_label(&self, node: &DeploymentNode) -> String {
        let mut rows: Vec<Vec<TableCell>> = Vec::new();

        let mut stereotypes = Vec::new();
        if self.show_stereotypes {
            if let Some(stereotype) = &node.stereotype {
                stereotypes.push(stereotype.clone());
            }
        }
        stereotypes.push(node.node_type.as_str().to_string());
        rows.push(vec![TableCell::plain(format!(
            "<<{}>>",
            stereotypes.join(", ")
        ))]);

        let mut name_row = vec![TableCell::plain(&node.name)];
        if self.show_protocols && (node.host.is_some() || node.port.is_some()) {
            let protocol = node
                .protocol
                .as_ref()
                .map(|p| format!("{p}://"))
                .unwrap_or_default();
            let host = node.host.as_deref().unwrap_or("localhost");
            let port = node.port.map(|p| format!(":{p}")).unwrap_or_default();
            name_row.push(TableCell::plain(format!("{protocol}{host}{port}")));
        }
        rows.push(name_row);

        if self.show_properties && !node.properties.is_empty() {
            rows.push(
                node.properties
                    .iter()
                    .map(|(key, value)| TableCell::plain(format!("{key}: {value}")))
                    .collect(),
            );
        }

        html_table_with(&rows, &[("cellborder", "0"), ("border", "1")])
    }

    fn emit_node(
        &self,
        graph: &mut DotGraph,
        node: &DeploymentNode,
        visited: &mut std::collections::HashSet<String>,
    ) {
        if !visited.insert(node.id.clone()) {
            return;
        }

        graph.add_node(
            &node.id,
            NodeSpec::new()
                .with_html(self.format_node_label(node))
                .with_shape(node.node_type.shape())
                .with_style("filled")
                .with_fill_color("white"),
        );

        for artifact in &node.artifacts {
            let artifact_id = format!("{}_{}", node.id, artifact.id);
            graph.add_node(
                &artifact_id,
                NodeSpec::new()
                    .with_html(self.format_artifact_label(artifact))
                    .with_shape("component")
                    .with_style("filled")
                    .with_fill_color("white"),
            );
            // Attachment must not distort the node ranking.
            graph.add_edge(
                &node.id,
                &artifact_id,
                EdgeSpec::new().with_style("dashed").with_constraint(false),
            );
        }

        if !node.subnodes.is_empty() {
            graph.open_cluster(
                &node.id,
                ClusterSpec::new().with_label("").with_style("rounded,dashed"),
            );
            for child_id in &node.subnodes {
                if let Some(child) = self.nodes.get(child_id) {
                    self.emit_node(graph, child, visited);
                }
            }
            graph.close_cluster();
        }
    }
}

impl DiagramGenerator for DeploymentDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            nodes = self.nodes.len(),
            relations = self.relations.len();
            "Building deployment diagram"
        );
        let mut graph = DotGraph::new("deployment_diagram", &self.style)
            .with_graph_attr("compound", "true");

        let nested: std::collections::HashSet<&String> = self
            .nodes
            .values()
            .flat_map(|n| n.subnodes.iter())
            .collect();

        let mut visited = std::collections::HashSet::new();
        for (id, node) in &self.nodes {
            if !nested.contains(id) {
                self.emit_node(&mut graph, node, &mut visited);
            }
        }

        for relation in &self.relations {
            let mut spec = match relation.kind {
                DeploymentRelationKind::Communication => EdgeSpec::new().with_style("bold"),
                DeploymentRelationKind::Deployment => EdgeSpec::new().with_style("dashed"),
            };

            let mut label_parts = Vec::new();
            if self.show_stereotypes {
                if let Some(stereotype) = &relation.stereotype {
                    label_parts.push(format!("<<{stereotype}>>"));
                }
            }
            if self.show_protocols {
                if let Some(protocol) = &relation.protocol {
                    label_parts.push(protocol.clone());
                }
            }
            if let Some(bandwidth) = &relation.bandwidth {
                label_parts.push(bandwidth.clone());
            }
            if !label_parts.is_empty() {
                spec = spec.with_label(label_parts.join("\n"));
            }

            graph.add_edge(&relation.source, &relation.target, spec);
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_core::{Class, Operation};

    #[test]
    fn test_node_shapes() {
        assert_eq!(NodeType::Device.shape(), "box3d");
        assert_eq!(NodeType::ExecutionEnvironment.shape(), "component");
        assert_eq!(NodeType::Node.shape(), "box3d");
        assert_eq!(NodeType::Container.shape(), "box");
        assert_eq!(NodeType::Cloud.shape(), "cloud");
        assert_eq!(NodeType::Database.shape(), "cylinder");
        assert_eq!(NodeType::Network.shape(), "diamond");
    }

    #[test]
    fn test_relation_requires_registered_nodes() {
        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        let id = diagram.add_node(DeploymentNode::new("web", NodeType::Device));

        let err = diagram
            .add_relation(DeploymentRelation::new(
                id,
                "missing",
                DeploymentRelationKind::Communication,
            ))
            .unwrap_err();
        assert!(matches!(err, DiagramError::UnknownNode(target) if target == "missing"));
    }

    #[test]
    fn test_artifact_attachment_is_non_constraining() {
        let mut node = DeploymentNode::new("app-server", NodeType::ExecutionEnvironment);
        node.add_artifact(
            DeploymentArtifact::new("billing.jar", ArtifactType::Executable).with_version("2.1"),
        );

        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        diagram.add_node(node);

        let graph = diagram.build().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let attachment = graph.edges().next().unwrap();
        assert_eq!(attachment.spec().style(), Some("dashed"));
        assert!(!attachment.spec().constraint());

        let artifact_node = graph.nodes().nth(1).unwrap();
        assert_eq!(artifact_node.spec().shape(), Some("component"));
        match artifact_node.spec().label() {
            Some(crate::graph::Label::Html(html)) => {
                assert!(html.contains("&lt;&lt;executable&gt;&gt; v2.1"));
                assert!(html.contains("billing.jar"));
            }
            other => panic!("expected html label, got {other:?}"),
        }
    }

    #[test]
    fn test_subnodes_render_in_dashed_cluster() {
        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        let parent = diagram.add_node(DeploymentNode::new("host", NodeType::Device));
        let child = diagram.add_node(DeploymentNode::new("jvm", NodeType::ExecutionEnvironment));
        diagram.nest(&parent, &child).unwrap();

        let graph = diagram.build().unwrap();
        assert_eq!(graph.cluster_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_relation_label_concatenation() {
        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_node(DeploymentNode::new("web", NodeType::Device));
        let b = diagram.add_node(DeploymentNode::new("db", NodeType::Database));
        diagram
            .add_relation(
                DeploymentRelation::new(a, b, DeploymentRelationKind::Communication)
                    .with_stereotype("tcp")
                    .with_protocol("postgres")
                    .with_bandwidth("1Gbps"),
            )
            .unwrap();

        let graph = diagram.build().unwrap();
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.spec().label(), Some("<<tcp>>\npostgres\n1Gbps"));
        assert_eq!(edge.spec().style(), Some("bold"));
    }

    #[test]
    fn test_host_port_in_name_compartment() {
        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        diagram.add_node(
            DeploymentNode::new("api", NodeType::Container)
                .with_protocol("https")
                .with_host("api.example.com")
                .with_port(8443),
        );

        let graph = diagram.build().unwrap();
        match graph.nodes().next().unwrap().spec().label() {
            Some(crate::graph::Label::Html(html)) => {
                assert!(html.contains("https://api.example.com:8443"));
            }
            other => panic!("expected html label, got {other:?}"),
        }
    }

    #[test]
    fn test_from_package_artifact_heuristics() {
        let mut store = Class::new("OrderStore");
        store.add_operation(Operation::new("save_order", None));
        let iface = Class::new("Notifier").with_interface(true);
        let plain = Class::new("Billing");

        let mut package = maquette_core::Package::new("backend");
        package.add_element(store);
        package.add_element(iface);
        package.add_element(plain);

        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        diagram.from_package(&package);

        let node = diagram.nodes().next().unwrap();
        let kinds: Vec<ArtifactType> =
            node.artifacts().iter().map(|a| a.artifact_type()).collect();
        assert_eq!(
            kinds,
            [
                ArtifactType::Database,
                ArtifactType::Library,
                ArtifactType::Service
            ]
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut diagram = DeploymentDiagramGenerator::new(DiagramStyle::default());
        let a = diagram.add_node(DeploymentNode::new("a", NodeType::Node));
        let b = diagram.add_node(DeploymentNode::new("b", NodeType::Cloud));
        diagram
            .add_relation(DeploymentRelation::new(a, b, DeploymentRelationKind::Deployment))
            .unwrap();

        assert_eq!(
            diagram.build().unwrap().source(),
            diagram.build().unwrap().source()
        );
    }
}
