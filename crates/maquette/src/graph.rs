//! Diagram-agnostic graph construction.
//!
//! Generators describe their output through the narrow [`GraphBuilder`]
//! capability — node, edge, and cluster creation with a fixed attribute
//! vocabulary — and never touch a rendering library directly. [`DotGraph`]
//! is the provided implementation: it records statements in insertion order
//! and renders them to deterministic Graphviz DOT source for an external
//! rendering backend. The same inputs always produce byte-identical output,
//! which is what makes repeated generation idempotent.

use std::{fs, path::Path};

use indexmap::IndexMap;

use crate::error::DiagramError;
use crate::style::DiagramStyle;

/// A node or cluster label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Label {
    /// Plain text, escaped into a quoted DOT string.
    Text(String),
    /// HTML-like label (typically a table built by [`html_table`]),
    /// emitted between angle brackets without further escaping.
    Html(String),
    /// Explicitly empty label (initial/final pseudo-states).
    #[default]
    Empty,
}

/// One cell of an HTML label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    text: String,
    italic: bool,
}

impl TableCell {
    /// A plain text cell.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: false,
        }
    }

    /// An italicized cell (abstract element names).
    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: true,
        }
    }
}

/// Escapes HTML special characters for use inside label tables.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Formats a stereotype as escaped guillemet-style markup
/// (`&lt;&lt;name&gt;&gt;`).
pub fn format_stereotype(stereotype: &str) -> String {
    format!("&lt;&lt;{}&gt;&gt;", escape_html(stereotype))
}

/// Renders rows of cells as a bordered HTML label table.
///
/// This is the one piece of presentation logic shared by every generator:
/// multi-compartment labels (class name/attributes/operations, component
/// stereotype/name/properties, ...) all go through here. Cell text is
/// HTML-escaped; output is deterministic for identical input.
pub fn html_table(rows: &[Vec<TableCell>]) -> String {
    html_table_with(rows, &[])
}

/// Like [`html_table`], with table attribute overrides.
///
/// Defaults are `border="0" cellborder="1" cellspacing="0" cellpadding="4"`;
/// overrides replace matching keys and append the rest in the given order.
pub fn html_table_with(rows: &[Vec<TableCell>], attrs: &[(&str, &str)]) -> String {
    let mut table_attrs: IndexMap<&str, &str> = IndexMap::new();
    table_attrs.insert("border", "0");
    table_attrs.insert("cellborder", "1");
    table_attrs.insert("cellspacing", "0");
    table_attrs.insert("cellpadding", "4");
    for (key, value) in attrs {
        table_attrs.insert(key, value);
    }

    let attrs_str = table_attrs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(" ");

    let mut table = format!("<table {attrs_str}>");
    for row in rows {
        table.push_str("<tr>");
        for cell in row {
            let escaped = escape_html(&cell.text);
            if cell.italic {
                table.push_str(&format!("<td><i>{escaped}</i></td>"));
            } else {
                table.push_str(&format!("<td>{escaped}</td>"));
            }
        }
        table.push_str("</tr>");
    }
    table.push_str("</table>");
    table
}

/// Attributes for a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSpec {
    label: Option<Label>,
    shape: Option<String>,
    style: Option<String>,
    fill_color: Option<String>,
    color: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    peripheries: Option<u32>,
    sides: Option<u32>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_label(Label::Text(text.into()))
    }

    pub fn with_html(self, html: impl Into<String>) -> Self {
        self.with_label(Label::Html(html.into()))
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_fill_color(mut self, color: impl Into<String>) -> Self {
        self.fill_color = Some(color.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_peripheries(mut self, peripheries: u32) -> Self {
        self.peripheries = Some(peripheries);
        self
    }

    pub fn with_sides(mut self, sides: u32) -> Self {
        self.sides = Some(sides);
        self
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn fill_color(&self) -> Option<&str> {
        self.fill_color.as_deref()
    }

    fn attrs(&self) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        if let Some(label) = &self.label {
            attrs.push(("label".to_string(), render_label(label)));
        }
        if let Some(shape) = &self.shape {
            attrs.push(("shape".to_string(), quote(shape)));
        }
        if let Some(style) = &self.style {
            attrs.push(("style".to_string(), quote(style)));
        }
        if let Some(fill) = &self.fill_color {
            attrs.push(("fillcolor".to_string(), quote(fill)));
        }
        if let Some(color) = &self.color {
            attrs.push(("color".to_string(), quote(color)));
        }
        if let Some(width) = self.width {
            attrs.push(("width".to_string(), quote(&format_number(width))));
        }
        if let Some(height) = self.height {
            attrs.push(("height".to_string(), quote(&format_number(height))));
        }
        if let Some(peripheries) = self.peripheries {
            attrs.push(("peripheries".to_string(), quote(&peripheries.to_string())));
        }
        if let Some(sides) = self.sides {
            attrs.push(("sides".to_string(), quote(&sides.to_string())));
        }
        attrs
    }
}

/// Attributes for an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    label: Option<String>,
    style: Option<String>,
    color: Option<String>,
    arrowhead: Option<String>,
    arrow_size: Option<f64>,
    constraint: bool,
}

impl Default for EdgeSpec {
    fn default() -> Self {
        Self {
            label: None,
            style: None,
            color: None,
            arrowhead: None,
            arrow_size: None,
            constraint: true,
        }
    }
}

impl EdgeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_arrowhead(mut self, arrowhead: impl Into<String>) -> Self {
        self.arrowhead = Some(arrowhead.into());
        self
    }

    pub fn with_arrow_size(mut self, size: f64) -> Self {
        self.arrow_size = Some(size);
        self
    }

    /// `constraint=false` edges do not influence node ranking (used for
    /// artifact attachment in deployment diagrams).
    pub fn with_constraint(mut self, constraint: bool) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn arrowhead(&self) -> Option<&str> {
        self.arrowhead.as_deref()
    }

    pub fn constraint(&self) -> bool {
        self.constraint
    }

    fn attrs(&self) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        if let Some(label) = &self.label {
            attrs.push(("label".to_string(), quote(label)));
        }
        if let Some(style) = &self.style {
            attrs.push(("style".to_string(), quote(style)));
        }
        if let Some(color) = &self.color {
            attrs.push(("color".to_string(), quote(color)));
        }
        if let Some(arrowhead) = &self.arrowhead {
            attrs.push(("arrowhead".to_string(), quote(arrowhead)));
        }
        if let Some(size) = self.arrow_size {
            attrs.push(("arrowsize".to_string(), quote(&format_number(size))));
        }
        if !self.constraint {
            attrs.push(("constraint".to_string(), quote("false")));
        }
        attrs
    }
}

/// Attributes for a cluster (nested subgraph).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterSpec {
    label: Option<String>,
    style: Option<String>,
    color: Option<String>,
}

impl ClusterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }
}

/// Narrow graph-construction capability.
///
/// Generators only encode UML layout/labeling policy against this trait; a
/// rendering backend supplies the implementation. Clusters nest: every
/// `open_cluster` must be paired with a `close_cluster`.
pub trait GraphBuilder {
    fn add_node(&mut self, id: &str, spec: NodeSpec);
    fn add_edge(&mut self, source: &str, target: &str, spec: EdgeSpec);
    fn open_cluster(&mut self, name: &str, spec: ClusterSpec);
    fn close_cluster(&mut self);
}

/// A recorded node statement.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStmt {
    id: String,
    spec: NodeSpec,
}

impl NodeStmt {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }
}

/// A recorded edge statement.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStmt {
    source: String,
    target: String,
    spec: EdgeSpec,
}

impl EdgeStmt {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn spec(&self) -> &EdgeSpec {
        &self.spec
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Node(NodeStmt),
    Edge(EdgeStmt),
    OpenCluster { name: String, spec: ClusterSpec },
    CloseCluster,
}

/// In-memory graph description rendered to Graphviz DOT source.
///
/// Statements are kept in insertion order; [`DotGraph::source`] walks them
/// once, so identical construction sequences yield identical output.
#[derive(Debug, Clone, PartialEq)]
pub struct DotGraph {
    name: String,
    graph_attrs: Vec<(String, String)>,
    node_defaults: Vec<(String, String)>,
    edge_defaults: Vec<(String, String)>,
    statements: Vec<Statement>,
    open_clusters: usize,
}

impl DotGraph {
    /// Creates an empty directed graph with the style's graph, node, and
    /// edge defaults applied.
    pub fn new(name: impl Into<String>, style: &DiagramStyle) -> Self {
        let font_size = style.font_size.to_string();
        Self {
            name: name.into(),
            graph_attrs: vec![
                ("fontname".to_string(), style.font_name.clone()),
                ("fontsize".to_string(), font_size.clone()),
                ("bgcolor".to_string(), style.background_color.clone()),
                ("rankdir".to_string(), "TB".to_string()),
                ("splines".to_string(), "ortho".to_string()),
                ("nodesep".to_string(), "0.8".to_string()),
                ("ranksep".to_string(), "1.0".to_string()),
                ("concentrate".to_string(), "true".to_string()),
            ],
            node_defaults: vec![
                ("fontname".to_string(), style.font_name.clone()),
                ("fontsize".to_string(), font_size.clone()),
                ("shape".to_string(), style.node_shape.clone()),
                ("style".to_string(), style.node_style.clone()),
                ("margin".to_string(), "0.3,0.1".to_string()),
            ],
            edge_defaults: vec![
                ("fontname".to_string(), style.font_name.clone()),
                ("fontsize".to_string(), font_size),
                ("style".to_string(), style.edge_style.clone()),
                ("color".to_string(), style.relationship_color.clone()),
            ],
            statements: Vec::new(),
            open_clusters: 0,
        }
    }

    /// Overrides or appends a graph-level attribute (`rankdir`, `compound`,
    /// `ranksep`, ...).
    pub fn with_graph_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.graph_attrs.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.graph_attrs.push((key, value));
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total node statements, clusters excluded.
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Total edge statements.
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Total clusters opened.
    pub fn cluster_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::OpenCluster { .. }))
            .count()
    }

    /// Iterates node statements in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeStmt> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Node(node) => Some(node),
            _ => None,
        })
    }

    /// Iterates edge statements in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeStmt> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Edge(edge) => Some(edge),
            _ => None,
        })
    }

    /// Finds a node statement by id.
    pub fn find_node(&self, id: &str) -> Option<&NodeStmt> {
        self.nodes().find(|n| n.id == id)
    }

    /// Iterates cluster labels in insertion order.
    pub fn cluster_labels(&self) -> impl Iterator<Item = Option<&str>> {
        self.statements.iter().filter_map(|s| match s {
            Statement::OpenCluster { spec, .. } => Some(spec.label()),
            _ => None,
        })
    }

    /// Renders the graph to DOT source.
    ///
    /// Output is deterministic: statements appear in insertion order and
    /// attributes in a fixed order per statement.
    pub fn source(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("digraph {} {{\n", quote(&self.name)));
        out.push_str(&format!(
            "    graph [{}];\n",
            render_defaults(&self.graph_attrs)
        ));
        out.push_str(&format!(
            "    node [{}];\n",
            render_defaults(&self.node_defaults)
        ));
        out.push_str(&format!(
            "    edge [{}];\n",
            render_defaults(&self.edge_defaults)
        ));

        let mut depth = 1usize;
        for statement in &self.statements {
            match statement {
                Statement::Node(node) => {
                    let attrs = node.spec.attrs();
                    let rendered = attrs
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    out.push_str(&format!(
                        "{}{} [{rendered}];\n",
                        indent(depth),
                        quote(&node.id)
                    ));
                }
                Statement::Edge(edge) => {
                    let attrs = edge.spec.attrs();
                    let rendered = attrs
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let arrow = format!("{} -> {}", quote(&edge.source), quote(&edge.target));
                    if rendered.is_empty() {
                        out.push_str(&format!("{}{arrow};\n", indent(depth)));
                    } else {
                        out.push_str(&format!("{}{arrow} [{rendered}];\n", indent(depth)));
                    }
                }
                Statement::OpenCluster { name, spec } => {
                    out.push_str(&format!(
                        "{}subgraph {} {{\n",
                        indent(depth),
                        quote(&format!("cluster_{name}"))
                    ));
                    depth += 1;
                    if let Some(label) = spec.label() {
                        out.push_str(&format!("{}label={};\n", indent(depth), quote(label)));
                    }
                    if let Some(cluster_style) = spec.style() {
                        out.push_str(&format!(
                            "{}style={};\n",
                            indent(depth),
                            quote(cluster_style)
                        ));
                    }
                    if let Some(color) = &spec.color {
                        out.push_str(&format!("{}color={};\n", indent(depth), quote(color)));
                    }
                }
                Statement::CloseCluster => {
                    depth = depth.saturating_sub(1).max(1);
                    out.push_str(&format!("{}}}\n", indent(depth)));
                }
            }
        }

        out.push_str("}\n");
        out
    }
}

impl GraphBuilder for DotGraph {
    fn add_node(&mut self, id: &str, spec: NodeSpec) {
        self.statements.push(Statement::Node(NodeStmt {
            id: id.to_string(),
            spec,
        }));
    }

    fn add_edge(&mut self, source: &str, target: &str, spec: EdgeSpec) {
        self.statements.push(Statement::Edge(EdgeStmt {
            source: source.to_string(),
            target: target.to_string(),
            spec,
        }));
    }

    fn open_cluster(&mut self, name: &str, spec: ClusterSpec) {
        self.open_clusters += 1;
        self.statements.push(Statement::OpenCluster {
            name: name.to_string(),
            spec,
        });
    }

    fn close_cluster(&mut self) {
        if self.open_clusters > 0 {
            self.open_clusters -= 1;
            self.statements.push(Statement::CloseCluster);
        }
    }
}

/// A diagram generator producing an abstract graph description.
pub trait DiagramGenerator {
    /// Projects the generator's registry onto a graph description.
    ///
    /// Pure: calling it twice on an unmodified generator yields structurally
    /// identical graphs.
    fn build(&self) -> Result<DotGraph, DiagramError>;

    /// Generates the diagram.
    ///
    /// With `output_path`, writes the DOT artifact there (creating parent
    /// directories) and returns `None`; otherwise returns the DOT bytes for
    /// the caller's rendering backend.
    fn generate(&self, output_path: Option<&Path>) -> Result<Option<Vec<u8>>, DiagramError> {
        let graph = self.build()?;
        match output_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent).map_err(|source| DiagramError::Io {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                    }
                }
                fs::write(path, graph.source()).map_err(|source| DiagramError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(None)
            }
            None => Ok(Some(graph.source().into_bytes())),
        }
    }

    /// Writes the DOT artifact to `path`. Equivalent to
    /// `generate(Some(path))`.
    fn save(&self, path: &Path) -> Result<(), DiagramError> {
        self.generate(Some(path)).map(|_| ())
    }
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn render_defaults(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!("{k}={}", quote(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_label(label: &Label) -> String {
    match label {
        Label::Text(text) => quote(text),
        Label::Html(html) => format!("<{html}>"),
        Label::Empty => quote(""),
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    // Literal newlines become DOT line breaks.
    let escaped = escaped.replace('\n', "\\n");
    format!("\"{escaped}\"")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> DiagramStyle {
        DiagramStyle::default()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("List<Order>"), "List&lt;Order&gt;");
    }

    #[test]
    fn test_format_stereotype() {
        assert_eq!(format_stereotype("service"), "&lt;&lt;service&gt;&gt;");
    }

    #[test]
    fn test_html_table_default_attrs() {
        let table = html_table(&[vec![TableCell::plain("Order")]]);
        assert!(table.starts_with(
            "<table border=\"0\" cellborder=\"1\" cellspacing=\"0\" cellpadding=\"4\">"
        ));
        assert!(table.contains("<td>Order</td>"));
        assert!(table.ends_with("</table>"));
    }

    #[test]
    fn test_html_table_escapes_cells() {
        let table = html_table(&[vec![TableCell::plain("a<b> & c")]]);
        assert!(table.contains("<td>a&lt;b&gt; &amp; c</td>"));
    }

    #[test]
    fn test_html_table_italic_cell() {
        let table = html_table(&[vec![TableCell::italic("AbstractBase")]]);
        assert!(table.contains("<td><i>AbstractBase</i></td>"));
    }

    #[test]
    fn test_html_table_attr_override() {
        let table = html_table_with(&[vec![TableCell::plain("x")]], &[("cellborder", "0")]);
        assert!(table.contains("cellborder=\"0\""));
        assert!(table.contains("border=\"0\""));
    }

    #[test]
    fn test_dot_graph_counts() {
        let mut graph = DotGraph::new("g", &style());
        graph.add_node("a", NodeSpec::new().with_text("A"));
        graph.add_node("b", NodeSpec::new().with_text("B"));
        graph.add_edge("a", "b", EdgeSpec::new().with_label("uses"));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.cluster_count(), 0);
    }

    #[test]
    fn test_dot_source_is_deterministic() {
        let build = || {
            let mut graph = DotGraph::new("g", &style());
            graph.add_node("a", NodeSpec::new().with_text("A").with_shape("box3d"));
            graph.add_edge("a", "a", EdgeSpec::new().with_style("dashed"));
            graph.source()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_dot_source_structure() {
        let mut graph = DotGraph::new("demo", &style()).with_graph_attr("rankdir", "LR");
        graph.add_node("a", NodeSpec::new().with_text("hello \"world\""));
        graph.add_edge("a", "a", EdgeSpec::new());

        let source = graph.source();
        assert!(source.starts_with("digraph \"demo\" {"));
        assert!(source.contains("rankdir=\"LR\""));
        assert!(source.contains("\"a\" [label=\"hello \\\"world\\\"\"];"));
        assert!(source.contains("\"a\" -> \"a\";"));
        assert!(source.trim_end().ends_with('}'));
    }

    #[test]
    fn test_cluster_nesting() {
        let mut graph = DotGraph::new("g", &style());
        graph.open_cluster(
            "outer",
            ClusterSpec::new()
                .with_label("Outer")
                .with_style("rounded,dashed"),
        );
        graph.open_cluster("inner", ClusterSpec::new().with_label("Inner"));
        graph.add_node("x", NodeSpec::new().with_text("X"));
        graph.close_cluster();
        graph.close_cluster();

        assert_eq!(graph.cluster_count(), 2);
        let source = graph.source();
        assert!(source.contains("subgraph \"cluster_outer\" {"));
        assert!(source.contains("subgraph \"cluster_inner\" {"));
        assert!(source.contains("label=\"Outer\";"));
        assert!(source.contains("style=\"rounded,dashed\";"));
    }

    #[test]
    fn test_unbalanced_close_is_ignored() {
        let mut graph = DotGraph::new("g", &style());
        graph.close_cluster();
        graph.add_node("a", NodeSpec::new());
        // Source must still be well-formed.
        let source = graph.source();
        assert_eq!(source.matches('{').count(), source.matches('}').count());
    }

    #[test]
    fn test_html_label_not_quoted() {
        let mut graph = DotGraph::new("g", &style());
        graph.add_node(
            "a",
            NodeSpec::new().with_html(html_table(&[vec![TableCell::plain("A")]])),
        );
        let source = graph.source();
        assert!(source.contains("label=<<table"));
    }

    #[test]
    fn test_newlines_become_dot_breaks() {
        let mut graph = DotGraph::new("g", &style());
        graph.add_edge(
            "a",
            "b",
            EdgeSpec::new().with_label("line1\nline2"),
        );
        // Node statements are not required for edge rendering here; only the
        // label escaping is under test.
        assert!(graph.source().contains("label=\"line1\\nline2\""));
    }

    struct FixedDiagram;

    impl DiagramGenerator for FixedDiagram {
        fn build(&self) -> Result<DotGraph, DiagramError> {
            let mut graph = DotGraph::new("fixed", &DiagramStyle::default());
            graph.add_node("only", NodeSpec::new().with_text("Only"));
            Ok(graph)
        }
    }

    #[test]
    fn test_generate_returns_bytes_without_path() {
        let bytes = FixedDiagram
            .generate(None)
            .expect("build succeeds")
            .expect("bytes returned");
        let text = String::from_utf8(bytes).expect("utf-8 DOT");
        assert!(text.contains("digraph \"fixed\""));
    }

    #[test]
    fn test_generate_writes_to_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("fixed.dot");

        let result = FixedDiagram.generate(Some(&path)).expect("write succeeds");
        assert!(result.is_none());

        let written = std::fs::read_to_string(&path).expect("file exists");
        assert!(written.contains("digraph \"fixed\""));
    }
}
