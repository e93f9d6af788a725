//! Sequence diagram generator.
//!
//! Lifelines render as ordered columns (insertion order); messages render in
//! list order as edges between columns, so vertical position grows
//! monotonically with message index and ties resolve by list order.

use indexmap::IndexMap;
use log::debug;

use crate::error::DiagramError;
use crate::graph::{DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, NodeSpec};
use crate::style::DiagramStyle;

/// A participant in a sequence diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifeline {
    name: String,
    type_name: String,
    is_actor: bool,
}

impl Lifeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_actor(&self) -> bool {
        self.is_actor
    }
}

/// A message between two lifelines.
///
/// Built by the caller and registered with
/// [`SequenceDiagramGenerator::add_message`]; `is_self` is derived there
/// from source and target.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceMessage {
    source: String,
    target: String,
    message: String,
    return_value: Option<String>,
    is_async: bool,
    is_self: bool,
    start_time: Option<f64>,
    duration: Option<f64>,
    parallel_group: Option<String>,
}

impl SequenceMessage {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            message: message.into(),
            return_value: None,
            is_async: false,
            is_self: false,
            start_time: None,
            duration: None,
            parallel_group: None,
        }
    }

    /// Adds a reply: a dashed return edge in the opposite direction.
    pub fn with_return_value(mut self, value: impl Into<String>) -> Self {
        self.return_value = Some(value.into());
        self
    }

    /// Marks the message asynchronous (dashed line, open arrow).
    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Annotates the message with a duration, shown as `(Ns)`.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Tags the message as part of a parallel group, shown as `[group]`.
    pub fn with_parallel_group(mut self, group: impl Into<String>) -> Self {
        self.parallel_group = Some(group.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn return_value(&self) -> Option<&str> {
        self.return_value.as_deref()
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// True when source and target are the same lifeline.
    pub fn is_self(&self) -> bool {
        self.is_self
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn parallel_group(&self) -> Option<&str> {
        self.parallel_group.as_deref()
    }
}

/// Generates sequence diagrams from registered lifelines and messages.
pub struct SequenceDiagramGenerator {
    style: DiagramStyle,
    lifelines: IndexMap<String, Lifeline>,
    messages: Vec<SequenceMessage>,
}

impl SequenceDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            lifelines: IndexMap::new(),
            messages: Vec::new(),
        }
    }

    /// Registers a lifeline.
    ///
    /// # Errors
    ///
    /// [`DiagramError::DuplicateLifeline`] if the name is already taken.
    pub fn add_lifeline(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        is_actor: bool,
    ) -> Result<(), DiagramError> {
        let name = name.into();
        if self.lifelines.contains_key(&name) {
            return Err(DiagramError::DuplicateLifeline(name));
        }
        self.lifelines.insert(
            name.clone(),
            Lifeline {
                name,
                type_name: type_name.into(),
                is_actor,
            },
        );
        Ok(())
    }

    /// Registers a plain synchronous message.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownLifeline`] if either endpoint is unregistered.
    pub fn add_message(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), DiagramError> {
        self.register_message(SequenceMessage::new(source, target, message))
    }

    /// Registers a fully configured message.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownLifeline`] if either endpoint is unregistered.
    pub fn register_message(&mut self, mut message: SequenceMessage) -> Result<(), DiagramError> {
        if !self.lifelines.contains_key(&message.source) {
            return Err(DiagramError::UnknownLifeline(message.source));
        }
        if !self.lifelines.contains_key(&message.target) {
            return Err(DiagramError::UnknownLifeline(message.target));
        }
        message.is_self = message.source == message.target;
        self.messages.push(message);
        Ok(())
    }

    pub fn lifelines(&self) -> impl Iterator<Item = &Lifeline> {
        self.lifelines.values()
    }

    pub fn messages(&self) -> &[SequenceMessage] {
        &self.messages
    }
}

impl DiagramGenerator for SequenceDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            lifelines = self.lifelines.len(),
            messages = self.messages.len();
            "Building sequence diagram"
        );
        let mut graph = DotGraph::new("sequence_diagram", &self.style)
            .with_graph_attr("ranksep", "0.5")
            .with_graph_attr("nodesep", "1.0");

        for (name, lifeline) in &self.lifelines {
            let label = if lifeline.is_actor {
                format!("Actor\n{name}")
            } else {
                format!("{}\n{name}", lifeline.type_name)
            };
            graph.add_node(name, NodeSpec::new().with_text(label));
        }

        for message in &self.messages {
            let mut label = message.message.clone();
            if let Some(duration) = message.duration {
                label.push_str(&format!("\n({duration}s)"));
            }
            if let Some(group) = &message.parallel_group {
                label.push_str(&format!("\n[{group}]"));
            }

            let mut spec = EdgeSpec::new().with_label(label);
            spec = if message.is_async {
                spec.with_style("dashed").with_arrowhead("vee")
            } else {
                spec.with_style("solid").with_arrowhead("normal")
            };
            if message.parallel_group.is_some() {
                spec = spec.with_color("blue");
            }
            graph.add_edge(&message.source, &message.target, spec);

            if let Some(return_value) = &message.return_value {
                graph.add_edge(
                    &message.target,
                    &message.source,
                    EdgeSpec::new()
                        .with_label(return_value.clone())
                        .with_style("dashed")
                        .with_arrowhead("vee"),
                );
            }
        }

        Ok(graph)
    }
}
