//! State diagram generator.
//!
//! States are keyed by name — the name is the identity. Initial and final
//! pseudo-states render as filled/double circles with empty labels and skip
//! the general label-formatting path; composite states render as dashed
//! clusters containing their substates, recursively.

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::error::DiagramError;
use crate::graph::{
    html_table_with, ClusterSpec, DiagramGenerator, DotGraph, EdgeSpec, GraphBuilder, Label,
    NodeSpec, TableCell,
};
use crate::style::DiagramStyle;

/// A state in the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    entry_actions: Vec<String>,
    exit_actions: Vec<String>,
    do_actions: Vec<String>,
    is_initial: bool,
    is_final: bool,
    is_composite: bool,
    substates: Vec<String>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            do_actions: Vec::new(),
            is_initial: false,
            is_final: false,
            is_composite: false,
            substates: Vec::new(),
        }
    }

    /// Shorthand for an initial pseudo-state.
    pub fn initial(name: impl Into<String>) -> Self {
        Self::new(name).with_initial(true)
    }

    /// Shorthand for a final pseudo-state.
    pub fn terminal(name: impl Into<String>) -> Self {
        Self::new(name).with_final(true)
    }

    pub fn with_initial(mut self, is_initial: bool) -> Self {
        self.is_initial = is_initial;
        self
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn with_composite(mut self, is_composite: bool) -> Self {
        self.is_composite = is_composite;
        self
    }

    pub fn add_entry_action(&mut self, action: impl Into<String>) {
        self.entry_actions.push(action.into());
    }

    pub fn add_exit_action(&mut self, action: impl Into<String>) {
        self.exit_actions.push(action.into());
    }

    pub fn add_do_action(&mut self, action: impl Into<String>) {
        self.do_actions.push(action.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_composite(&self) -> bool {
        self.is_composite
    }

    pub fn substates(&self) -> &[String] {
        &self.substates
    }
}

/// A transition between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    source: String,
    target: String,
    trigger: Option<String>,
    guard: Option<String>,
    action: Option<String>,
}

impl Transition {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            trigger: None,
            guard: None,
            action: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A state-machine well-formedness problem reported by
/// [`StateDiagramGenerator::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineIssue {
    #[error("scope '{scope}' has {count} initial states")]
    MultipleInitialStates { scope: String, count: usize },

    #[error("final state '{state}' has an outgoing transition")]
    TransitionFromFinal { state: String },
}

/// Generates state diagrams.
pub struct StateDiagramGenerator {
    style: DiagramStyle,
    states: IndexMap<String, State>,
    transitions: Vec<Transition>,
}

impl StateDiagramGenerator {
    pub fn new(style: DiagramStyle) -> Self {
        Self {
            style,
            states: IndexMap::new(),
            transitions: Vec::new(),
        }
    }

    /// Registers a state, replacing any previous state with the same name.
    pub fn add_state(&mut self, state: State) {
        self.states.insert(state.name.clone(), state);
    }

    /// Registers a transition.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownState`] if either endpoint name is absent.
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), DiagramError> {
        if !self.states.contains_key(&transition.source) {
            return Err(DiagramError::UnknownState(transition.source));
        }
        if !self.states.contains_key(&transition.target) {
            return Err(DiagramError::UnknownState(transition.target));
        }
        self.transitions.push(transition);
        Ok(())
    }

    /// Nests `child` inside the composite state `parent`.
    ///
    /// # Errors
    ///
    /// [`DiagramError::UnknownState`] if either name is absent.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), DiagramError> {
        if !self.states.contains_key(child) {
            return Err(DiagramError::UnknownState(child.to_string()));
        }
        let Some(parent_state) = self.states.get_mut(parent) else {
            return Err(DiagramError::UnknownState(parent.to_string()));
        };
        parent_state.substates.push(child.to_string());
        parent_state.is_composite = true;
        Ok(())
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Checks optional state-machine rules: at most one initial state per
    /// scope (top level, or inside a composite) and no outgoing transitions
    /// from a final state.
    ///
    /// Purely advisory; nothing in `add_transition` or `build` enforces
    /// these.
    pub fn check(&self) -> Vec<StateMachineIssue> {
        let mut issues = Vec::new();

        let nested: std::collections::HashSet<&String> = self
            .states
            .values()
            .flat_map(|s| s.substates.iter())
            .collect();

        let top_level_initials = self
            .states
            .values()
            .filter(|s| !nested.contains(&s.name) && s.is_initial)
            .count();
        if top_level_initials > 1 {
            issues.push(StateMachineIssue::MultipleInitialStates {
                scope: "<top>".to_string(),
                count: top_level_initials,
            });
        }

        for state in self.states.values() {
            if state.substates.is_empty() {
                continue;
            }
            let initials = state
                .substates
                .iter()
                .filter_map(|name| self.states.get(name))
                .filter(|s| s.is_initial)
                .count();
            if initials > 1 {
                issues.push(StateMachineIssue::MultipleInitialStates {
                    scope: state.name.clone(),
                    count: initials,
                });
            }
        }

        for transition in &self.transitions {
            if let Some(source) = self.states.get(&transition.source) {
                if source.is_final {
                    issues.push(StateMachineIssue::TransitionFromFinal {
                        state: source.name.clone(),
                    });
                }
            }
        }

        issues
    }

    fn format_label(&self, state: &State) -> Label {
        // Initial/final pseudo-states carry no label at all.
        if state.is_initial || state.is_final {
            return Label::Empty;
        }

        let mut rows = vec![vec![TableCell::plain(&state.name)]];

        let mut internal_actions = Vec::new();
        internal_actions.extend(state.entry_actions.iter().map(|a| format!("entry / {a}")));
        internal_actions.extend(state.exit_actions.iter().map(|a| format!("exit / {a}")));
        internal_actions.extend(state.do_actions.iter().map(|a| format!("do / {a}")));
        if !internal_actions.is_empty() {
            rows.push(internal_actions.into_iter().map(TableCell::plain).collect());
        }

        Label::Html(html_table_with(
            &rows,
            &[("cellborder", "0"), ("border", "1")],
        ))
    }

    fn format_transition_label(transition: &Transition) -> String {
        let mut parts = Vec::new();
        if let Some(trigger) = &transition.trigger {
            parts.push(trigger.clone());
        }
        if let Some(guard) = &transition.guard {
            parts.push(format!("[{guard}]"));
        }
        if let Some(action) = &transition.action {
            parts.push(format!("/ {action}"));
        }
        parts.join("\n")
    }

    fn emit_state(
        &self,
        graph: &mut DotGraph,
        state: &State,
        visited: &mut std::collections::HashSet<String>,
    ) {
        if !visited.insert(state.name.clone()) {
            return;
        }

        if state.is_initial {
            graph.add_node(
                &state.name,
                NodeSpec::new()
                    .with_label(Label::Empty)
                    .with_shape("circle")
                    .with_style("filled")
                    .with_fill_color("black")
                    .with_size(0.3, 0.3),
            );
        } else if state.is_final {
            graph.add_node(
                &state.name,
                NodeSpec::new()
                    .with_label(Label::Empty)
                    .with_shape("doublecircle")
                    .with_style("filled")
                    .with_fill_color("white")
                    .with_size(0.3, 0.3),
            );
        } else if state.is_composite && !state.substates.is_empty() {
            graph.open_cluster(
                &state.name,
                ClusterSpec::new()
                    .with_label(&state.name)
                    .with_style("rounded,dashed"),
            );
            for substate_name in &state.substates {
                if let Some(substate) = self.states.get(substate_name) {
                    self.emit_state(graph, substate, visited);
                }
            }
            graph.close_cluster();
        } else {
            graph.add_node(
                &state.name,
                NodeSpec::new()
                    .with_label(self.format_label(state))
                    .with_shape("box")
                    .with_style("rounded"),
            );
        }
    }
}

impl DiagramGenerator for StateDiagramGenerator {
    fn build(&self) -> Result<DotGraph, DiagramError> {
        debug!(
            states = self.states.len(),
            transitions = self.transitions.len();
            "Building state diagram"
        );
        let mut graph = DotGraph::new("state_diagram", &self.style)
            .with_graph_attr("ranksep", "0.8");

        let nested: std::collections::HashSet<&String> = self
            .states
            .values()
            .flat_map(|s| s.substates.iter())
            .collect();

        let mut visited = std::collections::HashSet::new();
        for (name, state) in &self.states {
            if !nested.contains(name) {
                self.emit_state(&mut graph, state, &mut visited);
            }
        }

        for transition in &self.transitions {
            let mut spec = EdgeSpec::new().with_label(Self::format_transition_label(transition));

            let source_initial = self
                .states
                .get(&transition.source)
                .is_some_and(|s| s.is_initial);
            let target_final = self
                .states
                .get(&transition.target)
                .is_some_and(|s| s.is_final);
            if source_initial || target_final {
                spec = spec.with_arrow_size(1.5);
            }

            graph.add_edge(&transition.source, &transition.target, spec);
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door_machine() -> StateDiagramGenerator {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::initial("start"));
        diagram.add_state(State::new("closed"));
        diagram.add_state(State::new("open"));
        diagram.add_state(State::terminal("end"));
        diagram
            .add_transition(Transition::new("start", "closed"))
            .unwrap();
        diagram
            .add_transition(
                Transition::new("closed", "open")
                    .with_trigger("pull")
                    .with_guard("unlocked")
                    .with_action("creak"),
            )
            .unwrap();
        diagram.add_transition(Transition::new("open", "end")).unwrap();
        diagram
    }

    #[test]
    fn test_pseudo_state_styling() {
        let graph = door_machine().build().unwrap();

        let start = graph.find_node("start").unwrap();
        assert_eq!(start.spec().shape(), Some("circle"));
        assert_eq!(start.spec().fill_color(), Some("black"));
        assert_eq!(start.spec().label(), Some(&Label::Empty));

        let end = graph.find_node("end").unwrap();
        assert_eq!(end.spec().shape(), Some("doublecircle"));
        assert_eq!(end.spec().label(), Some(&Label::Empty));
    }

    #[test]
    fn test_transition_label_concatenation() {
        let graph = door_machine().build().unwrap();
        let edge = graph.edges().nth(1).unwrap();
        assert_eq!(edge.spec().label(), Some("pull\n[unlocked]\n/ creak"));
    }

    #[test]
    fn test_unknown_state_rejected() {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::new("only"));

        let err = diagram
            .add_transition(Transition::new("only", "ghost"))
            .unwrap_err();
        assert!(matches!(err, DiagramError::UnknownState(name) if name == "ghost"));
        assert!(diagram.transitions().is_empty());
    }

    #[test]
    fn test_composite_state_renders_as_cluster() {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::new("running").with_composite(true));
        diagram.add_state(State::new("warming_up"));
        diagram.add_state(State::new("steady"));
        diagram.nest("running", "warming_up").unwrap();
        diagram.nest("running", "steady").unwrap();

        let graph = diagram.build().unwrap();
        assert_eq!(graph.cluster_count(), 1);
        assert_eq!(graph.cluster_labels().next(), Some(Some("running")));
        // Two substate nodes, no node for the composite shell itself.
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_internal_actions_in_label() {
        let mut waiting = State::new("waiting");
        waiting.add_entry_action("start_timer");
        waiting.add_exit_action("stop_timer");
        waiting.add_do_action("poll");

        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(waiting);

        let graph = diagram.build().unwrap();
        match graph.find_node("waiting").unwrap().spec().label() {
            Some(Label::Html(html)) => {
                assert!(html.contains("entry / start_timer"));
                assert!(html.contains("exit / stop_timer"));
                assert!(html.contains("do / poll"));
            }
            other => panic!("expected html label, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_and_final_arrow_emphasis() {
        let graph = door_machine().build().unwrap();
        let source = graph.source();
        // First transition leaves the initial state, last one enters the
        // final state; both carry the larger arrow.
        assert_eq!(source.matches("arrowsize=\"1.5\"").count(), 2);
    }

    #[test]
    fn test_check_reports_multiple_initials() {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::initial("a"));
        diagram.add_state(State::initial("b"));

        let issues = diagram.check();
        assert_eq!(
            issues,
            vec![StateMachineIssue::MultipleInitialStates {
                scope: "<top>".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn test_check_reports_transition_from_final() {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::terminal("end"));
        diagram.add_state(State::new("restart"));
        diagram
            .add_transition(Transition::new("end", "restart"))
            .unwrap();

        let issues = diagram.check();
        assert_eq!(
            issues,
            vec![StateMachineIssue::TransitionFromFinal {
                state: "end".to_string(),
            }]
        );
    }

    #[test]
    fn test_check_scopes_composites_independently() {
        let mut diagram = StateDiagramGenerator::new(DiagramStyle::default());
        diagram.add_state(State::initial("outer_start"));
        diagram.add_state(State::new("running").with_composite(true));
        diagram.add_state(State::initial("inner_start"));
        diagram.nest("running", "inner_start").unwrap();

        // One initial per scope: no issues.
        assert!(diagram.check().is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let diagram = door_machine();
        assert_eq!(
            diagram.build().unwrap().source(),
            diagram.build().unwrap().source()
        );
    }
}
