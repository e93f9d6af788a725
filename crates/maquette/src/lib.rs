//! Maquette - UML diagram generation for architectural models.
//!
//! Generators project a [`maquette_core::Model`] (or diagram-specific
//! entities derived from it) onto an abstract graph description — nodes,
//! edges, attributes, and nested clusters — rendered to Graphviz DOT text.
//! Turning that description into pixels is the job of an external rendering
//! backend; this crate stops at the graph.
//!
//! # Examples
//!
//! ```
//! use maquette::diagrams::sequence::SequenceDiagramGenerator;
//! use maquette::graph::DiagramGenerator;
//! use maquette::style::DiagramStyle;
//!
//! let mut diagram = SequenceDiagramGenerator::new(DiagramStyle::default());
//! diagram.add_lifeline("user", "User", true).unwrap();
//! diagram.add_lifeline("server", "AuthService", false).unwrap();
//! diagram.add_message("user", "server", "login()").unwrap();
//!
//! let graph = diagram.build().unwrap();
//! assert_eq!(graph.node_count(), 2);
//! ```

pub mod config;
pub mod diagrams;
pub mod graph;
pub mod style;

mod error;

pub use config::AppConfig;
pub use error::DiagramError;
pub use graph::{DiagramGenerator, DotGraph, GraphBuilder};
pub use style::DiagramStyle;
