//! Error types for diagram construction.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while building or writing a diagram.
///
/// Reference errors are raised immediately by the `add_*` call that
/// introduced the bad reference; nothing is inserted silently and nothing is
/// deferred to generation time.
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("duplicate lifeline: {0}")]
    DuplicateLifeline(String),

    #[error("unknown lifeline: {0}")]
    UnknownLifeline(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("unknown element: {0}")]
    UnknownElement(String),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
