//! Crate-wide error type.

use std::io;

use thiserror::Error;

use crate::engine::{NodeId, StyleError};

/// Result alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors surfaced by tree mutation, rendering and lifecycle operations.
///
/// Layout and text-measurement problems never show up here: they degrade
/// to zero-sized nodes and are reported through `tracing` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The id was never allocated by this tree or has been destroyed.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Text content was set on a node that is not a text node.
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// Hosts may not create or reparent the root.
    #[error("the root node cannot be created or reparented")]
    RootNotAllowed,

    #[error("cannot insert {child} into {parent}: {reason}")]
    InvalidChild {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },

    /// Inserting the child would make a node its own ancestor.
    #[error("inserting {child} into {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("invalid style: {0}")]
    Style(#[from] StyleError),

    /// Composition was attempted on a tree mutated since the last layout pass.
    #[error("layout is stale; run a layout pass before compositing")]
    StaleLayout,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The instance has already been torn down.
    #[error("instance is unmounted")]
    Unmounted,

    /// The application requested exit with an error message.
    #[error("exited with error: {0}")]
    Exited(String),

    /// Teardown was triggered by a termination signal.
    #[error("terminated by signal {0}")]
    Terminated(i32),
}
