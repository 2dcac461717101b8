//! Commit graph facade for the version-control log view.
//!
//! A [`FullGraph`] holds every commit of a repository snapshot. A
//! [`CollapsedGraph`] projects it onto the rows the log actually shows,
//! hiding linear branches behind synthetic collapsed edges, and a
//! [`LinearGraphController`] turns user gestures on rendered rows into
//! [`LinearGraphAnswer`]s that describe what changed.

pub mod actions;
pub mod collapsed_graph;
pub mod controller;
pub mod full_graph;
pub mod graph_changes;
pub mod graph_settings;
pub mod linear_graph;

use std::fmt;

pub use actions::{
    CursorHint, GraphAction, GraphAnswer, GraphElement, LinearGraphAction, LinearGraphAnswer,
    PrintElement,
};
pub use collapsed_graph::{CollapsedGraph, CollapsedInterval, IntervalId};
pub use controller::LinearGraphController;
pub use full_graph::{FullGraph, FullGraphBuilder};
pub use graph_changes::{EdgeChange, GraphChanges, NodeChange, RowEdit};
pub use graph_settings::VcsLogGraphSettings;
pub use linear_graph::{
    EdgeKind, EdgeList, FullNodeId, GraphEdge, GraphNode, LinearGraph, NodeId, NodeKind,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("index {index} is out of range for a graph of {len} nodes")]
    OutOfRange { index: usize, len: usize },
    #[error("cannot collapse: {0}")]
    NotCollapsible(Rejection),
    #[error("{node:?} is already hidden by {interval:?}")]
    AlreadyCollapsed {
        node: FullNodeId,
        interval: IntervalId,
    },
    #[error("unknown collapsed interval {0:?}")]
    UnknownInterval(IntervalId),
    #[error("{node:?} is hidden by {interval:?}")]
    NotVisible {
        node: FullNodeId,
        interval: IntervalId,
    },
}

impl GraphError {
    /// Whether this error can be explained by an action that was dispatched
    /// against an older compiled graph. Only `OutOfRange` indicates a broken
    /// mapping.
    pub fn is_stale(&self) -> bool {
        !matches!(self, GraphError::OutOfRange { .. })
    }
}

/// Why a candidate run of nodes cannot be hidden behind a collapsed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    EmptyRange,
    /// The node is a branch or merge point, a head or root, or the boundary
    /// of an existing collapsed interval.
    NotLinear(FullNodeId),
    /// Two consecutive candidates are not joined by an edge.
    Disconnected { from: FullNodeId, to: FullNodeId },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyRange => write!(f, "no nodes were given"),
            Rejection::NotLinear(node) => write!(f, "{node:?} is not part of a linear branch"),
            Rejection::Disconnected { from, to } => {
                write!(f, "{from:?} and {to:?} are not a single linear run")
            }
        }
    }
}

#[cfg(test)]
#[ctor::ctor]
fn init_logger() {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }
}
