use std::fmt;

use smallvec::SmallVec;

use crate::{GraphError, collapsed_graph::IntervalId};

/// Row of a node in the compiled (currently visible) graph. Only valid until
/// the next structural change of that graph.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Identity of a node in the full, uncollapsed graph. Stable for the lifetime
/// of the [`FullGraph`](crate::FullGraph) snapshot, and ordered the same way
/// the commits are.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FullNodeId(pub usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Debug for FullNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FullNodeId({})", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// A parent/child link that exists in the full graph.
    Normal,
    /// A synthetic link standing in for the nodes hidden by an interval.
    Collapsed(IntervalId),
}

/// An edge between an upper node (earlier in commit order) and a lower one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphEdge<Id> {
    pub up: Id,
    pub down: Id,
    pub kind: EdgeKind,
}

impl<Id: Copy + Eq> GraphEdge<Id> {
    pub fn normal(up: Id, down: Id) -> Self {
        Self {
            up,
            down,
            kind: EdgeKind::Normal,
        }
    }

    pub fn collapsed(up: Id, down: Id, interval: IntervalId) -> Self {
        Self {
            up,
            down,
            kind: EdgeKind::Collapsed(interval),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self.kind, EdgeKind::Collapsed(_))
    }

    pub fn touches(&self, node: Id) -> bool {
        self.up == node || self.down == node
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Commit,
    /// Placeholder for a commit that is referenced but was not loaded.
    Unloaded,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphNode<Id> {
    pub id: Id,
    pub kind: NodeKind,
}

pub type EdgeList<Id> = SmallVec<[GraphEdge<Id>; 4]>;

/// A linearly ordered sequence of nodes and the edges between them.
///
/// Implemented by both the full graph and the collapsed projection so that
/// code walking the graph does not need to know which one it has.
pub trait LinearGraph {
    type Id: Copy + Ord + fmt::Debug;

    fn node_count(&self) -> usize;

    fn graph_node(&self, id: Self::Id) -> Result<GraphNode<Self::Id>, GraphError>;

    /// Edges touching `id`: edges going down sorted by their lower node,
    /// followed by edges coming from above sorted by their upper node.
    fn edges_for(&self, id: Self::Id) -> Result<EdgeList<Self::Id>, GraphError>;

    fn down_edges(&self, id: Self::Id) -> Result<EdgeList<Self::Id>, GraphError> {
        let mut edges = self.edges_for(id)?;
        edges.retain(|edge| edge.up == id);
        Ok(edges)
    }

    fn up_edges(&self, id: Self::Id) -> Result<EdgeList<Self::Id>, GraphError> {
        let mut edges = self.edges_for(id)?;
        edges.retain(|edge| edge.down == id);
        Ok(edges)
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<usize, GraphError> {
    if index < len {
        Ok(index)
    } else {
        Err(GraphError::OutOfRange { index, len })
    }
}

pub(crate) fn sort_edges<Id: Copy + Ord>(node: Id, edges: &mut [GraphEdge<Id>]) {
    edges.sort_unstable_by_key(|edge| {
        if edge.up == node {
            (0, edge.down, edge.kind)
        } else {
            (1, edge.up, edge.kind)
        }
    });
}
