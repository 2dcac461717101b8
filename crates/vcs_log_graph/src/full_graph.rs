use anyhow::{Result, bail};
use smallvec::SmallVec;

use crate::{
    GraphError,
    linear_graph::{
        EdgeList, FullNodeId, GraphEdge, GraphNode, LinearGraph, NodeKind, check_index,
    },
};

type Neighbors = SmallVec<[FullNodeId; 2]>;

/// Every commit of a repository snapshot, in commit order.
///
/// Node ids are dense and every edge points from an upper node to a lower
/// one, so the order of ids is a topological order of the graph. The graph is
/// never mutated once built and is meant to be shared through an `Arc` by any
/// number of [`CollapsedGraph`](crate::CollapsedGraph)s.
#[derive(Clone, Debug, Default)]
pub struct FullGraph {
    kinds: Vec<NodeKind>,
    up_nodes: Vec<Neighbors>,
    down_nodes: Vec<Neighbors>,
}

impl FullGraph {
    pub fn builder() -> FullGraphBuilder {
        FullGraphBuilder::default()
    }

    /// Builds a graph of `node_count` commits from `(up, down)` index pairs.
    pub fn from_edges(
        node_count: usize,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let mut builder = FullGraphBuilder::with_capacity(node_count);
        for _ in 0..node_count {
            builder.add_commit();
        }
        for (up, down) in edges {
            builder.add_edge(FullNodeId(up), FullNodeId(down));
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = FullNodeId> + ExactSizeIterator {
        (0..self.kinds.len()).map(FullNodeId)
    }

    pub fn up_nodes(&self, node: FullNodeId) -> Result<&[FullNodeId], GraphError> {
        let ix = check_index(node.0, self.len())?;
        Ok(&self.up_nodes[ix])
    }

    pub fn down_nodes(&self, node: FullNodeId) -> Result<&[FullNodeId], GraphError> {
        let ix = check_index(node.0, self.len())?;
        Ok(&self.down_nodes[ix])
    }

    pub(crate) fn check(&self, node: FullNodeId) -> Result<FullNodeId, GraphError> {
        check_index(node.0, self.len()).map(FullNodeId)
    }

    /// The single neighbor above and below `node`, if it has exactly one of
    /// each. `node` must be in range.
    pub(crate) fn linear_neighbors(&self, node: FullNodeId) -> Option<(FullNodeId, FullNodeId)> {
        match (&self.up_nodes[node.0][..], &self.down_nodes[node.0][..]) {
            ([up], [down]) => Some((*up, *down)),
            _ => None,
        }
    }
}

impl LinearGraph for FullGraph {
    type Id = FullNodeId;

    fn node_count(&self) -> usize {
        self.len()
    }

    fn graph_node(&self, id: FullNodeId) -> Result<GraphNode<FullNodeId>, GraphError> {
        let ix = check_index(id.0, self.len())?;
        Ok(GraphNode {
            id,
            kind: self.kinds[ix],
        })
    }

    fn edges_for(&self, id: FullNodeId) -> Result<EdgeList<FullNodeId>, GraphError> {
        let ix = check_index(id.0, self.len())?;
        let mut edges = EdgeList::new();
        // Both neighbor lists are kept sorted by `build`.
        edges.extend(
            self.down_nodes[ix]
                .iter()
                .map(|down| GraphEdge::normal(id, *down)),
        );
        edges.extend(self.up_nodes[ix].iter().map(|up| GraphEdge::normal(*up, id)));
        Ok(edges)
    }
}

/// Collects the output of the history ingestion and validates it into a
/// [`FullGraph`].
#[derive(Clone, Debug, Default)]
pub struct FullGraphBuilder {
    kinds: Vec<NodeKind>,
    edges: Vec<(FullNodeId, FullNodeId)>,
}

impl FullGraphBuilder {
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            kinds: Vec::with_capacity(node_count),
            edges: Vec::with_capacity(node_count),
        }
    }

    pub fn add_commit(&mut self) -> FullNodeId {
        self.push_node(NodeKind::Commit)
    }

    pub fn add_unloaded(&mut self) -> FullNodeId {
        self.push_node(NodeKind::Unloaded)
    }

    pub fn add_edge(&mut self, up: FullNodeId, down: FullNodeId) -> &mut Self {
        self.edges.push((up, down));
        self
    }

    pub fn build(mut self) -> Result<FullGraph> {
        let len = self.kinds.len();
        let mut up_nodes = vec![Neighbors::new(); len];
        let mut down_nodes = vec![Neighbors::new(); len];

        self.edges.sort_unstable();
        self.edges.dedup();
        for (up, down) in self.edges {
            if up.0 >= len || down.0 >= len {
                bail!("edge {up:?} -> {down:?} references a node outside of 0..{len}");
            }
            if up >= down {
                bail!("edge {up:?} -> {down:?} does not follow the commit order");
            }
            down_nodes[up.0].push(down);
            up_nodes[down.0].push(up);
        }

        log::debug!("built full graph with {len} nodes");
        Ok(FullGraph {
            kinds: self.kinds,
            up_nodes,
            down_nodes,
        })
    }

    fn push_node(&mut self, kind: NodeKind) -> FullNodeId {
        let id = FullNodeId(self.kinds.len());
        self.kinds.push(kind);
        id
    }
}
