use std::{collections::BTreeMap, sync::Arc};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{
    GraphError, Rejection,
    full_graph::FullGraph,
    graph_changes::GraphChanges,
    linear_graph::{
        EdgeList, FullNodeId, GraphEdge, GraphNode, LinearGraph, NodeId, check_index, sort_edges,
    },
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalId(pub(crate) usize);

/// A run of hidden nodes and the two visible nodes it hangs between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollapsedInterval {
    pub id: IntervalId,
    pub up: FullNodeId,
    pub down: FullNodeId,
    /// In commit order; each node is joined to the next by an edge.
    pub hidden: Vec<FullNodeId>,
}

impl CollapsedInterval {
    pub fn edge(&self) -> GraphEdge<FullNodeId> {
        GraphEdge::collapsed(self.up, self.down, self.id)
    }

    /// The full-graph edges that the collapsed edge replaces, top to bottom.
    pub fn chain_edges(&self) -> impl Iterator<Item = GraphEdge<FullNodeId>> + '_ {
        let nodes = std::iter::once(self.up)
            .chain(self.hidden.iter().copied())
            .chain(std::iter::once(self.down));
        nodes
            .clone()
            .zip(nodes.skip(1))
            .map(|(up, down)| GraphEdge::normal(up, down))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Visible(NodeId),
    Hidden(IntervalId),
}

struct PendingInterval {
    up: FullNodeId,
    down: FullNodeId,
    hidden: Vec<FullNodeId>,
}

/// The compiled projection of a [`FullGraph`].
///
/// Visible nodes keep the relative order they have in the full graph and are
/// numbered densely from the top. Collapsing a run only renumbers the rows
/// from the first hidden node downwards, so the cost of a collapse or expand
/// is proportional to the part of the graph below it.
pub struct CollapsedGraph {
    full: Arc<FullGraph>,
    compiled: Vec<FullNodeId>,
    slots: Vec<Slot>,
    intervals: BTreeMap<IntervalId, CollapsedInterval>,
    boundaries: FxHashMap<FullNodeId, SmallVec<[IntervalId; 2]>>,
    next_interval_id: IntervalId,
}

impl CollapsedGraph {
    pub fn new(full: Arc<FullGraph>) -> Self {
        let compiled = full.nodes().collect::<Vec<_>>();
        let slots = (0..compiled.len())
            .map(|row| Slot::Visible(NodeId(row)))
            .collect();
        Self {
            full,
            compiled,
            slots,
            intervals: BTreeMap::new(),
            boundaries: FxHashMap::default(),
            next_interval_id: IntervalId(0),
        }
    }

    pub fn full_graph(&self) -> &Arc<FullGraph> {
        &self.full
    }

    /// The visible nodes, top to bottom. The index of each entry is its
    /// [`NodeId`].
    pub fn compiled_nodes(&self) -> &[FullNodeId] {
        &self.compiled
    }

    pub fn intervals(&self) -> impl ExactSizeIterator<Item = &CollapsedInterval> {
        self.intervals.values()
    }

    pub fn interval(&self, id: IntervalId) -> Option<&CollapsedInterval> {
        self.intervals.get(&id)
    }

    pub fn to_full_node_id(&self, node: NodeId) -> Result<FullNodeId, GraphError> {
        let row = check_index(node.0, self.compiled.len())?;
        Ok(self.compiled[row])
    }

    /// Fails with [`GraphError::NotVisible`] naming the hiding interval when
    /// `node` is collapsed, so the caller can expand it.
    pub fn to_node_id(&self, node: FullNodeId) -> Result<NodeId, GraphError> {
        match self.slot(node)? {
            Slot::Visible(row) => Ok(row),
            Slot::Hidden(interval) => Err(GraphError::NotVisible { node, interval }),
        }
    }

    pub fn hiding_interval(&self, node: FullNodeId) -> Result<Option<IntervalId>, GraphError> {
        Ok(match self.slot(node)? {
            Slot::Visible(_) => None,
            Slot::Hidden(interval) => Some(interval),
        })
    }

    /// The longest run of linear nodes containing `node`, in commit order.
    pub fn linear_branch(&self, node: FullNodeId) -> Result<Option<Vec<FullNodeId>>, GraphError> {
        self.full.check(node)?;
        if !self.is_linear(node) {
            return Ok(None);
        }

        let mut first = node;
        while let Some((up, _)) = self.full.linear_neighbors(first)
            && self.is_linear(up)
        {
            first = up;
        }

        let mut run = vec![first];
        let mut last = first;
        while let Some((_, down)) = self.full.linear_neighbors(last)
            && self.is_linear(down)
        {
            run.push(down);
            last = down;
        }
        Ok(Some(run))
    }

    /// Hides `nodes` behind a single collapsed edge.
    ///
    /// The nodes must be visible and form one chain of linear nodes: each of
    /// them has exactly one edge above and one below, and is not the boundary
    /// of another interval. Nothing changes when the run is rejected.
    pub fn collapse(
        &mut self,
        nodes: impl IntoIterator<Item = FullNodeId>,
    ) -> Result<(IntervalId, GraphChanges), GraphError> {
        let mut nodes = nodes.into_iter().collect::<Vec<_>>();
        nodes.sort_unstable();
        nodes.dedup();

        let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) else {
            return Err(GraphError::NotCollapsible(Rejection::EmptyRange));
        };
        for &node in &nodes {
            if let Slot::Hidden(interval) = self.slot(node)? {
                return Err(GraphError::AlreadyCollapsed { node, interval });
            }
        }
        for &node in &nodes {
            if !self.is_linear(node) {
                return Err(GraphError::NotCollapsible(Rejection::NotLinear(node)));
            }
        }
        for pair in nodes.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if self.full.linear_neighbors(from).map(|(_, down)| down) != Some(to) {
                return Err(GraphError::NotCollapsible(Rejection::Disconnected { from, to }));
            }
        }

        let (Some((up, _)), Some((_, down))) = (
            self.full.linear_neighbors(first),
            self.full.linear_neighbors(last),
        ) else {
            return Err(GraphError::NotCollapsible(Rejection::NotLinear(first)));
        };

        let (ids, changes) = self.hide(vec![PendingInterval {
            up,
            down,
            hidden: nodes,
        }]);
        Ok((ids[0], changes))
    }

    /// Collapses the linear branch that `node` belongs to.
    pub fn collapse_branch(
        &mut self,
        node: FullNodeId,
    ) -> Result<(IntervalId, GraphChanges), GraphError> {
        if let Slot::Hidden(interval) = self.slot(node)? {
            return Err(GraphError::AlreadyCollapsed { node, interval });
        }
        let run = self
            .linear_branch(node)?
            .ok_or(GraphError::NotCollapsible(Rejection::NotLinear(node)))?;
        self.collapse(run)
    }

    /// Collapses every linear branch of at least `min_len` nodes.
    pub fn collapse_all(&mut self, min_len: usize) -> GraphChanges {
        let mut claimed = FxHashSet::default();
        let mut pending = Vec::new();
        for &node in &self.compiled {
            if claimed.contains(&node) || !self.is_linear(node) {
                continue;
            }
            // Visible nodes are visited in commit order, so the first node of
            // a run is always seen before the rest of it.
            let Ok(Some(run)) = self.linear_branch(node) else {
                continue;
            };
            claimed.extend(run.iter().copied());
            if run.len() < min_len.max(1) {
                continue;
            }
            if let (Some((up, _)), Some((_, down))) = (
                self.full.linear_neighbors(run[0]),
                self.full.linear_neighbors(run[run.len() - 1]),
            ) {
                pending.push(PendingInterval {
                    up,
                    down,
                    hidden: run,
                });
            }
        }

        if pending.is_empty() {
            return GraphChanges::default();
        }
        self.hide(pending).1
    }

    /// Restores the nodes hidden by `interval` to their original rows.
    pub fn expand(&mut self, interval: IntervalId) -> Result<GraphChanges, GraphError> {
        if !self.intervals.contains_key(&interval) {
            return Err(GraphError::UnknownInterval(interval));
        }
        Ok(self.show(vec![interval]))
    }

    pub fn expand_all(&mut self) -> GraphChanges {
        let ids = self.intervals.keys().copied().collect::<Vec<_>>();
        if ids.is_empty() {
            return GraphChanges::default();
        }
        self.show(ids)
    }

    fn slot(&self, node: FullNodeId) -> Result<Slot, GraphError> {
        let ix = check_index(node.0, self.slots.len())?;
        Ok(self.slots[ix])
    }

    /// A visible node with exactly one edge above and below, neither of
    /// which is collapsed. Its neighbors are then visible too: a hidden
    /// neighbor would make it the boundary of an interval.
    fn is_linear(&self, node: FullNodeId) -> bool {
        matches!(self.slots[node.0], Slot::Visible(_))
            && !self.boundaries.contains_key(&node)
            && self.full.linear_neighbors(node).is_some()
    }

    fn hide(&mut self, pending: Vec<PendingInterval>) -> (Vec<IntervalId>, GraphChanges) {
        let mut changes = GraphChanges::default();
        let mut ids = Vec::with_capacity(pending.len());
        let mut start = self.compiled.len();

        for PendingInterval { up, down, hidden } in pending {
            let id = self.next_interval_id;
            self.next_interval_id.0 += 1;

            for &node in &hidden {
                if let Slot::Visible(row) = self.slots[node.0] {
                    start = start.min(row.0);
                }
                self.slots[node.0] = Slot::Hidden(id);
                changes.remove_node(node);
            }
            self.boundaries.entry(up).or_default().push(id);
            self.boundaries.entry(down).or_default().push(id);

            let interval = CollapsedInterval {
                id,
                up,
                down,
                hidden,
            };
            for edge in interval.chain_edges() {
                changes.remove_edge(edge);
            }
            changes.add_edge(interval.edge());
            log::debug!(
                "collapsed {} nodes between {up:?} and {down:?} as {id:?}",
                interval.hidden.len()
            );
            self.intervals.insert(id, interval);
            ids.push(id);
        }

        let tail = self.compiled.split_off(start);
        for (offset, node) in tail.into_iter().enumerate() {
            match self.slots[node.0] {
                Slot::Hidden(_) => changes.push_row_removal(start + offset, self.compiled.len()),
                Slot::Visible(_) => {
                    self.slots[node.0] = Slot::Visible(NodeId(self.compiled.len()));
                    self.compiled.push(node);
                }
            }
        }

        changes.normalize();
        (ids, changes)
    }

    /// `ids` must all name live intervals.
    fn show(&mut self, ids: Vec<IntervalId>) -> GraphChanges {
        let mut changes = GraphChanges::default();
        let mut restored = Vec::new();

        for id in ids {
            let Some(interval) = self.intervals.remove(&id) else {
                continue;
            };
            for boundary in [interval.up, interval.down] {
                if let Some(intervals) = self.boundaries.get_mut(&boundary) {
                    intervals.retain(|other| *other != id);
                    if intervals.is_empty() {
                        self.boundaries.remove(&boundary);
                    }
                }
            }

            changes.remove_edge(interval.edge());
            for edge in interval.chain_edges() {
                changes.add_edge(edge);
            }
            for &node in &interval.hidden {
                changes.add_node(node);
            }
            log::debug!(
                "expanded {id:?}, restoring {} nodes",
                interval.hidden.len()
            );
            restored.extend(interval.hidden);
        }

        restored.sort_unstable();
        let Some(&first) = restored.first() else {
            return changes;
        };

        let start = self.compiled.partition_point(|node| *node < first);
        let tail = self.compiled.split_off(start);
        let mut tail = tail.into_iter().peekable();
        let mut restored = restored.into_iter().peekable();
        let mut old_row = start;
        loop {
            let next = match (tail.peek().copied(), restored.peek().copied()) {
                (Some(visible), Some(hidden)) if visible < hidden => tail.next(),
                (_, Some(_)) => {
                    changes.push_row_insertion(old_row, self.compiled.len());
                    restored.next()
                }
                (Some(_), None) => tail.next(),
                (None, None) => break,
            };
            let Some(node) = next else {
                break;
            };
            if !matches!(self.slots[node.0], Slot::Hidden(_)) {
                old_row += 1;
            }
            self.slots[node.0] = Slot::Visible(NodeId(self.compiled.len()));
            self.compiled.push(node);
        }

        changes.normalize();
        changes
    }
}

impl LinearGraph for CollapsedGraph {
    type Id = NodeId;

    fn node_count(&self) -> usize {
        self.compiled.len()
    }

    fn graph_node(&self, id: NodeId) -> Result<GraphNode<NodeId>, GraphError> {
        let full = self.to_full_node_id(id)?;
        let kind = self.full.graph_node(full)?.kind;
        Ok(GraphNode { id, kind })
    }

    fn edges_for(&self, id: NodeId) -> Result<EdgeList<NodeId>, GraphError> {
        let full = self.to_full_node_id(id)?;
        let mut edges = EdgeList::new();

        // Edges into hidden nodes are represented by their interval's
        // collapsed edge below.
        for &down in self.full.down_nodes(full)? {
            if let Slot::Visible(down) = self.slots[down.0] {
                edges.push(GraphEdge::normal(id, down));
            }
        }
        for &up in self.full.up_nodes(full)? {
            if let Slot::Visible(up) = self.slots[up.0] {
                edges.push(GraphEdge::normal(up, id));
            }
        }
        if let Some(intervals) = self.boundaries.get(&full) {
            for interval_id in intervals {
                let Some(interval) = self.intervals.get(interval_id) else {
                    continue;
                };
                let up = self.to_node_id(interval.up)?;
                let down = self.to_node_id(interval.down)?;
                edges.push(GraphEdge::collapsed(up, down, interval.id));
            }
        }

        sort_edges(id, &mut edges);
        Ok(edges)
    }
}
