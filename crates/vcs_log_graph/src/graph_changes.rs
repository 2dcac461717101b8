use std::{mem, ops::Range};

use crate::linear_graph::{FullNodeId, GraphEdge};

/// A replaced span of compiled rows. `old` is expressed in rows of the graph
/// before the change and `new` in rows after it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowEdit {
    pub old: Range<usize>,
    pub new: Range<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeChange {
    pub node: FullNodeId,
    pub removed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeChange {
    pub edge: GraphEdge<FullNodeId>,
    pub removed: bool,
}

/// The difference between two versions of a compiled graph.
///
/// Nodes and edges are named by [`FullNodeId`] so the description stays
/// meaningful once the compiled rows have shifted. Row edits are sorted and
/// never overlap; rows before the first edit are identical in both versions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphChanges {
    pub nodes: Vec<NodeChange>,
    pub edges: Vec<EdgeChange>,
    pub rows: Vec<RowEdit>,
}

impl GraphChanges {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.rows.is_empty()
    }

    pub fn removed_nodes(&self) -> impl Iterator<Item = FullNodeId> + '_ {
        self.nodes
            .iter()
            .filter(|change| change.removed)
            .map(|change| change.node)
    }

    pub fn added_nodes(&self) -> impl Iterator<Item = FullNodeId> + '_ {
        self.nodes
            .iter()
            .filter(|change| !change.removed)
            .map(|change| change.node)
    }

    pub fn removed_edges(&self) -> impl Iterator<Item = GraphEdge<FullNodeId>> + '_ {
        self.edges
            .iter()
            .filter(|change| change.removed)
            .map(|change| change.edge)
    }

    pub fn added_edges(&self) -> impl Iterator<Item = GraphEdge<FullNodeId>> + '_ {
        self.edges
            .iter()
            .filter(|change| !change.removed)
            .map(|change| change.edge)
    }

    /// The first compiled row whose contents differ between the two versions.
    pub fn first_changed_row(&self) -> Option<usize> {
        self.rows.first().map(|edit| edit.old.start)
    }

    /// Turns these changes into the ones that undo them.
    pub fn invert(&mut self) -> &mut Self {
        for change in &mut self.nodes {
            change.removed = !change.removed;
        }
        for change in &mut self.edges {
            change.removed = !change.removed;
        }
        for edit in &mut self.rows {
            mem::swap(&mut edit.old, &mut edit.new);
        }
        self
    }

    pub(crate) fn remove_node(&mut self, node: FullNodeId) {
        self.nodes.push(NodeChange {
            node,
            removed: true,
        });
    }

    pub(crate) fn add_node(&mut self, node: FullNodeId) {
        self.nodes.push(NodeChange {
            node,
            removed: false,
        });
    }

    pub(crate) fn remove_edge(&mut self, edge: GraphEdge<FullNodeId>) {
        self.edges.push(EdgeChange {
            edge,
            removed: true,
        });
    }

    pub(crate) fn add_edge(&mut self, edge: GraphEdge<FullNodeId>) {
        self.edges.push(EdgeChange {
            edge,
            removed: false,
        });
    }

    /// Records that the row `old_row` disappeared and the rows below it now
    /// start at `new_row`. Rows must be pushed in ascending order.
    pub(crate) fn push_row_removal(&mut self, old_row: usize, new_row: usize) {
        if let Some(last) = self.rows.last_mut()
            && last.old.end == old_row
            && last.new.is_empty()
            && last.new.end == new_row
        {
            last.old.end += 1;
            return;
        }
        self.rows.push(RowEdit {
            old: old_row..old_row + 1,
            new: new_row..new_row,
        });
    }

    /// Records that a row appeared at `new_row`, in front of what used to be
    /// `old_row`. Rows must be pushed in ascending order.
    pub(crate) fn push_row_insertion(&mut self, old_row: usize, new_row: usize) {
        if let Some(last) = self.rows.last_mut()
            && last.old.is_empty()
            && last.old.end == old_row
            && last.new.end == new_row
        {
            last.new.end += 1;
            return;
        }
        self.rows.push(RowEdit {
            old: old_row..old_row,
            new: new_row..new_row + 1,
        });
    }

    /// Sorts nodes and edges so that equal changes compare equal no matter
    /// in which order they were recorded.
    pub(crate) fn normalize(&mut self) {
        self.nodes.sort_unstable();
        self.edges.sort_unstable();
    }
}
