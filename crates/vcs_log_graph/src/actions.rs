use std::collections::BTreeSet;

use crate::{
    graph_changes::GraphChanges,
    linear_graph::{FullNodeId, GraphEdge, NodeId},
};

/// A node or edge of the compiled graph, in compiled coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphElement {
    Node(NodeId),
    Edge(GraphEdge<NodeId>),
}

/// A glyph drawn in a particular row of the log.
///
/// Edges span several rows and are drawn in each of them, so the row is kept
/// alongside the element. It is only used to tell glyphs apart; resolution
/// always goes through the element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrintElement {
    pub row: usize,
    pub element: GraphElement,
}

impl PrintElement {
    pub fn node(node: NodeId) -> Self {
        Self {
            row: node.0,
            element: GraphElement::Node(node),
        }
    }

    pub fn edge(row: usize, edge: GraphEdge<NodeId>) -> Self {
        Self {
            row,
            element: GraphElement::Edge(edge),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphAction<E> {
    Click(E),
    HoverEnter(E),
    /// The pointer left whatever element it was over.
    HoverLeave,
}

impl<E> GraphAction<E> {
    pub fn affected_element(&self) -> Option<&E> {
        match self {
            GraphAction::Click(element) | GraphAction::HoverEnter(element) => Some(element),
            GraphAction::HoverLeave => None,
        }
    }
}

pub type LinearGraphAction = GraphAction<PrintElement>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CursorHint {
    #[default]
    Default,
    Pointer,
}

pub trait GraphAnswer {
    type CommitId;

    fn cursor_to_set(&self) -> Option<CursorHint>;
    fn commit_to_jump(&self) -> Option<Self::CommitId>;
}

/// What the view should do after an action.
///
/// Every field is optional and a missing field means the controller has no
/// opinion about it. In particular `selected_node_ids() == None` keeps the
/// current selection, while `Some` of an empty set clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinearGraphAnswer {
    graph_changes: Option<GraphChanges>,
    cursor_to_set: Option<CursorHint>,
    commit_to_jump: Option<FullNodeId>,
    selected_node_ids: Option<BTreeSet<NodeId>>,
}

impl LinearGraphAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty changes are dropped so that an answer carrying changes always
    /// describes an actual structural edit.
    pub fn with_graph_changes(mut self, changes: GraphChanges) -> Self {
        self.graph_changes = (!changes.is_empty()).then_some(changes);
        self
    }

    pub fn with_cursor(mut self, cursor: CursorHint) -> Self {
        self.cursor_to_set = Some(cursor);
        self
    }

    pub fn with_commit_to_jump(mut self, commit: FullNodeId) -> Self {
        self.commit_to_jump = Some(commit);
        self
    }

    pub fn with_selection(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.selected_node_ids = Some(nodes.into_iter().collect());
        self
    }

    pub fn graph_changes(&self) -> Option<&GraphChanges> {
        self.graph_changes.as_ref()
    }

    pub fn selected_node_ids(&self) -> Option<&BTreeSet<NodeId>> {
        self.selected_node_ids.as_ref()
    }

    pub fn into_graph_changes(self) -> Option<GraphChanges> {
        self.graph_changes
    }

    /// Whether the answer asks the view to do nothing at all.
    pub fn is_empty(&self) -> bool {
        self.graph_changes.is_none()
            && self.cursor_to_set.is_none()
            && self.commit_to_jump.is_none()
            && self.selected_node_ids.is_none()
    }
}

impl GraphAnswer for LinearGraphAnswer {
    type CommitId = FullNodeId;

    fn cursor_to_set(&self) -> Option<CursorHint> {
        self.cursor_to_set
    }

    fn commit_to_jump(&self) -> Option<FullNodeId> {
        self.commit_to_jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_not_cleared_fields() {
        let answer = LinearGraphAnswer::new();
        assert!(answer.is_empty());
        assert_eq!(answer.selected_node_ids(), None);

        let answer = LinearGraphAnswer::new().with_selection([]);
        assert!(!answer.is_empty());
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::new()));
    }

    #[test]
    fn test_empty_changes_are_dropped() {
        let answer = LinearGraphAnswer::new().with_graph_changes(GraphChanges::default());
        assert_eq!(answer.graph_changes(), None);
        assert!(answer.is_empty());
    }

    #[test]
    fn test_affected_element() {
        let element = PrintElement::node(NodeId(2));
        assert_eq!(element.row, 2);
        assert_eq!(
            GraphAction::Click(element).affected_element(),
            Some(&element)
        );
        assert_eq!(LinearGraphAction::HoverLeave.affected_element(), None);
    }
}
