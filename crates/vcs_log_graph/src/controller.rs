use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::{
    GraphError,
    actions::{
        CursorHint, GraphAction, GraphElement, LinearGraphAction, LinearGraphAnswer, PrintElement,
    },
    collapsed_graph::{CollapsedGraph, IntervalId},
    full_graph::FullGraph,
    graph_changes::GraphChanges,
    graph_settings::VcsLogGraphSettings,
    linear_graph::{EdgeKind, FullNodeId, GraphEdge, LinearGraph, NodeId},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum HoverState {
    Idle,
    Hovering(PrintElement),
}

/// What an affected element stands for in the current compiled graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Target {
    /// A normal edge inside a linear branch; the node is one of the branch.
    Collapse(FullNodeId),
    /// A collapsed edge.
    Expand(IntervalId),
    Commit(NodeId, FullNodeId),
    Inert,
}

impl Target {
    fn is_actionable(&self) -> bool {
        matches!(self, Target::Collapse(_) | Target::Expand(_))
    }
}

/// Turns gestures on the rendered log into changes of the compiled graph.
///
/// Actions may be dispatched against a compiled graph that has changed since
/// the element was drawn. Such actions resolve to an empty answer and leave
/// the controller untouched.
pub struct LinearGraphController {
    graph: CollapsedGraph,
    hover: HoverState,
    settings: VcsLogGraphSettings,
}

impl LinearGraphController {
    pub fn new(full: Arc<FullGraph>, settings: VcsLogGraphSettings) -> Self {
        let mut this = Self {
            graph: CollapsedGraph::new(full),
            hover: HoverState::Idle,
            settings,
        };
        this.apply_load_settings();
        this
    }

    pub fn compiled_graph(&self) -> &CollapsedGraph {
        &self.graph
    }

    pub fn settings(&self) -> &VcsLogGraphSettings {
        &self.settings
    }

    pub fn is_hovering(&self) -> bool {
        matches!(self.hover, HoverState::Hovering(_))
    }

    pub fn hovered_element(&self) -> Option<&PrintElement> {
        match &self.hover {
            HoverState::Idle => None,
            HoverState::Hovering(element) => Some(element),
        }
    }

    /// Fails only when the compiled graph turns out to be inconsistent.
    pub fn perform_linear_graph_action(
        &mut self,
        action: LinearGraphAction,
    ) -> Result<LinearGraphAnswer> {
        match action {
            GraphAction::HoverLeave => Ok(self.end_hover(LinearGraphAnswer::new())),
            GraphAction::HoverEnter(element) => {
                let Some(target) = self.resolve(&element)? else {
                    return Ok(LinearGraphAnswer::new());
                };
                if target.is_actionable() {
                    log::trace!("hovering {element:?}");
                    self.hover = HoverState::Hovering(element);
                    Ok(LinearGraphAnswer::new().with_cursor(CursorHint::Pointer))
                } else {
                    Ok(self.end_hover(LinearGraphAnswer::new()))
                }
            }
            GraphAction::Click(element) => match self.resolve(&element)? {
                Some(target) => self.click(target),
                None => Ok(LinearGraphAnswer::new()),
            },
        }
    }

    /// Scrolls to `node`, expanding the interval that hides it if needed.
    pub fn reveal(&mut self, node: FullNodeId) -> Result<LinearGraphAnswer> {
        let mut answer = LinearGraphAnswer::new();
        let row = match self.graph.to_node_id(node) {
            Ok(row) => row,
            Err(GraphError::NotVisible { interval, .. }) => {
                let changes = self
                    .graph
                    .expand(interval)
                    .with_context(|| format!("expanding {interval:?} to reveal {node:?}"))?;
                self.hover = HoverState::Idle;
                answer = answer.with_graph_changes(changes);
                self.graph
                    .to_node_id(node)
                    .with_context(|| format!("{node:?} is still hidden after expanding"))?
            }
            Err(error) => return Err(error).context("revealing a commit"),
        };
        Ok(answer.with_commit_to_jump(node).with_selection([row]))
    }

    pub fn collapse_all(&mut self) -> LinearGraphAnswer {
        let changes = self.graph.collapse_all(self.settings.min_linear_branch_len);
        self.bulk_answer(changes)
    }

    pub fn expand_all(&mut self) -> LinearGraphAnswer {
        let changes = self.graph.expand_all();
        self.bulk_answer(changes)
    }

    /// Starts over with a new snapshot of the history. Every id handed out
    /// for the previous graph becomes stale.
    pub fn replace_full_graph(&mut self, full: Arc<FullGraph>) {
        log::debug!("replacing full graph with {} nodes", full.len());
        self.graph = CollapsedGraph::new(full);
        self.hover = HoverState::Idle;
        self.apply_load_settings();
    }

    fn apply_load_settings(&mut self) {
        if self.settings.collapse_linear_branches_on_load {
            self.graph.collapse_all(self.settings.min_linear_branch_len);
        }
    }

    /// Hovering ends only once the click has been applied.
    fn click(&mut self, target: Target) -> Result<LinearGraphAnswer> {
        let answer = match target {
            Target::Collapse(node) => {
                let result = self.graph.collapse_branch(node).map(|(_, changes)| changes);
                Self::structural_answer(result)?
            }
            Target::Expand(interval) => Self::structural_answer(self.graph.expand(interval))?,
            Target::Commit(node, full) => LinearGraphAnswer::new()
                .with_commit_to_jump(full)
                .with_selection([node]),
            Target::Inert => LinearGraphAnswer::new(),
        };
        Ok(self.end_hover(answer))
    }

    fn end_hover(&mut self, answer: LinearGraphAnswer) -> LinearGraphAnswer {
        match self.hover {
            HoverState::Idle => answer,
            HoverState::Hovering(element) => {
                log::trace!("stopped hovering {element:?}");
                self.hover = HoverState::Idle;
                answer.with_cursor(CursorHint::Default)
            }
        }
    }

    fn bulk_answer(&mut self, changes: GraphChanges) -> LinearGraphAnswer {
        if changes.is_empty() {
            return LinearGraphAnswer::new();
        }
        self.hover = HoverState::Idle;
        LinearGraphAnswer::new()
            .with_graph_changes(changes)
            .with_selection([])
    }

    fn structural_answer(result: Result<GraphChanges, GraphError>) -> Result<LinearGraphAnswer> {
        match result {
            Ok(changes) => Ok(LinearGraphAnswer::new()
                .with_graph_changes(changes)
                .with_selection([])),
            Err(error) if error.is_stale() => {
                log::debug!("ignoring stale graph action: {error}");
                Ok(LinearGraphAnswer::new())
            }
            Err(error) => Err(error).context("applying a graph action"),
        }
    }

    /// `None` when the element does not exist in the current compiled graph.
    fn resolve(&self, element: &PrintElement) -> Result<Option<Target>> {
        match element.element {
            GraphElement::Node(node) => match self.graph.to_full_node_id(node) {
                Ok(full) => Ok(Some(Target::Commit(node, full))),
                Err(error) => {
                    log::debug!("ignoring action on stale node: {error}");
                    Ok(None)
                }
            },
            GraphElement::Edge(edge) => {
                if !self.edge_exists(&edge) {
                    log::debug!("ignoring action on stale edge {edge:?}");
                    return Ok(None);
                }
                match edge.kind {
                    EdgeKind::Collapsed(interval) => Ok(Some(Target::Expand(interval))),
                    EdgeKind::Normal => {
                        for end in [edge.down, edge.up] {
                            let full = self.graph.to_full_node_id(end)?;
                            let branch = self
                                .graph
                                .linear_branch(full)
                                .context("resolving the branch of an edge")?;
                            if branch.is_some() {
                                return Ok(Some(Target::Collapse(full)));
                            }
                        }
                        Ok(Some(Target::Inert))
                    }
                }
            }
        }
    }

    fn edge_exists(&self, edge: &GraphEdge<NodeId>) -> bool {
        self.graph
            .edges_for(edge.up)
            .is_ok_and(|edges| edges.contains(edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::GraphAnswer;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn controller(node_count: usize, edges: &[(usize, usize)]) -> LinearGraphController {
        controller_with_settings(node_count, edges, VcsLogGraphSettings::default())
    }

    fn controller_with_settings(
        node_count: usize,
        edges: &[(usize, usize)],
        settings: VcsLogGraphSettings,
    ) -> LinearGraphController {
        let full = FullGraph::from_edges(node_count, edges.iter().copied()).unwrap();
        LinearGraphController::new(Arc::new(full), settings)
    }

    fn full(ids: &[usize]) -> Vec<FullNodeId> {
        ids.iter().copied().map(FullNodeId).collect()
    }

    fn edge_element(up: usize, down: usize) -> PrintElement {
        PrintElement::edge(up, GraphEdge::normal(NodeId(up), NodeId(down)))
    }

    #[test]
    fn test_click_on_commit() {
        let mut controller = controller(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]);
        let answer = controller
            .perform_linear_graph_action(GraphAction::Click(PrintElement::node(NodeId(3))))
            .unwrap();

        assert_eq!(answer.graph_changes(), None);
        assert_eq!(answer.commit_to_jump(), Some(FullNodeId(3)));
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::from([NodeId(3)])));
        assert_eq!(answer.cursor_to_set(), None);
    }

    #[test]
    fn test_click_on_commit_below_collapsed_branch() {
        // Rows and full ids diverge once the branch is hidden.
        let mut controller = controller(6, &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 5), (4, 5)]);
        controller
            .perform_linear_graph_action(GraphAction::Click(edge_element(0, 1)))
            .unwrap();
        assert_eq!(controller.compiled_graph().compiled_nodes(), &full(&[0, 5])[..]);

        let answer = controller
            .perform_linear_graph_action(GraphAction::Click(PrintElement::node(NodeId(1))))
            .unwrap();
        assert_eq!(answer.commit_to_jump(), Some(FullNodeId(5)));
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::from([NodeId(1)])));
    }

    #[test]
    fn test_hover_collapse_indicator() {
        let mut controller = controller(4, &[(0, 1), (1, 2), (2, 3)]);
        let indicator = edge_element(0, 1);

        let answer = controller
            .perform_linear_graph_action(GraphAction::HoverEnter(indicator))
            .unwrap();
        assert_eq!(answer.cursor_to_set(), Some(CursorHint::Pointer));
        assert_eq!(answer.graph_changes(), None);
        assert_eq!(controller.hovered_element(), Some(&indicator));

        let answer = controller
            .perform_linear_graph_action(GraphAction::HoverLeave)
            .unwrap();
        assert_eq!(answer.cursor_to_set(), Some(CursorHint::Default));
        assert_eq!(answer.graph_changes(), None);
        assert!(!controller.is_hovering());

        let answer = controller
            .perform_linear_graph_action(GraphAction::HoverLeave)
            .unwrap();
        assert!(answer.is_empty());
    }

    #[test]
    fn test_hover_inert_elements() {
        let mut controller = controller(3, &[(0, 1), (1, 2), (0, 2)]);

        // Nodes are never collapse or expand indicators.
        let answer = controller
            .perform_linear_graph_action(GraphAction::HoverEnter(PrintElement::node(NodeId(1))))
            .unwrap();
        assert!(answer.is_empty());
        assert!(!controller.is_hovering());

        controller
            .perform_linear_graph_action(GraphAction::HoverEnter(edge_element(0, 1)))
            .unwrap();
        assert!(controller.is_hovering());

        // The edge between the two ends of the branch does not belong to it.
        let answer = controller
            .perform_linear_graph_action(GraphAction::HoverEnter(edge_element(0, 2)))
            .unwrap();
        assert_eq!(answer.cursor_to_set(), Some(CursorHint::Default));
        assert!(!controller.is_hovering());
    }

    #[test]
    fn test_click_collapse_then_expand() {
        let mut controller = controller(4, &[(0, 1), (1, 2), (2, 3)]);
        controller
            .perform_linear_graph_action(GraphAction::HoverEnter(edge_element(1, 2)))
            .unwrap();

        let answer = controller
            .perform_linear_graph_action(GraphAction::Click(edge_element(1, 2)))
            .unwrap();
        let changes = answer.graph_changes().unwrap().clone();
        assert_eq!(changes.removed_nodes().collect::<Vec<_>>(), full(&[1, 2]));
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::new()));
        assert_eq!(answer.cursor_to_set(), Some(CursorHint::Default));
        assert!(!controller.is_hovering());
        assert_eq!(controller.compiled_graph().compiled_nodes(), &full(&[0, 3])[..]);

        let collapsed = controller.compiled_graph().edges_for(NodeId(0)).unwrap()[0];
        assert!(collapsed.is_collapsed());
        let hover = controller
            .perform_linear_graph_action(GraphAction::HoverEnter(PrintElement::edge(0, collapsed)))
            .unwrap();
        assert_eq!(hover.cursor_to_set(), Some(CursorHint::Pointer));

        let answer = controller
            .perform_linear_graph_action(GraphAction::Click(PrintElement::edge(0, collapsed)))
            .unwrap();
        assert_eq!(
            answer.into_graph_changes(),
            Some(changes.clone().invert().clone())
        );
        assert_eq!(
            controller.compiled_graph().compiled_nodes(),
            &full(&[0, 1, 2, 3])[..]
        );
    }

    #[test]
    fn test_stale_actions_are_ignored() {
        let mut controller = controller(4, &[(0, 1), (1, 2), (2, 3)]);
        controller
            .perform_linear_graph_action(GraphAction::Click(edge_element(0, 1)))
            .unwrap();
        let compiled = controller.compiled_graph().compiled_nodes().to_vec();

        controller
            .perform_linear_graph_action(GraphAction::HoverEnter(PrintElement::edge(
                0,
                controller.compiled_graph().edges_for(NodeId(0)).unwrap()[0],
            )))
            .unwrap();

        for element in [
            PrintElement::node(NodeId(2)),
            PrintElement::node(NodeId(10)),
            edge_element(0, 1),
            edge_element(1, 2),
            edge_element(7, 8),
        ] {
            for action in [GraphAction::Click(element), GraphAction::HoverEnter(element)] {
                let answer = controller.perform_linear_graph_action(action).unwrap();
                assert!(answer.is_empty(), "{action:?} should be ignored");
                assert!(controller.is_hovering());
                assert_eq!(controller.compiled_graph().compiled_nodes(), &compiled[..]);
            }
        }
    }

    #[test]
    fn test_failed_click_keeps_hover() {
        let mut controller = controller(4, &[(0, 1), (1, 2), (2, 3)]);
        let indicator = edge_element(0, 1);
        controller
            .perform_linear_graph_action(GraphAction::HoverEnter(indicator))
            .unwrap();

        // A branch node outside of the graph can only come from a broken
        // mapping, so the click escalates.
        assert!(controller.click(Target::Collapse(FullNodeId(9))).is_err());
        assert_eq!(controller.hovered_element(), Some(&indicator));
        assert_eq!(
            controller.compiled_graph().compiled_nodes(),
            &full(&[0, 1, 2, 3])[..]
        );

        let answer = controller.click(Target::Inert).unwrap();
        assert_eq!(answer.cursor_to_set(), Some(CursorHint::Default));
        assert!(!controller.is_hovering());
    }

    #[test]
    fn test_reveal() {
        let mut controller = controller(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        assert!(!controller.collapse_all().is_empty());
        assert_eq!(controller.compiled_graph().compiled_nodes(), &full(&[0, 4])[..]);

        let answer = controller.reveal(FullNodeId(4)).unwrap();
        assert_eq!(answer.graph_changes(), None);
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::from([NodeId(1)])));

        let answer = controller.reveal(FullNodeId(2)).unwrap();
        assert_eq!(
            answer.graph_changes().unwrap().added_nodes().collect::<Vec<_>>(),
            full(&[1, 2, 3])
        );
        assert_eq!(answer.commit_to_jump(), Some(FullNodeId(2)));
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::from([NodeId(2)])));

        assert!(controller.reveal(FullNodeId(5)).is_err());
    }

    #[test]
    fn test_bulk_actions() {
        let mut controller = controller(4, &[(0, 1), (1, 2), (2, 3)]);
        assert!(controller.expand_all().is_empty());

        let answer = controller.collapse_all();
        assert_eq!(answer.selected_node_ids(), Some(&BTreeSet::new()));
        assert!(controller.collapse_all().is_empty());

        let answer = controller.expand_all();
        assert_eq!(answer.graph_changes().unwrap().added_nodes().count(), 2);
        assert_eq!(controller.compiled_graph().node_count(), 4);
    }

    #[test]
    fn test_collapse_on_load() {
        // 0 -> 1 -> 4, 0 -> 2 -> 3 -> 4
        let edges = [(0, 1), (1, 4), (0, 2), (2, 3), (3, 4)];
        let settings = VcsLogGraphSettings {
            collapse_linear_branches_on_load: true,
            min_linear_branch_len: 2,
        };
        let mut controller = controller_with_settings(5, &edges, settings);
        assert_eq!(controller.compiled_graph().compiled_nodes(), &full(&[0, 1, 4])[..]);

        controller
            .perform_linear_graph_action(GraphAction::HoverEnter(edge_element(0, 1)))
            .unwrap();
        let full_graph = FullGraph::from_edges(5, edges).unwrap();
        controller.replace_full_graph(Arc::new(full_graph));
        assert!(!controller.is_hovering());
        assert_eq!(controller.compiled_graph().compiled_nodes(), &full(&[0, 1, 4])[..]);
    }
}
