//! Edge classification: forward vs back (cyclic), plus orphan report.
//!
//! A depth-first walk from the chosen root, with an explicit stack (the
//! graph's depth is not bounded, so recursion depth must not equal graph
//! depth). An edge `(u -> v)` is a back-edge when `v` is on the current
//! ancestor stack of `u`; back-edges are recorded and never followed, so
//! termination is unconditional. After the root walk, the walk continues
//! from each still-unvisited page in input order so every edge gets a
//! classification, but only pages missed by the *root* walk count as
//! orphans.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::diag::{Diagnostic, DiagnosticKind, DiagnosticsSink};
use crate::graph::StoryGraph;
use crate::types::PageId;

/// Classification of every choice edge relative to a chosen root.
#[derive(Debug, Clone, Serialize)]
pub struct CycleAnalysis {
    /// Back-edges keyed by (source, target).
    back_edges: BTreeSet<(PageId, PageId)>,
    /// Pages unreachable from the root via forward edges, input order.
    orphans: Vec<PageId>,
}

impl Default for CycleAnalysis {
    fn default() -> Self {
        Self {
            back_edges: BTreeSet::new(),
            orphans: Vec::new(),
        }
    }
}

impl CycleAnalysis {
    /// Whether `(source -> target)` was classified as a back-edge.
    pub fn is_back_edge(&self, source: PageId, target: PageId) -> bool {
        self.back_edges.contains(&(source, target))
    }

    /// All back-edges in canonical order.
    pub fn back_edges(&self) -> &BTreeSet<(PageId, PageId)> {
        &self.back_edges
    }

    /// Pages unreachable from the root, in input order.
    pub fn orphans(&self) -> &[PageId] {
        &self.orphans
    }

    /// Whether any cycle was found.
    pub fn has_cycles(&self) -> bool {
        !self.back_edges.is_empty()
    }
}

/// Classify every choice edge as forward or back relative to `root`.
///
/// Pages reachable only through back-edges are still visited once, via
/// their first forward-reachable path. Unreachable pages are reported as
/// orphans, not as part of a cycle.
pub fn classify_edges(
    graph: &StoryGraph,
    root: PageId,
    sink: &dyn DiagnosticsSink,
) -> CycleAnalysis {
    let mut visited: HashSet<PageId> = HashSet::with_capacity(graph.len());
    let mut back_edges: BTreeSet<(PageId, PageId)> = BTreeSet::new();

    if graph.contains(root) {
        dfs_walk(graph, root, &mut visited, &mut back_edges);
    }

    // Everything the root walk missed is an orphan.
    let orphans: Vec<PageId> = graph
        .pages()
        .iter()
        .map(|p| p.id)
        .filter(|id| !visited.contains(id))
        .collect();
    for &page_id in &orphans {
        sink.emit(Diagnostic::new(DiagnosticKind::OrphanPage { page_id }));
    }

    // Continue the walk over orphan islands so every edge is classified.
    for &page_id in &orphans {
        if !visited.contains(&page_id) {
            dfs_walk(graph, page_id, &mut visited, &mut back_edges);
        }
    }

    for &(source, target) in &back_edges {
        sink.emit(Diagnostic::new(DiagnosticKind::CyclicEdge { source, target }));
    }

    CycleAnalysis {
        back_edges,
        orphans,
    }
}

/// One DFS tree of the walk: explicit stack, ancestor set maintained
/// alongside it.
fn dfs_walk(
    graph: &StoryGraph,
    start: PageId,
    visited: &mut HashSet<PageId>,
    back_edges: &mut BTreeSet<(PageId, PageId)>,
) {
    if visited.contains(&start) {
        return;
    }
    visited.insert(start);

    // (page, index of the next outgoing edge to examine)
    let mut stack: Vec<(PageId, usize)> = vec![(start, 0)];
    let mut on_stack: HashSet<PageId> = HashSet::new();
    on_stack.insert(start);

    while let Some(&(page, next)) = stack.last() {
        let edges = graph.outgoing(page);
        if next >= edges.len() {
            on_stack.remove(&page);
            stack.pop();
            continue;
        }
        if let Some(frame) = stack.last_mut() {
            frame.1 += 1;
        }

        let Some(target) = edges[next].target_page_id else {
            // Undeveloped choice: no edge to classify.
            continue;
        };
        if !graph.contains(target) {
            // Dangling target; navigation reports it, the walk skips it.
            continue;
        }

        if on_stack.contains(&target) {
            back_edges.insert((page, target));
        } else if !visited.contains(&target) {
            visited.insert(target);
            on_stack.insert(target);
            stack.push((target, 0));
        }
        // Already-visited, off-stack targets are forward/cross edges:
        // classified forward, not followed again.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{CollectingSink, NoOpSink};
    use crate::types::{Choice, ChoiceId, Page, StoryId};
    use uuid::Uuid;

    fn pid(id: u128) -> PageId {
        PageId::new(Uuid::from_u128(id))
    }

    fn page(id: u128) -> Page {
        Page::new(pid(id), StoryId::new(Uuid::from_u128(99)), "", false)
    }

    fn choice(id: u128, source: u128, target: u128) -> Choice {
        Choice::linked(ChoiceId::new(Uuid::from_u128(id)), pid(source), pid(target), "go")
    }

    fn build(pages: Vec<Page>, choices: Vec<Choice>) -> StoryGraph {
        StoryGraph::from_parts(pages, choices, &NoOpSink)
    }

    #[test]
    fn test_tree_has_no_back_edges() {
        let graph = build(
            vec![page(1), page(2), page(3)],
            vec![choice(1, 1, 2), choice(2, 1, 3)],
        );
        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        assert!(!analysis.has_cycles());
        assert!(analysis.orphans().is_empty());
    }

    #[test]
    fn test_two_cycle_back_edge() {
        // A -> B, B -> A: from root A the edge B -> A is the back-edge.
        let graph = build(
            vec![page(1), page(2)],
            vec![choice(1, 1, 2), choice(2, 2, 1)],
        );
        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        assert!(analysis.is_back_edge(pid(2), pid(1)));
        assert!(!analysis.is_back_edge(pid(1), pid(2)));
        assert_eq!(analysis.back_edges().len(), 1);
    }

    #[test]
    fn test_self_loop_is_back_edge() {
        let graph = build(vec![page(1)], vec![choice(1, 1, 1)]);
        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        assert!(analysis.is_back_edge(pid(1), pid(1)));
    }

    #[test]
    fn test_diamond_is_forward_only() {
        // 1 -> {2, 3} -> 4: the second edge into 4 is forward, not back.
        let graph = build(
            vec![page(1), page(2), page(3), page(4)],
            vec![
                choice(1, 1, 2),
                choice(2, 1, 3),
                choice(3, 2, 4),
                choice(4, 3, 4),
            ],
        );
        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        assert!(!analysis.has_cycles());
    }

    #[test]
    fn test_orphans_reported_in_input_order() {
        let sink = CollectingSink::new();
        let graph = build(
            vec![page(1), page(2), page(3), page(4)],
            vec![choice(1, 1, 2), choice(2, 3, 4)],
        );
        let analysis = classify_edges(&graph, pid(1), &sink);
        assert_eq!(analysis.orphans(), &[pid(3), pid(4)]);
        assert_eq!(sink.count("orphan_page"), 2);
    }

    #[test]
    fn test_orphan_island_cycle_is_classified() {
        // Root component {1, 2}; island {3, 4} is itself a 2-cycle.
        let graph = build(
            vec![page(1), page(2), page(3), page(4)],
            vec![choice(1, 1, 2), choice(2, 3, 4), choice(3, 4, 3)],
        );
        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        // Island pages are orphans, not "part of a cycle"...
        assert_eq!(analysis.orphans(), &[pid(3), pid(4)]);
        // ...but the island's internal cycle still gets its back-edge.
        assert!(analysis.is_back_edge(pid(4), pid(3)));
    }

    #[test]
    fn test_deep_chain_terminates() {
        // A long chain with a back-edge at the bottom; the explicit
        // stack keeps this independent of recursion limits.
        let n = 5_000u128;
        let pages: Vec<Page> = (1..=n).map(page).collect();
        let mut choices: Vec<Choice> = (1..n).map(|i| choice(i, i, i + 1)).collect();
        choices.push(choice(n, n, 1));
        let graph = build(pages, choices);

        let analysis = classify_edges(&graph, pid(1), &NoOpSink);
        assert!(analysis.is_back_edge(pid(n), pid(1)));
        assert!(analysis.orphans().is_empty());
    }
}
