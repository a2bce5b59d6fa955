//! Deterministic breadth-first presentation order of a story's pages.
//!
//! A visited-set BFS from the root over forward edges produces the
//! listing/editing order; orphans are appended afterwards in input
//! order, each flagged. The BFS discovery parent (the first non-cyclic
//! incoming edge on the root-first walk) is stored on every entry as
//! the page's display parent, so layout never has to re-infer it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::cycle::CycleAnalysis;
use crate::diag::{Diagnostic, DiagnosticKind, DiagnosticsSink};
use crate::graph::StoryGraph;
use crate::types::PageId;

/// One page in the presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalEntry {
    /// The page.
    pub page_id: PageId,
    /// Whether this page was unreachable from the root (diagnostic
    /// marker for the listing UI).
    pub orphan: bool,
    /// Parent used for display: the source of the first non-cyclic
    /// incoming edge on the root-first walk. `None` for the root and
    /// for orphan island heads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_parent: Option<PageId>,
}

/// Deterministic, duplicate-free ordering of all pages.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalOrder {
    entries: Vec<TraversalEntry>,
    #[serde(skip)]
    positions: HashMap<PageId, usize>,
}

impl Default for TraversalOrder {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TraversalOrder {
    fn new(entries: Vec<TraversalEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.page_id, i))
            .collect();
        Self { entries, positions }
    }

    /// Entries in presentation order.
    pub fn entries(&self) -> &[TraversalEntry] {
        &self.entries
    }

    /// Page ids in presentation order.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.entries.iter().map(|e| e.page_id).collect()
    }

    /// Position of a page in the order.
    pub fn position(&self, id: PageId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Display parent of a page.
    pub fn display_parent(&self, id: PageId) -> Option<PageId> {
        self.positions
            .get(&id)
            .and_then(|&i| self.entries[i].display_parent)
    }

    /// Number of entries (equals the deduplicated page count).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the order is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produce the breadth-first presentation order of all pages.
///
/// Guarantees: output length equals the deduplicated page count; the
/// order is stable given stable input order; the root is first when a
/// root exists.
pub fn traversal_order(
    graph: &StoryGraph,
    root: PageId,
    cycles: &CycleAnalysis,
    sink: &dyn DiagnosticsSink,
) -> TraversalOrder {
    let mut visited: HashSet<PageId> = HashSet::with_capacity(graph.len());
    let mut parents: HashMap<PageId, PageId> = HashMap::new();
    let mut main_order: Vec<PageId> = Vec::with_capacity(graph.len());

    if graph.contains(root) {
        bfs_walk(graph, root, cycles, sink, &mut visited, &mut parents, &mut main_order);
    }

    let mut entries: Vec<TraversalEntry> = main_order
        .iter()
        .map(|&page_id| TraversalEntry {
            page_id,
            orphan: false,
            display_parent: parents.get(&page_id).copied(),
        })
        .collect();

    // Walk each orphan island so its members get display parents, then
    // append the orphans in original input order.
    let orphans: Vec<PageId> = graph
        .pages()
        .iter()
        .map(|p| p.id)
        .filter(|id| !visited.contains(id))
        .collect();
    for &head in &orphans {
        if !visited.contains(&head) {
            let mut island_order = Vec::new();
            bfs_walk(graph, head, cycles, sink, &mut visited, &mut parents, &mut island_order);
        }
    }
    for page_id in orphans {
        entries.push(TraversalEntry {
            page_id,
            orphan: true,
            display_parent: parents.get(&page_id).copied(),
        });
    }

    TraversalOrder::new(entries)
}

/// Visited-set BFS over forward (non-back) developed edges. A page
/// already visited is never re-enqueued, which is what keeps
/// multi-parent pages and cycles safe.
fn bfs_walk(
    graph: &StoryGraph,
    start: PageId,
    cycles: &CycleAnalysis,
    sink: &dyn DiagnosticsSink,
    visited: &mut HashSet<PageId>,
    parents: &mut HashMap<PageId, PageId>,
    order: &mut Vec<PageId>,
) {
    let mut queue: VecDeque<PageId> = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(page) = queue.pop_front() {
        order.push(page);

        for edge in graph.outgoing(page) {
            let Some(target) = edge.target_page_id else {
                continue;
            };
            if !graph.contains(target) || cycles.is_back_edge(page, target) {
                continue;
            }
            if visited.insert(target) {
                parents.insert(target, page);
                queue.push_back(target);
            } else if parents.get(&target) != Some(&page) {
                sink.emit(Diagnostic::new(DiagnosticKind::MultiParentPage {
                    page_id: target,
                    extra_parent: page,
                }));
            }
        }
    }
}
