//! Root resolution: which page does the story start on?

use crate::diag::{Diagnostic, DiagnosticKind, DiagnosticsSink};
use crate::graph::StoryGraph;
use crate::types::Page;

/// Resolve the canonical starting page of a story's graph.
///
/// The candidates are pages never referenced as a developed choice
/// target. With exactly one candidate the answer is forced; with
/// several, the page with the most outgoing choices wins (the page an
/// author is most likely treating as the entry point; a heuristic, not
/// a documented contract; ties fall back to input order). With none,
/// which means the whole graph is one or more cycles, the first page in
/// input order is a degraded but defined answer, reported through the
/// sink.
///
/// Returns `None` only when the story has no pages.
pub fn resolve_root<'g>(graph: &'g StoryGraph, sink: &dyn DiagnosticsSink) -> Option<&'g Page> {
    if graph.is_empty() {
        return None;
    }

    let referenced = graph.referenced_targets();
    let candidates: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| !referenced.contains(&p.id))
        .collect();

    match candidates.len() {
        0 => {
            let fallback = &graph.pages()[0];
            sink.emit(Diagnostic::new(DiagnosticKind::NoUnreferencedPage {
                fallback: fallback.id,
            }));
            Some(fallback)
        }
        1 => Some(candidates[0]),
        n => {
            // Most outgoing choices wins; max_by_key returns the last
            // maximum, so scan manually to keep the first on ties.
            let mut best = candidates[0];
            let mut best_degree = graph.outgoing(best.id).len();
            for &page in &candidates[1..] {
                let degree = graph.outgoing(page.id).len();
                if degree > best_degree {
                    best = page;
                    best_degree = degree;
                }
            }
            sink.emit(Diagnostic::new(DiagnosticKind::MultipleRootCandidates {
                candidate_count: n,
                chosen: best.id,
            }));
            Some(best)
        }
    }
}
