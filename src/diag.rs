//! Structural diagnostics for the narrative graph.
//!
//! Duplicate ids, duplicate edges, cycles, orphans, and multi-parent
//! pages are *detected and annotated, never thrown*: the engine degrades
//! to a defined fallback and keeps going. Every such condition flows
//! through a single [`DiagnosticsSink`] injected into the engine, so
//! production routes them to `tracing` while tests assert on the exact
//! sequence emitted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChoiceId, PageId};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    /// Expected degradation, useful while authoring.
    Info,
    /// Structural anomaly worth surfacing to the author.
    Warning,
}

impl fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A structural condition detected while building or deriving the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The input page set repeated an id; the first occurrence was kept.
    DuplicatePageId {
        /// The repeated page id.
        page_id: PageId,
    },
    /// Two choices share a (source, target) pair; the first was kept.
    DuplicateChoice {
        /// Source page of the collapsed pair.
        source: PageId,
        /// Target page of the collapsed pair.
        target: PageId,
        /// The choice that was dropped from the read view.
        dropped: ChoiceId,
    },
    /// A choice targets an ancestor of its source (back-edge).
    CyclicEdge {
        /// Edge source.
        source: PageId,
        /// Edge target (the ancestor).
        target: PageId,
    },
    /// A page is unreachable from the root via forward edges.
    OrphanPage {
        /// The unreachable page.
        page_id: PageId,
    },
    /// A page is targeted by more than one forward edge; the first
    /// encountered on the root-first walk is its display parent.
    MultiParentPage {
        /// The multiply-targeted page.
        page_id: PageId,
        /// The parent that was not chosen for display.
        extra_parent: PageId,
    },
    /// Every page is a choice target; root resolution fell back to the
    /// first page in input order.
    NoUnreferencedPage {
        /// The fallback root.
        fallback: PageId,
    },
    /// Several pages are never targeted; the one with the most choices
    /// was picked as root.
    MultipleRootCandidates {
        /// How many candidates were found.
        candidate_count: usize,
        /// The page picked as root.
        chosen: PageId,
    },
}

impl DiagnosticKind {
    /// Default severity for this kind.
    pub fn level(&self) -> DiagLevel {
        match self {
            Self::DuplicatePageId { .. } => DiagLevel::Warning,
            Self::DuplicateChoice { .. } => DiagLevel::Warning,
            Self::CyclicEdge { .. } => DiagLevel::Info,
            Self::OrphanPage { .. } => DiagLevel::Warning,
            Self::MultiParentPage { .. } => DiagLevel::Info,
            Self::NoUnreferencedPage { .. } => DiagLevel::Warning,
            Self::MultipleRootCandidates { .. } => DiagLevel::Info,
        }
    }

    /// Short machine-readable name, used as the tracing event label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuplicatePageId { .. } => "duplicate_page_id",
            Self::DuplicateChoice { .. } => "duplicate_choice",
            Self::CyclicEdge { .. } => "cyclic_edge",
            Self::OrphanPage { .. } => "orphan_page",
            Self::MultiParentPage { .. } => "multi_parent_page",
            Self::NoUnreferencedPage { .. } => "no_unreferenced_page",
            Self::MultipleRootCandidates { .. } => "multiple_root_candidates",
        }
    }
}

/// A leveled diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagLevel,
    /// What was detected.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a diagnostic at the kind's default level.
    pub fn new(kind: DiagnosticKind) -> Self {
        Self {
            level: kind.level(),
            kind,
        }
    }
}

/// Sink for structural diagnostics.
///
/// Injected into graph construction and every derivation so diagnostics
/// are observable without global state.
pub trait DiagnosticsSink: Send + Sync {
    /// Record one diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Production sink: routes diagnostics to `tracing` at their level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagLevel::Warning => tracing::warn!(
                kind = diagnostic.kind.name(),
                detail = ?diagnostic.kind,
                "graph structure: {}",
                diagnostic.kind.name()
            ),
            DiagLevel::Info => tracing::debug!(
                kind = diagnostic.kind.name(),
                detail = ?diagnostic.kind,
                "graph structure: {}",
                diagnostic.kind.name()
            ),
        }
    }
}

/// Silent sink.
#[derive(Debug, Default)]
pub struct NoOpSink;

impl DiagnosticsSink for NoOpSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Collecting sink for tests: buffers every diagnostic for assertions.
#[derive(Debug, Default)]
pub struct CollectingSink {
    collected: parking_lot::Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.collected.lock())
    }

    /// All diagnostics matching a predicate on the kind name.
    pub fn of_kind(&self, name: &str) -> Vec<Diagnostic> {
        self.collected
            .lock()
            .iter()
            .filter(|d| d.kind.name() == name)
            .cloned()
            .collect()
    }

    /// Count of diagnostics with the given kind name.
    pub fn count(&self, name: &str) -> usize {
        self.collected
            .lock()
            .iter()
            .filter(|d| d.kind.name() == name)
            .count()
    }

    /// Total number of diagnostics emitted.
    pub fn len(&self) -> usize {
        self.collected.lock().len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.collected.lock().is_empty()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.collected.lock().push(diagnostic);
    }
}
