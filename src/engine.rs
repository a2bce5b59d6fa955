//! Engine façade: analysis pipeline and layout memoization.
//!
//! [`StoryEngine`] bundles the diagnostics sink and layout
//! configuration, runs the root/cycles/order pipeline in one call, and
//! memoizes computed layouts behind a [`GraphFingerprint`]. The cache
//! is purely a performance lever; every derivation is a pure function
//! over the snapshot and may be recomputed on any render. The
//! fingerprint is the only invalidation rule needed: a different
//! page/choice set hashes to a different key.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;

use crate::canonical::canonical_hash_hex;
use crate::cycle::{classify_edges, CycleAnalysis};
use crate::diag::DiagnosticsSink;
use crate::graph::StoryGraph;
use crate::layout::{layout_tree, LayoutConfig, TreeLayout};
use crate::order::{traversal_order, TraversalOrder};
use crate::root::resolve_root;
use crate::types::PageId;

/// Content-derived identity of a graph snapshot's structure.
///
/// Two snapshots with the same pages (ids, in order) and the same
/// developed edges (in order) share a fingerprint. Narrative text does
/// not participate: editing prose never invalidates a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphFingerprint(String);

impl GraphFingerprint {
    /// Compute the fingerprint of a graph snapshot.
    pub fn of(graph: &StoryGraph) -> Self {
        #[derive(Serialize)]
        struct Structure<'a> {
            pages: Vec<PageId>,
            edges: Vec<(PageId, Option<PageId>)>,
            schema_version: &'a str,
        }

        let structure = Structure {
            pages: graph.pages().iter().map(|p| p.id).collect(),
            edges: graph
                .choices()
                .iter()
                .map(|c| (c.page_id, c.target_page_id))
                .collect(),
            schema_version: crate::ENGINE_SCHEMA_VERSION,
        };
        Self(canonical_hash_hex(&structure))
    }

    /// Get the fingerprint as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Layout cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether layouts are memoized at all.
    pub enabled: bool,
    /// Maximum cached layouts before LRU eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 64,
        }
    }
}

/// Hit/miss counters for the layout cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Number of layouts served from cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of layouts computed.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Everything derived from one graph snapshot.
#[derive(Debug, Clone)]
pub struct GraphAnalysis {
    /// Resolved root, absent only for an empty story.
    pub root: Option<PageId>,
    /// Edge classification and orphan report.
    pub cycles: CycleAnalysis,
    /// Breadth-first presentation order.
    pub order: TraversalOrder,
}

/// Engine façade over the derivation pipeline.
pub struct StoryEngine {
    sink: Arc<dyn DiagnosticsSink>,
    layout_config: LayoutConfig,
    cache: Option<RwLock<LruCache<GraphFingerprint, Arc<TreeLayout>>>>,
    stats: CacheStats,
}

impl StoryEngine {
    /// Create an engine with default layout and cache settings.
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self::with_config(sink, LayoutConfig::default(), CacheConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(
        sink: Arc<dyn DiagnosticsSink>,
        layout_config: LayoutConfig,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = if cache_config.enabled {
            let size = NonZeroUsize::new(cache_config.max_entries)
                .unwrap_or_else(|| NonZeroUsize::new(64).expect("64 is non-zero"));
            Some(RwLock::new(LruCache::new(size)))
        } else {
            None
        };
        Self {
            sink,
            layout_config,
            cache,
            stats: CacheStats::default(),
        }
    }

    /// The layout configuration in use.
    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    /// Cache hit/miss counters.
    pub fn cache_stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Run the full derivation pipeline: root, cycle classification,
    /// traversal order.
    pub fn analyze(&self, graph: &StoryGraph) -> GraphAnalysis {
        let Some(root) = resolve_root(graph, self.sink.as_ref()).map(|p| p.id) else {
            return GraphAnalysis {
                root: None,
                cycles: CycleAnalysis::default(),
                order: TraversalOrder::default(),
            };
        };
        let cycles = classify_edges(graph, root, self.sink.as_ref());
        let order = traversal_order(graph, root, &cycles, self.sink.as_ref());
        GraphAnalysis {
            root: Some(root),
            cycles,
            order,
        }
    }

    /// Compute (or fetch) the layout for an analyzed graph.
    pub fn layout(&self, graph: &StoryGraph, analysis: &GraphAnalysis) -> Arc<TreeLayout> {
        let fingerprint = GraphFingerprint::of(graph);

        if let Some(cache) = &self.cache {
            if let Some(layout) = cache.read().peek(&fingerprint) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(layout);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let layout = Arc::new(layout_tree(&analysis.order, &self.layout_config));

        if let Some(cache) = &self.cache {
            cache.write().put(fingerprint, Arc::clone(&layout));
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NoOpSink;
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

    fn small_graph() -> StoryGraph {
        StoryGraph::from_parts(
            vec![page(1), page(2), page(3)],
            vec![choice(1, 1, 2), choice(2, 1, 3)],
            &NoOpSink,
        )
    }

    #[test]
    fn test_analyze_pipeline() {
        let engine = StoryEngine::new(Arc::new(NoOpSink));
        let graph = small_graph();
        let analysis = engine.analyze(&graph);

        assert_eq!(analysis.root, Some(pid(1)));
        assert!(!analysis.cycles.has_cycles());
        assert_eq!(analysis.order.len(), 3);
    }

    #[test]
    fn test_empty_graph_analysis() {
        let engine = StoryEngine::new(Arc::new(NoOpSink));
        let graph = StoryGraph::from_parts(vec![], vec![], &NoOpSink);
        let analysis = engine.analyze(&graph);

        assert!(analysis.root.is_none());
        assert!(analysis.order.is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_prose() {
        let a = small_graph();
        let mut pages = vec![page(1), page(2), page(3)];
        pages[0].content = "totally rewritten".to_string();
        let b = StoryGraph::from_parts(pages, vec![choice(1, 1, 2), choice(2, 1, 3)], &NoOpSink);

        assert_eq!(GraphFingerprint::of(&a), GraphFingerprint::of(&b));
    }

    #[test]
    fn test_fingerprint_tracks_structure() {
        let a = small_graph();
        let b = StoryGraph::from_parts(
            vec![page(1), page(2), page(3)],
            vec![choice(1, 1, 2), choice(2, 2, 3)],
            &NoOpSink,
        );
        assert_ne!(GraphFingerprint::of(&a), GraphFingerprint::of(&b));
    }

    #[test]
    fn test_layout_cache_hits_on_same_structure() {
        let engine = StoryEngine::new(Arc::new(NoOpSink));
        let graph = small_graph();
        let analysis = engine.analyze(&graph);

        let first = engine.layout(&graph, &analysis);
        let second = engine.layout(&graph, &analysis);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_stats().hits(), 1);
        assert_eq!(engine.cache_stats().misses(), 1);
    }

    #[test]
    fn test_structure_change_invalidates() {
        let engine = StoryEngine::new(Arc::new(NoOpSink));
        let graph = small_graph();
        let analysis = engine.analyze(&graph);
        engine.layout(&graph, &analysis);

        let grown = StoryGraph::from_parts(
            vec![page(1), page(2), page(3), page(4)],
            vec![choice(1, 1, 2), choice(2, 1, 3), choice(3, 2, 4)],
            &NoOpSink,
        );
        let analysis = engine.analyze(&grown);
        let layout = engine.layout(&grown, &analysis);

        assert_eq!(layout.len(), 4);
        assert_eq!(engine.cache_stats().misses(), 2);
    }

    #[test]
    fn test_disabled_cache_recomputes() {
        let engine = StoryEngine::with_config(
            Arc::new(NoOpSink),
            LayoutConfig::default(),
            CacheConfig {
                enabled: false,
                max_entries: 0,
            },
        );
        let graph = small_graph();
        let analysis = engine.analyze(&graph);

        let first = engine.layout(&graph, &analysis);
        let second = engine.layout(&graph, &analysis);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_stats().hits(), 0);
        assert_eq!(engine.cache_stats().misses(), 2);
    }
}
