//! Tree layout: 2-D positions for visualizing a story graph.
//!
//! `y` encodes depth (distance from the root along forward edges), `x`
//! spreads siblings horizontally. The layout consumes the display-parent
//! relationships recorded by the traversal orderer, so it works on the
//! derived display forest: the root's tree first, then each orphan
//! island as its own tree.
//!
//! ## Coordinates
//!
//! All positions live in an abstract 0–100 canvas. Vertical spacing per
//! level shrinks as the tree deepens (clamped to a configured band) so
//! very deep trees remain compact. Horizontal placement is post-order:
//! a leaf takes the preferred x handed down by its parent, an internal
//! page settles at the centroid of its children after spreading them
//! around the preferred x with an offset inversely proportional to the
//! sibling count. Everything is clamped into the configured x band; at
//! minimum spread more leaves than the band can hold will overlap, an
//! accepted approximation, not something to fix by clipping further.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::order::TraversalOrder;
use crate::types::PageId;

/// Configuration for the tree layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Left edge of the horizontal band.
    pub x_min: f64,
    /// Right edge of the horizontal band.
    pub x_max: f64,
    /// Vertical position of the root row.
    pub y_origin: f64,
    /// Vertical budget distributed across depth levels.
    pub canvas_height: f64,
    /// Smallest allowed per-level vertical spacing.
    pub level_spacing_min: f64,
    /// Largest allowed per-level vertical spacing.
    pub level_spacing_max: f64,
    /// Horizontal spread budget divided among siblings.
    pub sibling_spread: f64,
    /// Smallest allowed per-sibling offset.
    pub sibling_spread_min: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_min: 10.0,
            x_max: 90.0,
            y_origin: 10.0,
            canvas_height: 80.0,
            level_spacing_min: 8.0,
            level_spacing_max: 20.0,
            sibling_spread: 40.0,
            sibling_spread_min: 4.0,
        }
    }
}

impl LayoutConfig {
    /// Clamp degenerate parameters into a usable shape.
    fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.x_max <= cfg.x_min {
            cfg.x_min = Self::default().x_min;
            cfg.x_max = Self::default().x_max;
        }
        cfg.level_spacing_min = cfg.level_spacing_min.max(1.0);
        cfg.level_spacing_max = cfg.level_spacing_max.max(cfg.level_spacing_min);
        cfg.sibling_spread_min = cfg.sibling_spread_min.max(0.5);
        cfg.sibling_spread = cfg.sibling_spread.max(cfg.sibling_spread_min);
        cfg
    }

    fn clamp_x(&self, x: f64) -> f64 {
        x.clamp(self.x_min, self.x_max)
    }
}

/// Position assigned to one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePosition {
    /// Horizontal position in the 0–100 canvas.
    pub x: f64,
    /// Vertical position in the 0–100 canvas.
    pub y: f64,
    /// Depth: distance from the display root along forward edges.
    pub depth: u32,
}

/// The computed layout for a story graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeLayout {
    positions: BTreeMap<PageId, PagePosition>,
    max_depth: u32,
}

impl TreeLayout {
    /// Position of a page.
    pub fn position(&self, id: PageId) -> Option<PagePosition> {
        self.positions.get(&id).copied()
    }

    /// All positions keyed by page id.
    pub fn positions(&self) -> &BTreeMap<PageId, PagePosition> {
        &self.positions
    }

    /// Deepest level in the layout.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of positioned pages.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Assign a 2-D position to every page in the traversal order.
pub fn layout_tree(order: &TraversalOrder, config: &LayoutConfig) -> TreeLayout {
    let config = config.normalized();

    if order.is_empty() {
        return TreeLayout {
            positions: BTreeMap::new(),
            max_depth: 0,
        };
    }

    // Display forest: children per parent in discovery order, roots in
    // presentation order.
    let mut children: HashMap<PageId, Vec<PageId>> = HashMap::new();
    let mut roots: Vec<PageId> = Vec::new();
    for entry in order.entries() {
        match entry.display_parent {
            Some(parent) => children.entry(parent).or_default().push(entry.page_id),
            None => roots.push(entry.page_id),
        }
    }

    let depths = resolve_depths(order);
    let max_depth = depths.values().copied().max().unwrap_or(0);

    // Deep trees compress their levels; shallow trees spread out.
    let level_spacing = (config.canvas_height / f64::from(max_depth.max(1)))
        .clamp(config.level_spacing_min, config.level_spacing_max);

    let mut positions: BTreeMap<PageId, PagePosition> = BTreeMap::new();
    let band = config.x_max - config.x_min;
    let slot = band / roots.len() as f64;
    for (i, &root) in roots.iter().enumerate() {
        let preferred = config.x_min + (i as f64 + 0.5) * slot;
        place_subtree(
            root,
            preferred,
            &children,
            &depths,
            &config,
            config.y_origin,
            level_spacing,
            &mut positions,
        );
    }

    TreeLayout {
        positions,
        max_depth,
    }
}

/// Memoized depth per page: 0 for a display root, otherwise one more
/// than the display parent. Parent chains come from a BFS forest, so
/// they are acyclic; the walk still avoids recursion.
fn resolve_depths(order: &TraversalOrder) -> HashMap<PageId, u32> {
    let mut memo: HashMap<PageId, u32> = HashMap::with_capacity(order.len());
    for entry in order.entries() {
        // Walk up to the nearest memoized ancestor, then unwind.
        let mut chain: Vec<PageId> = Vec::new();
        let mut current = entry.page_id;
        let mut depth = loop {
            if let Some(&d) = memo.get(&current) {
                break d;
            }
            match order.display_parent(current) {
                None => {
                    memo.insert(current, 0);
                    break 0;
                }
                Some(parent) => {
                    chain.push(current);
                    current = parent;
                }
            }
        };
        for &node in chain.iter().rev() {
            depth += 1;
            memo.insert(node, depth);
        }
    }
    memo
}

/// Post-order placement: children are resolved around the preferred x,
/// then the page settles at their centroid. Returns the resolved x.
#[allow(clippy::too_many_arguments)]
fn place_subtree(
    page: PageId,
    preferred_x: f64,
    children: &HashMap<PageId, Vec<PageId>>,
    depths: &HashMap<PageId, u32>,
    config: &LayoutConfig,
    y_origin: f64,
    level_spacing: f64,
    positions: &mut BTreeMap<PageId, PagePosition>,
) -> f64 {
    let kids = children.get(&page).map(Vec::as_slice).unwrap_or(&[]);

    let x = if kids.is_empty() {
        config.clamp_x(preferred_x)
    } else {
        // More siblings, tighter spacing, never below the minimum.
        let n = kids.len() as f64;
        let step = (config.sibling_spread / n).max(config.sibling_spread_min);
        let mut sum = 0.0;
        for (i, &child) in kids.iter().enumerate() {
            let child_preferred = preferred_x + (i as f64 - (n - 1.0) / 2.0) * step;
            sum += place_subtree(
                child,
                child_preferred,
                children,
                depths,
                config,
                y_origin,
                level_spacing,
                positions,
            );
        }
        config.clamp_x(sum / n)
    };

    let depth = depths.get(&page).copied().unwrap_or(0);
    positions.insert(
        page,
        PagePosition {
            x,
            y: y_origin + f64::from(depth) * level_spacing,
            depth,
        },
    );
    x
}
