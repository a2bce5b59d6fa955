//! Reader progress through a story.

use crate::types::Party;

/// Percentage of a story's distinct pages visited by a party.
///
/// Formula:
/// ```text
/// progress = round(100 * distinct_visited_pages / total_pages)
/// ```
/// clamped to `[0, 100]`. A fresh party scores 0, an empty story scores
/// 0, and the value never decreases because the visit log is
/// append-only.
pub fn progress(party: &Party, total_pages: usize) -> u8 {
    if total_pages == 0 {
        return 0;
    }
    let distinct = party.distinct_visited();
    let pct = (100.0 * distinct as f64 / total_pages as f64).round();
    pct.clamp(0.0, 100.0) as u8
}
