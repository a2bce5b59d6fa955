//! In-memory story graph: structure and queries, no policy.
//!
//! A [`StoryGraph`] is an immutable snapshot of one story's pages and
//! choices fetched from the persistence collaborator. All derivations
//! (root resolution, cycle classification, ordering, layout) are pure
//! functions over it and may be recomputed on every render.
//!
//! ## Deduplication
//!
//! Repeated page ids in the input keep the first occurrence and drop the
//! rest; repeated `(source, target)` choice pairs collapse to the first
//! in the read view. Both are upstream data errors, reported through the
//! diagnostics sink, never a crash, and never merged back into storage.

use std::collections::{BTreeSet, HashMap};

use crate::diag::{Diagnostic, DiagnosticKind, DiagnosticsSink};
use crate::types::{Choice, ChoiceId, Page, PageId};

/// Immutable snapshot of one story's pages and choice edges.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    /// Pages in input order, deduplicated by id.
    pages: Vec<Page>,
    /// Page id -> index into `pages`.
    index: HashMap<PageId, usize>,
    /// Outgoing choices per page, in input order, deduplicated by
    /// (source, target).
    outgoing: HashMap<PageId, Vec<Choice>>,
    /// Outgoing choices per page as stored, duplicates included.
    raw_outgoing: HashMap<PageId, Vec<Choice>>,
    /// Deduplicated choices in input order (source of truth for edges).
    choices: Vec<Choice>,
}

impl StoryGraph {
    /// Build a graph snapshot from raw page and choice lists.
    ///
    /// Input order is preserved everywhere; it is what makes every
    /// downstream derivation deterministic.
    pub fn from_parts(
        pages: Vec<Page>,
        choices: Vec<Choice>,
        sink: &dyn DiagnosticsSink,
    ) -> Self {
        // Page dedup: first occurrence wins.
        let mut deduped_pages: Vec<Page> = Vec::with_capacity(pages.len());
        let mut index: HashMap<PageId, usize> = HashMap::with_capacity(pages.len());
        for page in pages {
            if index.contains_key(&page.id) {
                sink.emit(Diagnostic::new(DiagnosticKind::DuplicatePageId {
                    page_id: page.id,
                }));
                continue;
            }
            index.insert(page.id, deduped_pages.len());
            deduped_pages.push(page);
        }

        // Choice dedup: one edge per (source, target) pair. Undeveloped
        // choices carry no target and never collapse each other.
        let mut seen_pairs: BTreeSet<(PageId, PageId)> = BTreeSet::new();
        let mut deduped_choices: Vec<Choice> = Vec::with_capacity(choices.len());
        let mut outgoing: HashMap<PageId, Vec<Choice>> = HashMap::new();
        let mut raw_outgoing: HashMap<PageId, Vec<Choice>> = HashMap::new();
        for choice in choices {
            raw_outgoing
                .entry(choice.page_id)
                .or_default()
                .push(choice.clone());

            if let Some(target) = choice.target_page_id {
                if !seen_pairs.insert((choice.page_id, target)) {
                    sink.emit(Diagnostic::new(DiagnosticKind::DuplicateChoice {
                        source: choice.page_id,
                        target,
                        dropped: choice.id,
                    }));
                    continue;
                }
            }
            outgoing
                .entry(choice.page_id)
                .or_default()
                .push(choice.clone());
            deduped_choices.push(choice);
        }

        Self {
            pages: deduped_pages,
            index,
            outgoing,
            raw_outgoing,
            choices: deduped_choices,
        }
    }

    /// Look up a page by id.
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.index.get(&id).map(|&i| &self.pages[i])
    }

    /// Whether the graph contains a page.
    pub fn contains(&self, id: PageId) -> bool {
        self.index.contains_key(&id)
    }

    /// All pages in input order (deduplicated).
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// All deduplicated choices in input order.
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Outgoing choices of a page, deduplicated, in input order.
    pub fn outgoing(&self, id: PageId) -> &[Choice] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outgoing choices of a page as stored, duplicates included.
    pub fn raw_outgoing(&self, id: PageId) -> &[Choice] {
        self.raw_outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Navigation view of a page's choices.
    ///
    /// Ending pages have no active choices: whatever edges an author
    /// left on them stay visible to the editor but are never offered to
    /// a reader.
    pub fn active_choices(&self, id: PageId) -> &[Choice] {
        match self.page(id) {
            Some(page) if page.is_ending => &[],
            Some(_) => self.outgoing(id),
            None => &[],
        }
    }

    /// Find a choice by id on a specific page's active list.
    pub fn active_choice(&self, page_id: PageId, choice_id: ChoiceId) -> Option<&Choice> {
        self.active_choices(page_id).iter().find(|c| c.id == choice_id)
    }

    /// Ids of all pages referenced as a developed choice target.
    pub fn referenced_targets(&self) -> BTreeSet<PageId> {
        self.choices
            .iter()
            .filter_map(|c| c.target_page_id)
            .collect()
    }

    /// Whether any developed choice targets this page.
    pub fn is_referenced(&self, id: PageId) -> bool {
        self.choices.iter().any(|c| c.target_page_id == Some(id))
    }

    /// Number of pages after dedup.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the story has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
