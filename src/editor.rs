//! Author-side graph mutations.
//!
//! Every operation goes through the persistence collaborator; the graph
//! snapshot is rebuilt from the store after editing, never patched in
//! place. Content edits are optimistic: they land in a local draft pad
//! immediately and are pushed with [`StoryEditor::save_draft`]. Each
//! draft carries a revision counter so a slow save response that comes
//! back after further edits is recognized as stale and discarded
//! instead of overwriting the newer local text.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::StoryStore;
use crate::types::{
    Choice, ChoiceId, ChoiceUpdate, Page, PageId, PageUpdate, Story, StoryId, StoryStatus,
};

/// Error type for editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Content-incomplete: a choice needs visible text before saving.
    #[error("Choice text must not be empty")]
    EmptyChoiceText,
    /// No draft exists for the page.
    #[error("No draft for page: {0}")]
    NoDraft(PageId),
    /// Persistence collaborator failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl EditorError {
    fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

/// A local, not-yet-persisted content edit.
#[derive(Debug, Clone)]
pub struct PageDraft {
    /// Page being edited.
    pub page_id: PageId,
    /// Current local text.
    pub content: String,
    /// Whether the draft differs from the last successful save.
    pub dirty: bool,
    /// Bumped on every local edit; stale save responses fail the
    /// revision check and are discarded.
    revision: u64,
}

/// Result of pushing a draft to the collaborator.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The draft was saved and is now clean.
    Saved(Page),
    /// The response arrived after further local edits; the server copy
    /// is returned but the newer draft stays dirty.
    Stale(Page),
}

/// Author-side operations on one story's graph.
pub struct StoryEditor<S: StoryStore> {
    store: Arc<S>,
    story_id: StoryId,
    drafts: Mutex<BTreeMap<PageId, PageDraft>>,
}

impl<S: StoryStore> StoryEditor<S> {
    /// Create an editor for a story.
    pub fn new(store: Arc<S>, story_id: StoryId) -> Self {
        Self {
            store,
            story_id,
            drafts: Mutex::new(BTreeMap::new()),
        }
    }

    /// The story being edited.
    pub fn story_id(&self) -> StoryId {
        self.story_id
    }

    /// Create a new page (empty content allowed).
    pub async fn create_page(&self, content: &str, is_ending: bool) -> Result<Page, EditorError> {
        let page = self
            .store
            .create_page(self.story_id, content, is_ending)
            .await
            .map_err(EditorError::from_store)?;
        tracing::debug!(page_id = %page.id, story_id = %self.story_id, "page created");
        Ok(page)
    }

    /// Delete a page; its choices cascade at the store.
    pub async fn delete_page(&self, page_id: PageId) -> Result<(), EditorError> {
        self.store
            .delete_page(page_id)
            .await
            .map_err(EditorError::from_store)?;
        self.drafts.lock().remove(&page_id);
        Ok(())
    }

    /// Add a choice to a page, optionally already linked.
    ///
    /// Blank text is the content-incomplete condition: rejected before
    /// any store call.
    pub async fn create_choice(
        &self,
        page_id: PageId,
        text: &str,
        target_page_id: Option<PageId>,
    ) -> Result<Choice, EditorError> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyChoiceText);
        }
        self.store
            .create_choice(page_id, text, target_page_id)
            .await
            .map_err(EditorError::from_store)
    }

    /// Link an undeveloped choice to its target page.
    pub async fn link_choice(
        &self,
        choice_id: ChoiceId,
        target_page_id: PageId,
    ) -> Result<Choice, EditorError> {
        self.store
            .update_choice(choice_id, ChoiceUpdate::link(target_page_id))
            .await
            .map_err(EditorError::from_store)
    }

    /// Replace a choice's label.
    pub async fn rename_choice(
        &self,
        choice_id: ChoiceId,
        text: &str,
    ) -> Result<Choice, EditorError> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyChoiceText);
        }
        self.store
            .update_choice(choice_id, ChoiceUpdate::text(text))
            .await
            .map_err(EditorError::from_store)
    }

    /// Remove a choice.
    pub async fn delete_choice(&self, choice_id: ChoiceId) -> Result<(), EditorError> {
        self.store
            .delete_choice(choice_id)
            .await
            .map_err(EditorError::from_store)
    }

    /// Toggle a page's ending flag (and label).
    pub async fn set_ending(
        &self,
        page_id: PageId,
        is_ending: bool,
        label: Option<String>,
    ) -> Result<Page, EditorError> {
        self.store
            .update_page(page_id, PageUpdate::ending(is_ending, label))
            .await
            .map_err(EditorError::from_store)
    }

    /// Publish the story.
    pub async fn publish(&self) -> Result<Story, EditorError> {
        self.store
            .update_story(self.story_id, StoryStatus::Published)
            .await
            .map_err(EditorError::from_store)
    }

    /// Take the story back to draft.
    pub async fn unpublish(&self) -> Result<Story, EditorError> {
        self.store
            .update_story(self.story_id, StoryStatus::Draft)
            .await
            .map_err(EditorError::from_store)
    }

    /// Apply a content edit locally. Nothing is persisted until
    /// [`save_draft`](Self::save_draft).
    pub fn edit_content(&self, page_id: PageId, content: impl Into<String>) {
        let mut drafts = self.drafts.lock();
        let draft = drafts.entry(page_id).or_insert_with(|| PageDraft {
            page_id,
            content: String::new(),
            dirty: false,
            revision: 0,
        });
        draft.content = content.into();
        draft.dirty = true;
        draft.revision += 1;
    }

    /// Current draft for a page, if any.
    pub fn draft(&self, page_id: PageId) -> Option<PageDraft> {
        self.drafts.lock().get(&page_id).cloned()
    }

    /// Whether a page has unsaved local edits.
    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.drafts
            .lock()
            .get(&page_id)
            .map(|d| d.dirty)
            .unwrap_or(false)
    }

    /// Push a page's draft to the collaborator.
    ///
    /// The revision captured before the call gates reconciliation: if
    /// the page was edited again while the save was in flight, the
    /// response is stale and the draft stays dirty for the next save.
    /// A store failure also leaves the draft dirty for manual retry.
    pub async fn save_draft(&self, page_id: PageId) -> Result<SaveOutcome, EditorError> {
        let (content, revision) = {
            let drafts = self.drafts.lock();
            let draft = drafts.get(&page_id).ok_or(EditorError::NoDraft(page_id))?;
            (draft.content.clone(), draft.revision)
        };

        let page = self
            .store
            .update_page(page_id, PageUpdate::content(content))
            .await
            .map_err(EditorError::from_store)?;

        Ok(self.reconcile(page_id, revision, page))
    }

    /// Reconcile a save response against the draft pad. Only a response
    /// for the draft's current revision marks it clean; anything else
    /// is a stale in-flight save and is discarded.
    fn reconcile(&self, page_id: PageId, revision: u64, page: Page) -> SaveOutcome {
        let mut drafts = self.drafts.lock();
        match drafts.get_mut(&page_id) {
            Some(draft) if draft.revision == revision => {
                draft.dirty = false;
                SaveOutcome::Saved(page)
            }
            _ => {
                tracing::debug!(page_id = %page_id, "stale save response discarded");
                SaveOutcome::Stale(page)
            }
        }
    }
}
