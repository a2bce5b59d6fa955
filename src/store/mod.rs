//! Persistence collaborator for stories, pages, choices, and parties.
//!
//! The engine never talks to a database or network directly: everything
//! goes through [`StoryStore`]. Implementations must preserve insertion
//! order in list results; input order is what makes root resolution,
//! traversal, and layout deterministic.

pub mod memory;

use async_trait::async_trait;

use crate::diag::DiagnosticsSink;
use crate::graph::StoryGraph;
use crate::types::{
    Choice, ChoiceId, ChoiceUpdate, Page, PageId, PageUpdate, Party, PartyId, PartyUpdate, Story,
    StoryId, StoryStatus, UserId,
};

/// Trait for the persistence collaborator.
///
/// All methods are async to support network-backed implementations.
/// Calls may fail at any point; callers surface the error and keep
/// their in-memory state consistent with the last successful save.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch all pages of a story, in insertion order.
    async fn list_pages(&self, story_id: StoryId) -> Result<Vec<Page>, Self::Error>;

    /// Create a page (empty content allowed).
    async fn create_page(
        &self,
        story_id: StoryId,
        content: &str,
        is_ending: bool,
    ) -> Result<Page, Self::Error>;

    /// Apply a partial update to a page.
    async fn update_page(&self, page_id: PageId, fields: PageUpdate) -> Result<Page, Self::Error>;

    /// Delete a page. Its choices are deleted with it; choices that
    /// targeted it revert to undeveloped.
    async fn delete_page(&self, page_id: PageId) -> Result<(), Self::Error>;

    /// Fetch the choices hanging off a page, in insertion order.
    async fn list_choices_for_page(&self, page_id: PageId) -> Result<Vec<Choice>, Self::Error>;

    /// Create a choice, optionally already linked to a target.
    async fn create_choice(
        &self,
        page_id: PageId,
        text: &str,
        target_page_id: Option<PageId>,
    ) -> Result<Choice, Self::Error>;

    /// Apply a partial update to a choice.
    async fn update_choice(
        &self,
        choice_id: ChoiceId,
        fields: ChoiceUpdate,
    ) -> Result<Choice, Self::Error>;

    /// Delete a choice.
    async fn delete_choice(&self, choice_id: ChoiceId) -> Result<(), Self::Error>;

    /// Fetch a party by id.
    async fn get_party(&self, party_id: PartyId) -> Result<Option<Party>, Self::Error>;

    /// Create a fresh party for a reader and story.
    async fn create_party(&self, user_id: UserId, story_id: StoryId)
        -> Result<Party, Self::Error>;

    /// Append path entries and/or set the end date on a party.
    async fn update_party(
        &self,
        party_id: PartyId,
        fields: PartyUpdate,
    ) -> Result<Party, Self::Error>;

    /// Fetch a story by id.
    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, Self::Error>;

    /// Change a story's publication status.
    async fn update_story(
        &self,
        story_id: StoryId,
        status: StoryStatus,
    ) -> Result<Story, Self::Error>;
}

/// Snapshot a story's pages and choices into a [`StoryGraph`].
///
/// Choices are fetched per page, in page order, so the assembled edge
/// list inherits the store's insertion order.
pub async fn load_story_graph<S: StoryStore>(
    store: &S,
    story_id: StoryId,
    sink: &dyn DiagnosticsSink,
) -> Result<StoryGraph, S::Error> {
    let pages = store.list_pages(story_id).await?;
    let mut choices = Vec::new();
    for page in &pages {
        choices.extend(store.list_choices_for_page(page.id).await?);
    }
    Ok(StoryGraph::from_parts(pages, choices, sink))
}

pub use memory::{InMemoryError, InMemoryStoryStore};
