//! In-memory story store for testing.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::StoryStore;
use crate::types::{
    Choice, ChoiceId, ChoiceUpdate, Page, PageId, PageUpdate, Party, PartyId, PartyUpdate, Story,
    StoryId, StoryStatus, UserId,
};

/// Error type for the in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Page not found.
    #[error("Page not found: {0}")]
    PageNotFound(PageId),
    /// Choice not found.
    #[error("Choice not found: {0}")]
    ChoiceNotFound(ChoiceId),
    /// Party not found.
    #[error("Party not found: {0}")]
    PartyNotFound(PartyId),
    /// Story not found.
    #[error("Story not found: {0}")]
    StoryNotFound(StoryId),
    /// Injected failure for partial-failure tests.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct State {
    stories: BTreeMap<StoryId, Story>,
    pages: BTreeMap<PageId, Page>,
    page_order: Vec<PageId>,
    choices: BTreeMap<ChoiceId, Choice>,
    choice_order: Vec<ChoiceId>,
    parties: BTreeMap<PartyId, Party>,
    fail_next: Option<String>,
}

/// In-memory story store for testing.
///
/// List results come back in insertion order, which is what the engine's
/// determinism guarantees lean on. A single injected failure can be
/// armed with [`InMemoryStoryStore::fail_next`] to exercise the
/// partial-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryStoryStore {
    state: RwLock<State>,
}

impl InMemoryStoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a story record.
    pub fn add_story(&self, story: Story) {
        let mut state = self.state.write();
        state.stories.insert(story.id, story);
    }

    /// Seed a page record.
    pub fn add_page(&self, page: Page) {
        let mut state = self.state.write();
        if !state.pages.contains_key(&page.id) {
            state.page_order.push(page.id);
        }
        state.pages.insert(page.id, page);
    }

    /// Seed a choice record.
    pub fn add_choice(&self, choice: Choice) {
        let mut state = self.state.write();
        if !state.choices.contains_key(&choice.id) {
            state.choice_order.push(choice.id);
        }
        state.choices.insert(choice.id, choice);
    }

    /// Arm a one-shot failure: the next store call errors with this
    /// message instead of executing.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.write().fail_next = Some(message.into());
    }

    /// Number of pages across all stories.
    pub fn num_pages(&self) -> usize {
        self.state.read().pages.len()
    }

    /// Number of choices across all stories.
    pub fn num_choices(&self) -> usize {
        self.state.read().choices.len()
    }

    fn take_failure(state: &mut State) -> Result<(), InMemoryError> {
        match state.fail_next.take() {
            Some(message) => Err(InMemoryError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    type Error = InMemoryError;

    async fn list_pages(&self, story_id: StoryId) -> Result<Vec<Page>, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        Ok(state
            .page_order
            .iter()
            .filter_map(|id| state.pages.get(id))
            .filter(|p| p.story_id == story_id)
            .cloned()
            .collect())
    }

    async fn create_page(
        &self,
        story_id: StoryId,
        content: &str,
        is_ending: bool,
    ) -> Result<Page, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let page = Page::new(PageId::random(), story_id, content, is_ending);
        state.page_order.push(page.id);
        state.pages.insert(page.id, page.clone());
        Ok(page)
    }

    async fn update_page(&self, page_id: PageId, fields: PageUpdate) -> Result<Page, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let page = state
            .pages
            .get_mut(&page_id)
            .ok_or(InMemoryError::PageNotFound(page_id))?;
        fields.apply(page);
        Ok(page.clone())
    }

    async fn delete_page(&self, page_id: PageId) -> Result<(), Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        if state.pages.remove(&page_id).is_none() {
            return Err(InMemoryError::PageNotFound(page_id));
        }
        state.page_order.retain(|id| *id != page_id);

        // Cascade: the page's own choices go with it; choices that
        // targeted it revert to undeveloped.
        let owned: Vec<ChoiceId> = state
            .choices
            .values()
            .filter(|c| c.page_id == page_id)
            .map(|c| c.id)
            .collect();
        for id in owned {
            state.choices.remove(&id);
            state.choice_order.retain(|cid| *cid != id);
        }
        for choice in state.choices.values_mut() {
            if choice.target_page_id == Some(page_id) {
                choice.target_page_id = None;
            }
        }
        Ok(())
    }

    async fn list_choices_for_page(&self, page_id: PageId) -> Result<Vec<Choice>, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        Ok(state
            .choice_order
            .iter()
            .filter_map(|id| state.choices.get(id))
            .filter(|c| c.page_id == page_id)
            .cloned()
            .collect())
    }

    async fn create_choice(
        &self,
        page_id: PageId,
        text: &str,
        target_page_id: Option<PageId>,
    ) -> Result<Choice, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        if !state.pages.contains_key(&page_id) {
            return Err(InMemoryError::PageNotFound(page_id));
        }
        let choice = Choice::new(ChoiceId::random(), page_id, text, target_page_id);
        state.choice_order.push(choice.id);
        state.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn update_choice(
        &self,
        choice_id: ChoiceId,
        fields: ChoiceUpdate,
    ) -> Result<Choice, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let choice = state
            .choices
            .get_mut(&choice_id)
            .ok_or(InMemoryError::ChoiceNotFound(choice_id))?;
        fields.apply(choice);
        Ok(choice.clone())
    }

    async fn delete_choice(&self, choice_id: ChoiceId) -> Result<(), Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        if state.choices.remove(&choice_id).is_none() {
            return Err(InMemoryError::ChoiceNotFound(choice_id));
        }
        state.choice_order.retain(|id| *id != choice_id);
        Ok(())
    }

    async fn get_party(&self, party_id: PartyId) -> Result<Option<Party>, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        Ok(state.parties.get(&party_id).cloned())
    }

    async fn create_party(
        &self,
        user_id: UserId,
        story_id: StoryId,
    ) -> Result<Party, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let party = Party::new(PartyId::random(), user_id, story_id, Utc::now());
        state.parties.insert(party.id, party.clone());
        Ok(party)
    }

    async fn update_party(
        &self,
        party_id: PartyId,
        fields: PartyUpdate,
    ) -> Result<Party, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let party = state
            .parties
            .get_mut(&party_id)
            .ok_or(InMemoryError::PartyNotFound(party_id))?;
        for page in &fields.append_path {
            party.record_visit(*page);
        }
        // end_date is set exactly once; later attempts are ignored.
        if let (Some(at), Some(page)) = (fields.end_date, fields.ending_page_id) {
            party.finish(page, at);
        }
        Ok(party.clone())
    }

    async fn get_story(&self, story_id: StoryId) -> Result<Option<Story>, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        Ok(state.stories.get(&story_id).cloned())
    }

    async fn update_story(
        &self,
        story_id: StoryId,
        status: StoryStatus,
    ) -> Result<Story, Self::Error> {
        let mut state = self.state.write();
        Self::take_failure(&mut state)?;
        let story = state
            .stories
            .get_mut(&story_id)
            .ok_or(InMemoryError::StoryNotFound(story_id))?;
        story.status = status;
        Ok(story.clone())
    }
}
