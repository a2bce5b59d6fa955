//! Reader session (party) tracking.
//!
//! A session walks one reader through an immutable graph snapshot. Two
//! histories coexist and must not be confused: the *persisted path* is
//! an append-only visit log on the [`Party`] record, while the
//! *navigation history* is an in-memory undo stack that `go_back` pops.
//! Going back re-renders an earlier page without rewriting the log.
//!
//! State is advanced only after the collaborator accepts the save, so a
//! failed `update_party` leaves the session consistent with the last
//! successful write.

use std::sync::Arc;

use chrono::Utc;

use crate::diag::DiagnosticsSink;
use crate::graph::StoryGraph;
use crate::progress::progress;
use crate::root::resolve_root;
use crate::store::StoryStore;
use crate::types::{ChoiceId, PageId, Party, PartyUpdate, StoryId, UserId};

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The story has no pages to read.
    #[error("Story has no pages")]
    EmptyStory,
    /// The session already reached an ending; only go_back/restart apply.
    #[error("Session has reached an ending")]
    AlreadyEnded,
    /// The choice is not on the current page's active list.
    #[error("Choice not available here: {0}")]
    ChoiceNotFound(ChoiceId),
    /// Content-incomplete: the choice has no target page yet.
    #[error("Choice is not yet developed: {0}")]
    ChoiceNotDeveloped(ChoiceId),
    /// The target page is absent from the loaded graph.
    #[error("Page not found: {0}")]
    PageNotFound(PageId),
    /// Nothing earlier to go back to.
    #[error("Already at the first page of the session")]
    AtStart,
    /// The resumed party points at a page outside the loaded graph.
    #[error("Party position not in story: {0}")]
    StalePartyPosition(PageId),
    /// Persistence collaborator failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl SessionError {
    fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

/// Session state: where the reader stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// On a non-ending page; choices are selectable.
    Reading,
    /// On an ending page.
    Ended,
}

/// Result of a successful page transition.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The page the reader landed on.
    pub page_id: PageId,
    /// State after the step.
    pub state: SessionState,
    /// Whether this step set the party's end date. Fire the one-time
    /// completion side effect (e.g. the rating prompt) exactly when
    /// this is true.
    pub completed_now: bool,
    /// Progress percentage after the step.
    pub progress: u8,
}

/// A reader's live traversal of one story.
pub struct PartySession<S: StoryStore> {
    store: Arc<S>,
    graph: StoryGraph,
    sink: Arc<dyn DiagnosticsSink>,
    party: Party,
    /// Undo stack; the last entry is the page being rendered.
    history: Vec<PageId>,
}

impl<S: StoryStore> PartySession<S> {
    /// Begin a fresh session: create the party, resolve the root, and
    /// record the first visit.
    pub async fn start(
        store: Arc<S>,
        graph: StoryGraph,
        sink: Arc<dyn DiagnosticsSink>,
        user_id: UserId,
        story_id: StoryId,
    ) -> Result<Self, SessionError> {
        let root = resolve_root(&graph, sink.as_ref())
            .ok_or(SessionError::EmptyStory)?
            .id;
        let party = store
            .create_party(user_id, story_id)
            .await
            .map_err(SessionError::from_store)?;

        let mut session = Self {
            store,
            graph,
            sink,
            party,
            history: Vec::new(),
        };
        session.arrive(root).await?;
        Ok(session)
    }

    /// Resume an existing party where it left off.
    ///
    /// A party that never recorded a visit starts at the root; a party
    /// whose last position is no longer in the graph is stale and
    /// cannot be resumed.
    pub async fn resume(
        store: Arc<S>,
        graph: StoryGraph,
        sink: Arc<dyn DiagnosticsSink>,
        party: Party,
    ) -> Result<Self, SessionError> {
        match party.current_page() {
            Some(current) if graph.contains(current) => Ok(Self {
                store,
                graph,
                sink,
                party,
                history: vec![current],
            }),
            Some(current) => Err(SessionError::StalePartyPosition(current)),
            None => {
                let root = resolve_root(&graph, sink.as_ref())
                    .ok_or(SessionError::EmptyStory)?
                    .id;
                let mut session = Self {
                    store,
                    graph,
                    sink,
                    party,
                    history: Vec::new(),
                };
                session.arrive(root).await?;
                Ok(session)
            }
        }
    }

    /// The page currently rendered.
    pub fn current_page(&self) -> PageId {
        *self
            .history
            .last()
            .expect("session history always holds at least one page")
    }

    /// Current state, derived from the rendered page.
    pub fn state(&self) -> SessionState {
        match self.graph.page(self.current_page()) {
            Some(page) if page.is_ending => SessionState::Ended,
            _ => SessionState::Reading,
        }
    }

    /// The tracked party record, as of the last successful save.
    pub fn party(&self) -> &Party {
        &self.party
    }

    /// Progress percentage for the tracked party.
    pub fn progress(&self) -> u8 {
        progress(&self.party, self.graph.len())
    }

    /// Depth of the navigation history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Follow a choice from the current page.
    ///
    /// Valid only in `Reading`. A choice with no target signals the
    /// content-incomplete condition and transitions nothing; a target
    /// missing from the graph aborts the navigation, also without a
    /// transition.
    pub async fn select_choice(&mut self, choice_id: ChoiceId) -> Result<StepOutcome, SessionError> {
        if self.state() == SessionState::Ended {
            return Err(SessionError::AlreadyEnded);
        }
        let current = self.current_page();
        let choice = self
            .graph
            .active_choice(current, choice_id)
            .ok_or(SessionError::ChoiceNotFound(choice_id))?;
        let target = choice
            .target_page_id
            .ok_or(SessionError::ChoiceNotDeveloped(choice_id))?;
        if !self.graph.contains(target) {
            return Err(SessionError::PageNotFound(target));
        }

        self.arrive(target).await
    }

    /// Re-render the previous page of the session.
    ///
    /// Pops the navigation history only; the persisted path is a visit
    /// log and keeps every entry.
    pub fn go_back(&mut self) -> Result<PageId, SessionError> {
        if self.history.len() <= 1 {
            return Err(SessionError::AtStart);
        }
        self.history.pop();
        Ok(self.current_page())
    }

    /// Start over from the story's root.
    ///
    /// Valid in any state. The navigation history collapses to a single
    /// entry; the restart is itself a visit and is appended to the
    /// persisted path. A party that already ended stays ended;
    /// `end_date` is written at most once, ever.
    pub async fn restart(&mut self) -> Result<StepOutcome, SessionError> {
        let root = resolve_root(&self.graph, self.sink.as_ref())
            .ok_or(SessionError::EmptyStory)?
            .id;
        // Save first; a failed restart leaves the session where it was.
        let outcome = self.arrive(root).await?;
        self.history = vec![root];
        Ok(outcome)
    }

    /// Record arrival on a page: persist the visit (and the end date on
    /// first arrival at an ending), then advance in-memory state.
    async fn arrive(&mut self, page_id: PageId) -> Result<StepOutcome, SessionError> {
        let page = self
            .graph
            .page(page_id)
            .ok_or(SessionError::PageNotFound(page_id))?;
        let completing = page.is_ending && !self.party.is_ended();

        let update = if completing {
            PartyUpdate::visit_and_finish(page_id, Utc::now())
        } else {
            PartyUpdate::visit(page_id)
        };
        // Save first; only a successful response moves the session.
        let saved = self
            .store
            .update_party(self.party.id, update)
            .await
            .map_err(SessionError::from_store)?;

        self.party = saved;
        self.history.push(page_id);

        if completing {
            tracing::info!(
                party_id = %self.party.id,
                page_id = %page_id,
                "party reached an ending"
            );
        }

        Ok(StepOutcome {
            page_id,
            state: self.state(),
            completed_now: completing,
            progress: self.progress(),
        })
    }
}
