//! End-to-end reader and author flows over the in-memory store.

use std::sync::Arc;

use story_graph_engine::{
    load_story_graph, InMemoryStoryStore, NoOpSink, PartySession, SaveOutcome, SessionError,
    SessionState, Story, StoryEditor, StoryId, StoryStore, UserId,
};
use uuid::Uuid;

fn sid() -> StoryId {
    StoryId::new(Uuid::from_u128(1))
}

fn uid() -> UserId {
    UserId::new(Uuid::from_u128(2))
}

/// Author a four-page story through the editor and return the store.
///
/// ```text
///        gate
///       /    \
///   garden   tower
///       \    /
///       vault (ending)
/// ```
async fn author_story(store: &Arc<InMemoryStoryStore>) -> story_graph_engine::StoryGraph {
    store.add_story(Story::new(sid(), "The Vault"));
    let editor = StoryEditor::new(Arc::clone(store), sid());

    let gate = editor.create_page("You stand at the gate.", false).await.unwrap();
    let garden = editor.create_page("A walled garden.", false).await.unwrap();
    let tower = editor.create_page("A crooked tower.", false).await.unwrap();
    let vault = editor.create_page("The vault opens.", true).await.unwrap();

    editor.create_choice(gate.id, "Slip into the garden", Some(garden.id)).await.unwrap();
    editor.create_choice(gate.id, "Climb the tower", Some(tower.id)).await.unwrap();
    editor.create_choice(garden.id, "Dig under the wall", Some(vault.id)).await.unwrap();
    editor.create_choice(tower.id, "Leap to the vault roof", Some(vault.id)).await.unwrap();

    load_story_graph(store.as_ref(), sid(), &NoOpSink).await.unwrap()
}

#[tokio::test]
async fn authored_story_is_readable_to_completion() {
    let store = Arc::new(InMemoryStoryStore::new());
    let graph = author_story(&store).await;

    let mut session =
        PartySession::start(Arc::clone(&store), graph.clone(), Arc::new(NoOpSink), uid(), sid())
            .await
            .unwrap();

    // Scenario: start on root, visit one branch page. 2 of 4 pages
    // visited is exactly 50 percent.
    let root = session.current_page();
    let first_choice = graph.active_choices(root)[0].id;
    let outcome = session.select_choice(first_choice).await.unwrap();
    assert_eq!(outcome.progress, 50);
    assert_eq!(outcome.state, SessionState::Reading);

    // Follow the branch into the ending.
    let next = graph.active_choices(outcome.page_id)[0].id;
    let outcome = session.select_choice(next).await.unwrap();
    assert_eq!(outcome.state, SessionState::Ended);
    assert!(outcome.completed_now);
    assert_eq!(outcome.progress, 75);

    // The party record round-trips through the store.
    let stored = store.get_party(session.party().id).await.unwrap().unwrap();
    assert!(stored.is_ended());
    assert_eq!(stored.path.len(), 3);
}

#[tokio::test]
async fn undeveloped_choice_blocks_without_transition() {
    let store = Arc::new(InMemoryStoryStore::new());
    store.add_story(Story::new(sid(), "Unfinished"));
    let editor = StoryEditor::new(Arc::clone(&store), sid());

    let start = editor.create_page("A fork in the road.", false).await.unwrap();
    let left = editor.create_page("The left path.", false).await.unwrap();
    editor.create_choice(start.id, "Go left", Some(left.id)).await.unwrap();
    let stub = editor.create_choice(start.id, "Go right", None).await.unwrap();

    let graph = load_story_graph(store.as_ref(), sid(), &NoOpSink).await.unwrap();
    let mut session =
        PartySession::start(Arc::clone(&store), graph, Arc::new(NoOpSink), uid(), sid())
            .await
            .unwrap();

    let at = session.current_page();
    let path_before = session.party().path.clone();

    let err = session.select_choice(stub.id).await.unwrap_err();
    assert!(matches!(err, SessionError::ChoiceNotDeveloped(_)));
    assert_eq!(session.state(), SessionState::Reading);
    assert_eq!(session.current_page(), at);
    assert_eq!(session.party().path, path_before);
}

#[tokio::test]
async fn completion_fires_once_across_replays() {
    let store = Arc::new(InMemoryStoryStore::new());
    let graph = author_story(&store).await;

    let mut session =
        PartySession::start(Arc::clone(&store), graph.clone(), Arc::new(NoOpSink), uid(), sid())
            .await
            .unwrap();

    let mut completions = 0;
    for _ in 0..3 {
        // Walk root -> branch -> ending, then restart.
        let branch = graph.active_choices(session.current_page())[0].id;
        let landed = session.select_choice(branch).await.unwrap();
        let to_end = graph.active_choices(landed.page_id)[0].id;
        let outcome = session.select_choice(to_end).await.unwrap();
        if outcome.completed_now {
            completions += 1;
        }
        session.restart().await.unwrap();
    }

    assert_eq!(completions, 1, "the completion side effect fires exactly once");
    let stored = store.get_party(session.party().id).await.unwrap().unwrap();
    assert!(stored.is_ended());
}

#[tokio::test]
async fn linking_a_stub_makes_it_playable() {
    let store = Arc::new(InMemoryStoryStore::new());
    store.add_story(Story::new(sid(), "Growing"));
    let editor = StoryEditor::new(Arc::clone(&store), sid());

    let start = editor.create_page("Start.", false).await.unwrap();
    let stub = editor.create_choice(start.id, "Onward", None).await.unwrap();

    // Author develops the target and links the stub.
    let finale = editor.create_page("Fin.", true).await.unwrap();
    editor.link_choice(stub.id, finale.id).await.unwrap();

    let graph = load_story_graph(store.as_ref(), sid(), &NoOpSink).await.unwrap();
    let mut session =
        PartySession::start(Arc::clone(&store), graph, Arc::new(NoOpSink), uid(), sid())
            .await
            .unwrap();

    let outcome = session.select_choice(stub.id).await.unwrap();
    assert_eq!(outcome.state, SessionState::Ended);
    assert!(outcome.completed_now);
}

#[tokio::test]
async fn draft_edits_do_not_touch_reader_snapshot() {
    let store = Arc::new(InMemoryStoryStore::new());
    let graph = author_story(&store).await;
    let editor = StoryEditor::new(Arc::clone(&store), sid());

    let root = graph.pages()[0].clone();
    editor.edit_content(root.id, "rewritten opener");
    assert!(editor.is_dirty(root.id));

    // The reader's immutable snapshot still shows the saved text.
    assert_eq!(graph.page(root.id).unwrap().content, root.content);

    match editor.save_draft(root.id).await.unwrap() {
        SaveOutcome::Saved(saved) => assert_eq!(saved.content, "rewritten opener"),
        SaveOutcome::Stale(_) => panic!("no concurrent edits in this test"),
    }

    // A fresh snapshot picks the new text up.
    let reloaded = load_story_graph(store.as_ref(), sid(), &NoOpSink).await.unwrap();
    assert_eq!(reloaded.page(root.id).unwrap().content, "rewritten opener");
}

#[tokio::test]
async fn store_outage_is_recoverable_mid_session() {
    let store = Arc::new(InMemoryStoryStore::new());
    let graph = author_story(&store).await;

    let mut session =
        PartySession::start(Arc::clone(&store), graph.clone(), Arc::new(NoOpSink), uid(), sid())
            .await
            .unwrap();

    let choice = graph.active_choices(session.current_page())[0].id;
    store.fail_next("network partition");
    assert!(matches!(
        session.select_choice(choice).await.unwrap_err(),
        SessionError::Store(_)
    ));

    // Same selection works after the outage; nothing was corrupted.
    let outcome = session.select_choice(choice).await.unwrap();
    assert_eq!(session.party().path.len(), 2);
    assert_eq!(outcome.progress, 50);
}

#[tokio::test]
async fn resumed_party_keeps_progress() {
    let store = Arc::new(InMemoryStoryStore::new());
    let graph = author_story(&store).await;

    let party_id = {
        let mut session = PartySession::start(
            Arc::clone(&store),
            graph.clone(),
            Arc::new(NoOpSink),
            uid(),
            sid(),
        )
        .await
        .unwrap();
        let choice = graph.active_choices(session.current_page())[0].id;
        session.select_choice(choice).await.unwrap();
        session.party().id
    };

    let party = store.get_party(party_id).await.unwrap().unwrap();
    let resumed = PartySession::resume(Arc::clone(&store), graph, Arc::new(NoOpSink), party)
        .await
        .unwrap();
    assert_eq!(resumed.progress(), 50);
    assert_eq!(resumed.state(), SessionState::Reading);
}
