use std::sync::Arc;

use chrono::Utc;

use task_intercom::dialogue::store::{DialogueStore, MemoryDialogueStore};
use task_intercom::models::dialogue::{DialogueState, LastMessage};
use task_intercom::persistence::{db, dialogue_repo::DialogueRepo};

fn sample_state(text: &str) -> DialogueState {
    DialogueState {
        pending: None,
        last_message: Some(LastMessage::new(text, Utc::now())),
    }
}

async fn repo() -> DialogueRepo {
    let pool = db::connect_memory().await.expect("db connect");
    DialogueRepo::new(Arc::new(pool))
}

async fn exercise_versioning(store: &dyn DialogueStore) {
    let absent = store.load("U1").await.expect("load");
    assert_eq!(absent.version, 0);
    assert_eq!(absent.value, DialogueState::default());

    let first = sample_state("listar");
    assert!(store.compare_and_swap("U1", 0, &first).await.expect("cas"));
    assert!(
        !store.compare_and_swap("U1", 0, &sample_state("other")).await.expect("cas"),
        "second insert at version 0 must lose"
    );

    let loaded = store.load("U1").await.expect("load");
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.value, first);

    let second = sample_state("feito 2");
    assert!(store.compare_and_swap("U1", 1, &second).await.expect("cas"));
    assert!(!store.compare_and_swap("U1", 1, &first).await.expect("cas"));
    assert_eq!(store.load("U1").await.expect("load").version, 2);

    assert_eq!(store.load("U2").await.expect("load").version, 0);
}

#[tokio::test]
async fn sqlite_store_is_versioned() {
    let repo = repo().await;
    exercise_versioning(&repo).await;
}

#[tokio::test]
async fn memory_store_is_versioned() {
    exercise_versioning(&MemoryDialogueStore::new()).await;
}

#[tokio::test]
async fn state_round_trips_through_json_column() {
    let repo = repo().await;
    let state = sample_state("apagar 3");
    assert!(repo.compare_and_swap("U1", 0, &state).await.expect("cas"));
    let loaded = repo.load("U1").await.expect("load");
    assert_eq!(loaded.value.last_message, state.last_message);
}

#[tokio::test]
async fn purge_idle_removes_stale_rows() {
    let repo = repo().await;
    assert!(repo
        .compare_and_swap("U1", 0, &sample_state("oi"))
        .await
        .expect("cas"));

    let kept = repo
        .purge_idle(Utc::now() - chrono::Duration::hours(1))
        .await
        .expect("purge");
    assert_eq!(kept, 0);

    let purged = repo
        .purge_idle(Utc::now() + chrono::Duration::seconds(1))
        .await
        .expect("purge");
    assert_eq!(purged, 1);
    assert_eq!(repo.load("U1").await.expect("load").version, 0);
}
