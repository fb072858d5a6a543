//! Keyed, versioned dialogue state storage.
//!
//! Every write is a compare-and-swap against the version observed at load
//! time, so two workers racing on the same user cannot both commit a
//! transition planned from the same state.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use crate::models::dialogue::{DialogueState, Versioned};
use crate::persistence::dialogue_repo::DialogueRepo;
use crate::Result;

/// Storage seam for dialogue state.
pub trait DialogueStore: Send + Sync {
    /// Load a user's state; absent users are the default state at version 0.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    fn load(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Versioned<DialogueState>>> + Send + '_>>;

    /// Replace the state if the stored version still equals `expected_version`.
    ///
    /// Resolves to `false` on a version conflict.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        state: &DialogueState,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;
}

/// Process-local store for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryDialogueStore {
    entries: Mutex<HashMap<String, Versioned<DialogueState>>>,
}

impl MemoryDialogueStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DialogueStore for MemoryDialogueStore {
    fn load(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Versioned<DialogueState>>> + Send + '_>> {
        let user_id = user_id.to_owned();
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(&user_id).cloned().unwrap_or(Versioned {
                value: DialogueState::default(),
                version: 0,
            }))
        })
    }

    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        state: &DialogueState,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let user_id = user_id.to_owned();
        let state = state.clone();
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let current = entries.get(&user_id).map_or(0, |entry| entry.version);
            if current != expected_version {
                return Ok(false);
            }
            entries.insert(
                user_id,
                Versioned {
                    value: state,
                    version: current + 1,
                },
            );
            Ok(true)
        })
    }
}

impl DialogueStore for DialogueRepo {
    fn load(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Versioned<DialogueState>>> + Send + '_>> {
        let user_id = user_id.to_owned();
        Box::pin(async move { DialogueRepo::load(self, &user_id).await })
    }

    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        state: &DialogueState,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let user_id = user_id.to_owned();
        let state = state.clone();
        Box::pin(async move {
            DialogueRepo::compare_and_swap(self, &user_id, expected_version, &state).await
        })
    }
}
