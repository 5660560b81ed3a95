//! Conversation history shared between the send path and the background reader.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::types::Turn;

/// An ordered, shareable sequence of turns.
///
/// Clones share the same underlying history. User turns are appended by the
/// foreground; assistant turns are appended by the connection's reader task.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Arc<Mutex<Vec<Turn>>>,
}

impl ConversationHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn.
    pub fn append(&self, turn: Turn) {
        self.lock().push(turn);
    }

    /// Removes the last exchange (the last two turns).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientHistory`] and leaves the history untouched
    /// if fewer than two turns are present.
    pub fn undo(&self) -> Result<()> {
        let mut turns = self.lock();
        if turns.len() < 2 {
            return Err(Error::insufficient_history(turns.len()));
        }
        let keep = turns.len() - 2;
        turns.truncate(keep);
        Ok(())
    }

    /// Returns an owned copy of the current turns.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().clone()
    }

    /// Appends `turn` and returns a snapshot that includes it, atomically.
    pub fn append_and_snapshot(&self, turn: Turn) -> Vec<Turn> {
        let mut turns = self.lock();
        turns.push(turn);
        turns.clone()
    }

    /// Returns the number of turns.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no turns have been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Turn>> {
        // A panic while holding the lock cannot leave a Vec half-pushed.
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
