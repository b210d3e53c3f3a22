use parking_lot::RwLock;
use relay_core::{Conversation, Turn};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default number of turns retained per session.
pub const MAX_HISTORY: usize = relay_core::config::DEFAULT_MAX_HISTORY;

pub type SessionId = String;

/// Process-lifetime session memory. Cloning shares the underlying map.
///
/// Every stored conversation holds at most `max_history` turns; writes that
/// would exceed it drop the oldest turns first.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Conversation>>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_max_history(MAX_HISTORY)
    }

    /// A store retaining `max_history` turns per session (minimum 1).
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Allocate a fresh random session id with an empty conversation.
    pub fn create_session(&self) -> SessionId {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.write().insert(id.clone(), Conversation::new());
        debug!(session_id = %id, "session created");
        id
    }

    /// A copy of the stored conversation. Unknown ids yield an empty
    /// conversation rather than an error.
    pub fn get_history(&self, id: &str) -> Conversation {
        self.sessions.read().get(id).cloned().unwrap_or_default()
    }

    /// Replace the stored conversation with the last `max_history` turns of
    /// `conv`, creating the entry if needed.
    pub fn set_history(&self, id: &str, mut conv: Conversation) {
        self.truncate(&mut conv);
        self.sessions.write().insert(id.to_string(), conv);
    }

    /// Append `turn` and store the result in one step.
    ///
    /// The stored conversation is truncated as by [`set_history`], but the
    /// returned value is the untruncated previous history plus `turn`, so it
    /// may hold `max_history + 1` turns.
    ///
    /// [`set_history`]: SessionStore::set_history
    pub fn append_turn(&self, id: &str, turn: Turn) -> Conversation {
        let mut map = self.sessions.write();
        let conv = map.entry(id.to_string()).or_default();
        conv.push(turn);
        let updated = conv.clone();
        self.truncate(conv);
        updated
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Number of sessions held.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    fn truncate(&self, conv: &mut Conversation) {
        if conv.len() > self.max_history {
            let excess = conv.len() - self.max_history;
            conv.drain(..excess);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
