//! In-memory session store
//!
//! A map of session id → message window. Created lazily on first write,
//! trimmed on every write, deleted explicitly. Nothing survives a restart.

use std::collections::HashMap;

use crate::llm::ChatMessage;

#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, Vec<ChatMessage>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored history, empty for an unknown session.
    pub fn snapshot(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// The stored history, or `None` for an unknown session.
    pub fn history(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.sessions.get(session_id).cloned()
    }

    /// Replace a session's history, keeping only the most recent `window`
    /// entries.
    pub fn store(&mut self, session_id: &str, mut messages: Vec<ChatMessage>, window: usize) {
        if messages.len() > window {
            messages.drain(..messages.len() - window);
        }
        self.sessions.insert(session_id.to_string(), messages);
    }

    pub fn message_count(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map_or(0, Vec::len)
    }

    /// Delete a session. Reports whether it existed.
    pub fn clear(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }
}
