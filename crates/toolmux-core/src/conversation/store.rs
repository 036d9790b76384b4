//! Conversation store

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::types::{ChatMessage, ConversationSettings, MessageRole};

/// Exclusive access to one conversation, held for a whole query
pub type SessionHandle = Arc<AsyncMutex<History>>;

/// Bounded, ordered history of one conversation
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<ChatMessage>,
    max_entries: usize,
}

impl History {
    fn new(max_entries: usize, system_prompt: Option<&str>) -> Self {
        let entries = system_prompt.map(ChatMessage::system).into_iter().collect();
        Self { entries, max_entries }
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append, then evict down to the cap
    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
        self.evict();
    }

    fn evict(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return;
        }

        let keep_system = self
            .entries
            .first()
            .is_some_and(|m| m.role == MessageRole::System);
        if keep_system {
            self.entries.drain(1..=excess);
        } else {
            self.entries.drain(..excess);
        }
    }
}

/// All conversations of the process
pub struct ConversationStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    max_turns: usize,
    system_prompt: Option<String>,
}

impl ConversationStore {
    /// `max_turns` is clamped to at least one turn
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
            system_prompt: None,
        }
    }

    pub fn from_settings(settings: &ConversationSettings) -> Self {
        let store = Self::new(settings.max_turns);
        match &settings.system_prompt {
            Some(prompt) => store.with_system_prompt(prompt.clone()),
            None => store,
        }
    }

    /// Seed every new conversation with a system entry
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_entries(&self) -> usize {
        2 * self.max_turns
    }

    /// Lock handle for `id`, creating the conversation if needed
    pub fn session(&self, id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(AsyncMutex::new(History::new(
                    self.max_entries(),
                    self.system_prompt.as_deref(),
                )))
            })
            .clone()
    }

    fn existing(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.lock().get(id).cloned()
    }

    /// Copy of the history; unknown ids yield an empty history
    pub async fn get(&self, id: &str) -> Vec<ChatMessage> {
        match self.existing(id) {
            Some(session) => session.lock().await.entries().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn append(&self, id: &str, message: ChatMessage) {
        self.session(id).lock().await.push(message);
    }

    pub async fn len(&self, id: &str) -> usize {
        match self.existing(id) {
            Some(session) => session.lock().await.len(),
            None => 0,
        }
    }

    /// Drop the conversation entirely; returns whether it existed
    pub fn clear(&self, id: &str) -> bool {
        self.sessions.lock().remove(id).is_some()
    }

    /// Ids of every live conversation
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
