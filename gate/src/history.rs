use std::collections::VecDeque;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Bounded per-user conversation window used as model context.
///
/// Eviction is FIFO, not LRU: turn order is what matters, so once the
/// window is full the oldest turn goes first. Process-local cache only;
/// losing it costs conversational continuity, nothing else.
pub struct ConversationStore {
    max_turns: usize,
    turns: DashMap<Uuid, VecDeque<ChatTurn>>,
}

impl ConversationStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            turns: DashMap::new(),
        }
    }

    pub fn append(&self, user_id: Uuid, role: ChatRole, content: String) {
        let mut window = self.turns.entry(user_id).or_default();
        window.push_back(ChatTurn { role, content });
        while window.len() > self.max_turns {
            window.pop_front();
        }
    }

    /// Snapshot of the user's window, oldest turn first.
    pub fn history(&self, user_id: Uuid) -> Vec<ChatTurn> {
        self.turns
            .get(&user_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, user_id: Uuid) {
        self.turns.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_most_recent_turns_in_order() {
        let store = ConversationStore::new(20);
        let user = Uuid::new_v4();

        for i in 0..25 {
            store.append(user, ChatRole::User, format!("message {}", i));
        }

        let history = store.history(user);
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().unwrap().content, "message 5");
        assert_eq!(history.last().unwrap().content, "message 24");
    }

    #[test]
    fn history_is_empty_for_unknown_users() {
        let store = ConversationStore::new(20);
        assert!(store.history(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn clear_resets_the_window() {
        let store = ConversationStore::new(20);
        let user = Uuid::new_v4();

        store.append(user, ChatRole::User, "hello".to_string());
        store.append(user, ChatRole::Assistant, "hi".to_string());
        store.clear(user);

        assert!(store.history(user).is_empty());
    }

    #[test]
    fn windows_are_per_user() {
        let store = ConversationStore::new(20);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store.append(first, ChatRole::User, "mine".to_string());

        assert_eq!(store.history(first).len(), 1);
        assert!(store.history(second).is_empty());
    }
}
