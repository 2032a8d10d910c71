//! In-memory conversation history, keyed by session id.
//!
//! Each session keeps a bounded window of recent turns. When the window is
//! full the oldest turns fall off, so long conversations keep only their
//! tail. Everything lives in process memory; a restart forgets all sessions.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Transcript label for this role.
    pub const fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

struct SessionEntry {
    turns: VecDeque<Turn>,
    last_active: Instant,
}

/// Bounded per-session history store.
pub struct SessionStore {
    /// Maximum turns kept per session (a user/assistant pair is two turns).
    capacity: usize,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    /// Create a store keeping at most `memory_limit` exchanges per session.
    pub fn new(memory_limit: usize) -> Self {
        Self {
            capacity: memory_limit * 2,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Append a turn, evicting the oldest turns past capacity.
    pub async fn append(&self, session_id: &str, turn: Turn) {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                turns: VecDeque::new(),
                last_active: Instant::now(),
            });
        entry.turns.push_back(turn);
        while entry.turns.len() > self.capacity {
            entry.turns.pop_front();
        }
        entry.last_active = Instant::now();
    }

    /// Copy of the session's turns, oldest first. Empty for unknown sessions.
    pub async fn snapshot(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|entry| entry.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the session entirely.
    pub async fn clear(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }

    /// Drop sessions idle longer than `max_idle`. Returns how many were
    /// dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active.elapsed() < max_idle);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn is_known(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn turns_come_back_in_order() {
        let store = SessionStore::new(30);
        store.append("s1", Turn::user("hi")).await;
        store.append("s1", Turn::assistant("hello")).await;
        store.append("s1", Turn::user("how are you")).await;

        let turns = store.snapshot("s1").await;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hi");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].text, "how are you");
    }

    #[tokio::test]
    async fn history_is_bounded_to_the_tail() {
        let store = SessionStore::new(2); // four turns max
        for i in 0..6 {
            store.append("s1", Turn::user(format!("msg {i}"))).await;
        }

        let turns = store.snapshot("s1").await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].text, "msg 2");
        assert_eq!(turns[3].text, "msg 5");
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = SessionStore::new(30);
        assert!(store.snapshot("nope").await.is_empty());
    }

    #[tokio::test]
    async fn clear_forgets_the_session() {
        let store = SessionStore::new(30);
        store.append("s1", Turn::user("hi")).await;
        store.clear("s1").await;

        assert!(!store.is_known("s1").await);
        assert!(store.snapshot("s1").await.is_empty());
    }

    #[tokio::test]
    async fn evict_idle_drops_stale_sessions() {
        let store = SessionStore::new(30);
        store.append("stale", Turn::user("old")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.append("fresh", Turn::user("new")).await;

        let dropped = store.evict_idle(Duration::from_millis(25)).await;
        assert_eq!(dropped, 1);
        assert!(!store.is_known("stale").await);
        assert!(store.is_known("fresh").await);
    }
}
