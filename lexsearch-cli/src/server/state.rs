use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use lexsearch_lib::compose::Composer;
use lexsearch_lib::session::{ChatTurn, Conversation};
use tokio::sync::Mutex;

use crate::engine::Engine;

/// Result counts applied when a request does not set `k`.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Per-corpus count for dual search
    pub dual_top_k: usize,
    /// Sections retrieved to answer a chat message
    pub chat_top_k: usize,
}

impl Limits {
    /// Clamp a requested `k` into `1..=max_top_k`.
    pub fn top_k(&self, requested: Option<usize>, default: usize) -> usize {
        requested.unwrap_or(default).clamp(1, self.max_top_k.max(1))
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 20,
            dual_top_k: 3,
            chat_top_k: 3,
        }
    }
}

/// Shared, read-only service state plus the chat session table.
pub struct AppState {
    /// Primary corpus (Bharatiya Nyaya Sanhita)
    pub bns: Arc<Engine>,
    /// Optional second corpus (Indian Penal Code) for dual search
    pub ipc: Option<Arc<Engine>>,
    pub composer: Composer,
    pub sessions: SessionStore,
    pub limits: Limits,
}

/// Conversations keyed by session id.
///
/// Bounded: once `max_sessions` is reached the least recently created
/// session is dropped.
pub struct SessionStore {
    inner: Mutex<Sessions>,
    window: usize,
    max_sessions: usize,
}

struct Sessions {
    conversations: HashMap<String, Conversation>,
    created: VecDeque<String>,
}

impl SessionStore {
    pub fn new(window: usize, max_sessions: usize) -> Self {
        Self {
            inner: Mutex::new(Sessions {
                conversations: HashMap::new(),
                created: VecDeque::new(),
            }),
            window,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Append an exchange to a session and return its retained turns.
    pub async fn record(&self, session_id: &str, question: &str, answer: &str) -> Vec<ChatTurn> {
        let mut sessions = self.inner.lock().await;

        if !sessions.conversations.contains_key(session_id) {
            while sessions.conversations.len() >= self.max_sessions {
                let Some(oldest) = sessions.created.pop_front() else {
                    break;
                };
                sessions.conversations.remove(&oldest);
            }
            sessions.created.push_back(session_id.to_string());
        }

        let conversation = sessions
            .conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Conversation::new(self.window));
        conversation.record_exchange(question, answer);
        conversation.recent().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.conversations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_clamped() {
        let limits = Limits::default();
        assert_eq!(limits.top_k(None, 5), 5);
        assert_eq!(limits.top_k(Some(0), 5), 1);
        assert_eq!(limits.top_k(Some(500), 5), 20);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(6, 10);
        store.record("a", "q1", "a1").await;
        let b = store.record("b", "q2", "a2").await;
        let a = store.record("a", "q3", "a3").await;

        assert_eq!(b.len(), 2);
        assert_eq!(a.len(), 4);
        assert_eq!(a[2].text, "q3");
    }

    #[tokio::test]
    async fn test_oldest_session_evicted() {
        let store = SessionStore::new(6, 2);
        store.record("a", "q", "a").await;
        store.record("b", "q", "a").await;
        store.record("c", "q", "a").await;
        assert_eq!(store.len().await, 2);

        // "a" was evicted, so it starts over
        let a = store.record("a", "q", "a").await;
        assert_eq!(a.len(), 2);
    }
}
