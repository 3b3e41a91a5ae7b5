use super::{ChatTurn, ConversationMemory};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Session used by callers that do not identify a conversation. Never evicted.
pub const DEFAULT_SESSION_ID: &str = "default";

struct Session {
    memory: ConversationMemory,
    last_active: Instant,
}

/// Conversation memories keyed by session id.
///
/// Sessions are created on first write and evicted once idle for longer than the configured
/// timeout. The lock is only held for the duration of a single read or write, never across
/// provider calls.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_turns: Option<usize>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    /// Create an empty store. `idle_timeout` of `None` keeps sessions forever.
    pub fn new(max_turns: Option<usize>, idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns,
            idle_timeout,
        }
    }

    /// History of `session_id` in insertion order; empty for unknown sessions.
    pub async fn snapshot(&self, session_id: &str) -> Vec<ChatTurn> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_active = Instant::now();
                session.memory.snapshot()
            }
            None => Vec::new(),
        }
    }

    /// Append a question and its answer as one unit and return the resulting history.
    pub async fn record_exchange(
        &self,
        session_id: &str,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Vec<ChatTurn> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                memory: ConversationMemory::with_max_turns(self.max_turns),
                last_active: Instant::now(),
            });
        session.memory.append_exchange(question, answer);
        session.last_active = Instant::now();
        session.memory.snapshot()
    }

    /// Forget everything recorded for `session_id`.
    pub async fn reset(&self, session_id: &str) {
        let removed = self.sessions.lock().await.remove(session_id);
        tracing::debug!(
            session = session_id,
            turns = removed.map(|session| session.memory.len()).unwrap_or(0),
            "Session memory cleared"
        );
    }

    /// Number of turns stored for `session_id`.
    pub async fn turn_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|session| session.memory.len())
            .unwrap_or(0)
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop every non-default session idle since before `now - idle_timeout`.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            id == DEFAULT_SESSION_ID || now.saturating_duration_since(session.last_active) < timeout
        });
        before - sessions.len()
    }

    /// Run [`Self::evict_idle`] every `period` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        if self.idle_timeout.is_none() || period.is_zero() {
            return None;
        }
        let store: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_idle(Instant::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Evicted idle chat sessions");
                }
            }
        }))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None, None)
    }
}
