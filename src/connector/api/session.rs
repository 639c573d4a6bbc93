//! Per-conversation rolling history with inactivity eviction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Messages retained per conversation; the oldest pair is evicted first.
pub const MAX_MESSAGES: usize = 20;
/// Sessions idle longer than this are purged on the next sweep.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct Session {
    messages: Vec<(String, String)>,
    last_activity: Instant,
}

/// Conversation store. History is best-effort, bounded, and never persisted;
/// sweeps run opportunistically on each query instead of on a timer.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Clone the rolling history for a conversation, creating an empty
    /// session on first reference.
    pub fn history(&self, id: &str) -> Vec<(String, String)> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions.entry(id.to_string()).or_insert_with(|| Session {
            messages: Vec::new(),
            last_activity: Instant::now(),
        });
        session.messages.clone()
    }

    /// Append a query/answer pair and evict the oldest pair past the cap.
    pub fn record_exchange(&self, id: &str, query: &str, answer: &str) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions.entry(id.to_string()).or_insert_with(|| Session {
            messages: Vec::new(),
            last_activity: Instant::now(),
        });

        session.messages.push(("User".to_string(), query.to_string()));
        session
            .messages
            .push(("Assistant".to_string(), answer.to_string()));
        session.last_activity = Instant::now();

        while session.messages.len() > MAX_MESSAGES {
            session.messages.drain(..2);
        }
    }

    /// Drop sessions idle longer than the TTL, measured against `now`.
    pub fn sweep(&self, now: Instant) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_activity) <= SESSION_TTL);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {purged} idle conversations");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
