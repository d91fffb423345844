use super::{ChatMessage, WELCOME_MESSAGE};
use crate::metrics::record_sessions;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl ChatSession {
    fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE, None)],
            created_at: now,
            last_active: now,
        }
    }
}

/// In-memory chat transcripts with an idle timeout
///
/// Expired sessions are dropped lazily whenever the store is touched.
pub struct ChatSessionStore {
    sessions: RwLock<HashMap<Uuid, ChatSession>>,
    ttl: Duration,
}

impl ChatSessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn open(&self) -> ChatSession {
        let now = Utc::now();
        let session = ChatSession::new(Uuid::new_v4(), now);

        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);
        sessions.insert(session.id, session.clone());
        record_sessions(sessions.len());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<ChatSession> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|s| !self.is_expired(s, now))
            .cloned()
    }

    /// Append messages, opening the session under `id` if it is unknown
    pub async fn append(&self, id: Uuid, messages: Vec<ChatMessage>) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);

        let session = sessions
            .entry(id)
            .or_insert_with(|| ChatSession::new(id, now));
        session.messages.extend(messages);
        session.last_active = now;
        record_sessions(sessions.len());
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id).is_some();
        record_sessions(sessions.len());
        removed
    }

    pub async fn active(&self) -> usize {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| !self.is_expired(s, now)).count()
    }

    fn is_expired(&self, session: &ChatSession, now: DateTime<Utc>) -> bool {
        now - session.last_active > self.ttl
    }

    fn prune(&self, sessions: &mut HashMap<Uuid, ChatSession>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, remaining = sessions.len(), "Expired chat sessions pruned");
        }
    }
}
