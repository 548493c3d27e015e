use crate::domain::UserId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bearer token handed to a client after login.
pub type SessionToken = String;

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// In-memory session store. Sessions expire `ttl` after creation.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn is_live(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.created_at) < self.ttl
    }

    /// Create a new session and return the token. Expired sessions are
    /// swept while the write lock is held.
    pub async fn create_session(&self, user_id: UserId) -> SessionToken {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| self.is_live(session, now));
        sessions.insert(
            token.clone(),
            Session {
                user_id,
                created_at: now,
            },
        );
        token
    }

    /// Get a live session by token. Expired sessions are evicted on lookup.
    pub async fn get_session(&self, token: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if !self.is_live(&session, Utc::now()) {
            self.sessions.write().await.remove(token);
            return None;
        }
        Some(session)
    }

    /// Delete session (logout)
    pub async fn delete_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Number of sessions that have not expired.
    pub async fn active_sessions(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| self.is_live(session, now))
            .count()
    }

    #[cfg(test)]
    async fn stored_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}
