// ============================
// gamenight-backend-lib/src/auth/session.rs
// ============================
//! Bearer token sessions.
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use ::metrics::{counter, gauge};
use gamenight_common::UserId;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;
use uuid::Uuid;

use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED};

/// Session information
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub expires_at: SystemTime,
}

impl Session {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// Session manager for handling bearer tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a token for `user_id`
    pub async fn new_session(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = SystemTime::now();
        let session = Session {
            user_id: user_id.to_string(),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Live session for `token`; expired ones are treated as absent
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| !s.is_expired(SystemTime::now()))
            .cloned()
    }

    /// Drop a token; returns whether it existed
    pub async fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Remove expired sessions; returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = SystemTime::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        let removed = before - sessions.len();

        if removed > 0 {
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
            debug!(removed, "expired sessions purged");
        }
        removed
    }

    /// Periodically purge expired sessions
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                manager.purge_expired().await;
            }
        })
    }
}
