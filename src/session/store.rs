use crate::session::SynthesisList;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sessions idle longer than this are dropped
pub const DEFAULT_SESSION_TTL_SECS: i64 = 4 * 60 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// State of one respondent's visit
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    /// Organization bound by the link check, authoritative for every submission
    pub organization: String,
    pub records: SynthesisList,
    pub created_at: DateTime<Utc>,
}

/// A session is locked for the whole of each interaction, submissions included
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("too many open sessions ({limit}), try again later")]
    LimitReached { limit: usize },
}

struct Entry {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Open sessions keyed by id
///
/// Every lookup refreshes a session's idle clock. Idle sessions are swept on
/// each `create`, and an idle session found by `get` is dropped on the spot.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(
            Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            DEFAULT_MAX_SESSIONS,
        )
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_sessions,
        }
    }

    /// Open a session for an organization that already passed the link check
    pub async fn create(&self, organization: String) -> Result<(Uuid, SessionHandle), SessionError> {
        self.create_at(organization, Utc::now()).await
    }

    pub async fn create_at(
        &self,
        organization: String,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, SessionHandle), SessionError> {
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));
        if sessions.len() < before {
            debug!("Dropped {} idle sessions", before - sessions.len());
        }

        if sessions.len() >= self.max_sessions {
            warn!("Session limit of {} reached", self.max_sessions);
            return Err(SessionError::LimitReached {
                limit: self.max_sessions,
            });
        }

        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(Session {
            id,
            organization,
            records: SynthesisList::new(),
            created_at: now,
        }));
        sessions.insert(
            id,
            Entry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        Ok((id, handle))
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.get_at(id, Utc::now()).await
    }

    pub async fn get_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        let idle = self.is_idle(sessions.get(id)?, now);
        if idle {
            debug!("Session {} expired", id);
            sessions.remove(id);
            return None;
        }

        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry.handle.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn is_idle(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now - entry.last_seen > self.ttl
    }
}
