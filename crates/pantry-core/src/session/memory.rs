//! Per-session conversational memory.
//!
//! `SessionMemory` owns every live [`Session`]. Mutation for a given
//! session id is serialized through a per-session mutex so concurrent
//! turns apply in arrival order, while reads hand out cloned snapshots so
//! an idle-TTL purge can never tear an in-flight orchestration run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::SessionConfig;
use crate::product::ProductRef;
use crate::session::model::{Session, Turn};

/// Process-wide store of conversation sessions.
pub struct SessionMemory {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    config: SessionConfig,
    last_sweep: Mutex<Option<std::time::Instant>>,
}

impl SessionMemory {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            last_sweep: Mutex::new(None),
        }
    }

    /// Returns a snapshot of the session, creating an empty one on first use.
    pub async fn load(&self, session_id: &str) -> Session {
        let entry = self.entry(session_id).await;
        let mut session = entry.lock().await;
        session.last_active_at = Utc::now();
        session.clone()
    }

    /// Appends a turn, enforcing the turn-count and character budgets.
    ///
    /// Oldest turns are dropped first; `last_product` is stored separately
    /// and survives eviction.
    pub async fn append_turn(&self, session_id: &str, turn: Turn) {
        let entry = self.entry(session_id).await;
        let mut session = entry.lock().await;
        session.turns.push(turn);
        session.last_active_at = Utc::now();
        self.enforce_budget(&mut session);
    }

    /// Records the most recently resolved product for follow-up queries.
    pub async fn set_last_product(&self, session_id: &str, product: ProductRef) {
        let entry = self.entry(session_id).await;
        let mut session = entry.lock().await;
        debug!(session_id, product = %product, "updating last resolved product");
        session.last_product = Some(product);
        session.last_active_at = Utc::now();
    }

    /// Purges sessions idle past the TTL.
    ///
    /// Throttled to at most one sweep per configured interval, so it can
    /// be called opportunistically on every query. Removal only drops the
    /// map entry; runs still holding the `Arc` keep their session alive.
    pub async fn evict_idle(&self) {
        let mut last_sweep = self.last_sweep.lock().await;
        if let Some(at) = *last_sweep {
            if at.elapsed() < self.config.sweep_interval() {
                return;
            }
        }
        *last_sweep = Some(std::time::Instant::now());
        drop(last_sweep);

        let ttl = chrono::Duration::from_std(self.config.idle_ttl())
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let cutoff = Utc::now() - ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let mut expired = Vec::new();
        for (id, entry) in sessions.iter() {
            if let Ok(session) = entry.try_lock() {
                if session.last_active_at < cutoff {
                    expired.push(id.clone());
                }
            }
        }
        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            debug!(purged = expired.len(), remaining = before - expired.len(), "idle session sweep");
        }
    }

    /// Number of live sessions (diagnostics).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn entry(&self, session_id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(session_id) {
                return entry.clone();
            }
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(session_id))))
            .clone()
    }

    fn enforce_budget(&self, session: &mut Session) {
        while session.turns.len() > self.config.max_turns {
            session.turns.remove(0);
        }
        while session.turns.len() > 1 && session.context_chars() > self.config.max_context_chars {
            session.turns.remove(0);
        }
    }
}
