//! Session domain model.
//!
//! A session is one user's ongoing conversation: an append-only list of
//! turns plus the most recently resolved product anchor. Sessions live in
//! memory only and are bounded by the budgets in
//! [`SessionConfig`](crate::config::SessionConfig).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::ProductRef;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

/// One utterance in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// In-memory state for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub turns: Vec<Turn>,
    /// Survives turn eviction so follow-up questions keep resolving.
    pub last_product: Option<ProductRef>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            last_product: None,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Total character count of the rendered history.
    pub fn context_chars(&self) -> usize {
        self.turns.iter().map(|turn| turn.text.chars().count()).sum()
    }
}
