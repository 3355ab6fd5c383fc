//! The inbound query shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user question bound to a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: Uuid,
    pub session_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Query {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}
