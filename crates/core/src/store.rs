//! Durable persistence contract for interview sessions.
//!
//! The state machine treats storage as a key-value store addressed by session
//! id: one insert when the session starts, one partial update when it reaches
//! a terminal state. Write failures on the terminal update are reported to the
//! caller's logs but never block emission of the in-memory result.

use crate::evaluation::Evaluation;
use crate::session::{SessionStatus, TranscriptEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The row written when a session starts.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub session_id: Uuid,
    pub participant_id: String,
    pub topic_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// The partial update written when a session reaches a terminal state.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub transcript: Vec<TranscriptEntry>,
    pub evaluation: Evaluation,
    pub score: i32,
    pub completed_at: DateTime<Utc>,
    pub duration_mins: i32,
    pub questions_count: i32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a freshly started session.
    async fn insert_session(&self, record: NewSessionRecord) -> anyhow::Result<()>;

    /// Persists the terminal outcome of a session.
    async fn finalize_session(&self, session_id: Uuid, outcome: SessionOutcome)
    -> anyhow::Result<()>;
}
