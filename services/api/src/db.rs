//! Data Access Layer
//!
//! All PostgreSQL access for the service lives here, built on `sqlx` with
//! runtime-checked queries and connection pooling. `Db` also implements the
//! core's `SessionStore` and `TopicResolver` contracts, so the session state
//! machine persists and resolves through this layer without knowing about
//! SQL.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intervu_core::store::{NewSessionRecord, SessionOutcome, SessionStore};
use intervu_core::topic::{Topic as CoreTopic, TopicError, TopicRef, TopicResolver};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{Interview, Question, Topic};

const INTERVIEW_COLUMNS: &str = "id, user_id, topic_id, started_at, completed_at, transcript, \
     ai_evaluation, score, duration_mins, questions_count, status";

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a fresh interview row and returns it.
    pub async fn create_interview(
        &self,
        id: Uuid,
        user_id: &str,
        topic_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Interview> {
        let query = format!(
            "INSERT INTO interviews (id, user_id, topic_id, started_at) \
             VALUES ($1, $2, $3, $4) RETURNING {INTERVIEW_COLUMNS}"
        );
        let interview = sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .bind(user_id)
            .bind(topic_id)
            .bind(started_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(interview)
    }

    /// Applies the terminal partial update to an interview row.
    pub async fn finalize_interview(&self, id: Uuid, outcome: &SessionOutcome) -> Result<()> {
        sqlx::query(
            "UPDATE interviews SET transcript = $2, ai_evaluation = $3, score = $4, \
             completed_at = $5, duration_mins = $6, questions_count = $7, status = $8 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(&outcome.transcript))
        .bind(Json(&outcome.evaluation))
        .bind(outcome.score)
        .bind(outcome.completed_at)
        .bind(outcome.duration_mins)
        .bind(outcome.questions_count)
        .bind(outcome.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retrieves a single interview, scoped to its owner.
    pub async fn get_interview(&self, id: Uuid, user_id: &str) -> Result<Option<Interview>> {
        let query =
            format!("SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1 AND user_id = $2");
        let interview = sqlx::query_as::<_, Interview>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(interview)
    }

    /// Lists a participant's interviews, most recent first.
    pub async fn list_interviews(&self, user_id: &str) -> Result<Vec<Interview>> {
        let query = format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE user_id = $1 \
             ORDER BY started_at DESC"
        );
        let interviews = sqlx::query_as::<_, Interview>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(interviews)
    }

    pub async fn find_topic(&self, id: Uuid) -> Result<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            "SELECT id, name, legacy_id, created_at FROM topics WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(topic)
    }

    pub async fn find_topic_by_legacy_id(&self, legacy_id: i64) -> Result<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            "SELECT id, name, legacy_id, created_at FROM topics WHERE legacy_id = $1",
        )
        .bind(legacy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(topic)
    }

    /// Case-insensitive exact-name lookup.
    pub async fn find_topic_by_name(&self, name: &str) -> Result<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            "SELECT id, name, legacy_id, created_at FROM topics WHERE name ILIKE $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(topic)
    }

    /// All stored practice questions for a topic.
    pub async fn questions_for_topic(&self, topic_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, topic_id, question, created_at FROM questions WHERE topic_id = $1",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}

#[async_trait]
impl SessionStore for Db {
    async fn insert_session(&self, record: NewSessionRecord) -> Result<()> {
        self.create_interview(
            record.session_id,
            &record.participant_id,
            record.topic_id,
            record.started_at,
        )
        .await?;
        Ok(())
    }

    async fn finalize_session(&self, session_id: Uuid, outcome: SessionOutcome) -> Result<()> {
        self.finalize_interview(session_id, &outcome).await
    }
}

#[async_trait]
impl TopicResolver for Db {
    /// Resolves a loose topic reference: UUID passthrough first, then legacy
    /// numeric id, then case-insensitive name.
    async fn resolve(&self, topic: &TopicRef) -> Result<CoreTopic, TopicError> {
        if let Some(id) = topic.id.as_deref() {
            if let Ok(uuid) = Uuid::parse_str(id) {
                // Passthrough; pick up the canonical name when the row exists.
                if let Some(row) = self.find_topic(uuid).await.map_err(TopicError::Lookup)? {
                    return Ok(CoreTopic {
                        id: row.id,
                        name: row.name,
                    });
                }
                return Ok(CoreTopic {
                    id: uuid,
                    name: topic.name.clone().unwrap_or_default(),
                });
            }
            if let Ok(legacy_id) = id.parse::<i64>() {
                if let Some(row) = self
                    .find_topic_by_legacy_id(legacy_id)
                    .await
                    .map_err(TopicError::Lookup)?
                {
                    return Ok(CoreTopic {
                        id: row.id,
                        name: row.name,
                    });
                }
            }
        }

        if let Some(name) = topic.name.as_deref() {
            return match self
                .find_topic_by_name(name)
                .await
                .map_err(TopicError::Lookup)?
            {
                Some(row) => Ok(CoreTopic {
                    id: row.id,
                    name: row.name,
                }),
                None => Err(TopicError::NotFound),
            };
        }

        Err(TopicError::InvalidReference)
    }
}
