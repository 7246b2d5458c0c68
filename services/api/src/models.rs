//! API and Database Models
//!
//! This module defines the data structures used for database mapping with
//! `sqlx` and for generating OpenAPI documentation with `utoipa`.

use chrono::{DateTime, Utc};
use intervu_core::evaluation::Evaluation;
use intervu_core::session::{SessionStatus, TranscriptEntry};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One interview attempt, as persisted.
#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Interview {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub user_id: String,
    #[schema(value_type = String, format = Uuid)]
    pub topic_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Vec<Object>)]
    pub transcript: Json<Vec<TranscriptEntry>>,
    #[schema(value_type = Object)]
    pub ai_evaluation: Json<Evaluation>,
    pub score: i32,
    pub duration_mins: i32,
    pub questions_count: i32,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "active")]
    pub status: SessionStatus,
}

/// An interview topic. `legacy_id` supports lookups by the numeric ids used
/// before the move to UUIDs.
#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Topic {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub name: String,
    pub legacy_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A pre-written practice question for a topic.
#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Question {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, format = Uuid)]
    pub topic_id: Uuid,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct StartInterviewPayload {
    /// A topic UUID or a legacy numeric id, as a string.
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub topic_id: Option<String>,
    #[schema(example = "javascript")]
    pub topic_name: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug)]
pub struct QuestionParams {
    /// The topic to draw a random question from.
    pub topic_id: Uuid,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct EvaluatePayload {
    #[schema(value_type = String, format = Uuid)]
    pub interview_id: Uuid,
    /// Either an array of `{question, answer}` objects or an array of bare
    /// answer strings; normalized server-side.
    #[schema(value_type = Vec<Object>)]
    pub transcript: serde_json::Value,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct EvaluateResponse {
    pub success: bool,
    pub interview: Interview,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interview() -> Interview {
        Interview {
            id: Uuid::new_v4(),
            user_id: "user-42".to_string(),
            topic_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            transcript: Json(vec![TranscriptEntry {
                question: "What is a closure?".to_string(),
                answer: "A function plus captured state.".to_string(),
            }]),
            ai_evaluation: Json(Evaluation::default()),
            score: 0,
            duration_mins: 0,
            questions_count: 1,
            status: SessionStatus::Active,
        }
    }

    #[test]
    fn test_interview_serialization() {
        let interview = sample_interview();
        let json = serde_json::to_string(&interview).unwrap();

        assert!(json.contains("user-42"));
        assert!(json.contains("What is a closure?"));
        assert!(json.contains("\"status\":\"active\""));
        // Evaluation fields go out in camelCase.
        assert!(json.contains("overallScore"));

        let deserialized: Interview = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, interview.id);
        assert_eq!(deserialized.status, SessionStatus::Active);
        assert_eq!(deserialized.transcript.0.len(), 1);
    }

    #[test]
    fn test_terminated_status_wire_format() {
        let mut interview = sample_interview();
        interview.status = SessionStatus::TerminatedAbuse;
        let json = serde_json::to_string(&interview).unwrap();
        assert!(json.contains("\"status\":\"terminated_abuse\""));
    }

    #[test]
    fn test_start_payload_deserialization() {
        let json = r#"{"topic_name": "javascript"}"#;
        let payload: StartInterviewPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.topic_id, None);
        assert_eq!(payload.topic_name.as_deref(), Some("javascript"));

        let json = r#"{"topic_id": "7"}"#;
        let payload: StartInterviewPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.topic_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_evaluate_payload_accepts_mixed_transcripts() {
        let json = r#"{"interview_id": "550e8400-e29b-41d4-a716-446655440000", "transcript": ["just an answer", {"question": "Q", "answer": "A"}]}"#;
        let payload: EvaluatePayload = serde_json::from_str(json).unwrap();
        assert!(payload.transcript.is_array());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Topic not found".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Topic not found"}"#);
    }

    #[test]
    fn test_topic_serialization_round_trip() {
        let topic = Topic {
            id: Uuid::new_v4(),
            name: "javascript".to_string(),
            legacy_id: Some(7),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&topic).unwrap();
        let back: Topic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, topic.id);
        assert_eq!(back.legacy_id, Some(7));
    }
}
