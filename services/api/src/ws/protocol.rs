//! Defines the WebSocket message protocol between the client and the server.

use intervu_core::session::{SessionEvent, TranscriptEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Starts a new interview. A topic id (UUID or legacy numeric) or a
    /// topic name must be supplied.
    StartInterview {
        topic_id: Option<String>,
        topic_name: Option<String>,
    },
    /// Submits the answer to the pending question.
    SubmitAnswer {
        #[serde(rename = "previousAnswer")]
        previous_answer: Option<String>,
    },
}

/// Messages sent from the server to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Confirms the interview was created.
    InterviewStarted {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    /// The next question to put to the candidate.
    NextQuestion {
        question: String,
        #[serde(rename = "questionNumber")]
        question_number: u32,
    },
    /// Immediate, heuristic feedback on the submitted answer.
    AnswerFeedback { feedback: String },
    /// The final result, sent exactly once per interview.
    InterviewFinished {
        message: String,
        #[serde(rename = "overallScore")]
        overall_score: i32,
        strengths: Vec<String>,
        #[serde(rename = "areasToImprove")]
        areas_to_improve: Vec<String>,
        summary: String,
        transcript: Vec<TranscriptEntry>,
    },
    /// Reports a failure to the client.
    Error { message: String },
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Started { session_id } => ServerMessage::InterviewStarted { session_id },
            SessionEvent::Question { question, number } => ServerMessage::NextQuestion {
                question,
                question_number: number,
            },
            SessionEvent::Feedback { feedback } => ServerMessage::AnswerFeedback { feedback },
            SessionEvent::Finished {
                message,
                evaluation,
                transcript,
            } => ServerMessage::InterviewFinished {
                message,
                overall_score: evaluation.overall_score,
                strengths: evaluation.strengths,
                areas_to_improve: evaluation.areas_to_improve,
                summary: evaluation.summary,
                transcript,
            },
        }
    }
}
