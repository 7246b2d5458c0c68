//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for interview
//! management. It uses `utoipa` doc comments to generate OpenAPI
//! documentation. Every endpoint resolves the caller's identity from a
//! bearer token before touching any data.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use intervu_core::session::{SessionStatus, TranscriptEntry};
use intervu_core::store::SessionOutcome;
use intervu_core::topic::{TopicError, TopicRef, TopicResolver};
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::{
    auth::{self, AuthError, AuthUser},
    models::{
        ErrorResponse, EvaluatePayload, EvaluateResponse, Interview, Question, QuestionParams,
        StartInterviewPayload,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl ApiError {
    fn topic(err: TopicError) -> Self {
        match err {
            TopicError::NotFound => ApiError::NotFound("Topic not found".to_string()),
            TopicError::InvalidReference => ApiError::BadRequest(err.to_string()),
            TopicError::Lookup(e) => ApiError::InternalServerError(e),
        }
    }

    fn auth(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Provider(e) => ApiError::InternalServerError(e),
        }
    }
}

/// Resolves the caller's identity from the `Authorization` header.
pub(crate) async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthUser, ApiError> {
    let token =
        auth::bearer_token(headers).ok_or_else(|| ApiError::auth(AuthError::MissingToken))?;
    state.auth.verify(token).await.map_err(ApiError::auth)
}

/// Start a new interview attempt.
#[utoipa::path(
    post,
    path = "/api/interviews/start",
    request_body = StartInterviewPayload,
    responses(
        (status = 201, description = "Interview created", body = Interview),
        (status = 400, description = "Bad topic reference", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    )
)]
pub async fn start_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&state, &headers).await?;

    let topic_ref = TopicRef {
        id: payload.topic_id,
        name: payload.topic_name,
    };
    let topic = state
        .db
        .resolve(&topic_ref)
        .await
        .map_err(ApiError::topic)?;

    let interview = state
        .db
        .create_interview(Uuid::new_v4(), &user.id, topic.id, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(interview)))
}

/// Fetch a random stored practice question for a topic.
#[utoipa::path(
    get,
    path = "/api/interviews/question",
    responses(
        (status = 200, description = "A random question", body = Question),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No questions for this topic", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        QuestionParams,
        ("Authorization" = String, Header, description = "Bearer access token")
    )
)]
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<QuestionParams>,
) -> Result<Json<Question>, ApiError> {
    let _user = require_user(&state, &headers).await?;

    let questions = state.db.questions_for_topic(params.topic_id).await?;
    let question = questions
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| ApiError::NotFound("No questions found for this topic".to_string()))?;

    Ok(Json(question))
}

/// Submit a full transcript for evaluation.
#[utoipa::path(
    post,
    path = "/api/interviews/evaluate",
    request_body = EvaluatePayload,
    responses(
        (status = 200, description = "Evaluation stored", body = EvaluateResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Interview not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    )
)]
pub async fn evaluate_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EvaluatePayload>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let interview = state
        .db
        .get_interview(payload.interview_id, &user.id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Interview with id '{}' not found",
                payload.interview_id
            ))
        })?;

    let transcript = normalize_transcript(&payload.transcript);
    let evaluation = state.evaluation_oracle.evaluate(&transcript).await;

    let now = Utc::now();
    let duration_mins =
        (((now - interview.started_at).num_seconds() as f64) / 60.0).round() as i32;
    let outcome = SessionOutcome {
        status: SessionStatus::Completed,
        score: evaluation.overall_score,
        questions_count: transcript.len() as i32,
        transcript,
        evaluation,
        completed_at: now,
        duration_mins,
    };
    state
        .db
        .finalize_interview(interview.id, &outcome)
        .await?;

    let interview = state
        .db
        .get_interview(interview.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Interview disappeared during update".to_string()))?;

    Ok(Json(EvaluateResponse {
        success: true,
        interview,
    }))
}

/// Get the caller's interview history.
#[utoipa::path(
    get,
    path = "/api/interviews/history",
    responses(
        (status = 200, description = "Interview history, newest first", body = [Interview]),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    )
)]
pub async fn interview_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Interview>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let interviews = state.db.list_interviews(&user.id).await?;
    Ok(Json(interviews))
}

/// Normalizes a client-supplied transcript into `{question, answer}` pairs.
///
/// Accepts an array of objects, an array of bare answer strings, or a single
/// scalar; anything unrecognized becomes an entry with a placeholder
/// question.
fn normalize_transcript(value: &Value) -> Vec<TranscriptEntry> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(answer) => TranscriptEntry {
                    question: "N/A".to_string(),
                    answer: answer.clone(),
                },
                Value::Object(obj) => TranscriptEntry {
                    question: obj
                        .get("question")
                        .and_then(Value::as_str)
                        .unwrap_or("N/A")
                        .to_string(),
                    answer: obj
                        .get("answer")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                },
                other => TranscriptEntry {
                    question: "N/A".to_string(),
                    answer: other.to_string(),
                },
            })
            .collect(),
        Value::String(answer) => vec![TranscriptEntry {
            question: "N/A".to_string(),
            answer: answer.clone(),
        }],
        other => vec![TranscriptEntry {
            question: "N/A".to_string(),
            answer: other.to_string(),
        }],
    }
}
