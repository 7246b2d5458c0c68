//! Oracle adapters: question generation and transcript evaluation.
//!
//! Both oracles wrap an OpenAI-compatible chat-completions endpoint and are
//! contractually infallible from the session's point of view: any transport
//! failure, timeout, or malformed response degrades to a fixed fallback value
//! so the interview can always make progress.

use crate::evaluation::Evaluation;
use crate::session::TranscriptEntry;
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Placeholder question returned when the oracle cannot produce one.
pub const FALLBACK_QUESTION: &str = "Could not generate a question at this time. \
Please tell me about a recent project you worked on instead.";

/// Produces the next interview question. Must never raise to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionOracle: Send + Sync {
    /// Returns the question for turn `turn_index + 1`, given the previous
    /// answer (empty on the first turn) and the resolved topic name.
    async fn next_question(&self, previous_answer: &str, topic: &str, turn_index: u32) -> String;
}

/// Scores a full transcript. Must never raise to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationOracle: Send + Sync {
    async fn evaluate(&self, transcript: &[TranscriptEntry]) -> Evaluation;
}

/// An implementation of both oracles over any OpenAI-compatible API.
pub struct LlmOracle {
    client: Client<OpenAIConfig>,
    model: String,
    question_prompt: String,
    evaluation_prompt: String,
    timeout: Duration,
}

impl LlmOracle {
    /// Creates a new oracle client.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration (key and base URL; OpenAI or Groq).
    /// * `model` - Chat model identifier (e.g., "gpt-4o").
    /// * `question_prompt` - Interviewer system prompt; `{topic}` is replaced
    ///   with the resolved topic name per call.
    /// * `evaluation_prompt` - Evaluator system prompt.
    /// * `timeout` - Per-call deadline; expiry counts as an oracle failure.
    pub fn new(
        config: OpenAIConfig,
        model: String,
        question_prompt: String,
        evaluation_prompt: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            question_prompt,
            evaluation_prompt,
            timeout,
        }
    }

    /// Runs one bounded chat completion and returns the first choice's text.
    async fn chat(&self, system_prompt: &str, user_prompt: &str, temperature: f32) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(temperature)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .context("oracle call timed out")??;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl QuestionOracle for LlmOracle {
    async fn next_question(&self, previous_answer: &str, topic: &str, turn_index: u32) -> String {
        let system_prompt = self.question_prompt.replace("{topic}", topic);
        let user_prompt = format!(
            "Previous answer: \"{}\".\nPlease generate interview question number {}.",
            previous_answer,
            turn_index + 1
        );

        match self.chat(&system_prompt, &user_prompt, 0.7).await {
            Ok(question) if !question.is_empty() => question,
            Ok(_) => FALLBACK_QUESTION.to_string(),
            Err(e) => {
                warn!(error = ?e, turn_index, "Question oracle failed; using placeholder");
                FALLBACK_QUESTION.to_string()
            }
        }
    }
}

#[async_trait]
impl EvaluationOracle for LlmOracle {
    async fn evaluate(&self, transcript: &[TranscriptEntry]) -> Evaluation {
        let formatted = format_transcript(transcript);
        let user_prompt = format!(
            "Evaluate the following interview transcript:\n\n{}\n\nReturn output as valid JSON only.",
            formatted
        );

        match self.chat(&self.evaluation_prompt, &user_prompt, 0.0).await {
            Ok(raw) => Evaluation::from_oracle_text(&raw),
            Err(e) => {
                warn!(error = ?e, "Evaluation oracle failed; using zero-score fallback");
                Evaluation::unavailable()
            }
        }
    }
}

/// Renders a transcript as numbered question/answer pairs for the evaluator.
fn format_transcript(transcript: &[TranscriptEntry]) -> String {
    transcript
        .iter()
        .enumerate()
        .map(|(idx, entry)| format!("Q{}: {}\nA: {}", idx + 1, entry.question, entry.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
