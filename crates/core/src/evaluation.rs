//! Normalization of evaluation-oracle output.
//!
//! The oracle is asked to respond with a strict JSON object, but in practice
//! it returns varyingly-named fields, out-of-range scores, or prose that fails
//! to parse at all. Everything funnels through [`Evaluation::from_oracle_text`]
//! so the rest of the system only ever sees a well-formed result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The final, normalized verdict for one interview.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Evaluation {
    /// Overall performance score, always within `[0, 10]`.
    pub overall_score: i32,
    pub strengths: Vec<String>,
    pub areas_to_improve: Vec<String>,
    /// Human-readable summary. Never empty once an evaluation has run.
    pub summary: String,
    /// The unmodified oracle text, retained for audit.
    pub raw: String,
}

impl Default for Evaluation {
    fn default() -> Self {
        Self {
            overall_score: 0,
            strengths: Vec::new(),
            areas_to_improve: Vec::new(),
            summary: String::new(),
            raw: String::new(),
        }
    }
}

/// Key aliases accepted for each target field, in precedence order.
const SCORE_KEYS: &[&str] = &["overallScore", "overall_score", "score"];
const STRENGTH_KEYS: &[&str] = &["strengths", "Strengths", "positives"];
const IMPROVE_KEYS: &[&str] = &["areasToImprove", "areas_to_improve", "weaknesses"];
const SUMMARY_KEYS: &[&str] = &["summary", "feedback"];

impl Evaluation {
    /// Parses raw oracle text into a normalized `Evaluation`.
    ///
    /// Accepts a small set of known key aliases for each field and clamps the
    /// score into `[0, 10]`. Unparsable input degrades to a zero-score result
    /// that still carries the raw text.
    pub fn from_oracle_text(raw: &str) -> Self {
        let parsed: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(_) => return Self::unparsable(raw),
        };
        if !parsed.is_object() {
            return Self::unparsable(raw);
        }

        let summary = pick_string(&parsed, SUMMARY_KEYS)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "No summary provided.".to_string());

        Self {
            overall_score: clamp_score(pick_number(&parsed, SCORE_KEYS).unwrap_or(0.0)),
            strengths: pick_strings(&parsed, STRENGTH_KEYS),
            areas_to_improve: pick_strings(&parsed, IMPROVE_KEYS),
            summary,
            raw: raw.to_string(),
        }
    }

    /// Fallback when the oracle returned text that is not a JSON object.
    fn unparsable(raw: &str) -> Self {
        Self {
            overall_score: 0,
            strengths: Vec::new(),
            areas_to_improve: vec![
                "Candidate did not provide relevant answers or misbehaved.".to_string(),
            ],
            summary: "Interview ended due to unprofessional/diverted responses; performance unacceptable.".to_string(),
            raw: raw.to_string(),
        }
    }

    /// Fallback when the oracle could not be reached at all.
    pub fn unavailable() -> Self {
        Self {
            overall_score: 0,
            strengths: Vec::new(),
            areas_to_improve: vec!["Evaluation failed due to a system error.".to_string()],
            summary: "Evaluation failed due to a system error.".to_string(),
            raw: String::new(),
        }
    }

    /// Forced verdict for an abusive-language termination.
    pub fn abuse_termination() -> Self {
        Self {
            overall_score: 0,
            strengths: Vec::new(),
            areas_to_improve: vec!["Used abusive language.".to_string()],
            summary:
                "Interview terminated immediately due to unprofessional or abusive language."
                    .to_string(),
            raw: String::new(),
        }
    }

    /// Forced verdict for a refusal or topic-diversion termination.
    pub fn evasion_termination() -> Self {
        Self {
            overall_score: 0,
            strengths: Vec::new(),
            areas_to_improve: vec![
                "Candidate refused to answer or diverted from topic. Performance unacceptable."
                    .to_string(),
            ],
            summary:
                "Interview ended due to candidate refusing/diverting from questions; performance considered very poor."
                    .to_string(),
            raw: String::new(),
        }
    }
}

fn clamp_score(raw: f64) -> i32 {
    (raw.round() as i64).clamp(0, 10) as i32
}

fn pick_number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_f64))
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_str).map(str::to_string))
}

fn pick_strings(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
