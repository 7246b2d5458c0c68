//! Answer content screens: abusive language and evasion detection.
//!
//! Both screens are deliberately naive case-insensitive substring matches
//! against fixed phrase lists. No token boundaries are applied, so a phrase
//! buried inside a longer benign word still matches. That false positive is
//! accepted, documented behavior.

/// Profanity tokens that terminate an interview on sight.
const ABUSIVE_TERMS: &[&str] = &[
    "fuck", "shit", "bitch", "idiot", "stupid", "fool", "asshole", "dumb", "bastard", "crap",
    "screw you",
];

/// Phrases that signal the candidate wants out or is diverting from the topic.
const EVASION_PHRASES: &[&str] = &[
    "end interview",
    "stop interview",
    "finish interview",
    "dont want to continue",
    "not interested",
    "quit",
    "dont want to give interview",
    "i want to end",
    "i will not tell you",
    "i am not telling",
    "no more questions",
    "play cricket",
    "other topic",
];

/// The kind of content violation found in an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Abuse,
    Evasion,
}

/// Screens a normalized answer for termination triggers.
///
/// The abuse screen runs first; evasion is only checked when no abusive term
/// matched. Matching is case-insensitive substring containment.
pub fn screen_answer(answer: &str) -> Option<Violation> {
    let lowered = answer.to_lowercase();
    if ABUSIVE_TERMS.iter().any(|t| lowered.contains(t)) {
        return Some(Violation::Abuse);
    }
    if EVASION_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(Violation::Evasion);
    }
    None
}
