//! The live interview session state machine.
//!
//! One `InterviewSession` exists per connected participant. It owns the turn
//! counter, the transcript, and the termination screens, and it drives the
//! two oracles and the session store. All terminal states are absorbing:
//! once a session leaves `Active`, further submissions are ignored.

use crate::evaluation::Evaluation;
use crate::oracle::{EvaluationOracle, QuestionOracle};
use crate::screen::{self, Violation};
use crate::store::{NewSessionRecord, SessionOutcome, SessionStore};
use crate::topic::{Topic, TopicError, TopicRef, TopicResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

/// Maximum number of question/answer turns in one interview.
pub const MAX_TURNS: u32 = 5;

/// Answers shorter than this (in characters, after trimming) get the
/// "too short" heuristic feedback.
const MIN_ANSWER_CHARS: usize = 5;

/// Lifecycle status of a session. Monotonic: `Active` is the only
/// non-terminal state, and exactly one terminal transition occurs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    TerminatedAbuse,
    TerminatedEvasion,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::TerminatedAbuse => "terminated_abuse",
            SessionStatus::TerminatedEvasion => "terminated_evasion",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SessionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(SessionStatus::Active),
            "terminated_abuse" => Ok(SessionStatus::TerminatedAbuse),
            "terminated_evasion" => Ok(SessionStatus::TerminatedEvasion),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// One question/answer exchange in the transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub question: String,
    pub answer: String,
}

/// Outward-facing events produced by session operations. The gateway maps
/// these onto its wire protocol.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        session_id: Uuid,
    },
    Question {
        question: String,
        number: u32,
    },
    Feedback {
        feedback: String,
    },
    Finished {
        message: String,
        evaluation: Evaluation,
        transcript: Vec<TranscriptEntry>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error("failed to persist new session: {0}")]
    Store(#[source] anyhow::Error),
}

/// The per-participant interview state machine.
pub struct InterviewSession {
    session_id: Uuid,
    participant_id: String,
    topic: Topic,
    /// Count of questions issued so far. Starts at 1 once the opening
    /// question has been asked; never exceeds [`MAX_TURNS`].
    turn_index: u32,
    transcript: Vec<TranscriptEntry>,
    /// The most recently issued question, waiting for its answer.
    pending_question: String,
    started_at: DateTime<Utc>,
    status: SessionStatus,
}

impl InterviewSession {
    /// Starts a new interview: resolves the topic, persists the session
    /// record, and asks the opening question.
    ///
    /// Topic resolution failures surface as [`StartError::Topic`]; a failed
    /// initial store write aborts the start. The question oracle cannot fail
    /// (it degrades to a placeholder), so a started session always has a
    /// pending question.
    pub async fn start(
        participant_id: &str,
        topic_ref: &TopicRef,
        resolver: &dyn TopicResolver,
        questions: &dyn QuestionOracle,
        store: &dyn SessionStore,
    ) -> Result<(Self, Vec<SessionEvent>), StartError> {
        let topic = resolver.resolve(topic_ref).await?;

        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        store
            .insert_session(NewSessionRecord {
                session_id,
                participant_id: participant_id.to_string(),
                topic_id: topic.id,
                started_at,
            })
            .await
            .map_err(StartError::Store)?;

        let question = questions.next_question("", &topic.name, 0).await;
        info!(%session_id, topic = %topic.name, "Interview started");

        let session = Self {
            session_id,
            participant_id: participant_id.to_string(),
            topic,
            turn_index: 1,
            transcript: Vec::new(),
            pending_question: question.clone(),
            started_at,
            status: SessionStatus::Active,
        };

        let events = vec![
            SessionEvent::Started { session_id },
            SessionEvent::Question {
                question,
                number: 1,
            },
        ];
        Ok((session, events))
    }

    /// Processes one submitted answer.
    ///
    /// Exactly one of four things happens per call, checked in fixed order
    /// with the first match short-circuiting the rest: abuse termination,
    /// evasion termination, completion (after [`MAX_TURNS`] questions), or
    /// continuation with the next question. Submissions against a terminal
    /// session are a no-op and return no events.
    pub async fn submit_answer(
        &mut self,
        text: &str,
        questions: &dyn QuestionOracle,
        evaluator: &dyn EvaluationOracle,
        store: &dyn SessionStore,
    ) -> Vec<SessionEvent> {
        if self.status.is_terminal() {
            return Vec::new();
        }

        let answer = text.trim();

        match screen::screen_answer(answer) {
            Some(Violation::Abuse) => {
                // The triggering answer is not appended to the transcript.
                return self
                    .terminate(
                        SessionStatus::TerminatedAbuse,
                        Evaluation::abuse_termination(),
                        store,
                    )
                    .await;
            }
            Some(Violation::Evasion) => {
                return self
                    .terminate(
                        SessionStatus::TerminatedEvasion,
                        Evaluation::evasion_termination(),
                        store,
                    )
                    .await;
            }
            None => {}
        }

        self.transcript.push(TranscriptEntry {
            question: self.pending_question.clone(),
            answer: answer.to_string(),
        });

        let feedback = if answer.chars().count() >= MIN_ANSWER_CHARS {
            "Good answer!"
        } else {
            "Answer too short, elaborate more."
        };
        let mut events = vec![SessionEvent::Feedback {
            feedback: feedback.to_string(),
        }];

        if self.turn_index >= MAX_TURNS {
            let evaluation = evaluator.evaluate(&self.transcript).await;
            self.status = SessionStatus::Completed;
            self.persist_outcome(SessionStatus::Completed, &evaluation, store)
                .await;
            info!(session_id = %self.session_id, score = evaluation.overall_score, "Interview completed");
            events.push(SessionEvent::Finished {
                message: "Interview complete!".to_string(),
                evaluation,
                transcript: self.transcript.clone(),
            });
        } else {
            let question = questions
                .next_question(answer, &self.topic.name, self.turn_index)
                .await;
            self.pending_question = question.clone();
            self.turn_index += 1;
            events.push(SessionEvent::Question {
                question,
                number: self.turn_index,
            });
        }

        events
    }

    /// Applies a forced early termination and emits the final result.
    async fn terminate(
        &mut self,
        status: SessionStatus,
        evaluation: Evaluation,
        store: &dyn SessionStore,
    ) -> Vec<SessionEvent> {
        self.status = status;
        self.persist_outcome(status, &evaluation, store).await;
        info!(session_id = %self.session_id, %status, "Interview terminated early");
        vec![SessionEvent::Finished {
            message: evaluation.summary.clone(),
            evaluation,
            transcript: self.transcript.clone(),
        }]
    }

    /// Writes the terminal outcome. A failed write is logged but does not
    /// affect the committed in-memory transition or the emitted result.
    async fn persist_outcome(
        &self,
        status: SessionStatus,
        evaluation: &Evaluation,
        store: &dyn SessionStore,
    ) {
        let now = Utc::now();
        let outcome = SessionOutcome {
            status,
            transcript: self.transcript.clone(),
            evaluation: evaluation.clone(),
            score: evaluation.overall_score,
            completed_at: now,
            duration_mins: self.duration_mins(now),
            questions_count: self.transcript.len() as i32,
        };
        if let Err(e) = store.finalize_session(self.session_id, outcome).await {
            error!(session_id = %self.session_id, error = ?e, "Failed to persist session outcome");
        }
    }

    /// Elapsed session time in whole minutes, rounded to nearest.
    fn duration_mins(&self, now: DateTime<Utc>) -> i32 {
        let secs = (now - self.started_at).num_seconds();
        ((secs as f64) / 60.0).round() as i32
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn turn_index(&self) -> u32 {
        self.turn_index
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockSessionStore;
    use crate::topic::MockTopicResolver;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Question oracle double: emits "Question N?" and counts calls.
    #[derive(Default)]
    struct ScriptedQuestions {
        calls: AtomicU32,
    }

    #[async_trait]
    impl QuestionOracle for ScriptedQuestions {
        async fn next_question(&self, _prev: &str, _topic: &str, turn_index: u32) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("Question {}?", turn_index + 1)
        }
    }

    /// Evaluation oracle double: fixed verdict, counts calls.
    struct FixedEvaluator {
        calls: AtomicU32,
        result: Evaluation,
    }

    impl FixedEvaluator {
        fn scoring(score: i32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                result: Evaluation {
                    overall_score: score,
                    strengths: vec!["clear answers".to_string()],
                    areas_to_improve: vec![],
                    summary: "Good session.".to_string(),
                    raw: String::new(),
                },
            }
        }
    }

    #[async_trait]
    impl EvaluationOracle for FixedEvaluator {
        async fn evaluate(&self, _transcript: &[TranscriptEntry]) -> Evaluation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// In-memory store double recording every write.
    #[derive(Default)]
    struct MemStore {
        inserts: StdMutex<Vec<NewSessionRecord>>,
        outcomes: StdMutex<Vec<(Uuid, SessionOutcome)>>,
    }

    #[async_trait]
    impl SessionStore for MemStore {
        async fn insert_session(&self, record: NewSessionRecord) -> anyhow::Result<()> {
            self.inserts.lock().unwrap().push(record);
            Ok(())
        }

        async fn finalize_session(
            &self,
            session_id: Uuid,
            outcome: SessionOutcome,
        ) -> anyhow::Result<()> {
            self.outcomes.lock().unwrap().push((session_id, outcome));
            Ok(())
        }
    }

    struct StaticResolver(Topic);

    #[async_trait]
    impl TopicResolver for StaticResolver {
        async fn resolve(&self, _topic: &TopicRef) -> Result<Topic, TopicError> {
            Ok(self.0.clone())
        }
    }

    fn javascript() -> Topic {
        Topic {
            id: Uuid::new_v4(),
            name: "javascript".to_string(),
        }
    }

    async fn start_session(
        questions: &ScriptedQuestions,
        store: &MemStore,
    ) -> (InterviewSession, Vec<SessionEvent>) {
        InterviewSession::start(
            "user-1",
            &TopicRef {
                id: None,
                name: Some("javascript".to_string()),
            },
            &StaticResolver(javascript()),
            questions,
            store,
        )
        .await
        .expect("start should succeed")
    }

    #[tokio::test]
    async fn start_persists_record_and_emits_first_question() {
        let questions = ScriptedQuestions::default();
        let store = MemStore::default();
        let (session, events) = start_session(&questions, &store).await;

        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.turn_index(), 1);
        assert!(session.transcript().is_empty());

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Started { session_id } if session_id == session.session_id()));
        match &events[1] {
            SessionEvent::Question { question, number } => {
                assert_eq!(question, "Question 1?");
                assert_eq!(*number, 1);
            }
            other => panic!("expected Question event, got {:?}", other),
        }

        let inserts = store.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].participant_id, "user-1");
        assert_eq!(inserts[0].session_id, session.session_id());
    }

    #[tokio::test]
    async fn five_answers_complete_the_interview() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(8);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        // Four normal answers continue the interview with questions 2..=5.
        for expected_number in 2..=5u32 {
            let events = session
                .submit_answer("a perfectly reasonable answer", &questions, &evaluator, &store)
                .await;
            assert_eq!(events.len(), 2);
            assert!(matches!(&events[0], SessionEvent::Feedback { feedback } if feedback == "Good answer!"));
            match &events[1] {
                SessionEvent::Question { number, .. } => assert_eq!(*number, expected_number),
                other => panic!("expected Question event, got {:?}", other),
            }
            assert_eq!(session.transcript().len() as u32, expected_number - 1);
            assert!(session.turn_index() <= MAX_TURNS);
        }

        // The fifth answer triggers finalization.
        let events = session
            .submit_answer("my final considered answer", &questions, &evaluator, &store)
            .await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            SessionEvent::Finished {
                message,
                evaluation,
                transcript,
            } => {
                assert_eq!(message, "Interview complete!");
                assert_eq!(evaluation.overall_score, 8);
                assert_eq!(transcript.len(), 5);
            }
            other => panic!("expected Finished event, got {:?}", other),
        }

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.turn_index(), MAX_TURNS);
        assert_eq!(session.transcript().len(), 5);
        // One opening question plus four continuations.
        assert_eq!(questions.calls.load(Ordering::SeqCst), 5);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);

        let outcomes = store.outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        let (id, outcome) = &outcomes[0];
        assert_eq!(*id, session.session_id());
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.score, 8);
        assert_eq!(outcome.questions_count, 5);
        assert_eq!(outcome.duration_mins, 0);
    }

    #[tokio::test]
    async fn abusive_answer_terminates_without_recording_it() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(9);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        let events = session
            .submit_answer("you are stupid", &questions, &evaluator, &store)
            .await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::Finished {
                evaluation,
                transcript,
                ..
            } => {
                assert_eq!(evaluation.overall_score, 0);
                assert!(transcript.is_empty());
            }
            other => panic!("expected Finished event, got {:?}", other),
        }
        assert_eq!(session.status(), SessionStatus::TerminatedAbuse);
        assert!(session.transcript().is_empty());
        // No oracle traffic beyond the opening question.
        assert_eq!(questions.calls.load(Ordering::SeqCst), 1);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);

        let outcomes = store.outcomes.lock().unwrap();
        assert_eq!(outcomes[0].1.status, SessionStatus::TerminatedAbuse);
        assert_eq!(outcomes[0].1.score, 0);
        assert_eq!(outcomes[0].1.questions_count, 0);
    }

    #[tokio::test]
    async fn evasion_answer_terminates_with_zero_score() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(9);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        let events = session
            .submit_answer("I want to end this interview", &questions, &evaluator, &store)
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SessionEvent::Finished { evaluation, .. } if evaluation.overall_score == 0
        ));
        assert_eq!(session.status(), SessionStatus::TerminatedEvasion);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submissions_after_termination_are_no_ops() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(9);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        session
            .submit_answer("screw you", &questions, &evaluator, &store)
            .await;
        let question_calls = questions.calls.load(Ordering::SeqCst);
        let outcome_writes = store.outcomes.lock().unwrap().len();

        let events = session
            .submit_answer("a genuinely fine answer", &questions, &evaluator, &store)
            .await;

        assert!(events.is_empty());
        assert_eq!(session.status(), SessionStatus::TerminatedAbuse);
        assert!(session.transcript().is_empty());
        assert_eq!(questions.calls.load(Ordering::SeqCst), question_calls);
        assert_eq!(store.outcomes.lock().unwrap().len(), outcome_writes);
    }

    #[tokio::test]
    async fn short_answers_get_too_short_feedback_but_still_count() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(5);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        let events = session.submit_answer("ok", &questions, &evaluator, &store).await;

        assert!(matches!(
            &events[0],
            SessionEvent::Feedback { feedback } if feedback == "Answer too short, elaborate more."
        ));
        assert!(matches!(&events[1], SessionEvent::Question { number, .. } if *number == 2));
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].answer, "ok");
    }

    #[tokio::test]
    async fn answers_are_trimmed_before_screening_and_recording() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(5);
        let store = MemStore::default();
        let (mut session, _) = start_session(&questions, &store).await;

        session
            .submit_answer("   event loop and callbacks   ", &questions, &evaluator, &store)
            .await;

        assert_eq!(session.transcript()[0].answer, "event loop and callbacks");
        assert_eq!(session.transcript()[0].question, "Question 1?");
    }

    #[tokio::test]
    async fn failed_outcome_write_does_not_block_the_final_result() {
        let questions = ScriptedQuestions::default();
        let evaluator = FixedEvaluator::scoring(6);
        let mut store = MockSessionStore::new();
        store.expect_insert_session().returning(|_| Ok(()));
        store
            .expect_finalize_session()
            .returning(|_, _| Err(anyhow!("database unavailable")));

        let (mut session, _) = InterviewSession::start(
            "user-1",
            &TopicRef {
                id: None,
                name: Some("javascript".to_string()),
            },
            &StaticResolver(javascript()),
            &questions,
            &store,
        )
        .await
        .expect("start should succeed");

        for _ in 0..4 {
            session
                .submit_answer("a perfectly reasonable answer", &questions, &evaluator, &store)
                .await;
        }
        let events = session
            .submit_answer("the closing answer", &questions, &evaluator, &store)
            .await;

        assert!(matches!(
            events.last(),
            Some(SessionEvent::Finished { evaluation, .. }) if evaluation.overall_score == 6
        ));
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn failed_initial_write_aborts_start() {
        let questions = ScriptedQuestions::default();
        let mut store = MockSessionStore::new();
        store
            .expect_insert_session()
            .returning(|_| Err(anyhow!("database unavailable")));

        let result = InterviewSession::start(
            "user-1",
            &TopicRef {
                id: None,
                name: Some("javascript".to_string()),
            },
            &StaticResolver(javascript()),
            &questions,
            &store,
        )
        .await;

        assert!(matches!(result, Err(StartError::Store(_))));
        // The oracle is never consulted when persistence fails.
        assert_eq!(questions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolvable_topic_fails_start() {
        let questions = ScriptedQuestions::default();
        let store = MemStore::default();
        let mut resolver = MockTopicResolver::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(TopicError::NotFound));

        let result = InterviewSession::start(
            "user-1",
            &TopicRef {
                id: None,
                name: Some("basket weaving".to_string()),
            },
            &resolver,
            &questions,
            &store,
        )
        .await;

        assert!(matches!(result, Err(StartError::Topic(TopicError::NotFound))));
        assert!(store.inserts.lock().unwrap().is_empty());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::TerminatedAbuse,
            SessionStatus::TerminatedEvasion,
            SessionStatus::Completed,
        ] {
            let parsed = SessionStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(SessionStatus::try_from("paused".to_string()).is_err());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
    }

    #[test]
    fn status_serializes_to_snake_case() {
        let json = serde_json::to_string(&SessionStatus::TerminatedAbuse).unwrap();
        assert_eq!(json, "\"terminated_abuse\"");
    }
}
