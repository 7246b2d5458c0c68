//! Explicit registry of live interview sessions.
//!
//! Each session is held behind its own `tokio::Mutex`; locking an entry is
//! what serializes overlapping answer submissions for one session while
//! leaving other sessions free to run in parallel. Entries are inserted on
//! start and removed on disconnect or terminal status.

use intervu_core::InterviewSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<InterviewSession>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a started session and returns its shared handle.
    pub async fn insert(&self, session: InterviewSession) -> SharedSession {
        let id = session.session_id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.lock().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use intervu_core::oracle::QuestionOracle;
    use intervu_core::store::{NewSessionRecord, SessionOutcome, SessionStore};
    use intervu_core::topic::{Topic, TopicError, TopicRef, TopicResolver};

    struct StubResolver;

    #[async_trait]
    impl TopicResolver for StubResolver {
        async fn resolve(&self, _topic: &TopicRef) -> Result<Topic, TopicError> {
            Ok(Topic {
                id: Uuid::new_v4(),
                name: "javascript".to_string(),
            })
        }
    }

    struct StubQuestions;

    #[async_trait]
    impl QuestionOracle for StubQuestions {
        async fn next_question(&self, _prev: &str, _topic: &str, _turn: u32) -> String {
            "What is a promise?".to_string()
        }
    }

    struct StubStore;

    #[async_trait]
    impl SessionStore for StubStore {
        async fn insert_session(&self, _record: NewSessionRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn finalize_session(
            &self,
            _session_id: Uuid,
            _outcome: SessionOutcome,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn started_session() -> InterviewSession {
        let (session, _) = InterviewSession::start(
            "user-1",
            &TopicRef {
                id: None,
                name: Some("javascript".to_string()),
            },
            &StubResolver,
            &StubQuestions,
            &StubStore,
        )
        .await
        .unwrap();
        session
    }

    #[tokio::test]
    async fn insert_get_remove_round_trip() {
        let registry = SessionRegistry::new();
        let session = started_session().await;
        let id = session.session_id();

        registry.insert(session).await;
        assert_eq!(registry.len().await, 1);

        let shared = registry.get(id).await.expect("session should be present");
        assert_eq!(shared.lock().await.session_id(), id);

        assert!(registry.remove(id).await.is_some());
        assert!(registry.get(id).await.is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn removing_unknown_session_is_none() {
        let registry = SessionRegistry::new();
        assert!(registry.remove(Uuid::new_v4()).await.is_none());
    }
}
