//! Topic references and resolution.
//!
//! Clients may identify a topic by UUID, by a legacy numeric id, or by name.
//! Resolution to the canonical row is delegated to a [`TopicResolver`], which
//! the service implements over its topic storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client-supplied, possibly loose reference to a topic.
#[derive(Debug, Clone, Default)]
pub struct TopicRef {
    /// A UUID string or a legacy numeric id.
    pub id: Option<String>,
    /// A case-insensitive topic name.
    pub name: Option<String>,
}

/// A canonical, resolved topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("Topic not found")]
    NotFound,
    #[error("Invalid topic reference: a topic id or topic name is required")]
    InvalidReference,
    #[error("topic lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Resolves a [`TopicRef`] to a canonical [`Topic`].
///
/// Precedence: UUID passthrough, then legacy numeric-id lookup, then
/// case-insensitive name lookup. A name that matches nothing is `NotFound`;
/// a reference carrying neither a usable id nor a name is `InvalidReference`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicResolver: Send + Sync {
    async fn resolve(&self, topic: &TopicRef) -> Result<Topic, TopicError>;
}
