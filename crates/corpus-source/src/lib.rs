//! Message retrieval contract for corpus loading.
//!
//! A [`MessageSource`] returns the raw bodies of the most recent messages in
//! a scope, optionally restricted to one author, newest first. It is the only
//! seam through which the generator touches message storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Most messages a corpus is built from.
pub const DEFAULT_MESSAGE_LIMIT: usize = 50_000;

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Grouping boundary a corpus is drawn from (a server, a community).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub u64);

/// Participant whose messages a corpus can be restricted to.
///
/// `AuthorId(0)` is the storage layer's "nobody in particular" value and
/// filters nothing.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub u64);

impl AuthorId {
    /// Whether this id restricts a query.
    pub fn filters(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to retrieve messages. This is the only hard failure a prediction
/// can surface.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("message store unavailable: {0}")]
    Unavailable(#[source] BoxError),
    #[error("message query failed: {0}")]
    Query(#[source] BoxError),
}

/// Source of raw message bodies.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `limit` message bodies for `scope`, newest first.
    ///
    /// When `author` is given (and [`AuthorId::filters`]), only that author's
    /// messages are returned.
    async fn fetch_messages(
        &self,
        scope: ScopeId,
        author: Option<AuthorId>,
        limit: usize,
    ) -> Result<Vec<String>, SourceError>;
}

#[async_trait]
impl<T: MessageSource + ?Sized> MessageSource for Arc<T> {
    async fn fetch_messages(
        &self,
        scope: ScopeId,
        author: Option<AuthorId>,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        (**self).fetch_messages(scope, author, limit).await
    }
}

/// One stored chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub scope: ScopeId,
    pub author: AuthorId,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub contents: String,
}

/// In-memory message source.
///
/// Applies the same ordering, filtering and limit as a database-backed
/// source, and counts fetches so callers can observe cache behaviour.
#[derive(Debug, Default)]
pub struct StaticMessageSource {
    messages: RwLock<Vec<StoredMessage>>,
    fetches: AtomicUsize,
}

impl StaticMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<StoredMessage>) -> Self {
        StaticMessageSource {
            messages: RwLock::new(messages),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor: `bodies` are given newest first and all
    /// belong to `scope` and `author`.
    pub fn from_bodies<S: AsRef<str>>(scope: ScopeId, author: AuthorId, bodies: &[S]) -> Self {
        let count = bodies.len();
        let messages = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| StoredMessage {
                scope,
                author,
                timestamp: (count - i) as f64,
                contents: body.as_ref().to_string(),
            })
            .collect();
        Self::with_messages(messages)
    }

    pub async fn push(&self, message: StoredMessage) {
        self.messages.write().await.push(message);
    }

    /// Number of completed `fetch_messages` calls.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for StaticMessageSource {
    async fn fetch_messages(
        &self,
        scope: ScopeId,
        author: Option<AuthorId>,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let author = author.filter(|a| a.filters());
        let messages = self.messages.read().await;

        let mut matching: Vec<&StoredMessage> = messages
            .iter()
            .filter(|m| m.scope == scope && author.is_none_or(|a| m.author == a))
            .collect();
        matching.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));

        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|m| m.contents.clone())
            .collect())
    }
}
