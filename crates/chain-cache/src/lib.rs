//! Caching of whole-population chains.
//!
//! Building a chain means fetching up to 50,000 messages and walking every
//! token, so the unfiltered chain of each scope is persisted and reused until
//! it is older than the freshness window (7 days by default). Author-filtered
//! chains are always built fresh and never stored.
//!
//! Invalidation is purely time-based: new messages arriving in a scope do not
//! refresh its cached chain.
//!
//! The module is split into:
//! - [`clock`]: injectable time source
//! - [`record`]: the persisted record format
//! - [`store`]: [`ChainStore`] backends (JSON files, memory)

pub mod clock;
pub mod record;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use corpus_source::{AuthorId, DEFAULT_MESSAGE_LIMIT, MessageSource, ScopeId, SourceError};
use transition_chain::{Chain, ChainError};

pub use clock::{Clock, FixedClock, SystemClock};
pub use record::CacheRecord;
pub use store::{ChainStore, JsonDirStore, MemoryStore, StoreError};

/// Age at which a cached chain is rebuilt.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(604_800);

/// Tunables for [`ChainCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of a cached chain.
    pub freshness: Duration,
    /// Most messages fetched when building a chain.
    pub message_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            freshness: DEFAULT_FRESHNESS,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

/// Errors from [`ChainCache::get_or_build`].
///
/// Store failures never appear here: an unreadable record is a miss and an
/// unwritable one is logged.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A chain plus where it came from.
#[derive(Debug, Clone)]
pub struct ChainRead {
    chain: Chain,
    built_at: u64,
    was_cache_hit: bool,
}

impl ChainRead {
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    /// Build time, in seconds since the Unix epoch.
    pub fn built_at(&self) -> u64 {
        self.built_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }
}

/// Read-through cache in front of the corpus loader and chain builder.
pub struct ChainCache {
    source: Arc<dyn MessageSource>,
    store: Arc<dyn ChainStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl ChainCache {
    /// Create a cache using the system clock and default configuration.
    pub fn new(source: Arc<dyn MessageSource>, store: Arc<dyn ChainStore>) -> Self {
        ChainCache {
            source,
            store,
            clock: Arc::new(SystemClock),
            config: CacheConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the chain for `scope`, restricted to `author` when given.
    ///
    /// - With an author: always built from fresh messages; the store is not
    ///   touched.
    /// - Without: a stored record younger than the freshness window is
    ///   returned as-is. A missing, stale or corrupt record triggers a build,
    ///   and the new chain is written back with the current time.
    ///
    /// # Errors
    /// [`CacheError::Source`] when messages cannot be fetched,
    /// [`CacheError::Chain`] with [`ChainError::EmptyCorpus`] when there are
    /// none.
    pub async fn get_or_build(
        &self,
        scope: ScopeId,
        author: Option<AuthorId>,
    ) -> Result<ChainRead, CacheError> {
        if author.is_some() {
            let chain = self.build(scope, author).await?;
            return Ok(ChainRead {
                chain,
                built_at: self.clock.now(),
                was_cache_hit: false,
            });
        }

        if let Some(read) = self.read_fresh(scope).await {
            return Ok(read);
        }

        let chain = self.build(scope, None).await?;
        let built_at = self.clock.now();
        let record = CacheRecord::from_chain(&chain, built_at);
        if let Err(e) = self.store.save(scope, &record).await {
            tracing::warn!(scope = %scope, error = %e, "failed to persist chain cache");
        }

        Ok(ChainRead {
            chain,
            built_at,
            was_cache_hit: false,
        })
    }

    /// Whether a record built at `built_at` is still usable.
    pub fn is_fresh(&self, built_at: u64) -> bool {
        self.clock.now().saturating_sub(built_at) < self.config.freshness.as_secs()
    }

    async fn read_fresh(&self, scope: ScopeId) -> Option<ChainRead> {
        let record = match self.store.load(scope).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(scope = %scope, "chain cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "unreadable chain cache, rebuilding");
                return None;
            }
        };

        let built_at = record.build_time_epoch_seconds;
        if !self.is_fresh(built_at) {
            tracing::debug!(scope = %scope, built_at, "chain cache stale");
            return None;
        }

        match record.into_chain() {
            Ok(chain) => {
                tracing::debug!(scope = %scope, built_at, "chain cache hit");
                Some(ChainRead {
                    chain,
                    built_at,
                    was_cache_hit: true,
                })
            }
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "corrupt chain cache, rebuilding");
                None
            }
        }
    }

    async fn build(&self, scope: ScopeId, author: Option<AuthorId>) -> Result<Chain, CacheError> {
        let messages = self
            .source
            .fetch_messages(scope, author, self.config.message_limit)
            .await?;
        let chain = Chain::from_messages(&messages)?;
        tracing::info!(
            scope = %scope,
            author = ?author.map(|a| a.0),
            messages = messages.len(),
            tokens = chain.stream().len(),
            words = chain.vocabulary().len(),
            "built word chain"
        );
        Ok(chain)
    }
}
