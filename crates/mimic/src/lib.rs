//! Chat mimicry engine: first-order Markov chains over message history.
//!
//! This is the facade crate that wires together the lower-level components:
//! - `chat_normalize`: word normalization (used through [`transition_chain`])
//! - [`transition_chain`]: vocabulary, token stream and transition table
//! - [`chain_cache`]: scope-keyed chain caching with a freshness window
//! - [`chain_walk`]: random walk and punctuation
//! - [`corpus_source`]: message retrieval contract
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use mimic::{AuthorId, Command, MemoryStore, Mimic, ScopeId, StaticMessageSource};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let source = StaticMessageSource::from_bodies(ScopeId(1), AuthorId(1), &["the cat sat on the mat"]);
//! let engine = Mimic::new(Arc::new(source), Arc::new(MemoryStore::new()), SmallRng::seed_from_u64(42));
//! let text = engine.run(ScopeId(1), &Command::Markov { words: None }).await.unwrap();
//! println!("{text}");
//! # });
//! ```

pub mod command;
pub mod config;

use std::sync::{Arc, Mutex, PoisonError};

use chain_cache::CacheError;
use rand::Rng;

pub use chain_cache::{
    CacheConfig, CacheRecord, ChainCache, ChainRead, ChainStore, Clock, FixedClock, JsonDirStore,
    MemoryStore, SystemClock,
};
pub use chain_walk::{DEFAULT_LENGTH, MAX_LENGTH, NO_RESULTS, add_punctuation};
pub use command::{Command, DEFAULT_WORDS, JOKE_WORDS};
pub use config::{ConfigError, MimicConfig};
pub use transition_chain::Chain;
pub use corpus_source::{
    AuthorId, MessageSource, ScopeId, SourceError, StaticMessageSource, StoredMessage,
};

/// Hard failures of a prediction. Everything else ends in generated text or
/// [`NO_RESULTS`].
#[derive(Debug, thiserror::Error)]
pub enum MimicError {
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Parameters of one prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictRequest {
    pub scope: ScopeId,
    pub author: Option<AuthorId>,
    pub seed: Option<String>,
    /// Requested walk length; clamped to `1..=50`, default 20.
    pub length: i64,
}

impl PredictRequest {
    /// Request for the whole scope with the default length.
    pub fn new(scope: ScopeId) -> Self {
        PredictRequest {
            scope,
            author: None,
            seed: None,
            length: DEFAULT_WORDS,
        }
    }

    pub fn author(mut self, author: AuthorId) -> Self {
        self.author = Some(author);
        self
    }

    pub fn seed(mut self, word: impl Into<String>) -> Self {
        self.seed = Some(word.into());
        self
    }

    pub fn length(mut self, length: i64) -> Self {
        self.length = length;
        self
    }
}

/// The chat mimicry engine.
///
/// Generic over the PRNG type `R` for testability. The engine is `Sync` when
/// `R: Send`, so one instance can serve concurrent requests through an `Arc`.
pub struct Mimic<R: Rng> {
    cache: ChainCache,
    rng: Mutex<R>,
}

impl<R: Rng + Send> Mimic<R> {
    /// Create an engine with the system clock and default cache settings.
    pub fn new(source: Arc<dyn MessageSource>, store: Arc<dyn ChainStore>, rng: R) -> Self {
        Self::with_cache(ChainCache::new(source, store), rng)
    }

    /// Create an engine around a configured cache.
    pub fn with_cache(cache: ChainCache, rng: R) -> Self {
        Mimic {
            cache,
            rng: Mutex::new(rng),
        }
    }

    pub fn cache(&self) -> &ChainCache {
        &self.cache
    }

    /// Generate a phrase.
    ///
    /// An empty corpus yields [`NO_RESULTS`]; a walk that hits a word with no
    /// successor returns what it has so far.
    ///
    /// # Errors
    /// Only when the message source itself fails.
    pub async fn predict(&self, request: &PredictRequest) -> Result<String, MimicError> {
        let read = match self.cache.get_or_build(request.scope, request.author).await {
            Ok(read) => read,
            Err(CacheError::Source(e)) => return Err(e.into()),
            Err(CacheError::Chain(e)) => {
                tracing::info!(
                    scope = %request.scope,
                    author = ?request.author.map(|a| a.0),
                    reason = %e,
                    "no chain available"
                );
                return Ok(NO_RESULTS.to_string());
            }
        };

        let text = {
            let mut rng = self.lock_rng();
            chain_walk::generate(
                read.chain(),
                request.length,
                request.seed.as_deref(),
                &mut *rng,
            )
        };

        tracing::info!(
            scope = %request.scope,
            author = ?request.author.map(|a| a.0),
            seeded = request.seed.is_some(),
            cache_hit = read.was_cache_hit(),
            "ran markov prediction"
        );
        Ok(text)
    }

    /// Apply the joke formatter using the engine's PRNG.
    pub fn punctuate(&self, text: &str) -> String {
        add_punctuation(text, &mut *self.lock_rng())
    }

    /// Run a command in `scope` and return the text to deliver.
    ///
    /// # Errors
    /// Only when the message source fails.
    pub async fn run(&self, scope: ScopeId, command: &Command) -> Result<String, MimicError> {
        let length = command.words(&mut *self.lock_rng());
        let request = PredictRequest {
            scope,
            author: command.author(),
            seed: command.start_word().map(str::to_string),
            length,
        };

        let text = self.predict(&request).await?;
        if command.is_joke() {
            Ok(self.punctuate(&text))
        } else {
            Ok(text)
        }
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, R> {
        // The PRNG has no invariants a panicking holder could break.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
