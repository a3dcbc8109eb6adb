//! Backends for persisting [`CacheRecord`]s by scope.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use corpus_source::ScopeId;
use tokio::sync::RwLock;

use crate::record::CacheRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed cache record: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Scope-keyed storage for cached chains.
///
/// Writers for the same scope may race; the last completed write wins and
/// readers see either the old or the new record in full.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Load the record for `scope`, or `None` when nothing is stored.
    async fn load(&self, scope: ScopeId) -> Result<Option<CacheRecord>, StoreError>;

    /// Store `record` for `scope`, replacing any previous one.
    async fn save(&self, scope: ScopeId, record: &CacheRecord) -> Result<(), StoreError>;
}

/// One JSON file per scope inside a directory.
///
/// Files are named `chain-<scope>.json` and replaced atomically by writing a
/// temporary sibling and renaming it over the target.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirStore {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the record for `scope`.
    pub fn path_for(&self, scope: ScopeId) -> PathBuf {
        self.dir.join(format!("chain-{scope}.json"))
    }

    fn tmp_path_for(&self, scope: ScopeId) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("chain-{scope}.json.{}.{n}.tmp", std::process::id()))
    }
}

#[async_trait]
impl ChainStore for JsonDirStore {
    async fn load(&self, scope: ScopeId) -> Result<Option<CacheRecord>, StoreError> {
        let bytes = match tokio::fs::read(self.path_for(scope)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, scope: ScopeId, record: &CacheRecord) -> Result<(), StoreError> {
        let json = serde_json::to_vec(record)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.tmp_path_for(scope);
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(scope)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-process store, mainly for tests and short-lived embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ScopeId, CacheRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, scope: ScopeId, record: CacheRecord) {
        self.records.write().await.insert(scope, record);
    }

    pub async fn get(&self, scope: ScopeId) -> Option<CacheRecord> {
        self.records.read().await.get(&scope).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ChainStore for MemoryStore {
    async fn load(&self, scope: ScopeId) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self.get(scope).await)
    }

    async fn save(&self, scope: ScopeId, record: &CacheRecord) -> Result<(), StoreError> {
        self.insert(scope, record.clone()).await;
        Ok(())
    }
}
