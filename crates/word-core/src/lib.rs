//! Compact word identifiers for first-order Markov chains.
//!
//! A [`WordId`] is the position of a normalized word inside a chain's
//! vocabulary. Identifiers are dense and assigned in first-seen order, so the
//! first word of a corpus is always `WordId(0)`.

use serde::{Deserialize, Serialize};

/// Index of a word within a vocabulary.
///
/// Serializes as a bare integer. When used as a map key, `serde_json` writes
/// it as a string and parses it back into an integer, so transition-table
/// keys survive a JSON round-trip without losing their integer identity.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub u32);

impl WordId {
    /// Create a WordId from a usize index. Panics if index > u32::MAX.
    #[inline]
    pub fn from_usize(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "WordId overflow: {index}");
        WordId(index as u32)
    }

    /// Convert to usize for indexing.
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for WordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
