//! First-order Markov chain over normalized words.
//!
//! A [`Chain`] bundles three parallel views of a corpus:
//! - the [`Vocabulary`] of normalized words, in first-seen order;
//! - the token stream, one [`WordId`] per raw token, in corpus order;
//! - the [`TransitionTable`], mapping each word to every word observed
//!   immediately after it.
//!
//! Successor lists keep their multiplicities, so picking uniformly from a list
//! samples the empirical transition distribution directly.

use std::collections::BTreeMap;

use chat_normalize::normalize;
use serde::{Deserialize, Serialize};
use word_core::WordId;
use word_vocab::Vocabulary;

/// Errors raised while building or reassembling a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The corpus produced no tokens at all.
    #[error("corpus is empty")]
    EmptyCorpus,
    /// Reassembled parts reference words outside the vocabulary.
    #[error("inconsistent chain: {0}")]
    Inconsistent(String),
}

/// Word → observed successors, with repeats.
///
/// Words that never precede another word (terminal words) have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    successors: BTreeMap<WordId, Vec<WordId>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from every adjacent pair of a token stream.
    pub fn from_stream(stream: &[WordId]) -> Self {
        let mut table = TransitionTable::new();
        for pair in stream.windows(2) {
            table.observe(pair[0], pair[1]);
        }
        table
    }

    /// Record that `next` followed `word` once.
    pub fn observe(&mut self, word: WordId, next: WordId) {
        self.successors.entry(word).or_default().push(next);
    }

    /// Successors of `word`, or `None` for a terminal word.
    pub fn successors(&self, word: WordId) -> Option<&[WordId]> {
        self.successors.get(&word).map(Vec::as_slice)
    }

    /// Number of words that have at least one successor.
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordId, &[WordId])> {
        self.successors.iter().map(|(&k, v)| (k, v.as_slice()))
    }
}

impl FromIterator<(WordId, Vec<WordId>)> for TransitionTable {
    fn from_iter<I: IntoIterator<Item = (WordId, Vec<WordId>)>>(iter: I) -> Self {
        TransitionTable {
            successors: iter.into_iter().collect(),
        }
    }
}

/// A complete first-order chain: vocabulary, token stream and transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    vocabulary: Vocabulary,
    stream: Vec<WordId>,
    transitions: TransitionTable,
}

impl Chain {
    /// Build a chain from raw tokens in corpus order.
    ///
    /// Each token is normalized, interned, and appended to the token stream;
    /// the transition table is then filled from adjacent stream entries.
    /// Returns [`ChainError::EmptyCorpus`] when there are no tokens.
    pub fn build<'a, I>(tokens: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vocabulary = Vocabulary::new();
        let stream: Vec<WordId> = tokens
            .into_iter()
            .map(|tok| vocabulary.intern(normalize(tok)))
            .collect();

        if stream.is_empty() {
            return Err(ChainError::EmptyCorpus);
        }

        let transitions = TransitionTable::from_stream(&stream);
        Ok(Chain {
            vocabulary,
            stream,
            transitions,
        })
    }

    /// Build a chain from whole message bodies, splitting each on whitespace.
    pub fn from_messages<S: AsRef<str>>(messages: &[S]) -> Result<Self, ChainError> {
        Self::build(
            messages
                .iter()
                .flat_map(|m| chat_normalize::words(m.as_ref())),
        )
    }

    /// Reassemble a chain from previously persisted parts.
    ///
    /// Every id in the stream and in the table must resolve in `vocabulary`,
    /// and the stream must not be empty.
    pub fn from_parts(
        vocabulary: Vocabulary,
        stream: Vec<WordId>,
        transitions: TransitionTable,
    ) -> Result<Self, ChainError> {
        if stream.is_empty() {
            return Err(ChainError::Inconsistent("token stream is empty".into()));
        }
        let len = vocabulary.len();
        let in_range = |id: WordId| id.as_usize() < len;

        if let Some(bad) = stream.iter().copied().find(|&id| !in_range(id)) {
            return Err(ChainError::Inconsistent(format!(
                "stream index {bad} outside vocabulary of {len}"
            )));
        }
        for (word, nexts) in transitions.iter() {
            if !in_range(word) {
                return Err(ChainError::Inconsistent(format!(
                    "transition key {word} outside vocabulary of {len}"
                )));
            }
            if nexts.is_empty() {
                return Err(ChainError::Inconsistent(format!(
                    "transition key {word} has no successors"
                )));
            }
            if let Some(bad) = nexts.iter().copied().find(|&id| !in_range(id)) {
                return Err(ChainError::Inconsistent(format!(
                    "successor {bad} of {word} outside vocabulary of {len}"
                )));
            }
        }

        Ok(Chain {
            vocabulary,
            stream,
            transitions,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Token stream in corpus order. Never empty.
    pub fn stream(&self) -> &[WordId] {
        &self.stream
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Split the chain into its parts, e.g. for persistence.
    pub fn into_parts(self) -> (Vocabulary, Vec<WordId>, TransitionTable) {
        (self.vocabulary, self.stream, self.transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<WordId> {
        raw.iter().copied().map(WordId).collect()
    }

    fn sorted(ids: &[WordId]) -> Vec<WordId> {
        let mut v = ids.to_vec();
        v.sort();
        v
    }

    #[test]
    fn build_assigns_stable_indexes() {
        let chain = Chain::build(["a", "b", "a", "c"]).unwrap();
        assert_eq!(chain.vocabulary().words(), ["a", "b", "c"]);
        assert_eq!(chain.stream(), ids(&[0, 1, 0, 2]));
    }

    #[test]
    fn build_fills_transition_table() {
        let chain = Chain::build(["a", "b", "a", "c"]).unwrap();
        let table = chain.transitions();

        assert_eq!(sorted(table.successors(WordId(0)).unwrap()), ids(&[1, 2]));
        assert_eq!(table.successors(WordId(1)).unwrap(), ids(&[0]));
        // "c" is terminal.
        assert_eq!(table.successors(WordId(2)), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn build_normalizes_tokens() {
        let chain = Chain::build(["Hello!", "hello", "WORLD."]).unwrap();
        assert_eq!(chain.vocabulary().words(), ["hello", "world"]);
        assert_eq!(chain.stream(), ids(&[0, 0, 1]));
        assert_eq!(chain.transitions().successors(WordId(0)).unwrap(), ids(&[0, 1]));
    }

    #[test]
    fn build_preserves_multiplicity() {
        let chain = Chain::build(["x", "y", "x", "y", "x", "z"]).unwrap();
        let succ = sorted(chain.transitions().successors(WordId(0)).unwrap());
        assert_eq!(succ, ids(&[1, 1, 2]));
    }

    #[test]
    fn build_single_token_has_no_transitions() {
        let chain = Chain::build(["lonely"]).unwrap();
        assert_eq!(chain.stream(), ids(&[0]));
        assert!(chain.transitions().is_empty());
    }

    #[test]
    fn build_empty_is_empty_corpus() {
        let empty: [&str; 0] = [];
        assert_eq!(Chain::build(empty), Err(ChainError::EmptyCorpus));
    }

    #[test]
    fn from_messages_links_across_message_boundaries() {
        let chain = Chain::from_messages(&["hello world", "hello there", "world hello"]).unwrap();
        let vocab = chain.vocabulary();
        let hello = vocab.find("hello").unwrap();
        let succ: Vec<&str> = chain
            .transitions()
            .successors(hello)
            .unwrap()
            .iter()
            .map(|&id| vocab.resolve(id))
            .collect();
        assert_eq!(succ, vec!["world", "there"]);

        // Message boundaries are not chain boundaries: "world" ends the first
        // message and is still followed by the "hello" that opens the second.
        let world = vocab.find("world").unwrap();
        assert_eq!(chain.transitions().successors(world).unwrap(), [hello, hello]);
    }

    #[test]
    fn from_messages_of_blank_bodies_is_empty_corpus() {
        assert_eq!(
            Chain::from_messages(&["", "   ", "\n"]),
            Err(ChainError::EmptyCorpus)
        );
    }

    #[test]
    fn from_parts_roundtrip() {
        let chain = Chain::build(["the", "cat", "sat", "on", "the", "mat"]).unwrap();
        let (vocab, stream, table) = chain.clone().into_parts();
        assert_eq!(Chain::from_parts(vocab, stream, table).unwrap(), chain);
    }

    #[test]
    fn from_parts_rejects_out_of_range_stream() {
        let chain = Chain::build(["a", "b"]).unwrap();
        let (vocab, _, table) = chain.into_parts();
        let err = Chain::from_parts(vocab, ids(&[0, 5]), table).unwrap_err();
        assert!(matches!(err, ChainError::Inconsistent(_)));
    }

    #[test]
    fn from_parts_rejects_out_of_range_successor() {
        let chain = Chain::build(["a", "b"]).unwrap();
        let (vocab, stream, _) = chain.into_parts();
        let table: TransitionTable = [(WordId(0), ids(&[9]))].into_iter().collect();
        assert!(Chain::from_parts(vocab, stream, table).is_err());
    }

    #[test]
    fn from_parts_rejects_empty_stream() {
        let chain = Chain::build(["a"]).unwrap();
        let (vocab, _, table) = chain.into_parts();
        assert!(Chain::from_parts(vocab, Vec::new(), table).is_err());
    }

    #[test]
    fn transition_table_serde_keeps_integer_keys() {
        let chain = Chain::build(["a", "b", "a", "c"]).unwrap();
        let json = serde_json::to_string(chain.transitions()).unwrap();
        assert_eq!(json, r#"{"0":[1,2],"1":[0]}"#);
        let back: TransitionTable = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, chain.transitions());
    }
}
