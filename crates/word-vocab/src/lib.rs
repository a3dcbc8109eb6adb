//! Insertion-ordered interning of normalized words into [`WordId`] values.
//!
//! The vocabulary maintains two parallel structures:
//! - `entries`: words in first-seen order (index = WordId)
//! - `index`: a hash map from word to its WordId, for O(1) lookup
//!
//! Only `entries` is serialized. The hash index is rebuilt on load, and a
//! persisted word list containing duplicates is rejected.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use word_core::WordId;

/// A persisted word list could not be turned back into a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    #[error("duplicate word {word:?} at index {position}")]
    Duplicate { word: String, position: usize },
}

/// An interning vocabulary mapping words to dense [`WordId`] values.
///
/// The first time a word is interned it receives the next free id; interning
/// it again returns the id it already has. Ids are never reassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    entries: Vec<String>,
    index: HashMap<String, WordId>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a word if not already present, returning its ID.
    pub fn intern(&mut self, word: String) -> WordId {
        if let Some(&id) = self.index.get(&word) {
            return id;
        }
        let id = WordId::from_usize(self.entries.len());
        self.entries.push(word.clone());
        self.index.insert(word, id);
        id
    }

    /// Look up a word without inserting. Returns `None` if absent.
    pub fn find(&self, word: &str) -> Option<WordId> {
        self.index.get(word).copied()
    }

    /// Resolve a WordId back to its word.
    ///
    /// # Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn resolve(&self, id: WordId) -> &str {
        &self.entries[id.as_usize()]
    }

    /// Resolve a WordId, returning `None` when it does not belong here.
    pub fn get(&self, id: WordId) -> Option<&str> {
        self.entries.get(id.as_usize()).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Words in id order.
    pub fn words(&self) -> &[String] {
        &self.entries
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = VocabularyError;

    fn try_from(words: Vec<String>) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(words.len());
        for (position, word) in words.iter().enumerate() {
            if index.insert(word.clone(), WordId::from_usize(position)).is_some() {
                return Err(VocabularyError::Duplicate {
                    word: word.clone(),
                    position,
                });
            }
        }
        Ok(Vocabulary {
            entries: words,
            index,
        })
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab_of(words: &[&str]) -> (Vocabulary, Vec<WordId>) {
        let mut vocab = Vocabulary::new();
        let ids = words.iter().map(|w| vocab.intern(w.to_string())).collect();
        (vocab, ids)
    }

    #[test]
    fn new_vocabulary_is_empty() {
        let vocab = Vocabulary::new();
        assert!(vocab.is_empty());
        assert_eq!(vocab.len(), 0);
    }

    #[test]
    fn intern_assigns_ids_in_first_seen_order() {
        let (vocab, ids) = vocab_of(&["a", "b", "a", "c"]);
        assert_eq!(ids, vec![WordId(0), WordId(1), WordId(0), WordId(2)]);
        assert_eq!(vocab.words(), ["a", "b", "c"]);
    }

    #[test]
    fn intern_deduplicates() {
        let (vocab, ids) = vocab_of(&["hello", "hello"]);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn find_existing_and_missing() {
        let (vocab, ids) = vocab_of(&["zebra", "apple"]);
        assert_eq!(vocab.find("apple"), Some(ids[1]));
        assert_eq!(vocab.find("mango"), None);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        // Case folding belongs to the normalizer, not the vocabulary.
        let (vocab, _) = vocab_of(&["hello"]);
        assert_eq!(vocab.find("HELLO"), None);
    }

    #[test]
    fn resolve_roundtrip() {
        let (vocab, ids) = vocab_of(&["roundtrip"]);
        assert_eq!(vocab.resolve(ids[0]), "roundtrip");
        assert_eq!(vocab.get(WordId(1)), None);
    }

    #[test]
    fn empty_string_is_a_word() {
        let (vocab, ids) = vocab_of(&["", "x", ""]);
        assert_eq!(ids, vec![WordId(0), WordId(1), WordId(0)]);
        assert_eq!(vocab.find(""), Some(WordId(0)));
    }

    #[test]
    fn serializes_as_word_list() {
        let (vocab, _) = vocab_of(&["a", "b", "c"]);
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"["a","b","c"]"#);
    }

    #[test]
    fn serde_roundtrip_rebuilds_index() {
        let (vocab, _) = vocab_of(&["the", "cat", "sat"]);
        let json = serde_json::to_string(&vocab).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.find("sat"), Some(WordId(2)));
    }

    #[test]
    fn duplicate_word_list_is_rejected() {
        let err = Vocabulary::try_from(vec!["a".to_string(), "b".to_string(), "a".to_string()])
            .unwrap_err();
        assert_eq!(
            err,
            VocabularyError::Duplicate {
                word: "a".into(),
                position: 2
            }
        );
        assert!(serde_json::from_str::<Vocabulary>(r#"["x","x"]"#).is_err());
    }
}
