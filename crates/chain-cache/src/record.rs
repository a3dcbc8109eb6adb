//! Persisted form of a cached chain.

use serde::{Deserialize, Serialize};
use transition_chain::{Chain, ChainError, TransitionTable};
use word_core::WordId;
use word_vocab::Vocabulary;

/// One cached chain, as written to a store.
///
/// In JSON the transition table is an object whose keys are vocabulary
/// indexes written as strings (`{"0": [1, 2]}`); they are parsed back into
/// integers on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub vocabulary: Vocabulary,
    pub token_index_stream: Vec<WordId>,
    pub transition_table: TransitionTable,
    pub build_time_epoch_seconds: u64,
}

impl CacheRecord {
    pub fn from_chain(chain: &Chain, built_at: u64) -> Self {
        CacheRecord {
            vocabulary: chain.vocabulary().clone(),
            token_index_stream: chain.stream().to_vec(),
            transition_table: chain.transitions().clone(),
            build_time_epoch_seconds: built_at,
        }
    }

    /// Reassemble the chain, checking that every index resolves.
    pub fn into_chain(self) -> Result<Chain, ChainError> {
        Chain::from_parts(
            self.vocabulary,
            self.token_index_stream,
            self.transition_table,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Chain {
        Chain::build(["a", "b", "a", "c"]).unwrap()
    }

    #[test]
    fn json_layout() {
        let record = CacheRecord::from_chain(&sample(), 1234);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "vocabulary": ["a", "b", "c"],
                "token_index_stream": [0, 1, 0, 2],
                "transition_table": { "0": [1, 2], "1": [0] },
                "build_time_epoch_seconds": 1234
            })
        );
    }

    #[test]
    fn json_roundtrip_yields_identical_chain() {
        let chain = sample();
        let json = serde_json::to_string(&CacheRecord::from_chain(&chain, 99)).unwrap();
        let back: CacheRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.build_time_epoch_seconds, 99);
        assert_eq!(back.into_chain().unwrap(), chain);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let json = r#"{
            "vocabulary": ["a"],
            "token_index_stream": [0, 3],
            "transition_table": {},
            "build_time_epoch_seconds": 1
        }"#;
        let record: CacheRecord = serde_json::from_str(json).unwrap();
        assert!(record.into_chain().is_err());
    }

    #[test]
    fn non_integer_key_fails_to_parse() {
        let json = r#"{
            "vocabulary": ["a"],
            "token_index_stream": [0],
            "transition_table": { "a": [0] },
            "build_time_epoch_seconds": 1
        }"#;
        assert!(serde_json::from_str::<CacheRecord>(json).is_err());
    }
}
