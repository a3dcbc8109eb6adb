//! The six user-facing generation commands.

use std::ops::RangeInclusive;

use corpus_source::AuthorId;
use rand::Rng;

/// Walk length for plain commands invoked without one.
pub const DEFAULT_WORDS: i64 = 20;

/// Walk lengths a joke picks from when invoked without one.
pub const JOKE_WORDS: RangeInclusive<i64> = 15..=25;

/// A generation command, as parsed by a dispatcher.
///
/// `words` is the requested walk length; `None` means the command's default.
/// Out-of-range values are accepted here and clamped during prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Phrase from everyone.
    Markov { words: Option<i64> },
    /// Phrase from everyone, starting at a given word.
    MarkovHint {
        start_word: String,
        words: Option<i64>,
    },
    /// Phrase from one author.
    MarkovUser { user: AuthorId, words: Option<i64> },
    /// Phrase from one author, starting at a given word.
    MarkovHintUser {
        user: AuthorId,
        start_word: String,
        words: Option<i64>,
    },
    /// Punctuated phrase from everyone.
    MarkovJoke { words: Option<i64> },
    /// Punctuated phrase from one author.
    MarkovJokeUser { user: AuthorId, words: Option<i64> },
}

impl Command {
    pub fn author(&self) -> Option<AuthorId> {
        match self {
            Command::MarkovUser { user, .. }
            | Command::MarkovHintUser { user, .. }
            | Command::MarkovJokeUser { user, .. } => Some(*user),
            Command::Markov { .. } | Command::MarkovHint { .. } | Command::MarkovJoke { .. } => {
                None
            }
        }
    }

    pub fn start_word(&self) -> Option<&str> {
        match self {
            Command::MarkovHint { start_word, .. } | Command::MarkovHintUser { start_word, .. } => {
                Some(start_word)
            }
            _ => None,
        }
    }

    /// Whether the output goes through the punctuation formatter.
    pub fn is_joke(&self) -> bool {
        matches!(
            self,
            Command::MarkovJoke { .. } | Command::MarkovJokeUser { .. }
        )
    }

    /// Requested length, or the command's default. Jokes draw theirs from
    /// [`JOKE_WORDS`].
    pub fn words<R: Rng>(&self, rng: &mut R) -> i64 {
        let requested = match self {
            Command::Markov { words }
            | Command::MarkovHint { words, .. }
            | Command::MarkovUser { words, .. }
            | Command::MarkovHintUser { words, .. }
            | Command::MarkovJoke { words }
            | Command::MarkovJokeUser { words, .. } => *words,
        };
        match requested {
            Some(n) => n,
            None if self.is_joke() => rng.random_range(JOKE_WORDS),
            None => DEFAULT_WORDS,
        }
    }
}
