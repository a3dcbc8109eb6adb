//! Sentence generation over a first-order word chain.
//!
//! Generation runs in four steps:
//!
//! 1. **Start**: use the seed word if the chain knows it, otherwise draw a
//!    position uniformly from the token stream. Drawing from the stream rather
//!    than the vocabulary makes frequent words proportionally likelier starts.
//! 2. **Walk**: repeatedly append a successor drawn uniformly from the last
//!    word's successor list. Repeats in the list carry the transition weights.
//!    A word with no successors ends the walk early.
//! 3. **Render**: map ids back to words and join them with single spaces.
//! 4. **Punctuate** (optional): [`add_punctuation`] decorates the result.

use rand::Rng;
use transition_chain::Chain;
use word_core::WordId;

/// Returned instead of an empty sentence, and for corpora with no messages.
pub const NO_RESULTS: &str = "Didn't get any results.";

/// Walk length used when the requested one is out of range.
pub const DEFAULT_LENGTH: usize = 20;

/// Longest accepted walk length.
pub const MAX_LENGTH: usize = 50;

/// Map a requested walk length onto the accepted range.
///
/// Values in `1..=MAX_LENGTH` are kept; anything else becomes
/// [`DEFAULT_LENGTH`].
pub fn clamp_length(requested: i64) -> usize {
    match usize::try_from(requested) {
        Ok(n) if (1..=MAX_LENGTH).contains(&n) => n,
        _ => DEFAULT_LENGTH,
    }
}

/// Pick the first word of a walk.
///
/// The seed is normalized before lookup. An unknown or missing seed falls
/// back to a frequency-weighted random pick from the token stream.
pub fn start_word<R: Rng>(chain: &Chain, seed: Option<&str>, rng: &mut R) -> WordId {
    if let Some(seed) = seed
        && let Some(id) = chain.vocabulary().find(&chat_normalize::normalize(seed))
    {
        return id;
    }

    let stream = chain.stream();
    stream[rng.random_range(0..stream.len())]
}

/// Walk up to `steps` transitions from `start`.
///
/// The result always begins with `start` and holds at most `steps + 1` ids.
/// Reaching a word without successors stops the walk and keeps what was
/// generated so far.
pub fn walk<R: Rng>(chain: &Chain, start: WordId, steps: usize, rng: &mut R) -> Vec<WordId> {
    let mut sequence = Vec::with_capacity(steps + 1);
    sequence.push(start);

    for _ in 0..steps {
        let last = sequence[sequence.len() - 1];
        let Some(successors) = chain.transitions().successors(last) else {
            tracing::debug!(
                word = %last,
                generated = sequence.len(),
                requested = steps + 1,
                "walk reached a word with no successor"
            );
            break;
        };
        let next = successors[rng.random_range(0..successors.len())];
        sequence.push(next);
    }

    sequence
}

/// Join the words for `ids` with single spaces.
pub fn render(chain: &Chain, ids: &[WordId]) -> String {
    let vocabulary = chain.vocabulary();
    ids.iter()
        .map(|&id| vocabulary.resolve(id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate one sentence: start, walk, render.
///
/// `length` is clamped with [`clamp_length`]. A blank rendering (possible
/// when every walked word normalized to the empty string) yields
/// [`NO_RESULTS`].
pub fn generate<R: Rng>(chain: &Chain, length: i64, seed: Option<&str>, rng: &mut R) -> String {
    let steps = clamp_length(length);
    let start = start_word(chain, seed, rng);
    let sequence = walk(chain, start, steps, rng);
    let text = render(chain, &sequence);

    if text.trim().is_empty() {
        NO_RESULTS.to_string()
    } else {
        text
    }
}

/// Decorate generated text for comic effect.
///
/// One word, chosen uniformly from the second to the last, gets `"?\n"`
/// appended (the only word when there is just one). The last word always
/// gets `"!"`. [`NO_RESULTS`] and blank input are returned unchanged.
pub fn add_punctuation<R: Rng>(text: &str, rng: &mut R) -> String {
    if text == NO_RESULTS {
        return text.to_string();
    }

    let mut words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return text.to_string();
    }

    let idx = if words.len() < 2 {
        0
    } else {
        rng.random_range(1..words.len())
    };
    words[idx].push_str("?\n");
    if let Some(last) = words.last_mut() {
        last.push('!');
    }

    words.join(" ")
}
