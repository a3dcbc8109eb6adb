//! Chat message tokenization and word normalization.
//!
//! Messages are split on whitespace into raw tokens, and each token is
//! normalized into a comparable word form: lower-cased, with decorative
//! punctuation removed and mentions defused.
//!
//! This crate has no dependencies on the other chain crates. It is a pure
//! text processing utility.

/// Zero-width space inserted after every `@` so that generated text cannot
/// trigger mentions when it is displayed again.
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Characters removed from a token. Removal merges the neighbouring text.
const STRIPPED: &[char] = &[',', '.', '!', '?', '\'', '"', '~', '`', '*', '_', '(', ')'];

/// Normalize a whitespace-delimited token into its vocabulary form.
///
/// 1. Converts to lowercase.
/// 2. Removes `, . ! ? ' " ~ ` * _ ( )` without substituting anything.
/// 3. Follows every `@` with a zero-width space, unless one is already there.
///
/// Internal whitespace is preserved and nothing is trimmed. The function is
/// idempotent.
///
/// # Examples
///
/// ```
/// use chat_normalize::normalize;
///
/// assert_eq!(normalize("What!?!?!"), "what");
/// assert_eq!(normalize("(u wot)"), "u wot");
/// assert_eq!(normalize("@user"), "@\u{200B}user");
/// ```
pub fn normalize(token: &str) -> String {
    let lower = token.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut chars = lower.chars().filter(|c| !STRIPPED.contains(c)).peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c == '@' && chars.peek() != Some(&ZERO_WIDTH_SPACE) {
            out.push(ZERO_WIDTH_SPACE);
        }
    }

    out
}

/// Split a raw message body into whitespace-delimited tokens.
pub fn words(message: &str) -> impl Iterator<Item = &str> {
    message.split_whitespace()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn lowercases() {
        assert_eq!(normalize("Test"), "test");
        assert_eq!(normalize("HELLO"), "hello");
    }

    #[test]
    fn strips_terminal_punctuation() {
        assert_eq!(normalize("What!?!?!"), "what");
    }

    #[test]
    fn does_not_trim_internal_whitespace() {
        assert_eq!(normalize("(u wot)"), "u wot");
    }

    #[test]
    fn stripping_merges_neighbours() {
        assert_eq!(normalize("don't"), "dont");
        assert_eq!(normalize("snake_case"), "snakecase");
        assert_eq!(normalize("*~`\"hi\"`~*"), "hi");
    }

    #[test]
    fn defuses_mentions() {
        assert_eq!(normalize("@user"), "@\u{200B}user");
        assert_eq!(normalize("a@b@c"), "a@\u{200B}b@\u{200B}c");
    }

    #[test]
    fn mention_marker_not_doubled() {
        let once = normalize("@Everyone");
        assert_eq!(once, "@\u{200B}everyone");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn punctuation_only_token_becomes_empty() {
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn keeps_other_symbols() {
        assert_eq!(normalize("#rust:"), "#rust:");
        assert_eq!(normalize("<3"), "<3");
    }

    #[test]
    fn words_split_on_any_whitespace() {
        let tokens: Vec<&str> = words("  hello\tthere\n\nworld  ").collect();
        assert_eq!(tokens, vec!["hello", "there", "world"]);
    }

    #[test]
    fn words_of_blank_message_is_empty() {
        assert_eq!(words(" \n\t ").count(), 0);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(token in "[a-zA-Z0-9@,.!?'\"~`*_() \u{200B}]{0,24}") {
            let once = normalize(&token);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_case_insensitive(token in "[a-zA-Z@!?.]{0,24}") {
            prop_assert_eq!(normalize(&token.to_uppercase()), normalize(&token.to_lowercase()));
        }

        #[test]
        fn normalized_words_contain_no_stripped_chars(token in "\\PC{0,24}") {
            let out = normalize(&token);
            prop_assert!(!out.contains(STRIPPED));
        }
    }
}
