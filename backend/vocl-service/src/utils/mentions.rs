//! Mention Parser Utility
//!
//! Extracts @mentions from post and comment text for notification fan-out.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const MAX_HANDLE_LEN: usize = 20;

/// `@` followed by a run of ASCII username characters, not directly after a
/// word character (so `bob@example.com` is not a mention). The run ends at
/// the first other character, CJK included.
static MENTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])@([A-Za-z0-9_]+)")
        .expect("hardcoded mention regex is invalid - fix source code")
});

/// Extract @mentions from content text
///
/// Returns lowercased usernames without the `@`, deduplicated, in order of
/// first appearance.
///
/// # Examples
/// ```
/// use vocl_service::utils::mentions::extract_mentions;
///
/// let mentions = extract_mentions("@alice said hi to @Bob and @alice");
/// assert_eq!(mentions, vec!["alice", "bob"]);
/// ```
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION_REGEX
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .filter(|m| m.as_str().len() <= MAX_HANDLE_LEN)
        .map(|m| m.as_str().to_lowercase())
        .filter(|username| seen.insert(username.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_duplicate_mentions_case_insensitive() {
        let mentions = extract_mentions("@alice said hi to @Bob and @alice");
        assert_eq!(mentions, vec!["alice", "bob"]);
    }

    #[test]
    fn test_extract_no_mentions() {
        assert!(extract_mentions("Hello world!").is_empty());
        assert!(extract_mentions("just an @ sign").is_empty());
    }

    #[test]
    fn test_email_addresses_are_not_mentions() {
        assert!(extract_mentions("write to bob@example.com").is_empty());
    }

    #[test]
    fn test_adjacent_punctuation() {
        let mentions = extract_mentions("(@carol), @dave! and @erin.");
        assert_eq!(mentions, vec!["carol", "dave", "erin"]);
    }

    #[test]
    fn test_overlong_handle_ignored() {
        let content = format!("hi @{}", "a".repeat(25));
        assert!(extract_mentions(&content).is_empty());
    }

    #[test]
    fn test_mentions_in_unicode_text() {
        let mentions = extract_mentions("你好 @alice 欢迎加入！");
        assert_eq!(mentions, vec!["alice"]);
    }

    #[test]
    fn test_mention_followed_by_cjk() {
        assert_eq!(extract_mentions("@alice你好"), vec!["alice"]);
        assert_eq!(extract_mentions("谢谢@bob。"), vec!["bob"]);
    }

    #[test]
    fn test_space_separated_mentions() {
        assert_eq!(extract_mentions("@a @b @c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mention_at_start_of_line() {
        let mentions = extract_mentions("first line\n@frank second");
        assert_eq!(mentions, vec!["frank"]);
    }
}
