use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// `@token` preceded by start of text or a non-word character. The token is
/// either an email address or a handle of at least two characters.
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^\w@])@([A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}|[A-Za-z0-9_.\-]{2,})",
    )
    .expect("mention regex is valid")
});

/// Scan comment text for `@` mentions.
///
/// Returns the raw tokens, de-duplicated, in order of first appearance.
/// Resolving tokens to user identities is left to the backend.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut mentions = Vec::new();

    for caps in MENTION_RE.captures_iter(text) {
        let token = caps[1].trim_end_matches(['.', '-']);
        if token.chars().count() < 2 {
            continue;
        }
        if seen.insert(token.to_owned()) {
            mentions.push(token.to_owned());
        }
    }

    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_and_emails() {
        assert_eq!(
            extract_mentions("hi @alice and @bob@example.com"),
            vec!["alice", "bob@example.com"]
        );
    }

    #[test]
    fn repeated_mentions_appear_once() {
        assert_eq!(
            extract_mentions("@alice please check, @carol too. ping @alice again"),
            vec!["alice", "carol"]
        );
    }

    #[test]
    fn single_char_handles_are_ignored() {
        assert!(extract_mentions("@a is too short").is_empty());
    }

    #[test]
    fn trailing_punctuation_is_dropped() {
        assert_eq!(extract_mentions("thanks @dave."), vec!["dave"]);
        assert_eq!(
            extract_mentions("cc @ops.desk@acme.co."),
            vec!["ops.desk@acme.co"]
        );
    }

    #[test]
    fn plain_email_is_not_a_mention() {
        assert!(extract_mentions("write to erin@example.com").is_empty());
    }

    #[test]
    fn mention_at_start_of_text() {
        assert_eq!(extract_mentions("@risk_team review"), vec!["risk_team"]);
    }
}
