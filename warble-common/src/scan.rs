//! Extraction of `#hashtag` and `@mention` tokens from post content.

use crate::model::{post::Hashtag, user::UserSlug};
use regex::Regex;
use std::{collections::BTreeSet, sync::LazyLock};

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9]+)").expect("hashtag pattern is valid"));
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9]+)").expect("mention pattern is valid"));

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ScannedContent {
    pub hashtags: BTreeSet<Hashtag>,
    /// Mentioned slugs in order of first appearance, without duplicates.
    pub mentions: Vec<UserSlug>,
}

/// Hashtags are case-insensitive and stored lowercase. Mentions keep their
/// case since slugs are matched exactly.
#[must_use]
pub fn scan_content(content: &str) -> ScannedContent {
    let hashtags = HASHTAG
        .captures_iter(content)
        .filter_map(|captures| Hashtag::new(&captures[1]).ok())
        .collect();

    let mut mentions: Vec<UserSlug> = Vec::new();
    for captures in MENTION.captures_iter(content) {
        // Tokens made of digits only can never be a slug.
        let Ok(slug) = UserSlug::new(captures[1].to_owned()) else {
            continue;
        };
        if !mentions.contains(&slug) {
            mentions.push(slug);
        }
    }

    ScannedContent { hashtags, mentions }
}

/// Turns a free-text search query into the hashtags it names.
///
/// Words are split on whitespace; a leading `#` is optional.
#[must_use]
pub fn query_hashtags(query: &str) -> BTreeSet<Hashtag> {
    query
        .split_whitespace()
        .filter_map(|word| Hashtag::new(word).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::scan::{query_hashtags, scan_content};

    fn tags(content: &str) -> Vec<String> {
        scan_content(content)
            .hashtags
            .into_iter()
            .map(|tag| tag.get().to_owned())
            .collect()
    }

    fn mentions(content: &str) -> Vec<String> {
        scan_content(content)
            .mentions
            .into_iter()
            .map(|slug| slug.into_inner())
            .collect()
    }

    #[test]
    fn hashtags() {
        assert_eq!(tags("#hello world"), ["hello"]);
        assert_eq!(tags("#Rust and #rust and #RUST"), ["rust"]);
        assert_eq!(tags("#one,#two.#three!"), ["one", "three", "two"]);
        assert_eq!(tags("snake#case counts too"), ["case"]);
        assert!(tags("# nothing here #").is_empty());
    }

    #[test]
    fn mentions_keep_case_and_order() {
        assert_eq!(mentions("hi @Bob and @alice, bye @Bob"), ["Bob", "alice"]);
        assert_eq!(mentions("mail me at me@example"), ["example"]);
        assert!(mentions("@1234 is not a handle").is_empty());
        assert!(mentions("no handles").is_empty());
    }

    #[test]
    fn search_queries() {
        let tags: Vec<_> = query_hashtags("Hello  #WORLD bad-word")
            .into_iter()
            .map(|tag| tag.get().to_owned())
            .collect();

        assert_eq!(tags, ["hello", "world"]);
        assert!(query_hashtags("   ").is_empty());
    }
}
