//! Shortcode extraction from Instagram post links.
//!
//! Turns free-form message text into a canonical [`ContentReference`], or tells
//! the caller whether the text was not a link at all or a broken one.

use lazy_regex::regex_is_match;
use std::fmt;

/// Domain marker that identifies a content platform link.
pub const PLATFORM_MARKER: &str = "instagram.com";

/// Wrapping characters stripped from the start of a link token.
const LEADING_WRAPPERS: &[char] = &['<', '(', '"', '\''];

/// Sentence punctuation and closing wrappers stripped from the end of a link token.
const TRAILING_WRAPPERS: &[char] = &['.', ',', ';', ':', '!', ')', '>', '"', '\''];

/// Path segments that name the kind of post rather than the post itself.
const PATH_MARKERS: &[&str] = &["p", "post", "reel", "reels", "tv"];

/// Canonical identifier of one remote content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentReference(String);

impl ContentReference {
    /// Returns the shortcode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical post URL for this shortcode.
    ///
    /// # Examples
    ///
    /// ```
    /// use insta_relay_core::shortcode::{extract, Extraction};
    ///
    /// let Extraction::Found(reference) = extract("https://instagram.com/reel/Cx9_ab/") else {
    ///     panic!("expected a reference");
    /// };
    /// assert_eq!(reference.post_url(), "https://www.instagram.com/p/Cx9_ab/");
    /// ```
    #[must_use]
    pub fn post_url(&self) -> String {
        format!("https://www.instagram.com/p/{}/", self.0)
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of scanning a message for a post link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The message does not mention the content platform.
    NotALink,
    /// The message mentions the platform but no shortcode could be extracted.
    Invalid,
    /// A shortcode was extracted.
    Found(ContentReference),
}

/// Returns `true` if the text mentions the content platform at all.
#[must_use]
pub fn has_marker(text: &str) -> bool {
    text.to_ascii_lowercase().contains(PLATFORM_MARKER)
}

/// Extracts a content reference from raw message text.
///
/// The first whitespace-separated token that mentions the platform is used,
/// minus surrounding brackets, quotes and sentence punctuation. Query strings, fragments and trailing slashes are ignored, so links that
/// differ only in those parts yield the same reference.
///
/// # Examples
///
/// ```
/// use insta_relay_core::shortcode::{extract, Extraction};
///
/// let a = extract("https://www.instagram.com/p/ABC123/");
/// let b = extract("https://www.instagram.com/p/ABC123?igsh=xyz");
/// assert_eq!(a, b);
/// assert_eq!(extract("hello there"), Extraction::NotALink);
/// ```
#[must_use]
pub fn extract(text: &str) -> Extraction {
    let Some(link) = text.split_whitespace().find(|token| has_marker(token)) else {
        return Extraction::NotALink;
    };

    let link = link
        .trim_start_matches(LEADING_WRAPPERS)
        .trim_end_matches(TRAILING_WRAPPERS)
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let mut after_marker = false;
    let mut first_plain = None;
    for segment in link.split('/') {
        let lowered = segment.to_ascii_lowercase();
        if segment.is_empty() || lowered == "http:" || lowered == "https:" {
            continue;
        }
        if after_marker {
            return validate(segment);
        }
        if lowered.contains(PLATFORM_MARKER) {
            continue;
        }
        if PATH_MARKERS.contains(&lowered.as_str()) {
            after_marker = true;
            continue;
        }
        if first_plain.is_none() {
            first_plain = Some(segment);
        }
    }

    if after_marker {
        // marker was the last segment
        return Extraction::Invalid;
    }
    first_plain.map_or(Extraction::Invalid, validate)
}

fn validate(candidate: &str) -> Extraction {
    if regex_is_match!(r"^[A-Za-z0-9_-]+$", candidate) {
        Extraction::Found(ContentReference(candidate.to_string()))
    } else {
        Extraction::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn found(code: &str) -> Extraction {
        Extraction::Found(ContentReference(code.to_string()))
    }

    #[test]
    fn test_query_and_trailing_slash_are_ignored() {
        assert_eq!(extract("https://instagram.com/p/ABC123/"), found("ABC123"));
        assert_eq!(extract("https://instagram.com/p/ABC123?x=1"), found("ABC123"));
        assert_eq!(extract("https://instagram.com/p/ABC123///"), found("ABC123"));
        assert_eq!(
            extract("https://www.instagram.com/reel/ABC123/?utm_source=ig_web_copy_link"),
            found("ABC123")
        );
    }

    #[test]
    fn test_mixed_case_domain_and_missing_scheme() {
        assert_eq!(extract("HTTPS://WWW.Instagram.COM/p/Xy_-9/"), found("Xy_-9"));
        assert_eq!(extract("instagram.com/tv/Qq1"), found("Qq1"));
    }

    #[test]
    fn test_link_without_path_marker() {
        assert_eq!(extract("https://instagram.com/ABC123"), found("ABC123"));
    }

    #[test]
    fn test_username_prefixed_reel_link() {
        assert_eq!(
            extract("https://www.instagram.com/some.user/reel/DEF456/"),
            found("DEF456")
        );
    }

    #[test]
    fn test_link_embedded_in_text() {
        assert_eq!(
            extract("look at this https://instagram.com/p/ZZ9/ lol"),
            found("ZZ9")
        );
    }

    #[test]
    fn test_surrounding_punctuation_is_ignored() {
        assert_eq!(extract("see https://instagram.com/reel/ABC123."), found("ABC123"));
        assert_eq!(extract("<https://instagram.com/p/ABC123>"), found("ABC123"));
        assert_eq!(extract("(https://instagram.com/p/ABC123/)!"), found("ABC123"));
        assert_eq!(extract("\"https://instagram.com/p/A_b-1/\","), found("A_b-1"));
        assert_eq!(extract("https://instagram.com/p/ABC123?x=1."), found("ABC123"));
    }

    #[test]
    fn test_not_a_link() {
        assert_eq!(extract("hello"), Extraction::NotALink);
        assert_eq!(extract("https://example.com/p/ABC123"), Extraction::NotALink);
        assert_eq!(extract(""), Extraction::NotALink);
    }

    #[test]
    fn test_malformed_links_are_invalid() {
        assert_eq!(extract("https://instagram.com/"), Extraction::Invalid);
        assert_eq!(extract("https://instagram.com/p/"), Extraction::Invalid);
        assert_eq!(extract("instagram.com"), Extraction::Invalid);
        assert_eq!(extract("https://instagram.com/p/<script>"), Extraction::Invalid);
    }

    proptest! {
        #[test]
        fn prop_query_and_slashes_do_not_change_reference(
            code in "[A-Za-z0-9_-]{1,16}",
            marker in prop::sample::select(vec!["p", "reel", "tv"]),
            slashes in 0usize..4,
            query in proptest::option::of("[a-z]{1,6}=[a-z0-9]{0,6}"),
        ) {
            let base = format!("https://www.instagram.com/{marker}/{code}");
            let mut variant = format!("{base}{}", "/".repeat(slashes));
            if let Some(q) = query {
                variant.push('?');
                variant.push_str(&q);
            }
            prop_assert_eq!(extract(&base), extract(&variant));
            prop_assert_eq!(extract(&variant), found(&code));
        }

        #[test]
        fn prop_text_without_marker_is_not_a_link(text in "[a-z /:.?=]{0,40}") {
            prop_assume!(!text.contains(PLATFORM_MARKER));
            prop_assert_eq!(extract(&text), Extraction::NotALink);
        }
    }
}
