//! Mention parsing
//!
//! Extracts typed `@kind:id` tokens from free-form user text. The grammar is
//! fixed: a word-character kind, a colon, and an alphanumeric-or-hyphen id.
//! Unrecognized kinds are accepted and carried through; they resolve to zero
//! papers downstream (permissive-parse policy). Pure and deterministic.

use regex_lite::Regex;
use scribe_common::models::{Mention, MentionKind};

const MENTION_PATTERN: &str = r"@(\w+):([A-Za-z0-9-]+)";

/// Parse all non-overlapping mention tokens from `text`.
///
/// Malformed tokens like `@:123` or `@search:` do not match the grammar and
/// are excluded.
pub fn parse_mentions(text: &str) -> Vec<Mention> {
    let pattern = Regex::new(MENTION_PATTERN).expect("mention pattern is valid");
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let full = caps.get(0)?.as_str();
            let kind = caps.get(1)?.as_str();
            let id = caps.get(2)?.as_str();
            Some(Mention {
                id: id.to_string(),
                display: full.to_string(),
                kind: MentionKind::from_token(kind),
            })
        })
        .collect()
}

/// Remove all mention tokens from `text`, collapsing the whitespace left
/// behind. Used where the request text doubles as display copy, e.g. a
/// document title.
pub fn strip_mentions(text: &str) -> String {
    let pattern = Regex::new(MENTION_PATTERN).expect("mention pattern is valid");
    let stripped = pattern.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_mention() {
        let mentions = parse_mentions("summarize @search:abc-123 please");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].id, "abc-123");
        assert_eq!(mentions[0].display, "@search:abc-123");
        assert_eq!(mentions[0].kind, MentionKind::Search);
    }

    #[test]
    fn test_parse_multiple_kinds_in_order() {
        let mentions = parse_mentions("@search:s1 and @pdf_batch:b2 and @zotero:z3");
        assert_eq!(mentions.len(), 3);
        assert_eq!(mentions[0].kind, MentionKind::Search);
        assert_eq!(mentions[1].kind, MentionKind::PdfBatch);
        assert_eq!(mentions[2].kind, MentionKind::Zotero);
    }

    #[test]
    fn test_unknown_kind_still_parses() {
        let mentions = parse_mentions("@library:x-1");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].kind, MentionKind::Other("library".to_string()));
    }

    #[test]
    fn test_malformed_tokens_excluded() {
        assert!(parse_mentions("@:123").is_empty());
        assert!(parse_mentions("@search:").is_empty());
        assert!(parse_mentions("no mentions here").is_empty());
        assert!(parse_mentions("email@example.com without colon-id").is_empty());
    }

    #[test]
    fn test_strip_mentions_cleans_display_text() {
        assert_eq!(
            strip_mentions("summarize @search:abc-123 and @pdf_batch:b2 findings"),
            "summarize and findings"
        );
        assert_eq!(strip_mentions("@search:only"), "");
        assert_eq!(strip_mentions("no mentions"), "no mentions");
    }

    #[test]
    fn test_idempotent() {
        let text = "@search:abc @pdf_batch:def-9";
        assert_eq!(parse_mentions(text), parse_mentions(text));
    }
}
