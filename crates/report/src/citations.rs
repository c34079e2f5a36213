//! Citation reconciliation
//!
//! Matches in-text citations in generated prose against the references
//! block emitted alongside it, synthesizing placeholder entries for
//! citations with no usable reference line.
//!
//! All of the parsing here is tolerant by contract. Reference lines that
//! do not fit the APA-like shape are dropped, never retained as malformed
//! entries, and citation matching is case-insensitive containment rather
//! than equality. Keep that looseness: downstream dedup and the tests
//! assume it.

use regex_lite::Regex;
use scribe_common::models::Reference;
use tracing::debug;
use uuid::Uuid;

/// One in-text citation occurrence, normalized for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Leading author fragment with "et al." and co-author tails stripped
    pub author_fragment: String,

    /// Four-digit year as cited
    pub year: String,
}

/// Parse the references block into bibliography entries.
///
/// Each non-blank line is matched against `Authors (Year). Title.
/// *Journal*. doi-or-url` with the journal and link optional. Authors are
/// split on `,`, `&`, and `and`. Lines that do not fit are dropped.
pub fn parse_reference_lines(block: &str) -> Vec<Reference> {
    let line_pattern =
        Regex::new(r"^([^(]+?)\s*\((\d{4})\)\.\s*(.+)$").expect("reference pattern is valid");
    let journal_pattern = Regex::new(r"\*([^*]+)\*").expect("journal pattern is valid");
    let link_pattern = Regex::new(r"https?://\S+").expect("link pattern is valid");

    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let captures = match line_pattern.captures(line) {
                Some(captures) => captures,
                None => {
                    debug!(line, "Dropping unparseable reference line");
                    return None;
                }
            };

            let authors = split_authors(captures.get(1)?.as_str());
            if authors.is_empty() {
                debug!(line, "Dropping reference line with no usable authors");
                return None;
            }
            let year = captures.get(2)?.as_str().to_string();
            let rest = captures.get(3)?.as_str();

            let journal = journal_pattern
                .captures(rest)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            let doi = link_pattern.find(rest).map(|m| {
                let link = m.as_str().trim_end_matches(['.', ',']);
                link.strip_prefix("https://doi.org/")
                    .or_else(|| link.strip_prefix("http://doi.org/"))
                    .unwrap_or(link)
                    .to_string()
            });

            // Title runs up to the journal marker or the link, whichever
            // comes first
            let title_end = rest
                .find('*')
                .or_else(|| link_pattern.find(rest).map(|m| m.start()))
                .unwrap_or(rest.len());
            let title = rest[..title_end].trim().trim_end_matches('.').trim();
            if title.is_empty() {
                debug!(line, "Dropping reference line with empty title");
                return None;
            }

            Some(Reference {
                id: Uuid::new_v4().to_string(),
                title: title.to_string(),
                authors,
                year,
                doi,
                journal,
            })
        })
        .collect()
}

/// Scan prose for in-text citations with one loose `(fragment, year)`
/// pattern; parenthesized multi-author and "et al." forms collapse into
/// the same match
pub fn extract_citations(content: &str) -> Vec<Citation> {
    let pattern = Regex::new(r"\(([^()]+?),\s*(\d{4})\)").expect("citation pattern is valid");
    pattern
        .captures_iter(content)
        .filter_map(|captures| {
            let fragment = normalize_fragment(captures.get(1)?.as_str());
            if fragment.is_empty() {
                return None;
            }
            Some(Citation {
                author_fragment: fragment,
                year: captures.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Reconcile prose citations with the references block.
///
/// Every parsed reference line is kept. Each citation with no parsed
/// reference whose author list contains its fragment (case-insensitive)
/// and whose year matches exactly gets one synthesized placeholder;
/// repeated citations of the same `(fragment, year)` pair synthesize a
/// single placeholder. Encounter order is preserved within each group.
pub fn reconcile(content: &str, references_block: &str) -> Vec<Reference> {
    let mut references = parse_reference_lines(references_block);
    let citations = extract_citations(content);

    let mut synthesized_keys: Vec<(String, String)> = Vec::new();
    for citation in &citations {
        let matched = references.iter().any(|reference| {
            reference.year == citation.year
                && reference.matches_author_fragment(&citation.author_fragment)
        });
        if matched {
            continue;
        }
        let key = (
            citation.author_fragment.to_lowercase(),
            citation.year.clone(),
        );
        if synthesized_keys.contains(&key) {
            continue;
        }
        debug!(
            fragment = %citation.author_fragment,
            year = %citation.year,
            "Synthesizing placeholder reference for unmatched citation"
        );
        synthesized_keys.push(key);
        references.push(Reference::placeholder(
            &citation.author_fragment,
            &citation.year,
        ));
    }

    references
}

/// Split an author list on `,` / `&` / `and`, keeping pieces with at
/// least one alphabetic character
fn split_authors(authors: &str) -> Vec<String> {
    authors
        .split(['&', ','])
        .flat_map(|piece| piece.split(" and "))
        .map(|piece| piece.trim().trim_end_matches('.').trim().to_string())
        .filter(|piece| piece.chars().any(|c| c.is_alphabetic()))
        .collect()
}

/// Reduce a captured citation fragment to its leading author name:
/// "Smith et al." and "Smith & Garcia" both normalize to "Smith"
fn normalize_fragment(fragment: &str) -> String {
    let fragment = fragment.split('&').next().unwrap_or(fragment);
    let fragment = fragment
        .trim()
        .trim_end_matches("et al.")
        .trim_end_matches("et al");
    fragment.trim().trim_end_matches(',').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::models::{PLACEHOLDER_JOURNAL, PLACEHOLDER_TITLE};

    #[test]
    fn test_parse_full_reference_line() {
        let references = parse_reference_lines(
            "Smith, J., & Garcia, M. (2020). A Study of Things. *Nature*. https://doi.org/10.1000/xyz",
        );
        assert_eq!(references.len(), 1);
        let reference = &references[0];
        assert_eq!(reference.title, "A Study of Things");
        assert_eq!(reference.authors, vec!["Smith", "J", "Garcia", "M"]);
        assert_eq!(reference.year, "2020");
        assert_eq!(reference.journal.as_deref(), Some("Nature"));
        assert_eq!(reference.doi.as_deref(), Some("10.1000/xyz"));
    }

    #[test]
    fn test_parse_drops_unparseable_lines() {
        let references = parse_reference_lines(
            "Smith, J. (2020). A Study. *Nature*.\nthis is not a reference\n(2020). No authors.",
        );
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].title, "A Study");
    }

    #[test]
    fn test_parse_optional_journal_and_link() {
        let references = parse_reference_lines("Garcia, M. (2018). Minimal Entry.");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].journal, None);
        assert_eq!(references[0].doi, None);
    }

    #[test]
    fn test_extract_citation_forms() {
        let citations = extract_citations(
            "First (Smith, 2020), then (Garcia & Lee, 2019), then (Chen et al., 2021).",
        );
        assert_eq!(
            citations,
            vec![
                Citation { author_fragment: "Smith".into(), year: "2020".into() },
                Citation { author_fragment: "Garcia".into(), year: "2019".into() },
                Citation { author_fragment: "Chen".into(), year: "2021".into() },
            ]
        );
    }

    #[test]
    fn test_reconcile_matched_citation_yields_single_reference() {
        let references = reconcile(
            "<p>The results hold (Smith, 2020).</p>",
            "Smith, J. (2020). A Study of Things. *Nature*.",
        );
        assert_eq!(references.len(), 1);
        assert!(!references[0].is_placeholder());
        assert_eq!(references[0].title, "A Study of Things");
    }

    #[test]
    fn test_reconcile_unmatched_citation_synthesizes_placeholder() {
        let references = reconcile("<p>As shown (Doe, 2019).</p>", "");
        assert_eq!(references.len(), 1);
        let placeholder = &references[0];
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.title, PLACEHOLDER_TITLE);
        assert_eq!(placeholder.authors, vec!["Doe".to_string()]);
        assert_eq!(placeholder.year, "2019");
        assert_eq!(placeholder.journal.as_deref(), Some(PLACEHOLDER_JOURNAL));
    }

    #[test]
    fn test_reconcile_year_mismatch_synthesizes_placeholder() {
        let references = reconcile(
            "<p>Earlier work (Smith, 2018).</p>",
            "Smith, J. (2020). A Study of Things. *Nature*.",
        );
        assert_eq!(references.len(), 2);
        assert!(references.iter().any(|r| r.is_placeholder() && r.year == "2018"));
    }

    #[test]
    fn test_reconcile_dedupes_repeated_unmatched_citations() {
        let references = reconcile("<p>(Doe, 2019) and again (Doe, 2019).</p>", "");
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn test_reconcile_keeps_uncited_reference_lines() {
        let references = reconcile(
            "<p>No citations here.</p>",
            "Smith, J. (2020). A Study of Things. *Nature*.",
        );
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn test_reconcile_containment_match_not_equality() {
        // Fragment "Smith" matches author entry "Smithson" by containment
        let references = reconcile(
            "<p>(Smith, 2020)</p>",
            "Smithson, A. (2020). Broader Work. *Science*.",
        );
        assert_eq!(references.len(), 1);
        assert!(!references[0].is_placeholder());
    }
}
