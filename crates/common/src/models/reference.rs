//! Bibliographic reference entries attached to section nodes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Paper;

/// Sentinel title for a synthesized placeholder reference
pub const PLACEHOLDER_TITLE: &str = "Reference details not available";

/// Sentinel journal for a synthesized placeholder reference
pub const PLACEHOLDER_JOURNAL: &str = "Journal information not available";

/// A bibliography entry attached to a section node.
///
/// Two provenances: derived from a resolved [`Paper`], or synthesized as a
/// placeholder for an in-text citation with no matching reference line.
/// Identity is a fresh synthetic id, never the paper id; deduplication
/// happens only at bibliography assembly via author overlap + exact year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,

    pub title: String,

    pub authors: Vec<String>,

    pub year: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
}

impl Reference {
    /// Build a reference from a resolved paper, minting a fresh id
    pub fn from_paper(paper: &Paper) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            year: paper.year.clone(),
            doi: paper.doi.clone(),
            journal: paper.journal.clone(),
        }
    }

    /// Synthesize a placeholder for an in-text citation with no matching
    /// reference entry
    pub fn placeholder(author_fragment: &str, year: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: PLACEHOLDER_TITLE.to_string(),
            authors: vec![author_fragment.to_string()],
            year: year.to_string(),
            doi: None,
            journal: Some(PLACEHOLDER_JOURNAL.to_string()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }

    /// Format the entry APA-style: `Authors (Year). Title. *Journal*. url`
    pub fn format_apa(&self) -> String {
        let mut entry = format!(
            "{} ({}). {}.",
            self.authors.join(", "),
            self.year,
            self.title
        );
        if let Some(journal) = &self.journal {
            entry.push_str(&format!(" *{}*.", journal));
        }
        if let Some(doi) = &self.doi {
            entry.push_str(&format!(" https://doi.org/{}", doi));
        }
        entry
    }

    /// Loose author-overlap test used for citation matching and
    /// bibliography deduplication.
    ///
    /// Two author lists overlap when any pair of name tokens (length >= 2,
    /// lowercased, punctuation stripped) contain one another. "J. Smith"
    /// and "Smith, J." overlap on "smith"; so do "Lee" and "Leeman",
    /// a known precision tradeoff of the loose matcher.
    pub fn authors_overlap(left: &[String], right: &[String]) -> bool {
        let left_tokens = name_tokens(left);
        let right_tokens = name_tokens(right);
        left_tokens.iter().any(|a| {
            right_tokens
                .iter()
                .any(|b| a.contains(b.as_str()) || b.contains(a.as_str()))
        })
    }

    /// Whether any author string contains the given fragment
    /// (case-insensitive containment, not equality)
    pub fn matches_author_fragment(&self, fragment: &str) -> bool {
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return false;
        }
        self.authors
            .iter()
            .any(|author| author.to_lowercase().contains(&fragment))
    }
}

/// Normalized name tokens for overlap matching: lowercased alphabetic runs,
/// initials (single letters) dropped
fn name_tokens(authors: &[String]) -> Vec<String> {
    authors
        .iter()
        .flat_map(|author| {
            author
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| t.len() >= 2)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_sentinels() {
        let reference = Reference::placeholder("Doe", "2019");
        assert_eq!(reference.title, PLACEHOLDER_TITLE);
        assert_eq!(reference.authors, vec!["Doe".to_string()]);
        assert_eq!(reference.year, "2019");
        assert_eq!(reference.journal.as_deref(), Some(PLACEHOLDER_JOURNAL));
        assert_eq!(reference.doi, None);
        assert!(reference.is_placeholder());
    }

    #[test]
    fn test_fresh_id_per_reference() {
        let paper = Paper::new("p1", "A Study", vec!["Smith, J.".into()], "2020");
        let a = Reference::from_paper(&paper);
        let b = Reference::from_paper(&paper);
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, paper.id);
    }

    #[test]
    fn test_authors_overlap_initial_order() {
        let left = vec!["J. Smith".to_string()];
        let right = vec!["Smith, J.".to_string()];
        assert!(Reference::authors_overlap(&left, &right));
    }

    #[test]
    fn test_authors_overlap_substring() {
        // Containment merges "Lee" into "Leeman" by construction.
        let left = vec!["Lee".to_string()];
        let right = vec!["Leeman".to_string()];
        assert!(Reference::authors_overlap(&left, &right));
    }

    #[test]
    fn test_authors_no_overlap() {
        let left = vec!["Garcia, M.".to_string()];
        let right = vec!["Smith, J.".to_string()];
        assert!(!Reference::authors_overlap(&left, &right));
    }

    #[test]
    fn test_matches_author_fragment() {
        let paper = Paper::new("p1", "A Study", vec!["Smith, J.".into(), "Garcia, M.".into()], "2020");
        let reference = Reference::from_paper(&paper);
        assert!(reference.matches_author_fragment("Smith"));
        assert!(reference.matches_author_fragment("garcia"));
        assert!(!reference.matches_author_fragment("Doe"));
    }

    #[test]
    fn test_format_apa() {
        let mut reference = Reference::from_paper(&Paper::new(
            "p1",
            "Deep Learning for Citations",
            vec!["Smith, J.".into(), "Garcia, M.".into()],
            "2021",
        ));
        reference.journal = Some("Nature".to_string());
        reference.doi = Some("10.1000/xyz".to_string());
        assert_eq!(
            reference.format_apa(),
            "Smith, J., Garcia, M. (2021). Deep Learning for Citations. *Nature*. https://doi.org/10.1000/xyz"
        );
    }
}
