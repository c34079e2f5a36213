//! Inline mention tokens referencing prior searches, PDF batches, or Zotero libraries

use serde::{Deserialize, Serialize};

/// The kind of resource a mention points at.
///
/// Unrecognized kind strings are accepted syntactically and carried as
/// [`MentionKind::Other`]; they resolve to zero papers downstream rather
/// than failing the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionKind {
    Search,
    PdfBatch,
    Zotero,
    Other(String),
}

impl MentionKind {
    pub fn from_token(token: &str) -> Self {
        match token {
            "search" => MentionKind::Search,
            "pdf_batch" => MentionKind::PdfBatch,
            "zotero" => MentionKind::Zotero,
            other => MentionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MentionKind::Search => "search",
            MentionKind::PdfBatch => "pdf_batch",
            MentionKind::Zotero => "zotero",
            MentionKind::Other(s) => s,
        }
    }
}

/// A parsed `@kind:id` token from free-form user text.
///
/// Ephemeral per generation request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// The captured resource id (alphanumeric and hyphens)
    pub id: String,

    /// The full matched token, e.g. `@search:abc-123`
    pub display: String,

    /// Resource kind
    pub kind: MentionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(MentionKind::from_token("search"), MentionKind::Search);
        assert_eq!(MentionKind::from_token("pdf_batch"), MentionKind::PdfBatch);
        assert_eq!(MentionKind::from_token("zotero"), MentionKind::Zotero);
        assert_eq!(
            MentionKind::from_token("library"),
            MentionKind::Other("library".to_string())
        );
        assert_eq!(MentionKind::from_token("library").as_str(), "library");
    }
}
