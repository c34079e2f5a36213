//! Paper corpus resolution
//!
//! Turns parsed mentions into the flattened, ordered corpus of papers that
//! grounds a generation run. Resolution fails open: a collaborator error
//! for one mention contributes an empty list and the remaining mentions
//! still resolve.

use scribe_common::models::{Mention, MentionKind, Paper};
use scribe_common::papers::PaperSource;
use tracing::{debug, warn};

/// Resolve mentions into the generation corpus.
///
/// Results are concatenated preserving mention order, with no deduplication
/// across mentions: a paper appearing in two mentioned sets appears twice
/// (accepted limitation). Zotero mentions are parsed upstream but never
/// resolved to papers here (known gap, kept as-is); unknown kinds resolve
/// to zero papers.
pub async fn resolve_corpus(source: &dyn PaperSource, mentions: &[Mention]) -> Vec<Paper> {
    let mut corpus = Vec::new();

    for mention in mentions {
        let resolved = match &mention.kind {
            MentionKind::Search => source.papers_for_search(&mention.id).await,
            MentionKind::PdfBatch => source.papers_for_batch(&mention.id).await,
            MentionKind::Zotero => {
                debug!(mention = %mention.display, "Zotero mentions are not resolved during generation");
                Ok(Vec::new())
            }
            MentionKind::Other(kind) => {
                debug!(mention = %mention.display, kind = %kind, "Unknown mention kind resolves to no papers");
                Ok(Vec::new())
            }
        };

        match resolved {
            Ok(papers) => {
                metrics::counter!("scribe_corpus_papers_resolved_total")
                    .increment(papers.len() as u64);
                corpus.extend(papers);
            }
            Err(error) => {
                // Fail open: this mention contributes nothing
                metrics::counter!("scribe_corpus_resolution_failures_total").increment(1);
                warn!(
                    mention = %mention.display,
                    error = %error,
                    "Failed to resolve mention; continuing with empty contribution"
                );
            }
        }
    }

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mentions::parse_mentions;
    use async_trait::async_trait;
    use scribe_common::errors::{AppError, Result};

    struct FixturePaperSource {
        fail_search_ids: Vec<String>,
    }

    #[async_trait]
    impl PaperSource for FixturePaperSource {
        async fn papers_for_search(&self, search_id: &str) -> Result<Vec<Paper>> {
            if self.fail_search_ids.iter().any(|id| id == search_id) {
                return Err(AppError::PaperSource {
                    message: "search backend unavailable".to_string(),
                });
            }
            Ok(vec![Paper::new(
                format!("paper-{}", search_id),
                format!("Paper from {}", search_id),
                vec!["Smith, J.".to_string()],
                "2020",
            )])
        }

        async fn papers_for_batch(&self, batch_id: &str) -> Result<Vec<Paper>> {
            Ok(vec![Paper::new(
                format!("pdf-{}", batch_id),
                format!("PDF from {}", batch_id),
                vec!["Garcia, M.".to_string()],
                "2021",
            )])
        }
    }

    #[tokio::test]
    async fn test_resolution_preserves_mention_order() {
        let source = FixturePaperSource {
            fail_search_ids: Vec::new(),
        };
        let mentions = parse_mentions("@pdf_batch:b1 then @search:s1");
        let corpus = resolve_corpus(&source, &mentions).await;
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].id, "pdf-b1");
        assert_eq!(corpus[1].id, "paper-s1");
    }

    #[tokio::test]
    async fn test_failing_collaborator_fails_open() {
        let source = FixturePaperSource {
            fail_search_ids: vec!["bad".to_string()],
        };
        let mentions = parse_mentions("@search:bad @search:good");
        let corpus = resolve_corpus(&source, &mentions).await;
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].id, "paper-good");
    }

    #[tokio::test]
    async fn test_zotero_and_unknown_kinds_resolve_empty() {
        let source = FixturePaperSource {
            fail_search_ids: Vec::new(),
        };
        let mentions = parse_mentions("@zotero:lib1 @library:x1");
        let corpus = resolve_corpus(&source, &mentions).await;
        assert!(corpus.is_empty());
    }

    #[tokio::test]
    async fn test_no_cross_mention_deduplication() {
        let source = FixturePaperSource {
            fail_search_ids: Vec::new(),
        };
        let mentions = parse_mentions("@search:s1 @search:s1");
        let corpus = resolve_corpus(&source, &mentions).await;
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].id, corpus[1].id);
    }
}
