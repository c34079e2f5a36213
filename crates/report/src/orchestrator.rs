//! Report generation orchestration
//!
//! Drives one report job end to end: walks the structure tree in document
//! order, generates and reconciles each section, persists section rows
//! incrementally, and publishes progress events along the way. A failed
//! section is tolerated (Error event, job continues); only errors escaping
//! the top-level loop, such as a store failure, fail the job.

use std::sync::Arc;
use std::time::Instant;

use scribe_common::config::GenerationConfig;
use scribe_common::errors::{AppError, Result};
use scribe_common::llm::CompletionClient;
use scribe_common::models::{Paper, ReportStatus, SectionProgress, SectionStatus, SectionTree};
use scribe_common::store::ReportStore;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::assembler;
use crate::citations;
use crate::generator::SectionGenerator;

/// Name of the final pseudo-section carrying the deduplicated bibliography
pub const REFERENCES_SECTION: &str = "References";

/// Runs report jobs against a store, a completion client, and a
/// generation config threaded in per job
pub struct ReportOrchestrator {
    store: Arc<dyn ReportStore>,
    client: Arc<dyn CompletionClient>,
    config: GenerationConfig,
}

impl ReportOrchestrator {
    pub fn new(
        store: Arc<dyn ReportStore>,
        client: Arc<dyn CompletionClient>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Run one job to a terminal status. Never returns an error: failures
    /// are recorded on the job itself.
    #[instrument(skip(self, corpus), fields(report_id = %report_id))]
    pub async fn run(&self, report_id: Uuid, corpus: Vec<Paper>) {
        let started = Instant::now();
        match self.run_inner(report_id, &corpus).await {
            Ok(()) => {
                metrics::counter!("scribe_reports_completed_total").increment(1);
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "Report completed");
            }
            Err(err) => {
                metrics::counter!("scribe_reports_failed_total").increment(1);
                error!(error = %err, "Report failed");
                if let Err(status_err) = self.store.set_status(report_id, ReportStatus::Error).await
                {
                    error!(error = %status_err, "Failed to record error status");
                }
            }
        }
        metrics::histogram!("scribe_report_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    async fn run_inner(&self, report_id: Uuid, corpus: &[Paper]) -> Result<()> {
        let job = self
            .store
            .get_report(report_id)
            .await?
            .ok_or_else(|| AppError::ReportNotFound {
                id: report_id.to_string(),
            })?;

        self.store.set_status(report_id, ReportStatus::Processing).await?;

        let mut tree = job.structure;
        let generator = SectionGenerator::new(self.client.as_ref(), &self.config);

        for node_id in tree.document_order() {
            let (title, parent_title) = match section_titles(&tree, node_id) {
                Some(titles) => titles,
                None => continue,
            };

            self.store
                .publish_progress(
                    report_id,
                    SectionProgress {
                        section: title.clone(),
                        status: SectionStatus::Generating,
                        content: None,
                    },
                )
                .await?;

            match generator.generate(&title, parent_title.as_deref(), corpus).await {
                Ok(generated) => {
                    let references =
                        citations::reconcile(&generated.content, &generated.references_block);
                    tree.populate(node_id, generated.content.clone(), references);

                    self.store
                        .append_section(report_id, &title, &generated.content)
                        .await?;
                    self.store
                        .publish_progress(
                            report_id,
                            SectionProgress {
                                section: title.clone(),
                                status: SectionStatus::Completed,
                                content: Some(generated.content),
                            },
                        )
                        .await?;
                    metrics::counter!("scribe_sections_generated_total").increment(1);
                }
                Err(err) => {
                    warn!(section = %title, error = %err, "Section generation failed, continuing");
                    metrics::counter!("scribe_sections_failed_total").increment(1);
                    self.store
                        .publish_progress(
                            report_id,
                            SectionProgress {
                                section: title,
                                status: SectionStatus::Error,
                                content: None,
                            },
                        )
                        .await?;
                }
            }
        }

        self.persist_bibliography(report_id, &tree).await?;

        self.store.update_structure(report_id, tree).await?;
        self.store.set_status(report_id, ReportStatus::Completed).await?;
        Ok(())
    }

    /// Append the deduplicated bibliography as a final pseudo-section,
    /// even when no references were collected. Its persistence failure is
    /// reported as a section error but does not fail the job.
    async fn persist_bibliography(&self, report_id: Uuid, tree: &SectionTree) -> Result<()> {
        let unique = assembler::unique_references(tree);
        let content = unique
            .iter()
            .map(|reference| format!("<p>{}</p>", reference.format_apa()))
            .collect::<Vec<_>>()
            .join("\n");

        match self
            .store
            .append_section(report_id, REFERENCES_SECTION, &content)
            .await
        {
            Ok(_) => {
                self.store
                    .publish_progress(
                        report_id,
                        SectionProgress {
                            section: REFERENCES_SECTION.to_string(),
                            status: SectionStatus::Completed,
                            content: Some(content),
                        },
                    )
                    .await?;
            }
            Err(err) => {
                warn!(error = %err, "Bibliography persistence failed, continuing");
                self.store
                    .publish_progress(
                        report_id,
                        SectionProgress {
                            section: REFERENCES_SECTION.to_string(),
                            status: SectionStatus::Error,
                            content: None,
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// Title of a node plus its parent's title when the parent is a real
/// section (the synthetic root never names a section)
fn section_titles(tree: &SectionTree, node_id: Uuid) -> Option<(String, Option<String>)> {
    let node = tree.get(node_id)?;
    let parent_title = node
        .parent_id
        .filter(|parent_id| *parent_id != tree.root)
        .and_then(|parent_id| tree.get(parent_id))
        .map(|parent| parent.title.clone());
    Some((node.title.clone(), parent_title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scribe_common::store::InMemoryReportStore;

    /// Completion mock that fails for any prompt naming a poisoned
    /// section and otherwise returns concluded prose with references
    struct SelectiveClient {
        poisoned_section: Option<String>,
    }

    #[async_trait]
    impl CompletionClient for SelectiveClient {
        async fn complete(&self, prompt: &str) -> scribe_common::errors::Result<String> {
            if let Some(poisoned) = &self.poisoned_section {
                if prompt.contains(poisoned.as_str()) {
                    return Err(AppError::Completion {
                        message: "provider unavailable".to_string(),
                    });
                }
            }
            Ok("Findings hold (Smith, 2020). Therefore, the claim stands.\nREFERENCES:\nSmith, J. (2020). A Study of Things. *Nature*.".to_string())
        }
    }

    fn three_sibling_tree() -> SectionTree {
        let mut tree = SectionTree::new();
        let root = tree.root;
        tree.add_child(root, "Alpha").unwrap();
        tree.add_child(root, "Beta").unwrap();
        tree.add_child(root, "Gamma").unwrap();
        tree
    }

    async fn run_job(
        poisoned_section: Option<&str>,
    ) -> (Arc<InMemoryReportStore>, Uuid) {
        let store = Arc::new(InMemoryReportStore::new());
        let client = Arc::new(SelectiveClient {
            poisoned_section: poisoned_section.map(String::from),
        });
        let report_id = store
            .create_report("@search:abc", three_sibling_tree(), "user-1")
            .await
            .unwrap();

        let orchestrator = ReportOrchestrator::new(
            store.clone(),
            client,
            GenerationConfig::default(),
        );
        orchestrator.run(report_id, vec![]).await;
        (store, report_id)
    }

    #[tokio::test]
    async fn test_all_sections_persisted_and_completed() {
        let (store, report_id) = run_job(None).await;

        let sections = store.sections(report_id).await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.section_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma", REFERENCES_SECTION]);

        let job = store.get_report(report_id).await.unwrap().unwrap();
        assert_eq!(job.status, ReportStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_section_tolerated() {
        let (store, report_id) = run_job(Some("Beta")).await;

        let sections = store.sections(report_id).await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.section_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma", REFERENCES_SECTION]);

        let job = store.get_report(report_id).await.unwrap().unwrap();
        assert_eq!(job.status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_references_row_persisted_when_every_section_fails() {
        // "academic report" appears in every prompt, so no section
        // generates; the References pseudo-section is still written
        let (store, report_id) = run_job(Some("academic report")).await;

        let sections = store.sections(report_id).await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.section_name.as_str()).collect();
        assert_eq!(names, vec![REFERENCES_SECTION]);
        assert!(sections[0].content.is_empty());

        let job = store.get_report(report_id).await.unwrap().unwrap();
        assert_eq!(job.status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_bibliography_deduplicates_across_sections() {
        // Every section cites the same paper; the References row carries
        // one entry
        let (store, report_id) = run_job(None).await;

        let sections = store.sections(report_id).await.unwrap();
        let bibliography = sections
            .iter()
            .find(|s| s.section_name == REFERENCES_SECTION)
            .unwrap();
        assert_eq!(bibliography.content.matches("A Study of Things").count(), 1);
    }

    #[tokio::test]
    async fn test_structure_snapshot_updated_with_content() {
        let (store, report_id) = run_job(None).await;

        let job = store.get_report(report_id).await.unwrap().unwrap();
        let populated = job
            .structure
            .document_order()
            .into_iter()
            .filter_map(|id| job.structure.get(id))
            .filter(|node| node.content.is_some())
            .count();
        assert_eq!(populated, 3);
    }

    #[tokio::test]
    async fn test_missing_report_records_error_without_panic() {
        let store = Arc::new(InMemoryReportStore::new());
        let client = Arc::new(SelectiveClient {
            poisoned_section: None,
        });
        let orchestrator =
            ReportOrchestrator::new(store, client, GenerationConfig::default());
        orchestrator.run(Uuid::new_v4(), vec![]).await;
    }
}
