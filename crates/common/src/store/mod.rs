//! Report job store
//!
//! A key-value record store for report jobs with incremental, append-only
//! section rows and a subscribable event channel per job. The trait keeps
//! the orchestrator and gateway decoupled from the backing storage; the
//! in-memory implementation backs both the service default and the tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{
    ReportEvent, ReportJob, ReportSection, ReportStatus, SectionProgress, SectionTree,
};

/// Buffered events per job subscription channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Job store collaborator contract
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create a job in `Generating` status and return its id
    async fn create_report(
        &self,
        search_query: &str,
        structure: SectionTree,
        user_id: &str,
    ) -> Result<Uuid>;

    async fn get_report(&self, id: Uuid) -> Result<Option<ReportJob>>;

    /// Update the job status and publish a status-change event
    async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<()>;

    /// Replace the stored structure snapshot
    async fn update_structure(&self, id: Uuid, structure: SectionTree) -> Result<()>;

    /// Append one completed section row; rows are written once, never updated
    async fn append_section(&self, report_id: Uuid, section_name: &str, content: &str)
        -> Result<Uuid>;

    /// Section rows persisted so far, in insertion order
    async fn sections(&self, report_id: Uuid) -> Result<Vec<ReportSection>>;

    /// Publish a per-section progress event to subscribers
    async fn publish_progress(&self, report_id: Uuid, progress: SectionProgress) -> Result<()>;

    /// Subscribe to status changes and section progress for a job
    async fn subscribe(&self, report_id: Uuid) -> Result<broadcast::Receiver<ReportEvent>>;
}

struct JobEntry {
    job: ReportJob,
    sections: Vec<ReportSection>,
    events: broadcast::Sender<ReportEvent>,
}

/// In-memory report store
#[derive(Default)]
pub struct InMemoryReportStore {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn create_report(
        &self,
        search_query: &str,
        structure: SectionTree,
        user_id: &str,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let job = ReportJob {
            id,
            status: ReportStatus::Generating,
            search_query: search_query.to_string(),
            structure,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            completed_at: None,
        };
        self.jobs.write().await.insert(
            id,
            JobEntry {
                job,
                sections: Vec::new(),
                events,
            },
        );
        metrics::counter!("scribe_reports_created_total").increment(1);
        Ok(id)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<ReportJob>> {
        Ok(self.jobs.read().await.get(&id).map(|entry| entry.job.clone()))
    }

    async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&id).ok_or_else(|| AppError::ReportNotFound {
            id: id.to_string(),
        })?;
        entry.job.status = status;
        if status.is_terminal() {
            entry.job.completed_at = Some(Utc::now());
        }
        // Subscribers may have gone away; a send failure is not an error
        let _ = entry.events.send(ReportEvent::StatusChanged { status });
        Ok(())
    }

    async fn update_structure(&self, id: Uuid, structure: SectionTree) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&id).ok_or_else(|| AppError::ReportNotFound {
            id: id.to_string(),
        })?;
        entry.job.structure = structure;
        Ok(())
    }

    async fn append_section(
        &self,
        report_id: Uuid,
        section_name: &str,
        content: &str,
    ) -> Result<Uuid> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .get_mut(&report_id)
            .ok_or_else(|| AppError::ReportNotFound {
                id: report_id.to_string(),
            })?;
        let section = ReportSection {
            id: Uuid::new_v4(),
            report_id,
            section_name: section_name.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let id = section.id;
        entry.sections.push(section);
        metrics::counter!("scribe_sections_persisted_total").increment(1);
        Ok(id)
    }

    async fn sections(&self, report_id: Uuid) -> Result<Vec<ReportSection>> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&report_id).ok_or_else(|| AppError::ReportNotFound {
            id: report_id.to_string(),
        })?;
        Ok(entry.sections.clone())
    }

    async fn publish_progress(&self, report_id: Uuid, progress: SectionProgress) -> Result<()> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&report_id).ok_or_else(|| AppError::ReportNotFound {
            id: report_id.to_string(),
        })?;
        let _ = entry.events.send(ReportEvent::SectionProgress(progress));
        Ok(())
    }

    async fn subscribe(&self, report_id: Uuid) -> Result<broadcast::Receiver<ReportEvent>> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&report_id).ok_or_else(|| AppError::ReportNotFound {
            id: report_id.to_string(),
        })?;
        Ok(entry.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionStatus;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryReportStore::new();
        let id = store
            .create_report("@search:abc", SectionTree::new(), "user-1")
            .await
            .unwrap();
        let job = store.get_report(id).await.unwrap().unwrap();
        assert_eq!(job.status, ReportStatus::Generating);
        assert_eq!(job.search_query, "@search:abc");
        assert!(job.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_status_transition_publishes_event() {
        let store = InMemoryReportStore::new();
        let id = store
            .create_report("q", SectionTree::new(), "user-1")
            .await
            .unwrap();
        let mut rx = store.subscribe(id).await.unwrap();

        store.set_status(id, ReportStatus::Completed).await.unwrap();

        match rx.recv().await.unwrap() {
            ReportEvent::StatusChanged { status } => assert_eq!(status, ReportStatus::Completed),
            other => panic!("unexpected event: {:?}", other),
        }
        let job = store.get_report(id).await.unwrap().unwrap();
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_sections_append_in_order() {
        let store = InMemoryReportStore::new();
        let id = store
            .create_report("q", SectionTree::new(), "user-1")
            .await
            .unwrap();
        store.append_section(id, "Introduction", "intro text").await.unwrap();
        store.append_section(id, "Methods", "methods text").await.unwrap();

        let sections = store.sections(id).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_name, "Introduction");
        assert_eq!(sections[1].section_name, "Methods");
    }

    #[tokio::test]
    async fn test_progress_events_reach_subscriber() {
        let store = InMemoryReportStore::new();
        let id = store
            .create_report("q", SectionTree::new(), "user-1")
            .await
            .unwrap();
        let mut rx = store.subscribe(id).await.unwrap();

        store
            .publish_progress(
                id,
                SectionProgress {
                    section: "Results".to_string(),
                    status: SectionStatus::Generating,
                    content: None,
                },
            )
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ReportEvent::SectionProgress(progress) => {
                assert_eq!(progress.section, "Results");
                assert_eq!(progress.status, SectionStatus::Generating);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_report() {
        let store = InMemoryReportStore::new();
        assert!(store.get_report(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.sections(Uuid::new_v4()).await.is_err());
    }
}
