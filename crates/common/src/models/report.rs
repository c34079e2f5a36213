//! Report job and section records persisted through the report store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SectionTree;

/// Report job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Generating,
    Processing,
    Completed,
    Error,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Generating => "generating",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Error => "error",
        }
    }
}

/// A persisted report generation job.
///
/// Status is set once at creation and updated at most twice afterward
/// (processing start, terminal state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJob {
    pub id: Uuid,

    pub status: ReportStatus,

    /// The mention-bearing query the report was requested from
    pub search_query: String,

    /// Snapshot of the section tree
    pub structure: SectionTree,

    pub user_id: String,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One persisted row per completed tree node, written incrementally as the
/// orchestrator finishes each section; this backs the live-updating view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub id: Uuid,
    pub report_id: Uuid,
    pub section_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Per-section progress status emitted while a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

/// A progress update for one section of a running job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section: String,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Events published on a job's subscription channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    StatusChanged { status: ReportStatus },
    SectionProgress(SectionProgress),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(ReportStatus::Completed.is_terminal());
        assert!(ReportStatus::Error.is_terminal());
        assert!(!ReportStatus::Generating.is_terminal());
        assert!(!ReportStatus::Processing.is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = ReportEvent::SectionProgress(SectionProgress {
            section: "Introduction".to_string(),
            status: SectionStatus::Completed,
            content: Some("text".to_string()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "section_progress");
        assert_eq!(json["status"], "completed");
    }
}
