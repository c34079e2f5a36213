//! Core domain models shared across Scribe services

pub mod mention;
pub mod paper;
pub mod reference;
pub mod report;
pub mod tree;

pub use mention::{Mention, MentionKind};
pub use paper::Paper;
pub use reference::{Reference, PLACEHOLDER_JOURNAL, PLACEHOLDER_TITLE};
pub use report::{ReportEvent, ReportJob, ReportSection, ReportStatus, SectionProgress, SectionStatus};
pub use tree::{OutlineSection, SectionNode, SectionTree};
