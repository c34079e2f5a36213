//! Scribe Report Pipeline
//!
//! The report generation pipeline, from user text to a citable document:
//! - Mention parsing (`@type:id` tokens in the request text)
//! - Paper corpus resolution against external paper sources
//! - Outline/structure building (template, heading scan, or fallback)
//! - Per-section content generation with bounded continuation
//! - Citation reconciliation and placeholder synthesis
//! - LaTeX/BibTeX document assembly
//! - Job orchestration with incremental persistence and progress events
//!
//! Data flows strictly forward: mentions -> corpus -> structure ->
//! per-node content -> reconciled references -> assembled document,
//! all driven by the [`orchestrator::ReportOrchestrator`].

pub mod assembler;
pub mod citations;
pub mod corpus;
pub mod generator;
pub mod mentions;
pub mod orchestrator;
pub mod outline;

// Re-export the pipeline entry points
pub use assembler::{assemble, unique_references, AssembledDocument};
pub use citations::reconcile;
pub use corpus::resolve_corpus;
pub use generator::{GeneratedSection, SectionGenerator};
pub use mentions::{parse_mentions, strip_mentions};
pub use orchestrator::ReportOrchestrator;
pub use outline::{outline_from_response, template_tree, tree_from_headings};
