//! Scribe Common Library
//!
//! Shared code for the Scribe services including:
//! - Domain models (papers, references, mentions, section trees, jobs)
//! - Report store abstraction and in-memory implementation
//! - LLM completion client
//! - Paper-set collaborators
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod papers;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::CompletionClient;
pub use papers::PaperSource;
pub use store::ReportStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
