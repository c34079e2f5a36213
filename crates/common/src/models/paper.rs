//! Resolved paper records from the reference-manager collaborators

use serde::{Deserialize, Serialize};

/// A paper record resolved for a generation run.
///
/// Sourced externally and immutable once resolved; the pipeline never
/// mutates papers, only derives [`super::Reference`] entries from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,

    pub title: String,

    /// Ordered author list as supplied by the source
    pub authors: Vec<String>,

    pub year: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    /// Derived field extracted at import time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_question: Option<String>,

    /// Derived field extracted at import time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_findings: Option<String>,

    /// Derived field extracted at import time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

impl Paper {
    /// Minimal constructor used mostly by tests and fixtures
    pub fn new(id: impl Into<String>, title: impl Into<String>, authors: Vec<String>, year: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors,
            year: year.into(),
            abstract_text: None,
            doi: None,
            journal: None,
            research_question: None,
            major_findings: None,
            suggestions: None,
        }
    }
}
