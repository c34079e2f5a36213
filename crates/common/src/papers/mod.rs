//! Paper-set collaborators
//!
//! Thin glue over the reference-manager REST API: fetch the concrete paper
//! records behind a saved search or an uploaded PDF batch. Resolution
//! failure handling (fail-open to an empty list) lives in the corpus
//! resolver, not here.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::PaperSourceConfig;
use crate::errors::{AppError, Result};
use crate::models::Paper;

/// Paper-set collaborator contract
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Papers attached to a saved search
    async fn papers_for_search(&self, search_id: &str) -> Result<Vec<Paper>>;

    /// Papers attached to an uploaded PDF batch
    async fn papers_for_batch(&self, batch_id: &str) -> Result<Vec<Paper>>;
}

/// HTTP-backed paper source
pub struct HttpPaperSource {
    config: PaperSourceConfig,
    client: reqwest::Client,
}

impl HttpPaperSource {
    pub fn new(config: PaperSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { config, client })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Paper>> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| AppError::PaperSource {
            message: format!("Paper source request failed: {}", e),
        })?;

        if !response.status().is_success() {
            return Err(AppError::PaperSource {
                message: format!("Paper source returned {} for {}", response.status(), url),
            });
        }

        response.json().await.map_err(|e| AppError::PaperSource {
            message: format!("Failed to parse paper source response: {}", e),
        })
    }
}

#[async_trait]
impl PaperSource for HttpPaperSource {
    async fn papers_for_search(&self, search_id: &str) -> Result<Vec<Paper>> {
        self.fetch(&format!("/searches/{}/papers", search_id)).await
    }

    async fn papers_for_batch(&self, batch_id: &str) -> Result<Vec<Paper>> {
        self.fetch(&format!("/batches/{}/papers", batch_id)).await
    }
}
