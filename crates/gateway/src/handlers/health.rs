//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub completion: CheckResult,
    pub paper_source: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - reports on configured collaborators
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let completion = if state.config.llm.api_key.is_none() {
        CheckResult {
            status: "degraded".to_string(),
            detail: Some("no completion API key configured".to_string()),
        }
    } else {
        CheckResult {
            status: "up".to_string(),
            detail: None,
        }
    };

    let paper_source = CheckResult {
        status: "up".to_string(),
        detail: Some(state.config.paper_source.base_url.clone()),
    };

    let all_up = completion.status == "up";

    Json(ReadyResponse {
        status: if all_up { "ready" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            completion,
            paper_source,
        },
    })
}
