//! Report job handlers

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::outline::{tree_to_nodes, OutlineNode};
use crate::AppState;
use scribe_common::{
    errors::{AppError, Result},
    models::ReportStatus,
};
use scribe_report::{assembler, mentions, outline, resolve_corpus, ReportOrchestrator};

/// Request to start a report generation job
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    /// Request text carrying `@type:id` mention tokens
    #[validate(length(min = 1, max = 20000))]
    pub text: String,

    /// Optional heading-marked outline; the standard template is used
    /// when absent
    #[serde(default)]
    pub outline: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,
}

/// Response after starting a job
#[derive(Serialize)]
pub struct CreateReportResponse {
    pub report_id: Uuid,
    pub status: String,
    pub paper_count: usize,
    pub poll_url: String,
}

/// Job status response
#[derive(Serialize)]
pub struct ReportResponse {
    pub report_id: Uuid,
    pub status: String,
    pub search_query: String,
    pub structure: Vec<OutlineNode>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Serialize)]
pub struct SectionResponse {
    pub id: Uuid,
    pub section_name: String,
    pub content: String,
    pub created_at: String,
}

/// Export response carrying the assembled document
#[derive(Serialize)]
pub struct ExportResponse {
    pub latex: String,
    pub bibtex: String,
}

/// Start a report generation job and return immediately
pub async fn create_report(
    State(state): State<AppState>,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<CreateReportResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let parsed = mentions::parse_mentions(&request.text);
    let corpus = resolve_corpus(state.papers.as_ref(), &parsed).await;
    let paper_count = corpus.len();

    let structure = match request.outline.as_deref() {
        Some(text) if !text.trim().is_empty() => outline::tree_from_headings(text),
        _ => outline::template_tree(),
    };

    let user_id = request.user_id.as_deref().unwrap_or("anonymous");
    let report_id = state
        .store
        .create_report(&request.text, structure, user_id)
        .await?;

    tracing::info!(
        report_id = %report_id,
        mentions = parsed.len(),
        papers = corpus.len(),
        "Report job created"
    );

    let orchestrator = ReportOrchestrator::new(
        state.store.clone(),
        state.completion.clone(),
        state.config.generation.clone(),
    );
    tokio::spawn(async move {
        orchestrator.run(report_id, corpus).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateReportResponse {
            report_id,
            status: ReportStatus::Generating.as_str().to_string(),
            paper_count,
            poll_url: format!("/v1/reports/{}", report_id),
        }),
    ))
}

/// Get job status and the current structure snapshot
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportResponse>> {
    let job = state
        .store
        .get_report(report_id)
        .await?
        .ok_or_else(|| AppError::ReportNotFound {
            id: report_id.to_string(),
        })?;

    Ok(Json(ReportResponse {
        report_id: job.id,
        status: job.status.as_str().to_string(),
        search_query: job.search_query,
        structure: tree_to_nodes(&job.structure),
        created_at: job.created_at.to_rfc3339(),
        completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
    }))
}

/// Section rows persisted so far, in completion order
pub async fn get_sections(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Vec<SectionResponse>>> {
    let sections = state.store.sections(report_id).await?;
    Ok(Json(
        sections
            .into_iter()
            .map(|section| SectionResponse {
                id: section.id,
                section_name: section.section_name,
                content: section.content,
                created_at: section.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}

/// Stream status changes and section progress as server-sent events
pub async fn report_events(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let receiver = state.store.subscribe(report_id).await?;

    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse_event) => return Some((Ok(sse_event), receiver)),
                    Err(_) => continue,
                },
                // A slow consumer skips missed events rather than erroring
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Export the completed report as LaTeX plus a BibTeX database
pub async fn export_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ExportResponse>> {
    let job = state
        .store
        .get_report(report_id)
        .await?
        .ok_or_else(|| AppError::ReportNotFound {
            id: report_id.to_string(),
        })?;

    if job.status != ReportStatus::Completed {
        return Err(AppError::Validation {
            message: format!("report is not completed (status: {})", job.status.as_str()),
            field: None,
        });
    }

    // Mention tokens are request plumbing, not display copy
    let mut title = mentions::strip_mentions(&job.search_query);
    if title.is_empty() {
        title = "Research Report".to_string();
    }

    let assembled = assembler::assemble(&job.structure, &title);
    Ok(Json(ExportResponse {
        latex: assembled.latex,
        bibtex: assembled.bibtex,
    }))
}
