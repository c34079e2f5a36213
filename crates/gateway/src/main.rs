//! Scribe API Gateway
//!
//! Entry point for all external report-generation requests.
//! Handles:
//! - Outline previews and report job creation
//! - Job status, section, and event streaming endpoints
//! - LaTeX/BibTeX export of completed reports
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use scribe_common::{
    config::AppConfig,
    llm::HttpCompletionClient,
    metrics,
    papers::HttpPaperSource,
    store::{InMemoryReportStore, ReportStore},
    CompletionClient, PaperSource,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ReportStore>,
    pub completion: Arc<dyn CompletionClient>,
    pub papers: Arc<dyn PaperSource>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Scribe API Gateway v{}", scribe_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;

    // Wire up collaborators
    let store: Arc<dyn ReportStore> = Arc::new(InMemoryReportStore::new());
    let completion: Arc<dyn CompletionClient> =
        Arc::new(HttpCompletionClient::new(config.llm.clone())?);
    let papers: Arc<dyn PaperSource> = Arc::new(HttpPaperSource::new(config.paper_source.clone())?);

    let state = AppState {
        config: config.clone(),
        store,
        completion,
        papers,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Outline preview
        .route("/outline", post(handlers::outline::build_outline))
        // Report endpoints
        .route("/reports", post(handlers::reports::create_report))
        .route("/reports/{id}", get(handlers::reports::get_report))
        .route("/reports/{id}/sections", get(handlers::reports::get_sections))
        .route("/reports/{id}/events", get(handlers::reports::report_events))
        .route("/reports/{id}/export", get(handlers::reports::export_report));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
