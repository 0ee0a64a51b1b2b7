//! SynthesisTalk API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Chat turns with optional web search, documents and multi-step reasoning
//! - Document upload and conversation management
//! - Summaries, visualizations and cache maintenance
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use synthesis_common::{
    cache::SearchCache,
    config::{AppConfig, ObservabilityConfig},
    context::ResearchAssistant,
    insights::InsightService,
    llm::create_llm,
    metrics,
    search::{create_search_provider, SearchService},
    store::{InMemoryConversationRepository, InMemoryDocumentRepository},
    LlmProvider, WebSearchProvider,
};
use synthesis_ingestion::DocumentProcessor;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Slack on top of the upload limit for multipart framing
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub assistant: Arc<ResearchAssistant>,
    pub insights: InsightService,
    pub processor: Arc<DocumentProcessor>,
}

impl AppState {
    /// Wire the pipeline, stores and services around the given providers
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
        search_provider: Option<Arc<dyn WebSearchProvider>>,
    ) -> Self {
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let cache = Arc::new(SearchCache::new(config.cache_max_age()));

        let assistant = ResearchAssistant::new(
            &config,
            llm.clone(),
            SearchService::new(search_provider, cache),
            conversations.clone(),
            documents.clone(),
        );
        let insights = InsightService::new(llm, config.llm.model.clone(), conversations);
        let processor = DocumentProcessor::new(&config.documents, documents);

        Self {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
            insights,
            processor: Arc::new(processor),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting SynthesisTalk API Gateway v{}",
        synthesis_common::VERSION
    );

    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // A missing LLM credential is fatal
    let llm = create_llm(&config.llm).map_err(|e| {
        error!(error = %e, "Failed to initialise LLM provider");
        e
    })?;
    info!(provider = llm.name(), model = %config.llm.model, "LLM provider ready");

    // A missing search credential only disables search
    let search_provider = match create_search_provider(&config.search) {
        Ok(Some(provider)) => {
            info!(provider = provider.name(), "Web search enabled");
            Some(provider)
        }
        // Already logged by the factory
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Web search provider unavailable, search disabled");
            None
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let shutdown_timeout = config.shutdown_timeout();

    let state = AppState::new(config, llm, search_provider);
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (stopping_tx, mut stopping_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stopping_tx.send(true);
    });

    // Open connections get `shutdown_timeout` to drain
    let drain_deadline = async move {
        let _ = stopping_rx.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline => warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialise the tracing subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on their own port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("call_duration_seconds".to_string()),
            metrics::PROVIDER_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_search_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::PROVIDER_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = DefaultBodyLimit::max(state.config.documents.max_upload_bytes + MULTIPART_OVERHEAD);
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Chat
        .route("/llm", post(handlers::chat::chat))
        .route("/llm/batch", post(handlers::chat::batch))

        // Web search and its cache
        .route("/search", post(handlers::search::search))
        .route("/cache/search", delete(handlers::search::clear_cache))
        .route("/cache/stats", get(handlers::search::cache_stats))

        // Documents
        .route(
            "/documents",
            post(handlers::documents::upload_document).get(handlers::documents::list_documents),
        )
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )

        // Conversations
        .route(
            "/conversations",
            get(handlers::conversations::list_conversations)
                .post(handlers::conversations::create_conversation)
                .delete(handlers::conversations::clear_conversations),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversations::get_conversation)
                .put(handlers::conversations::update_title)
                .delete(handlers::conversations::delete_conversation),
        )
        .route("/conversations/state/{id}", get(handlers::conversations::conversation_state))
        .route("/conversations/{id}/auto-title", post(handlers::conversations::auto_title))
        .route("/conversations/{id}/export", get(handlers::conversations::export_conversation))

        // Insights
        .route("/summaries", post(handlers::insights::generate_summary))
        .route("/summaries/formats", get(handlers::insights::summary_formats))
        .route("/visualizations", post(handlers::insights::generate_visualization))
        .route("/visualizations/types", get(handlers::insights::visualization_types));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(body_limit)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
