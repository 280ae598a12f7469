mod logging;
mod routes;
mod ws;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use verdict_agent::dictionary::LegalDictionaryClient;
use verdict_core::{config::Config, llm::LlmBackend, pipeline::LoadedClassifier, rooms::RoomHub};

use crate::logging::LogRing;

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub log_tx: broadcast::Sender<String>,
    pub log_ring: LogRing,
    pub llm: Arc<dyn LlmBackend>,
    pub dictionary: LegalDictionaryClient,
    /// `None` when no model is configured; classification requests get 503.
    pub classifier: Option<Arc<LoadedClassifier>>,
    /// Last analysis per session id. Gone on restart.
    pub sessions: Mutex<HashMap<String, Value>>,
    pub rooms: Arc<RoomHub>,
}

pub(crate) fn build_router(state: Arc<AppState>, static_dir: &str) -> Router {
    let serve_dir = ServeDir::new(static_dir).fallback(tower_http::services::ServeFile::new(
        format!("{static_dir}/index.html"),
    ));

    Router::new()
        // Health
        .route("/api/health", get(routes::health))
        // Case analysis
        .route("/api/analyze", post(routes::analyze))
        .route("/api/export", get(routes::export))
        .route("/api/define/:term", get(routes::define))
        // Validity
        .route("/api/validity", post(routes::validity))
        .route("/api/question", post(routes::question))
        .route("/api/flowchart", post(routes::flowchart))
        // Classification
        .route("/api/classify", post(routes::classify))
        // Rooms
        .route("/api/rooms/ws", get(ws::rooms_ws))
        // SSE logs
        .route("/api/logs", get(routes::sse_logs))
        // Static dashboard
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (log_tx, log_ring) = logging::init();

    let config = Config::from_env()?;
    info!(backend = %config.llm_backend, "starting verdict server");

    let classifier = match &config.model_path {
        Some(model_path) => {
            let loaded = LoadedClassifier::load(
                model_path,
                config.vocabulary_path.as_deref(),
                config.lexicon_path.as_deref(),
                config.max_features,
            )
            .with_context(|| format!("loading classifier from {}", model_path.display()))?;
            Some(Arc::new(loaded))
        }
        None => {
            warn!("MODEL_PATH not set; /api/classify is disabled");
            None
        }
    };

    let llm = verdict_agent::backend_from_config(&config)?;
    if config.llm_backend == "perplexity" && config.perplexity_api_key.is_empty() {
        warn!("PERPLEXITY_API_KEY not set; LLM routes will fail");
    }

    let state = Arc::new(AppState {
        log_tx,
        log_ring,
        llm,
        dictionary: LegalDictionaryClient::new(
            &config.legal_dictionary_base_url,
            &config.legal_dictionary_api_key,
            config.llm_timeout_s,
        ),
        classifier,
        sessions: Mutex::new(HashMap::new()),
        rooms: RoomHub::new(),
    });

    let app = build_router(state, &config.static_dir);

    let addr = format!("{}:{}", config.web_bind, config.web_port);
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
