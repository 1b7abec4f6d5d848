//! HTTP service
//!
//! Search misses are answered with `200 {"error": "Section not found"}`, not
//! a 404: a miss is a normal outcome for a lookup by section number.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use clap::Args;
use lexsearch_lib::compose::{Composer, OllamaClient, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use lexsearch_lib::session::DEFAULT_HISTORY_WINDOW;
use lexsearch_lib::store::index_path_for;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::{self, IndexArgs};

mod error;
mod handlers;
mod state;

pub use state::{AppState, Limits, SessionStore};

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// Second corpus (IPC) searched alongside the primary one by /dual-search
    #[arg(long, env = "LEXSEARCH_IPC_CORPUS")]
    pub ipc_corpus: Option<PathBuf>,

    /// Persisted index for the second corpus
    #[arg(long, env = "LEXSEARCH_IPC_INDEX")]
    pub ipc_index: Option<PathBuf>,

    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "LEXSEARCH_BIND", default_value = "127.0.0.1:8000")]
    pub bind: String,

    /// Default top-k when the client does not override it
    #[arg(long, env = "LEXSEARCH_DEFAULT_TOP_K", default_value_t = 5)]
    pub default_top_k: usize,

    /// Maximum top-k allowed per request
    #[arg(long, env = "LEXSEARCH_MAX_TOP_K", default_value_t = 20)]
    pub max_top_k: usize,

    /// Ollama generate endpoint used to phrase chat answers
    #[arg(long, env = "LEXSEARCH_LLM_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub llm_url: String,

    /// Model name passed to Ollama
    #[arg(long, env = "LEXSEARCH_LLM_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    pub llm_model: String,

    /// Seconds before a generation request times out
    #[arg(long, env = "LEXSEARCH_LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    /// Answer chat messages from section explanations only
    #[arg(long)]
    pub no_llm: bool,

    /// Allowed CORS origin (repeatable); any origin when omitted
    #[arg(long = "cors-origin", env = "LEXSEARCH_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Chat turns remembered per session
    #[arg(long, default_value_t = DEFAULT_HISTORY_WINDOW)]
    pub history_window: usize,

    /// Chat sessions kept in memory before the oldest is dropped
    #[arg(long, default_value_t = 1024)]
    pub max_sessions: usize,
}

/// Creates the application router with all routes and middleware.
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/search", get(handlers::search))
        .route("/explain/:section_id", get(handlers::explain_section))
        .route("/semantic-search", get(handlers::semantic_search))
        .route("/dual-search", get(handlers::dual_search))
        .route("/chat", post(handlers::chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/'))
                .with_context(|| format!("invalid CORS origin {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Load corpora and indexes, then serve until interrupted.
pub async fn serve(args: ServeArgs) -> Result<()> {
    let addr: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", args.bind))?;
    let cors = build_cors_layer(&args.cors_origins)?;

    let embedder = engine::make_embedder(args.index.embedder, args.index.hash_dimension)?;
    let options = args.index.search_options();

    let bns = {
        let (corpus, index, embedder, options) = (
            args.index.corpus.clone(),
            args.index.index_path(),
            embedder.clone(),
            options.clone(),
        );
        tokio::task::spawn_blocking(move || engine::open_engine(&corpus, &index, embedder, options))
            .await
            .context("index build task failed")??
    };

    let ipc = match &args.ipc_corpus {
        Some(corpus) => {
            let corpus = corpus.clone();
            let index = args.ipc_index.clone().unwrap_or_else(|| index_path_for(&corpus));
            let engine = tokio::task::spawn_blocking(move || {
                engine::open_engine(&corpus, &index, embedder, options)
            })
            .await
            .context("index build task failed")??;
            Some(Arc::new(engine))
        }
        None => None,
    };

    let composer = if args.no_llm {
        Composer::extractive()
    } else {
        let llm = OllamaClient::new(
            args.llm_url.clone(),
            args.llm_model.clone(),
            Duration::from_secs(args.llm_timeout_secs.max(1)),
        )?;
        tracing::info!(url = %args.llm_url, model = llm.model(), "generation backend configured");
        Composer::with_llm(Arc::new(llm))
    };

    let state = Arc::new(AppState {
        bns: Arc::new(bns),
        ipc,
        composer,
        sessions: SessionStore::new(args.history_window, args.max_sessions),
        limits: Limits {
            default_top_k: args.default_top_k.max(1),
            max_top_k: args.max_top_k.max(1),
            ..Limits::default()
        },
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        sections = state.bns.len(),
        ipc_sections = state.ipc.as_ref().map(|e| e.len()),
        "listening"
    );

    axum::serve(listener, router(state, cors))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use lexsearch_lib::corpus::{Corpus, Section};
    use lexsearch_lib::embed::{self as lexembed, Embedder, HashEmbedder};
    use lexsearch_lib::search::{SearchOptions, SemanticEngine};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::engine::Engine;

    fn bns_corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_sections(vec![
                Section::new(
                    "303",
                    "Theft",
                    "Whoever intending to take dishonestly any movable property out of the possession of any person commits theft.",
                ),
                Section::new(
                    "103",
                    "Punishment for murder",
                    "Whoever commits murder shall be punished with death, or imprisonment for life, and fine.",
                ),
                Section::new(
                    "318",
                    "Cheating",
                    "Whoever by deceiving any person fraudulently induces the person so deceived.",
                ),
                Section::new(
                    "147",
                    "Waging war against Government of India",
                    "Whoever wages war against the Government of India shall be punished with death.",
                ),
            ])
            .unwrap(),
        )
    }

    fn ipc_corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_sections(vec![
                Section::new("378", "Theft", "Whoever intending to take dishonestly any movable property commits theft."),
                Section::new("302", "Punishment for murder", "Whoever commits murder shall be punished with death."),
            ])
            .unwrap(),
        )
    }

    fn engine(corpus: Arc<Corpus>) -> Arc<Engine> {
        let embedder: Box<dyn Embedder> = Box::new(HashEmbedder::default());
        Arc::new(SemanticEngine::build(corpus, lexembed::shared(embedder), SearchOptions::default()).unwrap())
    }

    fn app(with_ipc: bool) -> Router {
        let state = Arc::new(AppState {
            bns: engine(bns_corpus()),
            ipc: with_ipc.then(|| engine(ipc_corpus())),
            composer: Composer::extractive(),
            sessions: SessionStore::new(6, 16),
            limits: Limits::default(),
        });
        router(state, build_cors_layer(&[]).unwrap())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_chat(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (status, body) = get_json(app(false), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "LexSearch running");

        let (_, body) = get_json(app(true), "/health").await;
        assert_eq!(body["sections"], 4);
        assert_eq!(body["ipc_sections"], 2);
        assert_eq!(body["llm"], false);
    }

    #[tokio::test]
    async fn test_exact_search_hit() {
        let (status, body) = get_json(app(false), "/search?q=tell%20me%20about%20section%20303").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["section"], "303");
        assert_eq!(body["title"], "Theft");
        assert!(body["text"].as_str().unwrap().starts_with("Whoever intending"));
    }

    #[tokio::test]
    async fn test_exact_search_miss_is_labelled() {
        let (status, body) = get_json(app(false), "/search?q=what%20is%20theft").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "error": "Section not found" }));

        let (_, body) = get_json(app(false), "/search?q=section%20999").await;
        assert_eq!(body["error"], "Section not found");
    }

    #[tokio::test]
    async fn test_explain() {
        let (status, body) = get_json(app(false), "/explain/103").await;
        assert_eq!(status, StatusCode::OK);
        let explanation = body["explanation"].as_str().unwrap();
        assert!(explanation.starts_with("Section 103 deals with punishment for murder."));
        assert!(explanation.contains("Punishment: death, or imprisonment for life, and fine."));

        let (_, body) = get_json(app(false), "/explain/1").await;
        assert_eq!(body["error"], "Section not found");
    }

    #[tokio::test]
    async fn test_semantic_search() {
        let (status, body) = get_json(app(false), "/semantic-search?q=dishonestly%20take%20movable%20property&k=3").await;
        assert_eq!(status, StatusCode::OK);

        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["section"], "303");
        assert!(results[0]["preview"].as_str().unwrap().ends_with("..."));
        let distances: Vec<f64> = results.iter().map(|r| r["distance"].as_f64().unwrap()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_semantic_search_defaults_and_clamps() {
        let (_, body) = get_json(app(false), "/semantic-search?q=war").await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (_, body) = get_json(app(false), "/semantic-search?q=war&k=0").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_semantic_search_requires_query() {
        let (status, body) = get_json(app(false), "/semantic-search?q=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_dual_search() {
        let (status, body) = get_json(app(true), "/dual-search?q=theft%20of%20movable%20property").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bns"].as_array().unwrap().len(), 3);
        assert_eq!(body["ipc"].as_array().unwrap().len(), 2);
        assert_eq!(body["ipc"][0]["section"], "378");

        let (_, body) = get_json(app(false), "/dual-search?q=theft").await;
        assert!(body["ipc"].is_null());
    }

    #[tokio::test]
    async fn test_chat_answers_and_remembers() {
        let app = app(false);

        let (status, first) = post_chat(
            app.clone(),
            serde_json::json!({ "query": "punishment for murder", "session_id": "s1" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["session_id"], "s1");
        assert_eq!(first["mode"], "extractive");
        assert_eq!(first["degraded"], false);
        assert_eq!(first["top_section"]["section"], "103");
        assert_eq!(first["sources"].as_array().unwrap().len(), 3);
        assert!(first["answer"].as_str().unwrap().starts_with("## Answer: punishment for murder"));
        assert_eq!(first["memory"].as_array().unwrap().len(), 2);

        let (_, second) = post_chat(app, serde_json::json!({ "query": "what is theft", "session_id": "s1" })).await;
        let memory = second["memory"].as_array().unwrap();
        assert_eq!(memory.len(), 4);
        assert_eq!(memory[0]["role"], "user");
        assert_eq!(memory[0]["text"], "punishment for murder");
        assert_eq!(memory[2]["text"], "what is theft");
    }

    #[tokio::test]
    async fn test_chat_mints_session_id() {
        let (_, body) = post_chat(app(false), serde_json::json!({ "query": "cheating" })).await;
        let id = body["session_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_query() {
        let (status, _) = post_chat(app(false), serde_json::json!({ "query": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cors_origins() {
        assert!(build_cors_layer(&["https://lexsearch.example.com/".to_string()]).is_ok());
        assert!(build_cors_layer(&["*".to_string()]).is_ok());
        assert!(build_cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
