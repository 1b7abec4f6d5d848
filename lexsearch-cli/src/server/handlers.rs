use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use lexsearch_lib::compose::{Answer, AnswerMode, Citation};
use lexsearch_lib::corpus::Section;
use lexsearch_lib::explain::explain;
use lexsearch_lib::search::SearchHit;
use lexsearch_lib::session::ChatTurn;
use lexsearch_lib::store::VectorStore;
use lexsearch_lib::{exact, Error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::Engine;
use crate::server::error::ApiError;
use crate::server::state::AppState;

pub const SECTION_NOT_FOUND: &str = "Section not found";

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SectionPreview {
    section: String,
    title: String,
    preview: String,
    distance: f32,
}

impl From<&SearchHit> for SectionPreview {
    fn from(hit: &SearchHit) -> Self {
        Self {
            section: hit.section.id.clone(),
            title: hit.section.title.clone(),
            preview: hit.section.preview(PREVIEW_CHARS),
            distance: hit.distance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DualSearchResponse {
    bns: Vec<SectionPreview>,
    ipc: Option<Vec<SectionPreview>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    answer: String,
    session_id: String,
    top_section: Option<Section>,
    sources: Vec<SectionPreview>,
    citations: Vec<Citation>,
    memory: Vec<ChatTurn>,
    mode: AnswerMode,
    degraded: bool,
}

fn not_found() -> Json<Value> {
    Json(json!({ "error": SECTION_NOT_FOUND }))
}

fn require_query(q: &str) -> Result<&str, ApiError> {
    let q = q.trim();
    if q.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    Ok(q)
}

/// Run a semantic search off the async runtime.
///
/// The outer error is a task failure; the inner result is the search itself.
async fn search_blocking(
    engine: Arc<Engine>,
    query: String,
    k: usize,
) -> Result<lexsearch_lib::Result<Vec<SearchHit>>, ApiError> {
    tokio::task::spawn_blocking(move || engine.search(&query, k))
        .await
        .map_err(ApiError::internal)
}

pub async fn root() -> impl IntoResponse {
    Json(json!({ "status": "LexSearch running" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sections": state.bns.len(),
        "ipc_sections": state.ipc.as_ref().map(|engine| engine.len()),
        "model": state.bns.store().meta().model,
        "llm": state.composer.has_llm(),
    }))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    match exact::search(&params.q, state.bns.corpus()) {
        Some(section) => Ok(Json(serde_json::to_value(section).map_err(ApiError::internal)?)),
        None => Ok(not_found()),
    }
}

pub async fn explain_section(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<String>,
) -> Json<Value> {
    match state.bns.corpus().get(section_id.trim()) {
        Some(section) => Json(json!({
            "section": section.id,
            "title": section.title,
            "explanation": explain(section),
        })),
        None => not_found(),
    }
}

pub async fn semantic_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SectionPreview>>, ApiError> {
    let query = require_query(&params.q)?.to_string();
    let k = state.limits.top_k(params.k, state.limits.default_top_k);

    let hits = search_blocking(state.bns.clone(), query, k).await??;
    Ok(Json(hits.iter().map(SectionPreview::from).collect()))
}

pub async fn dual_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<DualSearchResponse>, ApiError> {
    let query = require_query(&params.q)?.to_string();
    let k = state.limits.top_k(params.k, state.limits.dual_top_k);

    let bns = search_blocking(state.bns.clone(), query.clone(), k);
    let ipc = async {
        match &state.ipc {
            Some(engine) => search_blocking(engine.clone(), query.clone(), k).await.map(Some),
            None => Ok(None),
        }
    };
    let (bns, ipc) = tokio::join!(bns, ipc);

    let bns = bns??;
    let ipc = match ipc? {
        Some(result) => Some(result?),
        None => None,
    };

    Ok(Json(DualSearchResponse {
        bns: bns.iter().map(SectionPreview::from).collect(),
        ipc: ipc.map(|hits| hits.iter().map(SectionPreview::from).collect()),
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = require_query(&request.query)?.to_string();
    let k = state.limits.top_k(request.k, state.limits.chat_top_k);
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (answer, hits) = match search_blocking(state.bns.clone(), query.clone(), k).await? {
        Ok(hits) => (state.composer.answer(&query, &hits).await, hits),
        Err(e @ Error::Embedding(_)) => {
            tracing::warn!(error = %e, "retrieval failed, answer unavailable");
            (Answer::unavailable(), Vec::new())
        }
        Err(e) => return Err(e.into()),
    };

    let memory = state.sessions.record(&session_id, &query, &answer.text).await;

    Ok(Json(ChatResponse {
        top_section: hits.first().map(|hit| hit.section.clone()),
        sources: hits.iter().map(SectionPreview::from).collect(),
        answer: answer.text,
        session_id,
        citations: answer.citations,
        memory,
        mode: answer.mode,
        degraded: answer.degraded,
    }))
}
