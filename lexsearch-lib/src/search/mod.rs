//! Semantic search over a corpus
//!
//! Combines a corpus, an embedder and a vector index into one read-only
//! service object. Built once at startup, then shared by reference.
//!
//! # Usage
//!
//! ```ignore
//! use lexsearch_lib::search::{SearchOptions, SemanticEngine};
//!
//! let corpus = Arc::new(Corpus::load("data/bns_sections.json")?);
//! let embedder = embed::shared(MiniLmEmbedder::new()?);
//!
//! // Load the persisted index, or build and persist one
//! let engine = SemanticEngine::open(corpus, embedder, "data/bns_sections.index", SearchOptions::default())?;
//! let hits = engine.search("punishment for theft", 5)?;
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::corpus::{Corpus, Section};
use crate::embed::{self, Embedder, SharedEmbedder};
use crate::store::{FlatIndex, IndexMeta, VectorStore};
use crate::{Error, Result};

/// Default number of results when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 5;

/// A ranked search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched section, exactly as loaded
    pub section: Section,
    /// Squared Euclidean distance to the query (lower is more similar)
    pub distance: f32,
    /// 1-based position in the result list
    pub rank: usize,
}

/// Knobs applied to every search
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Drop hits farther than this; `None` keeps all `k`
    pub max_distance: Option<f32>,
    /// Ignore any persisted index and rebuild
    pub rebuild: bool,
}

/// Semantic search engine combining corpus, embedder and index.
///
/// Holds no per-request state: `search` takes `&self` and may be called from
/// many threads at once. Only the embedder is locked, and only while the
/// query is encoded.
pub struct SemanticEngine<E: Embedder, S: VectorStore = FlatIndex> {
    corpus: Arc<Corpus>,
    embedder: SharedEmbedder<E>,
    store: S,
    max_distance: Option<f32>,
}

impl<E: Embedder> SemanticEngine<E, FlatIndex> {
    /// Embed every section and build a fresh index.
    pub fn build(
        corpus: Arc<Corpus>,
        embedder: SharedEmbedder<E>,
        options: SearchOptions,
    ) -> Result<Self> {
        let start = Instant::now();
        let expected = embed::with_embedder(&embedder, |e| Ok(expected_meta(&corpus, e)))?;

        let embeddings = if corpus.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = corpus.iter().map(Section::composite_text).collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embed::with_embedder(&embedder, |e| e.embed_documents(&refs))?
        };

        let index = FlatIndex::build(expected, embeddings)?;
        tracing::info!(
            rows = index.len(),
            model = %index.meta().model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built index"
        );

        Self::with_store(corpus, embedder, index, options)
    }

    /// Load the index persisted at `index_path`, or build and persist one.
    ///
    /// A persisted index that disagrees with the corpus or the embedder is
    /// discarded and rebuilt.
    pub fn open(
        corpus: Arc<Corpus>,
        embedder: SharedEmbedder<E>,
        index_path: impl AsRef<Path>,
        options: SearchOptions,
    ) -> Result<Self> {
        let index_path = index_path.as_ref();

        if !options.rebuild {
            let expected = embed::with_embedder(&embedder, |e| Ok(expected_meta(&corpus, e)))?;
            match FlatIndex::load(index_path) {
                Ok(Some(index)) => match index.meta().ensure_matches(&expected) {
                    Ok(()) => return Self::with_store(corpus, embedder, index, options),
                    Err(e) => tracing::warn!(
                        path = %index_path.display(),
                        error = %e,
                        "persisted index is stale, rebuilding"
                    ),
                },
                Ok(None) => tracing::info!(
                    path = %index_path.display(),
                    "no persisted index, building"
                ),
                Err(e @ Error::IndexMismatch(_)) => tracing::warn!(
                    path = %index_path.display(),
                    error = %e,
                    "unreadable index, rebuilding"
                ),
                Err(e) => return Err(e),
            }
        }

        let engine = Self::build(corpus, embedder, options)?;
        if let Err(e) = engine.store.save(index_path) {
            tracing::warn!(path = %index_path.display(), error = %e, "failed to persist index");
        }
        Ok(engine)
    }
}

impl<E: Embedder, S: VectorStore> SemanticEngine<E, S> {
    /// Pair an existing index with a corpus and embedder.
    ///
    /// Fails with [`Error::IndexMismatch`] unless the index was built from
    /// exactly this corpus with this embedder.
    pub fn with_store(
        corpus: Arc<Corpus>,
        embedder: SharedEmbedder<E>,
        store: S,
        options: SearchOptions,
    ) -> Result<Self> {
        let expected = embed::with_embedder(&embedder, |e| Ok(expected_meta(&corpus, e)))?;
        store.meta().ensure_matches(&expected)?;

        Ok(Self {
            corpus,
            embedder,
            store,
            max_distance: options.max_distance,
        })
    }

    /// Find the `k` sections nearest to the query.
    ///
    /// Always returns `k` hits when the corpus has at least `k` sections,
    /// however weak the match, unless a `max_distance` was configured.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".to_string()));
        }
        if self.corpus.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query_embedding = embed::with_embedder(&self.embedder, |e| e.embed_query(query))?;
        let neighbors = self.store.search(&query_embedding, k)?;

        let mut seen = HashSet::with_capacity(neighbors.len());
        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let Some(section) = self.corpus.at(neighbor.row) else {
                tracing::warn!(
                    row = neighbor.row,
                    corpus_len = self.corpus.len(),
                    "index returned a row outside the corpus, skipping"
                );
                continue;
            };
            if !seen.insert(neighbor.row) {
                continue;
            }
            if self.max_distance.is_some_and(|max| neighbor.distance > max) {
                continue;
            }
            hits.push(SearchHit {
                section: section.clone(),
                distance: neighbor.distance,
                rank: hits.len() + 1,
            });
        }

        tracing::debug!(
            query,
            k,
            hits = hits.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "semantic search"
        );
        Ok(hits)
    }

    /// Returns the corpus this engine searches.
    #[must_use]
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Returns a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the shared embedder.
    #[must_use]
    pub fn embedder(&self) -> &SharedEmbedder<E> {
        &self.embedder
    }

    /// Returns the number of indexed sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no sections are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn expected_meta<E: Embedder + ?Sized>(corpus: &Corpus, embedder: &E) -> IndexMeta {
    IndexMeta {
        dimension: embedder.dimension(),
        rows: corpus.len(),
        fingerprint: corpus.fingerprint(),
        model: embedder.model_name().to_string(),
    }
}
