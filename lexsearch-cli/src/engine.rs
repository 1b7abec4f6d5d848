//! Building search engines from command-line options.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use lexsearch_lib::corpus::Corpus;
use lexsearch_lib::embed::{self, Embedder, HashEmbedder, SharedEmbedder, DEFAULT_HASH_DIMENSION};
use lexsearch_lib::search::{SearchOptions, SemanticEngine};
use lexsearch_lib::store::index_path_for;

/// Engine type used by the binary; the embedder is picked at runtime.
pub type Engine = SemanticEngine<Box<dyn Embedder>>;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// sentence-transformers/all-MiniLM-L6-v2 via fastembed
    Minilm,
    /// Feature hashing, no model download
    Hash,
}

/// Options shared by every command that needs an index.
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Corpus JSON file: a list of {section, title, text}
    #[arg(long, env = "LEXSEARCH_CORPUS")]
    pub corpus: PathBuf,

    /// Persisted index path (defaults to the corpus path with an .index extension)
    #[arg(long, env = "LEXSEARCH_INDEX")]
    pub index: Option<PathBuf>,

    /// Embedding provider
    #[arg(long, value_enum, env = "LEXSEARCH_EMBEDDER", default_value_t = EmbedderKind::Minilm)]
    pub embedder: EmbedderKind,

    /// Vector size for the hash embedder
    #[arg(long, default_value_t = DEFAULT_HASH_DIMENSION)]
    pub hash_dimension: usize,

    /// Ignore any persisted index and rebuild it
    #[arg(long)]
    pub rebuild: bool,

    /// Drop semantic hits farther than this squared distance
    #[arg(long, env = "LEXSEARCH_MAX_DISTANCE")]
    pub max_distance: Option<f32>,
}

impl IndexArgs {
    pub fn index_path(&self) -> PathBuf {
        self.index
            .clone()
            .unwrap_or_else(|| index_path_for(&self.corpus))
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_distance: self.max_distance,
            rebuild: self.rebuild,
        }
    }
}

pub fn make_embedder(kind: EmbedderKind, hash_dimension: usize) -> Result<SharedEmbedder<Box<dyn Embedder>>> {
    let embedder: Box<dyn Embedder> = match kind {
        EmbedderKind::Hash => Box::new(HashEmbedder::new(hash_dimension)?),
        EmbedderKind::Minilm => minilm()?,
    };
    tracing::info!(model = embedder.model_name(), dimension = embedder.dimension(), "embedder ready");
    Ok(embed::shared(embedder))
}

#[cfg(feature = "fastembed")]
fn minilm() -> Result<Box<dyn Embedder>> {
    tracing::info!("loading MiniLM model (first run downloads ~90MB)");
    Ok(Box::new(embed::MiniLmEmbedder::new()?))
}

#[cfg(not(feature = "fastembed"))]
fn minilm() -> Result<Box<dyn Embedder>> {
    anyhow::bail!("built without the fastembed feature; use --embedder hash")
}

pub fn load_corpus(path: &Path) -> Result<Arc<Corpus>> {
    let corpus = Corpus::load(path).with_context(|| format!("cannot start without corpus {}", path.display()))?;
    Ok(Arc::new(corpus))
}

/// Load a corpus and open its engine, building the index if needed.
pub fn open_engine(
    corpus_path: &Path,
    index_path: &Path,
    embedder: SharedEmbedder<Box<dyn Embedder>>,
    options: SearchOptions,
) -> Result<Engine> {
    let corpus = load_corpus(corpus_path)?;
    SemanticEngine::open(corpus, embedder, index_path, options)
        .with_context(|| format!("failed to open index {}", index_path.display()))
}
