//! Text embedding
//!
//! Two providers:
//! - [`MiniLmEmbedder`]: sentence-transformers/all-MiniLM-L6-v2 via fastembed
//!   (ONNX runtime), 384 dimensions. Requires the `fastembed` feature.
//! - [`HashEmbedder`]: signed feature hashing of word tokens. No model, no
//!   download, fully deterministic; good for offline runs and tests.
//!
//! An index is only meaningful against the model that built it, so the model
//! name is persisted alongside the vectors.
//!
//! # Usage
//!
//! ```ignore
//! use lexsearch_lib::embed::Embedder;
//!
//! let mut embedder = MiniLmEmbedder::new()?;
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["Section 303 Theft ..."])?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("punishment for stealing")?;
//! ```

use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// A vector embedding
pub type Embedding = Vec<f32>;

/// An embedder shared between engines and request handlers.
///
/// Embedding needs `&mut`, so concurrent callers take turns on the lock.
pub type SharedEmbedder<E> = Arc<Mutex<E>>;

/// Wrap an embedder for sharing.
pub fn shared<E: Embedder>(embedder: E) -> SharedEmbedder<E> {
    Arc::new(Mutex::new(embedder))
}

/// Run `f` with exclusive access to a shared embedder.
pub fn with_embedder<E: Embedder, T>(
    embedder: &SharedEmbedder<E>,
    f: impl FnOnce(&mut E) -> Result<T>,
) -> Result<T> {
    let mut guard = embedder
        .lock()
        .map_err(|_| Error::Embedding("embedder lock poisoned".to_string()))?;
    f(&mut guard)
}

/// Trait for text embedding models
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Documents may be batched for efficiency.
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    ///
    /// Asymmetric models prompt queries differently from documents; this
    /// method owns that distinction.
    fn embed_query(&mut self, text: &str) -> Result<Embedding>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed_documents(texts)
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        (**self).embed_query(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

mod hash;
#[cfg(feature = "fastembed")]
mod minilm;

pub use hash::*;
#[cfg(feature = "fastembed")]
pub use minilm::*;
