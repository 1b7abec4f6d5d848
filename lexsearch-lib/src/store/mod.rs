//! Vector index over corpus rows
//!
//! The index is built once from a corpus and never mutated. Row `i` of the
//! index is row `i` of the corpus it was built from; [`IndexMeta`] records
//! enough about that corpus (row count, fingerprint, model, dimension) to
//! refuse a pairing that no longer holds.
//!
//! # Storage Model
//!
//! Each row is one embedding, stored row-major in a single `Vec<f32>`.
//! Search is exact brute force by squared Euclidean distance, which is plenty
//! for a statute of a few hundred sections.
//!
//! # Usage
//!
//! ```ignore
//! use lexsearch_lib::store::{FlatIndex, IndexMeta, VectorStore};
//!
//! let index = FlatIndex::build(meta, embeddings)?;
//! index.save("data/bns_sections.index")?;
//!
//! let neighbors = index.search(&query_embedding, 5)?;
//! ```

use std::cmp::Ordering;

use crate::Result;

/// A nearest-neighbor hit: a row of the index and its distance to the query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Row in the index, which is also the corpus row
    pub row: usize,
    /// Squared Euclidean distance (lower is more similar)
    pub distance: f32,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    /// Nearer first; equal distances fall back to row order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.row.cmp(&other.row))
    }
}

/// Facts about the corpus and model an index was built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Embedding dimension
    pub dimension: usize,
    /// Number of rows, equal to the corpus length
    pub rows: usize,
    /// [`Corpus::fingerprint`](crate::corpus::Corpus::fingerprint) at build time
    pub fingerprint: [u8; 32],
    /// Embedding model identifier
    pub model: String,
}

/// Trait for vector index backends
pub trait VectorStore: Send + Sync {
    /// Search for the rows nearest to a query vector
    ///
    /// # Returns
    /// At most `k` neighbors sorted by distance (nearest first)
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Describes what the index was built from
    fn meta(&self) -> &IndexMeta;

    /// Get total number of rows
    fn len(&self) -> usize {
        self.meta().rows
    }

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod flat;
mod persist;

pub use flat::*;
pub use persist::*;
