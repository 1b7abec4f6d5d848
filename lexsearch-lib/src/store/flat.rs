use std::collections::BinaryHeap;

use crate::embed::Embedding;
use crate::store::{IndexMeta, Neighbor, VectorStore};
use crate::{Error, Result};

/// Exact, brute-force index by squared Euclidean distance.
///
/// Immutable once built, so `&FlatIndex` can be searched from any number of
/// threads at once.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    meta: IndexMeta,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from one embedding per corpus row, in corpus order.
    pub fn build(meta: IndexMeta, embeddings: Vec<Embedding>) -> Result<Self> {
        if embeddings.len() != meta.rows {
            return Err(Error::IndexMismatch(format!(
                "expected {} embeddings, got {}",
                meta.rows,
                embeddings.len()
            )));
        }

        let mut vectors = Vec::with_capacity(meta.rows * meta.dimension);
        for (row, embedding) in embeddings.into_iter().enumerate() {
            if embedding.len() != meta.dimension {
                return Err(Error::IndexMismatch(format!(
                    "row {row} has dimension {}, expected {}",
                    embedding.len(),
                    meta.dimension
                )));
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(Error::Embedding(format!(
                    "row {row} contains non-finite values"
                )));
            }
            vectors.extend(embedding);
        }

        Ok(Self { meta, vectors })
    }

    /// Assemble an index from raw row-major storage.
    pub(crate) fn from_raw(meta: IndexMeta, vectors: Vec<f32>) -> Result<Self> {
        if vectors.len() != meta.rows * meta.dimension {
            return Err(Error::IndexMismatch(format!(
                "payload holds {} values, header promises {} x {}",
                vectors.len(),
                meta.rows,
                meta.dimension
            )));
        }
        Ok(Self { meta, vectors })
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.vectors
    }

    /// Vector stored at `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.meta.rows {
            return None;
        }
        let start = row * self.meta.dimension;
        Some(&self.vectors[start..start + self.meta.dimension])
    }
}

impl VectorStore for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.meta.dimension {
            return Err(Error::IndexMismatch(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.meta.dimension
            )));
        }
        if k == 0 || self.meta.dimension == 0 {
            return Ok(Vec::new());
        }

        // max-heap of the k best so far; the worst of them sits on top
        let mut best = BinaryHeap::with_capacity(k + 1);
        for (row, vector) in self.vectors.chunks_exact(self.meta.dimension).enumerate() {
            best.push(Neighbor {
                row,
                distance: squared_l2(query, vector),
            });
            if best.len() > k {
                best.pop();
            }
        }

        Ok(best.into_sorted_vec())
    }

    fn meta(&self) -> &IndexMeta {
        &self.meta
    }
}

impl IndexMeta {
    /// Check that an index built under `self` can serve `expected`.
    pub fn ensure_matches(&self, expected: &IndexMeta) -> Result<()> {
        if self.rows != expected.rows {
            return Err(Error::IndexMismatch(format!(
                "index has {} rows, corpus has {}",
                self.rows, expected.rows
            )));
        }
        if self.dimension != expected.dimension {
            return Err(Error::IndexMismatch(format!(
                "index dimension {} does not match embedder dimension {}",
                self.dimension, expected.dimension
            )));
        }
        if self.model != expected.model {
            return Err(Error::IndexMismatch(format!(
                "index built with {}, embedder is {}",
                self.model, expected.model
            )));
        }
        if self.fingerprint != expected.fingerprint {
            return Err(Error::IndexMismatch(format!(
                "corpus fingerprint changed ({} != {})",
                hex::encode(&self.fingerprint[..8]),
                hex::encode(&expected.fingerprint[..8])
            )));
        }
        Ok(())
    }
}

/// Squared Euclidean distance between two vectors of equal length.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
