use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Default dimension for [`HashEmbedder`].
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimension` buckets with a hash-derived sign, and the resulting vector is
/// L2-normalised. Texts sharing words land close together; there is no
/// notion of synonyms. Output is stable across runs and platforms.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput(
                "hash embedder dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            name: format!("feature-hash-{dimension}"),
        })
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASH_DIMENSION,
            name: format!("feature-hash-{DEFAULT_HASH_DIMENSION}"),
        }
    }
}

impl Embedder for HashEmbedder {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        Ok(self.embed_one(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_dimension_and_norm() {
        let mut embedder = HashEmbedder::new(64).unwrap();
        let v = embedder.embed_query("Whoever commits theft").unwrap();

        assert_eq!(v.len(), 64);
        let norm = dot(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let mut a = HashEmbedder::default();
        let mut b = HashEmbedder::default();
        assert_eq!(
            a.embed_query("punishment for murder").unwrap(),
            b.embed_query("punishment for murder").unwrap()
        );
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let mut embedder = HashEmbedder::default();
        assert_eq!(
            embedder.embed_query("Theft, Robbery!").unwrap(),
            embedder.embed_query("theft robbery").unwrap()
        );
    }

    #[test]
    fn test_shared_words_are_closer() {
        let mut embedder = HashEmbedder::default();
        let query = embedder.embed_query("theft of property").unwrap();
        let docs = embedder
            .embed_documents(&["dishonest theft of movable property", "waging war against the state"])
            .unwrap();

        assert!(dot(&query, &docs[0]) > dot(&query, &docs[1]));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let mut embedder = HashEmbedder::new(8).unwrap();
        let v = embedder.embed_query("  ...  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }
}
