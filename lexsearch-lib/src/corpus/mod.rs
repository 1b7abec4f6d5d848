//! Statute corpus loading
//!
//! A corpus is read once at startup from a JSON array of
//! `{section, title, text}` records and never mutated afterwards.
//!
//! Two views are kept over the same load pass:
//! - positional: row `i` is the `i`-th record of the file, which is also row `i`
//!   of the vector index built from it
//! - keyed: section id to row
//!
//! # Usage
//!
//! ```ignore
//! use lexsearch_lib::corpus::Corpus;
//!
//! let corpus = Corpus::load("data/bns_sections.json")?;
//! let murder = corpus.get("103");
//! let first = corpus.at(0);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{Error, Result};

mod section;

pub use section::*;

/// Ordered, read-only collection of sections.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    sections: Vec<Section>,
    rows: HashMap<String, usize>,
}

impl Corpus {
    /// Load a corpus from a JSON file.
    ///
    /// Fails if the file is missing, is not a list of section records, or
    /// repeats a section id.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::load(path, e))?;
        let sections: Vec<Section> =
            serde_json::from_str(&raw).map_err(|e| Error::load(path, e))?;

        let corpus = Self::from_sections(sections).map_err(|e| match e {
            Error::InvalidInput(reason) => Error::load(path, reason),
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            sections = corpus.len(),
            "loaded corpus"
        );
        Ok(corpus)
    }

    /// Build a corpus from sections already in memory, keeping their order.
    pub fn from_sections(sections: Vec<Section>) -> Result<Self> {
        let mut rows = HashMap::with_capacity(sections.len());

        for (row, section) in sections.iter().enumerate() {
            if section.id.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "section at position {row} has an empty id"
                )));
            }
            if rows.insert(section.id.clone(), row).is_some() {
                return Err(Error::InvalidInput(format!(
                    "duplicate section id {}",
                    section.id
                )));
            }
        }

        Ok(Self { sections, rows })
    }

    /// Look up a section by its id.
    pub fn get(&self, id: &str) -> Option<&Section> {
        self.rows.get(id).map(|&row| &self.sections[row])
    }

    /// Section at a positional row, `None` past the end.
    pub fn at(&self, row: usize) -> Option<&Section> {
        self.sections.get(row)
    }

    /// Row of a section id.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// SHA-256 over every section in row order.
    ///
    /// Persisted indexes carry this value so that reordering or editing the
    /// corpus is caught before row numbers are trusted.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update((self.sections.len() as u64).to_le_bytes());
        for section in &self.sections {
            for field in [&section.id, &section.title, &section.text] {
                hasher.update((field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
        hasher.finalize().into()
    }
}
