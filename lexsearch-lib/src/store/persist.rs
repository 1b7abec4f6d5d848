//! On-disk format for [`FlatIndex`]
//!
//! ```text
//! magic        4 bytes  "LXIX"
//! version      u32
//! dimension    u32
//! rows         u64
//! fingerprint  32 bytes
//! model_len    u32
//! model        model_len bytes, UTF-8
//! vectors      rows * dimension f32
//! ```
//!
//! All integers and floats are little-endian.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::store::{FlatIndex, IndexMeta, VectorStore};
use crate::{Error, Result};

const MAGIC: &[u8; 4] = b"LXIX";
const FORMAT_VERSION: u32 = 1;
const MAX_MODEL_NAME: usize = 1024;

// magic + version + dimension + rows + fingerprint + model_len
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 32 + 4;

/// Index path paired with a corpus file: same stem, `.index` extension.
pub fn index_path_for(corpus_path: impl AsRef<Path>) -> PathBuf {
    corpus_path.as_ref().with_extension("index")
}

impl FlatIndex {
    /// Write the index to `path`, replacing any previous file atomically.
    ///
    /// The bytes go to a temporary file in the same directory, which is
    /// removed again if writing or the final rename fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;

        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            let meta = self.meta();
            let model = meta.model.as_bytes();

            out.write_all(MAGIC)?;
            out.write_all(&FORMAT_VERSION.to_le_bytes())?;
            out.write_all(&to_u32(meta.dimension, "dimension")?.to_le_bytes())?;
            out.write_all(&(meta.rows as u64).to_le_bytes())?;
            out.write_all(&meta.fingerprint)?;
            out.write_all(&to_u32(model.len(), "model name length")?.to_le_bytes())?;
            out.write_all(model)?;
            for value in self.raw() {
                out.write_all(&value.to_le_bytes())?;
            }
            out.flush()?;
        }

        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        tracing::info!(
            path = %path.display(),
            rows = self.meta().rows,
            dimension = self.meta().dimension,
            "saved index"
        );
        Ok(())
    }

    /// Read an index from `path`.
    ///
    /// `Ok(None)` when no file exists. A file that exists but cannot be
    /// decoded is an [`Error::IndexMismatch`]: it was not written for this
    /// build and must not be trusted.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut input = BufReader::new(file);

        let mut magic = [0u8; 4];
        read_exact(&mut input, &mut magic)?;
        if &magic != MAGIC {
            return Err(Error::IndexMismatch(format!(
                "{} is not an index file",
                path.display()
            )));
        }

        let version = read_u32(&mut input)?;
        if version != FORMAT_VERSION {
            return Err(Error::IndexMismatch(format!(
                "unsupported index format version {version}"
            )));
        }

        let dimension = read_u32(&mut input)? as usize;
        let rows = usize::try_from(read_u64(&mut input)?)
            .map_err(|_| Error::IndexMismatch("row count overflows usize".to_string()))?;

        let mut fingerprint = [0u8; 32];
        read_exact(&mut input, &mut fingerprint)?;

        let model_len = read_u32(&mut input)? as usize;
        if model_len > MAX_MODEL_NAME {
            return Err(Error::IndexMismatch(format!(
                "model name length {model_len} is implausible"
            )));
        }
        let mut model = vec![0u8; model_len];
        read_exact(&mut input, &mut model)?;
        let model = String::from_utf8(model)
            .map_err(|_| Error::IndexMismatch("model name is not UTF-8".to_string()))?;

        let expected = rows
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| Error::IndexMismatch("index size overflows".to_string()))?;
        let available = file_len.saturating_sub((HEADER_LEN + model_len) as u64);
        if available != expected as u64 {
            return Err(Error::IndexMismatch(format!(
                "payload is {available} bytes, header promises {expected}"
            )));
        }

        let mut payload = Vec::with_capacity(expected);
        input.read_to_end(&mut payload)?;
        if payload.len() != expected {
            return Err(Error::IndexMismatch(format!(
                "payload is {} bytes, expected {expected}",
                payload.len()
            )));
        }
        let vectors = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let meta = IndexMeta {
            dimension,
            rows,
            fingerprint,
            model,
        };
        let index = FlatIndex::from_raw(meta, vectors)?;
        tracing::info!(path = %path.display(), rows, dimension, "loaded index");
        Ok(Some(index))
    }
}

fn to_u32(value: usize, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidInput(format!("{field} {value} does not fit the index format")))
}

fn read_exact(input: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::IndexMismatch("index file is truncated".to_string()),
        _ => e.into(),
    })
}

fn read_u32(input: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(input: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(input, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
