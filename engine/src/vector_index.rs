use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{EngineError, Result};

/// One dense retrieval hit.
#[derive(Debug, Clone)]
pub struct EmbHit {
    pub doc_id: String,
    pub score: f32,
}

/// Flat dense-vector index: `n` vectors of a fixed dimension stored
/// contiguously, one per document id, queried by brute-force cosine.
///
/// Binary layout (little-endian), reproduced bit-exact for interop:
///
/// ```text
/// u32 dim
/// u32 n
/// repeat n: u32 id_len, id bytes
/// u64 element_count        // == n * dim
/// f32[element_count]       // row-major, doc-major
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EmbeddingIndex {
    ids: Vec<String>,
    vecs: Vec<f32>,
    dim: usize,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())) as f32
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of pre-packed vectors. `vecs.len()` must equal
    /// `ids.len() * dim`.
    pub fn set(ids: Vec<String>, vecs: Vec<f32>, dim: usize) -> Result<Self> {
        if ids.len() * dim != vecs.len() {
            return Err(EngineError::Config(format!(
                "embedding index shape mismatch: {} ids, dim {}, {} elements",
                ids.len(),
                dim,
                vecs.len()
            )));
        }
        Ok(Self { ids, vecs, dim })
    }

    /// Append one vector. The first push fixes the index dimension.
    pub fn push(&mut self, id: String, vec: Vec<f32>) -> Result<()> {
        if self.dim == 0 {
            self.dim = vec.len();
        }
        if vec.len() != self.dim {
            return Err(EngineError::DimensionMismatch { expected: self.dim, got: vec.len() });
        }
        self.ids.push(id);
        self.vecs.extend_from_slice(&vec);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Brute-force cosine top-k, O(n * dim). Zero-norm vectors score 0
    /// instead of poisoning the ordering.
    pub fn topk(&self, query: &[f32], k: usize) -> Result<Vec<EmbHit>> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(EngineError::DimensionMismatch { expected: self.dim, got: query.len() });
        }

        let mut hits: Vec<EmbHit> = Vec::with_capacity(self.ids.len());
        for (i, id) in self.ids.iter().enumerate() {
            let row = &self.vecs[i * self.dim..(i + 1) * self.dim];
            hits.push(EmbHit { doc_id: id.clone(), score: cosine(query, row) });
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k.min(self.ids.len()));
        Ok(hits)
    }

    /// Write the index to `path`, going through a temp file so readers
    /// never observe a truncated index.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
            }
        }

        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp).map_err(|e| EngineError::io(&tmp, e))?;
            let mut out = BufWriter::new(file);
            self.write_to(&mut out).map_err(|e| EngineError::io(&tmp, e))?;
            out.flush().map_err(|e| EngineError::io(&tmp, e))?;
        }
        fs::rename(&tmp, path).map_err(|e| EngineError::io(path, e))
    }

    fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&(self.dim as u32).to_le_bytes())?;
        out.write_all(&(self.ids.len() as u32).to_le_bytes())?;

        for id in &self.ids {
            out.write_all(&(id.len() as u32).to_le_bytes())?;
            out.write_all(id.as_bytes())?;
        }

        out.write_all(&(self.vecs.len() as u64).to_le_bytes())?;
        for &v in &self.vecs {
            out.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Load an index saved by [`save`](Self::save). Validation failures
    /// leave no partial state behind: either a whole index comes back or
    /// an error does.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
        let mut input = BufReader::new(file);

        let dim = read_u32(&mut input, path)? as usize;
        let n = read_u32(&mut input, path)? as usize;
        if dim == 0 {
            return Err(EngineError::corrupt(path, "dimension is zero"));
        }

        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            let len = read_u32(&mut input, path)? as usize;
            let mut buf = vec![0u8; len];
            input.read_exact(&mut buf).map_err(|e| EngineError::io(path, e))?;
            let id = String::from_utf8(buf)
                .map_err(|_| EngineError::corrupt(path, "document id is not utf-8"))?;
            ids.push(id);
        }

        let element_count = read_u64(&mut input, path)? as usize;
        if element_count != n * dim {
            return Err(EngineError::corrupt(
                path,
                format!("element count {element_count} does not match n*dim = {}", n * dim),
            ));
        }

        let mut vecs = Vec::with_capacity(element_count);
        let mut buf = [0u8; 4];
        for _ in 0..element_count {
            input.read_exact(&mut buf).map_err(|e| EngineError::io(path, e))?;
            vecs.push(f32::from_le_bytes(buf));
        }

        // The byte count must match exactly; trailing bytes mean the file
        // was not written by this format.
        let mut trailing = [0u8; 1];
        match input.read(&mut trailing) {
            Ok(0) => {}
            Ok(_) => return Err(EngineError::corrupt(path, "trailing bytes after vector data")),
            Err(e) => return Err(EngineError::io(path, e)),
        }

        Ok(Self { ids, vecs, dim })
    }
}

fn read_u32(input: &mut impl Read, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf).map_err(|e| EngineError::io(path, e))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(input: &mut impl Read, path: &Path) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf).map_err(|e| EngineError::io(path, e))?;
    Ok(u64::from_le_bytes(buf))
}
