use crate::wordpiece::WordPieceTokenizer;

/// Text embedding boundary.
///
/// Implementations return a mean-pooled, L2-normalized vector, or an
/// empty vector when no embedding can be produced. Callers must treat an
/// empty vector as "no embedding available" and never feed it into
/// cosine math.
pub trait TextEmbedder {
    fn embed(&self, text: &str, max_len: usize) -> Vec<f32>;

    fn dim(&self) -> usize;
}

/// FNV-1a offset basis / prime (64-bit).
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Deterministic hash embedder.
///
/// Each wordpiece id hashes (FNV-1a) to a seed that drives a splitmix64
/// stream of pseudo-random components in [-1, 1]; token vectors are
/// mean-pooled over the encoded sequence and L2-normalized. No model
/// weights are involved, so identical text always embeds identically and
/// `cosine(embed(t), embed(t)) == 1.0`.
pub struct HashEmbedder {
    tokenizer: WordPieceTokenizer,
    dim: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIM: usize = 384;

    pub fn new(tokenizer: WordPieceTokenizer, dim: usize) -> Self {
        Self { tokenizer, dim }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut h = FNV_OFFSET;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    fn splitmix64(state: &mut u64) -> u64 {
        *state = state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = *state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn accumulate_token(&self, id: i64, pooled: &mut [f32]) {
        let mut state = Self::fnv1a(&id.to_le_bytes());
        for slot in pooled.iter_mut() {
            let r = Self::splitmix64(&mut state);
            // map to [-1, 1]
            let unit = (r >> 11) as f64 / (1u64 << 53) as f64;
            *slot += (unit * 2.0 - 1.0) as f32;
        }
    }
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str, max_len: usize) -> Vec<f32> {
        if self.dim == 0 || max_len < 2 {
            return Vec::new();
        }

        let ids = self.tokenizer.encode(text, max_len);
        if ids.is_empty() {
            return Vec::new();
        }

        let mut pooled = vec![0.0f32; self.dim];
        for &id in &ids {
            self.accumulate_token(id, &mut pooled);
        }

        let inv = 1.0 / ids.len() as f32;
        for x in pooled.iter_mut() {
            *x *= inv;
        }

        let norm2: f64 = pooled.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
        if norm2 <= 0.0 {
            return Vec::new();
        }
        let inv_norm = (1.0 / norm2.sqrt()) as f32;
        for x in pooled.iter_mut() {
            *x *= inv_norm;
        }

        pooled
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
