use std::collections::HashSet;
use std::path::PathBuf;

use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::embedder::TextEmbedder;
use crate::models::RoleProfile;
use crate::scorer::canonicalize;
use crate::vector_index::EmbeddingIndex;
use crate::Result;

const SKILL_EMBED_MAX_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct SemanticHit {
    /// matched profile skill (canonical key)
    pub skill: String,
    /// cosine similarity against the skill embedding
    pub similarity: f64,
}

/// Embedding-based fallback lookup for tags with no exact profile match.
pub trait SemanticMatcher {
    /// Best profile skill at or above the configured threshold, if any.
    /// `None` is the normal "no match" outcome, never an error.
    fn best_match(&self, text: &str) -> Option<SemanticHit>;
}

/// Default matcher: semantic matching disabled.
#[derive(Debug, Default)]
pub struct NullSemanticMatcher;

impl SemanticMatcher for NullSemanticMatcher {
    fn best_match(&self, _text: &str) -> Option<SemanticHit> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct SemanticMatcherConfig {
    pub threshold: f64,
    pub topk: usize,
    /// optional on-disk cache of the profile skill index
    pub cache_path: Option<PathBuf>,
}

impl Default for SemanticMatcherConfig {
    fn default() -> Self {
        Self { threshold: 0.66, topk: 1, cache_path: None }
    }
}

lazy_static! {
    // Short names that really are skills despite being single tokens.
    static ref ALLOW: HashSet<&'static str> = [
        "c", "c++", "c#", "java", "python", "rust", "go", "sql", "linux", "git", "docker",
        "kubernetes", "aws", "gcp", "azure", "grpc", "http", "rest", "mongodb", "postgres",
        "mysql",
    ]
    .into_iter()
    .collect();
    // Generic nouns that embeddings over-match against anything.
    static ref BAN: HashSet<&'static str> = [
        "engineer", "engineers", "developer", "developers", "development", "software", "coding",
        "experience", "best practices", "practices", "talent", "team", "teams", "framework",
        "frameworks",
    ]
    .into_iter()
    .collect();
}

/// Filter for semantic targets: allowlisted names pass, banned generics
/// fail, and everything else must be multi-token with at least one token
/// of four or more characters.
fn is_real_skill_target(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if ALLOW.contains(s) {
        return true;
    }
    if BAN.contains(s) {
        return false;
    }

    let mut token_count = 0;
    let mut has_long_token = false;
    for tok in s.split_whitespace() {
        token_count += 1;
        if tok.chars().count() >= 4 {
            has_long_token = true;
        }
    }
    token_count > 1 && has_long_token
}

/// Matcher backed by a small vector index of eligible profile skills.
pub struct EmbeddingSemanticMatcher<'a> {
    index: EmbeddingIndex,
    embedder: &'a dyn TextEmbedder,
    cfg: SemanticMatcherConfig,
}

impl SemanticMatcher for EmbeddingSemanticMatcher<'_> {
    fn best_match(&self, text: &str) -> Option<SemanticHit> {
        if self.index.is_empty() || self.index.dim() == 0 {
            return None;
        }

        let q = canonicalize(text);
        if q.is_empty() {
            return None;
        }

        let qv = self.embedder.embed(&q, SKILL_EMBED_MAX_LEN);
        if qv.is_empty() {
            return None;
        }

        let k = self.cfg.topk.max(1);
        let hits = self.index.topk(&qv, k).ok()?;
        let best = hits.first()?;

        if f64::from(best.score) < self.cfg.threshold {
            return None;
        }
        Some(SemanticHit { skill: best.doc_id.clone(), similarity: f64::from(best.score) })
    }
}

fn build_index_from_profile(
    profile: &RoleProfile,
    embedder: &dyn TextEmbedder,
) -> Result<EmbeddingIndex> {
    // Canonicalize, filter junk targets, dedupe deterministically.
    let mut skills: Vec<String> = profile
        .skill_weights
        .keys()
        .map(|s| canonicalize(s))
        .filter(|s| is_real_skill_target(s))
        .collect();
    skills.sort();
    skills.dedup();

    let mut index = EmbeddingIndex::new();
    for skill in skills {
        let v = embedder.embed(&skill, SKILL_EMBED_MAX_LEN);
        if v.is_empty() {
            debug!(skill, "skipping profile skill with no embedding");
            continue;
        }
        index.push(skill, v)?;
    }
    Ok(index)
}

/// Build the per-profile matcher, reusing the cached skill index when a
/// valid one exists at `cache_path`.
pub fn build_profile_matcher<'a>(
    profile: &RoleProfile,
    embedder: &'a dyn TextEmbedder,
    cfg: SemanticMatcherConfig,
) -> Result<EmbeddingSemanticMatcher<'a>> {
    if let Some(cache) = &cfg.cache_path {
        if cache.exists() {
            match EmbeddingIndex::load(cache) {
                Ok(cached) if cached.dim() == embedder.dim() || cached.is_empty() => {
                    debug!(path = %cache.display(), n = cached.len(), "loaded cached skill index");
                    return Ok(EmbeddingSemanticMatcher { index: cached, embedder, cfg });
                }
                Ok(cached) => {
                    warn!(
                        path = %cache.display(),
                        cached_dim = cached.dim(),
                        embedder_dim = embedder.dim(),
                        "skill index cache has wrong dimension, rebuilding"
                    );
                }
                Err(e) => {
                    warn!(path = %cache.display(), error = %e, "unusable skill index cache, rebuilding");
                }
            }
        }
    }

    let index = build_index_from_profile(profile, embedder)?;
    if let Some(cache) = &cfg.cache_path {
        // An empty index has no dimension and would not load back.
        if !index.is_empty() {
            if let Err(e) = index.save(cache) {
                warn!(path = %cache.display(), error = %e, "failed to write skill index cache");
            }
        }
    }

    Ok(EmbeddingSemanticMatcher { index, embedder, cfg })
}
