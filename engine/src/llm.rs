use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One skill surfaced by evidence extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillHit {
    pub raw: String,
    pub canonical: String,
    #[serde(default)]
    pub confidence: f64,
}

/// One evidence span extracted from a posting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub span_type: String,
    pub span_text: String,
    /// "positive" | "negated"
    #[serde(default)]
    pub polarity: String,
    /// "must" | "should" | "nice" | "unknown"
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub skills: Vec<SkillHit>,
}

/// Evidence-extraction boundary. The engine only consumes the spans;
/// prompting, caching and transport live behind this trait.
pub trait LlmClient {
    fn analyze_posting(&self, posting_id: &str, posting_text: &str) -> Vec<EvidenceSpan>;
}

/// Default client: no evidence. Scoring degrades to the lexicon-only
/// path without error, so tests never need a live model.
#[derive(Debug, Default)]
pub struct NullLlmClient;

impl LlmClient for NullLlmClient {
    fn analyze_posting(&self, _posting_id: &str, _posting_text: &str) -> Vec<EvidenceSpan> {
        Vec::new()
    }
}

/// File-backed client reading pre-extracted evidence from
/// `<root>/<posting_id>.json`. Missing or malformed fixtures yield no
/// spans rather than failing the analysis.
#[derive(Debug)]
pub struct MockLlmClient {
    root: PathBuf,
}

impl MockLlmClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LlmClient for MockLlmClient {
    fn analyze_posting(&self, posting_id: &str, _posting_text: &str) -> Vec<EvidenceSpan> {
        let path = self.root.join(format!("{posting_id}.json"));
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(spans) => spans,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed evidence fixture");
                Vec::new()
            }
        }
    }
}
