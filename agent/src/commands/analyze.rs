use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use tracing::info;

use engine::embedder::{HashEmbedder, TextEmbedder};
use engine::extract;
use engine::lexical::TfidfIndex;
use engine::llm::{LlmClient, MockLlmClient, NullLlmClient};
use engine::models::Posting;
use engine::profile::{build_role_profile, PostingAnalysis};
use engine::rerank::{rerank, Candidate, RerankConfig};
use engine::vector_index::EmbeddingIndex;
use engine::wordpiece::WordPieceTokenizer;

use crate::artifacts::{self, MentionRecord};
use crate::corpus;

const QUERY_EMBED_MAX_LEN: usize = 64;
/// Retrieve well past top-k so the reranker has candidates to demote.
const RETRIEVAL_FLOOR: usize = 50;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Role query, e.g. "C++ Backend Engineer"
    #[arg(long)]
    pub role: String,
    /// Directory of posting .txt files
    #[arg(long, default_value = "data/jobs/raw")]
    pub jobs: PathBuf,
    /// Number of postings to keep after reranking
    #[arg(long, default_value_t = 25)]
    pub topk: usize,
    /// Minimum embedding similarity before rerank
    #[arg(long, default_value_t = 0.30)]
    pub min_score: f32,
    /// Embedding index produced by `agent embed`
    #[arg(long, default_value = "data/embeddings/jobs.bin")]
    pub emb: PathBuf,
    /// Wordpiece vocabulary file
    #[arg(long, default_value = "models/emb/vocab.txt")]
    pub vocab: PathBuf,
    /// Embedding dimension (must match the index)
    #[arg(long, default_value_t = HashEmbedder::DEFAULT_DIM)]
    pub dim: usize,
    /// Directory of cached evidence fixtures; omitted = no LLM evidence
    #[arg(long)]
    pub llm_cache: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = "out")]
    pub out: PathBuf,
}

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    ensure!(!args.role.trim().is_empty(), "invalid configuration: --role must not be empty");
    ensure!(args.min_score.is_finite(), "invalid configuration: --min-score must be finite");
    ensure!(args.dim > 0, "invalid configuration: --dim must be positive");
    let topk = args.topk.max(1);

    let postings = corpus::load_dir(&args.jobs)?;
    info!(role = %args.role, postings = postings.len(), "analyzing corpus");

    let tfidf = TfidfIndex::build(&postings);
    info!(num_docs = tfidf.num_docs(), num_terms = tfidf.vocab_size(), "lexical index built");

    let index = EmbeddingIndex::load(&args.emb)
        .with_context(|| format!("loading embedding index {} (run `agent embed` first)", args.emb.display()))?;

    let tokenizer =
        WordPieceTokenizer::load_vocab(&args.vocab).context("loading embedder vocabulary")?;
    let embedder = HashEmbedder::new(tokenizer, args.dim);

    // A query with no embedding means no retrieval at all.
    let query = embedder.embed(&args.role, QUERY_EMBED_MAX_LEN);
    if query.is_empty() {
        return Err(engine::EngineError::EmbeddingUnavailable {
            what: format!("query role '{}'", args.role),
        }
        .into());
    }

    let bigk = topk.max(RETRIEVAL_FLOOR);
    let hits = index.topk(&query, bigk)?;
    let kept: Vec<_> = hits.into_iter().filter(|h| h.score >= args.min_score).collect();
    info!(kept = kept.len(), min_score = args.min_score, "dense retrieval complete");

    let by_id: HashMap<&str, &Posting> =
        postings.iter().map(|p| (p.id.as_str(), p)).collect();

    let candidates: Vec<Candidate<'_>> = kept
        .iter()
        .filter_map(|h| {
            by_id.get(h.doc_id.as_str()).map(|p| Candidate {
                doc_id: &p.id,
                raw_text: &p.raw_text,
                embedding_score: f64::from(h.score),
            })
        })
        .collect();

    let ranked = rerank(&args.role, &candidates, &tfidf, &RerankConfig::default(), topk);
    info!(ranked = ranked.len(), "rerank complete");

    let llm: Box<dyn LlmClient> = match &args.llm_cache {
        Some(dir) => Box::new(MockLlmClient::new(dir.clone())),
        None => Box::new(NullLlmClient),
    };

    let mentions_path = args.out.join("mentions.jsonl");
    // mentions.jsonl is rebuilt per analysis, not accumulated across runs
    let _ = fs::remove_file(&mentions_path);

    let mut analyses = Vec::with_capacity(ranked.len());
    for hit in &ranked {
        let posting = by_id[hit.doc_id.as_str()];
        let reqs = extract::extract(&posting.raw_text);
        let evidence = llm.analyze_posting(&posting.id, &posting.raw_text);

        artifacts::append_jsonl(&mentions_path, &MentionRecord::new(hit, &reqs.by_category))?;
        analyses.push(PostingAnalysis { posting_id: posting.id.clone(), reqs, evidence });
    }

    let profile = build_role_profile(&args.role, &analyses);
    let profile_path = args.out.join("profile.json");
    artifacts::write_json(&profile_path, &profile)?;

    info!(
        profile = %profile_path.display(),
        skills = profile.skill_weights.len(),
        core = profile.core_skills.len(),
        "analysis complete"
    );
    Ok(())
}
