use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use engine::embedder::HashEmbedder;
use engine::models::{AbstractResume, RoleProfile};
use engine::scorer::{score_bullets, ScoreConfig};
use engine::selector::{select_bullets, SelectorConfig};
use engine::semantic::{build_profile_matcher, SemanticMatcher, SemanticMatcherConfig};
use engine::validator::ExplainabilityDoc;
use engine::wordpiece::WordPieceTokenizer;

use crate::artifacts::{self, BulletScoresDoc};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Role label for the artifacts; defaults to the profile's role
    #[arg(long)]
    pub role: Option<String>,
    /// Abstract resume JSON
    #[arg(long, default_value = "data/abstract_resume.json")]
    pub resume: PathBuf,
    /// Role profile JSON produced by `agent analyze`
    #[arg(long, default_value = "out/profile.json")]
    pub profile: PathBuf,
    /// Output directory
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Enable embedding-based semantic tag matching
    #[arg(long)]
    pub semantic: bool,
    /// Wordpiece vocabulary file (semantic matching only)
    #[arg(long, default_value = "models/emb/vocab.txt")]
    pub vocab: PathBuf,
    /// Embedding dimension (semantic matching only)
    #[arg(long, default_value_t = HashEmbedder::DEFAULT_DIM)]
    pub dim: usize,
    #[arg(long, default_value_t = 0.66)]
    pub semantic_threshold: f64,
    #[arg(long, default_value_t = 1)]
    pub semantic_topk: usize,
    #[arg(long, default_value_t = 0.25)]
    pub semantic_weight_scale: f64,
    #[arg(long, default_value_t = 0.01)]
    pub semantic_min_contribution: f64,
    /// Optional on-disk cache for the profile skill index
    #[arg(long)]
    pub semantic_cache: Option<PathBuf>,

    #[arg(long, default_value_t = 0.15)]
    pub core_bonus: f64,
    #[arg(long, default_value_t = 10)]
    pub max_total_bullets: usize,
    #[arg(long, default_value_t = 3)]
    pub max_bullets_per_parent: usize,
    #[arg(long, default_value_t = 6)]
    pub max_experience_bullets: usize,
    #[arg(long, default_value_t = 4)]
    pub max_project_bullets: usize,
    #[arg(long, default_value_t = 2)]
    pub min_unique_parents: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {what}: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {what}: {}", path.display()))
}

pub fn execute(args: &BuildArgs) -> Result<()> {
    let score_cfg = ScoreConfig {
        core_bonus: args.core_bonus,
        semantic_enabled: args.semantic,
        semantic_threshold: args.semantic_threshold,
        semantic_weight_scale: args.semantic_weight_scale,
        semantic_min_contribution: args.semantic_min_contribution,
    };
    // Bad numeric knobs fail before any file or index work.
    score_cfg.validate()?;

    let selector_cfg = SelectorConfig {
        max_total_bullets: args.max_total_bullets,
        max_bullets_per_parent: args.max_bullets_per_parent,
        max_experience_bullets: args.max_experience_bullets,
        max_project_bullets: args.max_project_bullets,
        min_unique_parents: args.min_unique_parents,
    };

    let resume: AbstractResume = read_json(&args.resume, "resume")?;
    let profile: RoleProfile = read_json(&args.profile, "profile")?;
    let role = args.role.clone().unwrap_or_else(|| profile.role.clone());

    // The matcher borrows the embedder, so both live in this scope.
    let embedder = if args.semantic {
        let tokenizer = WordPieceTokenizer::load_vocab(&args.vocab)
            .context("loading embedder vocabulary for semantic matching")?;
        Some(HashEmbedder::new(tokenizer, args.dim))
    } else {
        None
    };
    let matcher = match &embedder {
        Some(emb) => Some(build_profile_matcher(
            &profile,
            emb,
            SemanticMatcherConfig {
                threshold: args.semantic_threshold,
                topk: args.semantic_topk,
                cache_path: args.semantic_cache.clone(),
            },
        )?),
        None => None,
    };
    let matcher_ref: Option<&dyn SemanticMatcher> =
        matcher.as_ref().map(|m| m as &dyn SemanticMatcher);

    let scored = score_bullets(&resume, &profile, &score_cfg, matcher_ref)?;
    let result = select_bullets(&scored, &selector_cfg);

    let scores_doc = BulletScoresDoc {
        role: &role,
        num_bullets: scored.len(),
        resume_path: args.resume.display().to_string(),
        profile_path: args.profile.display().to_string(),
        bullets: &scored,
    };
    artifacts::write_json(&args.out.join("bullet_scores.json"), &scores_doc)?;

    let explain = ExplainabilityDoc {
        role: role.clone(),
        config: result.config.clone(),
        num_candidates: scored.len(),
        selected: result.selected,
        decisions: result.decisions,
    };
    artifacts::write_json(&args.out.join("explainability.json"), &explain)?;
    artifacts::write_resume_markdown(&args.out.join("resume.md"), &explain)?;

    info!(
        role = %role,
        bullets = scored.len(),
        selected = explain.selected.len(),
        semantic = args.semantic,
        out = %args.out.display(),
        "build complete"
    );
    Ok(())
}
