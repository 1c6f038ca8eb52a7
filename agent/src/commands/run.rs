use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use engine::embedder::HashEmbedder;
use engine::validator::{validate_run, ValidationError, ValidationInputs};

use crate::artifacts;
use crate::commands::{analyze, build};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Role query, e.g. "C++ Backend Engineer"
    #[arg(long)]
    pub role: String,
    /// Abstract resume JSON
    #[arg(long)]
    pub resume: PathBuf,
    /// Directory of posting .txt files
    #[arg(long, default_value = "data/jobs/raw")]
    pub jobs: PathBuf,
    /// Embedding index produced by `agent embed`
    #[arg(long, default_value = "data/embeddings/jobs.bin")]
    pub emb: PathBuf,
    /// Wordpiece vocabulary file
    #[arg(long, default_value = "models/emb/vocab.txt")]
    pub vocab: PathBuf,
    /// Embedding dimension
    #[arg(long, default_value_t = HashEmbedder::DEFAULT_DIM)]
    pub dim: usize,
    /// Directory of cached evidence fixtures
    #[arg(long)]
    pub llm_cache: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = "out")]
    pub out: PathBuf,
}

/// One retry step. `None` keeps the build default for that knob.
#[derive(Debug, Clone, Default, Serialize)]
struct BuildTweak {
    max_total_bullets: Option<usize>,
    max_experience_bullets: Option<usize>,
    max_project_bullets: Option<usize>,
    max_bullets_per_parent: Option<usize>,
    semantic_threshold: Option<f64>,
}

/// Deterministic retry schedule: relax the bullet caps, then the
/// semantic threshold, then the per-parent cap.
fn retry_plan() -> Vec<BuildTweak> {
    let base = BuildTweak::default();
    let relaxed_caps = BuildTweak {
        max_total_bullets: Some(12),
        max_experience_bullets: Some(7),
        max_project_bullets: Some(5),
        ..BuildTweak::default()
    };
    let relaxed_threshold =
        BuildTweak { semantic_threshold: Some(0.62), ..relaxed_caps.clone() };
    let relaxed_parent =
        BuildTweak { max_bullets_per_parent: Some(4), ..relaxed_threshold.clone() };
    vec![base, relaxed_caps, relaxed_threshold, relaxed_parent]
}

#[derive(Debug, Serialize)]
struct AttemptRecord<'a> {
    attempt: usize,
    build_ok: bool,
    pass: bool,
    tweak: &'a BuildTweak,
    errors: &'a [ValidationError],
}

fn build_args_for(args: &RunArgs, profile_path: &PathBuf, tweak: &BuildTweak) -> build::BuildArgs {
    let defaults = build::BuildArgs {
        role: Some(args.role.clone()),
        resume: args.resume.clone(),
        profile: profile_path.clone(),
        out: args.out.clone(),
        semantic: true,
        vocab: args.vocab.clone(),
        dim: args.dim,
        semantic_threshold: 0.66,
        semantic_topk: 1,
        semantic_weight_scale: 0.25,
        semantic_min_contribution: 0.01,
        semantic_cache: Some(args.out.join("profile_skill_index.bin")),
        core_bonus: 0.15,
        max_total_bullets: 10,
        max_bullets_per_parent: 3,
        max_experience_bullets: 6,
        max_project_bullets: 4,
        min_unique_parents: 2,
    };
    build::BuildArgs {
        semantic_threshold: tweak.semantic_threshold.unwrap_or(defaults.semantic_threshold),
        max_total_bullets: tweak.max_total_bullets.unwrap_or(defaults.max_total_bullets),
        max_experience_bullets: tweak
            .max_experience_bullets
            .unwrap_or(defaults.max_experience_bullets),
        max_project_bullets: tweak.max_project_bullets.unwrap_or(defaults.max_project_bullets),
        max_bullets_per_parent: tweak
            .max_bullets_per_parent
            .unwrap_or(defaults.max_bullets_per_parent),
        ..defaults
    }
}

pub fn execute(args: &RunArgs) -> Result<()> {
    let profile_path = args.out.join("profile.json");
    let attempts_path = args.out.join("run_attempts.jsonl");
    let report_path = args.out.join("validation_report.json");
    let manifest_path = args.out.join("run_manifest.json");
    let _ = fs::remove_file(&attempts_path);

    // 1) Analyze once; its profile feeds every build attempt.
    analyze::execute(&analyze::AnalyzeArgs {
        role: args.role.clone(),
        jobs: args.jobs.clone(),
        topk: 25,
        min_score: 0.30,
        emb: args.emb.clone(),
        vocab: args.vocab.clone(),
        dim: args.dim,
        llm_cache: args.llm_cache.clone(),
        out: args.out.clone(),
    })?;

    // 2) Build + validate loop over the retry schedule.
    let plan = retry_plan();
    let mut success = false;

    for (i, tweak) in plan.iter().enumerate() {
        let attempt = i + 1;
        let build_result = build::execute(&build_args_for(args, &profile_path, tweak));
        let build_ok = match &build_result {
            Ok(()) => true,
            Err(e) => {
                warn!(attempt, error = %e, "build attempt failed");
                false
            }
        };

        let report = validate_run(&ValidationInputs {
            resume_path: args.resume.clone(),
            outdir: args.out.clone(),
        });
        artifacts::write_json(&report_path, &report)?;

        artifacts::append_jsonl(
            &attempts_path,
            &AttemptRecord { attempt, build_ok, pass: report.pass, tweak, errors: &report.errors },
        )?;

        if build_ok && report.pass {
            info!(attempt, "run validated");
            success = true;
            break;
        }
    }

    // 3) Manifest is written no matter how the loop ended.
    let manifest = serde_json::json!({
        "role": args.role,
        "resume_path": args.resume.display().to_string(),
        "outdir": args.out.display().to_string(),
        "created_at": OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        "artifacts": {
            "profile_json": profile_path.display().to_string(),
            "mentions_jsonl": args.out.join("mentions.jsonl").display().to_string(),
            "bullet_scores_json": args.out.join("bullet_scores.json").display().to_string(),
            "explainability_json": args.out.join("explainability.json").display().to_string(),
            "resume_md": args.out.join("resume.md").display().to_string(),
            "validation_report_json": report_path.display().to_string(),
            "run_attempts_jsonl": attempts_path.display().to_string(),
            "run_manifest_json": manifest_path.display().to_string(),
        },
    });
    artifacts::write_json(&manifest_path, &manifest)?;

    if !success {
        bail!(
            "validation failed after {} attempts, see {} and {}",
            plan.len(),
            report_path.display(),
            attempts_path.display()
        );
    }
    Ok(())
}
