use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tracing::{error, info};

use engine::validator::{validate_run, ValidationInputs};

use crate::artifacts;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Abstract resume JSON the run was built from
    #[arg(long, default_value = "data/abstract_resume.json")]
    pub resume: PathBuf,
    /// Output directory of the run to validate
    #[arg(long, default_value = "out")]
    pub out: PathBuf,
}

pub fn execute(args: &ValidateArgs) -> Result<()> {
    let report = validate_run(&ValidationInputs {
        resume_path: args.resume.clone(),
        outdir: args.out.clone(),
    });

    let report_path = args.out.join("validation_report.json");
    artifacts::write_json(&report_path, &report)?;

    if !report.pass {
        for e in &report.errors {
            error!(code = %e.code, bullet_id = %e.bullet_id, "{}", e.message);
        }
        bail!("validation failed with {} error(s), see {}", report.errors.len(), report_path.display());
    }

    info!(report = %report_path.display(), "validation passed");
    Ok(())
}
