use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::AbstractResume;
use crate::scorer::{ScoredBullet, Section};
use crate::selector::{SelectionDecision, SelectorConfig};

/// Explainability artifact written after selection; the validator
/// re-checks it against the resume and the configured caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainabilityDoc {
    pub role: String,
    pub config: SelectorConfig,
    pub num_candidates: usize,
    pub selected: Vec<ScoredBullet>,
    pub decisions: Vec<SelectionDecision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bullet_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub pass: bool,
    pub errors: Vec<ValidationError>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self { pass: true, errors: Vec::new() }
    }
}

impl ValidationReport {
    fn add(&mut self, code: &str, message: impl Into<String>, bullet_id: &str) {
        self.pass = false;
        self.errors.push(ValidationError {
            code: code.to_string(),
            message: message.into(),
            bullet_id: bullet_id.to_string(),
        });
    }
}

pub struct ValidationInputs {
    pub resume_path: PathBuf,
    pub outdir: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let file = File::open(path).ok()?;
    serde_json::from_reader(BufReader::new(file)).ok()
}

/// Re-validate a finished run from its on-disk artifacts.
///
/// Missing or unreadable artifacts become report errors rather than
/// hard failures, so a broken run still produces a diagnosable report.
pub fn validate_run(inputs: &ValidationInputs) -> ValidationReport {
    let mut rep = ValidationReport::default();

    let explain_path = inputs.outdir.join("explainability.json");
    let profile_path = inputs.outdir.join("profile.json");
    let scores_path = inputs.outdir.join("bullet_scores.json");
    let resume_md = inputs.outdir.join("resume.md");

    for (path, what) in [
        (&inputs.resume_path, "resume"),
        (&explain_path, "explainability.json"),
        (&profile_path, "profile.json"),
        (&scores_path, "bullet_scores.json"),
        (&resume_md, "resume.md"),
    ] {
        if !path.exists() {
            rep.add("missing_file", format!("{what} does not exist: {}", path.display()), "");
        }
    }
    if !rep.pass {
        return rep;
    }

    let Some(resume) = read_json::<AbstractResume>(&inputs.resume_path) else {
        rep.add("parse_error", format!("failed to parse {}", inputs.resume_path.display()), "");
        return rep;
    };
    let Some(doc) = read_json::<ExplainabilityDoc>(&explain_path) else {
        rep.add("parse_error", format!("failed to parse {}", explain_path.display()), "");
        return rep;
    };

    check_constraints(&resume, &doc, &mut rep);
    rep
}

fn check_constraints(resume: &AbstractResume, doc: &ExplainabilityDoc, rep: &mut ValidationReport) {
    let cfg = &doc.config;

    if doc.selected.len() > cfg.max_total_bullets {
        rep.add("constraint_violation", "selected bullets exceed max_total_bullets", "");
    }

    let mut resume_ids: HashSet<&str> = HashSet::new();
    for e in &resume.experiences {
        for b in &e.bullets {
            resume_ids.insert(&b.id);
        }
    }
    for p in &resume.projects {
        for b in &p.bullets {
            resume_ids.insert(&b.id);
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut per_parent: HashMap<String, usize> = HashMap::new();
    let mut exp_count = 0usize;
    let mut proj_count = 0usize;

    for b in &doc.selected {
        if !resume_ids.contains(b.bullet_id.as_str()) {
            rep.add(
                "unknown_bullet",
                format!("selected bullet is not in the resume: {}", b.bullet_id),
                &b.bullet_id,
            );
        }
        if !seen.insert(&b.bullet_id) {
            rep.add(
                "duplicate_bullet",
                format!("bullet selected more than once: {}", b.bullet_id),
                &b.bullet_id,
            );
        }

        let key = b.parent_key();
        let count = per_parent.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > cfg.max_bullets_per_parent {
            rep.add(
                "constraint_violation",
                format!("max_bullets_per_parent exceeded for {key}"),
                &b.bullet_id,
            );
        }

        match b.section {
            Section::Experience => exp_count += 1,
            Section::Project => proj_count += 1,
        }
    }

    if exp_count > cfg.max_experience_bullets {
        rep.add("constraint_violation", "max_experience_bullets exceeded", "");
    }
    if proj_count > cfg.max_project_bullets {
        rep.add("constraint_violation", "max_project_bullets exceeded", "");
    }

    let unique_parents: HashSet<String> =
        doc.selected.iter().map(ScoredBullet::parent_key).collect();
    if !doc.selected.is_empty() && unique_parents.len() < cfg.min_unique_parents {
        rep.add("constraint_violation", "min_unique_parents not satisfied", "");
    }

    if doc.decisions.len() != doc.num_candidates {
        rep.add(
            "decision_trail_incomplete",
            format!(
                "expected {} decisions, found {}",
                doc.num_candidates,
                doc.decisions.len()
            ),
            "",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bullet, Experience, RoleProfile};
    use crate::scorer::{score_bullets, ScoreConfig};
    use crate::selector::select_bullets;
    use std::io::Write;

    fn resume() -> AbstractResume {
        AbstractResume {
            experiences: vec![Experience {
                id: "e1".into(),
                title: "Engineer".into(),
                organization: String::new(),
                dates: String::new(),
                bullets: vec![
                    Bullet { id: "b1".into(), text: "did c++".into(), tags: vec!["c++".into()] },
                    Bullet { id: "b2".into(), text: "did linux".into(), tags: vec!["linux".into()] },
                ],
            }],
            projects: vec![],
        }
    }

    fn write_run(dir: &Path, doc: &ExplainabilityDoc, resume: &AbstractResume) -> ValidationInputs {
        let resume_path = dir.join("resume.json");
        serde_json::to_writer(File::create(&resume_path).unwrap(), resume).unwrap();
        serde_json::to_writer(File::create(dir.join("explainability.json")).unwrap(), doc).unwrap();
        serde_json::to_writer(
            File::create(dir.join("profile.json")).unwrap(),
            &RoleProfile::default(),
        )
        .unwrap();
        File::create(dir.join("bullet_scores.json")).unwrap().write_all(b"{}").unwrap();
        File::create(dir.join("resume.md")).unwrap().write_all(b"# resume").unwrap();
        ValidationInputs { resume_path, outdir: dir.to_path_buf() }
    }

    fn doc_for(resume: &AbstractResume) -> ExplainabilityDoc {
        let profile = RoleProfile {
            role: "r".into(),
            core_skills: vec![],
            skill_weights: [("c++".to_string(), 1.0), ("linux".to_string(), 1.0)]
                .into_iter()
                .collect(),
        };
        let scored = score_bullets(resume, &profile, &ScoreConfig::default(), None).unwrap();
        let result = select_bullets(&scored, &SelectorConfig::default());
        ExplainabilityDoc {
            role: "r".into(),
            config: result.config.clone(),
            num_candidates: scored.len(),
            selected: result.selected,
            decisions: result.decisions,
        }
    }

    #[test]
    fn valid_run_passes() {
        let dir = tempfile::tempdir().unwrap();
        let resume = resume();
        let doc = doc_for(&resume);
        let inputs = write_run(dir.path(), &doc, &resume);
        let rep = validate_run(&inputs);
        assert!(rep.pass, "unexpected errors: {:?}", rep.errors);
    }

    #[test]
    fn missing_artifacts_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = ValidationInputs {
            resume_path: dir.path().join("resume.json"),
            outdir: dir.path().to_path_buf(),
        };
        let rep = validate_run(&inputs);
        assert!(!rep.pass);
        assert!(rep.errors.iter().all(|e| e.code == "missing_file"));
    }

    #[test]
    fn cap_violations_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let resume = resume();
        let mut doc = doc_for(&resume);
        doc.config.max_total_bullets = 1; // selected has two bullets
        let inputs = write_run(dir.path(), &doc, &resume);
        let rep = validate_run(&inputs);
        assert!(!rep.pass);
        assert!(rep.errors.iter().any(|e| e.code == "constraint_violation"));
    }

    #[test]
    fn unknown_selected_bullet_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let resume = resume();
        let mut doc = doc_for(&resume);
        doc.selected[0].bullet_id = "ghost".into();
        let inputs = write_run(dir.path(), &doc, &resume);
        let rep = validate_run(&inputs);
        assert!(rep.errors.iter().any(|e| e.code == "unknown_bullet"));
    }

    #[test]
    fn short_decision_trail_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let resume = resume();
        let mut doc = doc_for(&resume);
        doc.decisions.pop();
        let inputs = write_run(dir.path(), &doc, &resume);
        let rep = validate_run(&inputs);
        assert!(rep.errors.iter().any(|e| e.code == "decision_trail_incomplete"));
    }
}
