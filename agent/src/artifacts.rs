use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use engine::rerank::RankedPosting;
use engine::scorer::{ScoredBullet, Section};
use engine::validator::ExplainabilityDoc;

/// bullet_scores.json: the full scored candidate list with provenance.
#[derive(Debug, Serialize)]
pub struct BulletScoresDoc<'a> {
    pub role: &'a str,
    pub num_bullets: usize,
    pub resume_path: String,
    pub profile_path: String,
    pub bullets: &'a [ScoredBullet],
}

/// One mentions.jsonl record per reranked posting.
#[derive(Debug, Serialize)]
pub struct MentionRecord<'a> {
    pub posting_id: &'a str,
    pub title: &'a str,
    pub combined: f64,
    pub embedding: f64,
    pub lexical: f64,
    pub skills_by_category: BTreeMap<String, Vec<String>>,
}

impl<'a> MentionRecord<'a> {
    pub fn new(hit: &'a RankedPosting, categories: &[(String, Vec<String>)]) -> Self {
        Self {
            posting_id: &hit.doc_id,
            title: &hit.title,
            combined: hit.final_score,
            embedding: hit.embedding_score,
            lexical: hit.lexical_score,
            skills_by_category: categories
                .iter()
                .filter(|(_, skills)| !skills.is_empty())
                .cloned()
                .collect(),
        }
    }
}

pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, value)
        .with_context(|| format!("writing {}", path.display()))?;
    file.write_all(b"\n")?;
    Ok(())
}

pub fn append_jsonl(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let line = serde_json::to_string(value)?;
    writeln!(file, "{line}").with_context(|| format!("appending to {}", path.display()))?;
    Ok(())
}

/// Render the selected bullets as Markdown, grouped by section and then
/// by parent in selection order.
pub fn render_resume_markdown(doc: &ExplainabilityDoc) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Resume: {}\n", doc.role));

    for section in [Section::Experience, Section::Project] {
        let in_section: Vec<&ScoredBullet> =
            doc.selected.iter().filter(|b| b.section == section).collect();
        if in_section.is_empty() {
            continue;
        }

        out.push_str(&format!("\n## {section}\n"));

        let mut parent_order: Vec<&str> = Vec::new();
        for b in &in_section {
            if !parent_order.contains(&b.parent_id.as_str()) {
                parent_order.push(&b.parent_id);
            }
        }

        for parent in parent_order {
            let bullets: Vec<&&ScoredBullet> =
                in_section.iter().filter(|b| b.parent_id == parent).collect();
            out.push_str(&format!("\n### {}\n", bullets[0].parent_title));
            for b in bullets {
                out.push_str(&format!("- {}\n", b.text));
            }
        }
    }

    out
}

pub fn write_resume_markdown(path: &Path, doc: &ExplainabilityDoc) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(path, render_resume_markdown(doc))
        .with_context(|| format!("writing {}", path.display()))
}
