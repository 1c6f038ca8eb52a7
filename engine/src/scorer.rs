use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::models::{AbstractResume, Bullet, RoleProfile};
use crate::semantic::SemanticMatcher;
use crate::{EngineError, Result};

lazy_static! {
    /// Skill alias table: verbose profile phrasings collapse onto the
    /// canonical key resume tags actually use.
    static ref SKILL_ALIASES: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("c++ programming language", "c++"),
            ("ruby on rails expertise", "ruby on rails"),
            ("server-side framework expertise", "server-side framework"),
            ("server-side framework experience", "server-side framework"),
            ("client-side framework experience", "client-side framework"),
            ("testing framework expertise", "testing framework"),
            ("open source contribution experience", "open source contribution"),
            ("stakeholder management experience", "stakeholder management"),
            ("technical debt management experience", "technical debt management"),
            ("refactoring expertise", "refactoring"),
            ("no sql database", "nosql database"),
        ];
        pairs.iter().copied().collect()
    };
}

/// Trim + lowercase, then apply the alias table.
pub fn canonicalize(s: &str) -> String {
    let key = s.trim().to_lowercase();
    match SKILL_ALIASES.get(key.as_str()) {
        Some(alias) => (*alias).to_string(),
        None => key,
    }
}

/// Scoring knobs. `validate` runs before any scoring work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub core_bonus: f64,
    pub semantic_enabled: bool,
    /// accept a semantic match if cosine >= threshold
    pub semantic_threshold: f64,
    /// semantic credit is scaled down so it can help but never dominate
    /// an exact match
    pub semantic_weight_scale: f64,
    /// contributions below this floor are treated as noise and dropped
    pub semantic_min_contribution: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            core_bonus: 0.15,
            semantic_enabled: false,
            semantic_threshold: 0.66,
            semantic_weight_scale: 0.25,
            semantic_min_contribution: 0.01,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.core_bonus < 0.0 {
            return Err(EngineError::Config("core_bonus must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(EngineError::Config("semantic_threshold must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.semantic_weight_scale) {
            return Err(EngineError::Config("semantic_weight_scale must be in [0, 1]".into()));
        }
        if self.semantic_min_contribution < 0.0 {
            return Err(EngineError::Config(
                "semantic_min_contribution must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Semantic,
}

/// One credited match; at most one per distinct profile skill per bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub kind: MatchKind,
    pub source_tag: String,
    pub matched_skill: String,
    /// cosine for semantic matches, 1.0 for exact
    pub similarity: f64,
    pub profile_weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub skill: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub raw_skill_sum: f64,
    pub tag_count: usize,
    pub normalized_skill: f64,
    pub core_bonus: f64,
    pub total: f64,
}

/// Resume section. The derived ordering (Experience before Project) is
/// part of the deterministic global sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    Experience,
    Project,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Experience => write!(f, "Experience"),
            Section::Project => write!(f, "Project"),
        }
    }
}

/// Immutable scoring output for one bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredBullet {
    pub bullet_id: String,
    pub section: Section,
    pub parent_id: String,
    pub parent_title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub matched_skills: Vec<MatchedSkill>,
    pub core_hits: Vec<String>,
    pub match_evidence: Vec<MatchEvidence>,
    pub score: ScoreBreakdown,
}

impl ScoredBullet {
    pub fn parent_key(&self) -> String {
        format!("{}::{}", self.section, self.parent_id)
    }
}

fn tag_count_norm(tag_count: usize) -> f64 {
    (1.0 + tag_count as f64).sqrt()
}

/// Linear map of similarity from [threshold, 1] onto [0, 1]; at or below
/// the threshold a match contributes nothing.
fn semantic_scale(similarity: f64, threshold: f64) -> f64 {
    if similarity <= threshold || threshold >= 1.0 {
        return 0.0;
    }
    ((similarity - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
}

fn score_one(
    bullet: &Bullet,
    section: Section,
    parent_id: &str,
    parent_title: &str,
    profile: &RoleProfile,
    core: &HashSet<String>,
    cfg: &ScoreConfig,
    matcher: Option<&dyn SemanticMatcher>,
) -> ScoredBullet {
    let tags: Vec<String> = bullet.tags.iter().map(|t| canonicalize(t)).collect();
    let tag_count = tags.len();

    let mut credited: HashSet<String> = HashSet::new();
    let mut matched_skills: Vec<MatchedSkill> = Vec::new();
    let mut core_hits: Vec<String> = Vec::new();
    let mut evidence: Vec<MatchEvidence> = Vec::new();
    let mut raw = 0.0f64;
    let mut has_core = false;

    for tag in &tags {
        if tag.is_empty() {
            continue;
        }

        // 1) Exact match against the profile.
        if let Some(&weight) = profile.skill_weights.get(tag) {
            if !credited.insert(tag.clone()) {
                continue;
            }
            raw += weight;
            matched_skills.push(MatchedSkill { skill: tag.clone(), weight });
            evidence.push(MatchEvidence {
                kind: MatchKind::Exact,
                source_tag: tag.clone(),
                matched_skill: tag.clone(),
                similarity: 1.0,
                profile_weight: weight,
                contribution: weight,
            });
            if core.contains(tag) {
                has_core = true;
                core_hits.push(tag.clone());
            }
            continue;
        }

        // 2) Semantic fallback through the per-profile vector index.
        if !cfg.semantic_enabled {
            continue;
        }
        let Some(matcher) = matcher else {
            continue;
        };
        let Some(hit) = matcher.best_match(tag) else {
            continue;
        };
        let Some(&profile_weight) = profile.skill_weights.get(&hit.skill) else {
            continue;
        };
        if credited.contains(&hit.skill) {
            continue;
        }

        let contribution = profile_weight
            * cfg.semantic_weight_scale
            * semantic_scale(hit.similarity, cfg.semantic_threshold);
        if contribution < cfg.semantic_min_contribution {
            continue;
        }

        credited.insert(hit.skill.clone());
        raw += contribution;
        matched_skills.push(MatchedSkill { skill: hit.skill.clone(), weight: contribution });
        evidence.push(MatchEvidence {
            kind: MatchKind::Semantic,
            source_tag: tag.clone(),
            matched_skill: hit.skill.clone(),
            similarity: hit.similarity,
            profile_weight,
            contribution,
        });
        if core.contains(&hit.skill) {
            has_core = true;
            core_hits.push(hit.skill.clone());
        }
    }

    matched_skills.sort_by(|a, b| {
        b.weight.total_cmp(&a.weight).then_with(|| a.skill.cmp(&b.skill))
    });
    core_hits.sort();
    core_hits.dedup();
    evidence.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.matched_skill.cmp(&b.matched_skill))
            .then_with(|| a.source_tag.cmp(&b.source_tag))
    });

    let normalized_skill = raw / tag_count_norm(tag_count);
    let core_bonus = if has_core { cfg.core_bonus } else { 0.0 };

    ScoredBullet {
        bullet_id: bullet.id.clone(),
        section,
        parent_id: parent_id.to_string(),
        parent_title: parent_title.to_string(),
        text: bullet.text.clone(),
        tags,
        matched_skills,
        core_hits,
        match_evidence: evidence,
        score: ScoreBreakdown {
            raw_skill_sum: raw,
            tag_count,
            normalized_skill,
            core_bonus,
            total: normalized_skill + core_bonus,
        },
    }
}

/// Deterministic global ordering shared by scorer and selector output:
/// total desc, raw sum desc, core-hit count desc, section asc, id asc.
pub fn sort_scored(bullets: &mut [ScoredBullet]) {
    bullets.sort_by(|a, b| {
        b.score
            .total
            .total_cmp(&a.score.total)
            .then_with(|| b.score.raw_skill_sum.total_cmp(&a.score.raw_skill_sum))
            .then_with(|| b.core_hits.len().cmp(&a.core_hits.len()))
            .then_with(|| a.section.cmp(&b.section))
            .then_with(|| a.bullet_id.cmp(&b.bullet_id))
    });
}

/// Score every bullet of the resume against the role profile.
///
/// Profile keys are canonicalized once up front; a tag credits at most
/// one profile skill and a skill is credited at most once per bullet.
pub fn score_bullets(
    resume: &AbstractResume,
    profile: &RoleProfile,
    cfg: &ScoreConfig,
    matcher: Option<&dyn SemanticMatcher>,
) -> Result<Vec<ScoredBullet>> {
    cfg.validate()?;

    let canonical_profile = RoleProfile {
        role: profile.role.clone(),
        core_skills: profile.core_skills.iter().map(|s| canonicalize(s)).collect(),
        skill_weights: profile
            .skill_weights
            .iter()
            .map(|(k, &v)| (canonicalize(k), v))
            .collect(),
    };
    let core: HashSet<String> = canonical_profile.core_skills.iter().cloned().collect();

    let mut scored = Vec::with_capacity(resume.bullet_count());
    for e in &resume.experiences {
        for b in &e.bullets {
            scored.push(score_one(
                b,
                Section::Experience,
                &e.id,
                &e.title,
                &canonical_profile,
                &core,
                cfg,
                matcher,
            ));
        }
    }
    for p in &resume.projects {
        for b in &p.bullets {
            scored.push(score_one(
                b,
                Section::Project,
                &p.id,
                &p.name,
                &canonical_profile,
                &core,
                cfg,
                matcher,
            ));
        }
    }

    sort_scored(&mut scored);
    Ok(scored)
}
