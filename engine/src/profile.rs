use std::collections::{BTreeMap, HashSet};

use crate::extract::ExtractedReqs;
use crate::llm::EvidenceSpan;
use crate::models::RoleProfile;
use crate::scorer::canonicalize;

/// Everything known about one analyzed posting.
pub struct PostingAnalysis {
    pub posting_id: String,
    pub reqs: ExtractedReqs,
    pub evidence: Vec<EvidenceSpan>,
}

fn strength_factor(strength: &str) -> f64 {
    match strength {
        "must" => 1.0,
        "should" => 0.75,
        "nice" => 0.5,
        _ => 0.5,
    }
}

/// Blend lexicon hits and evidence spans into a role profile.
///
/// A skill's weight is its posting frequency (nice-to-have hits count
/// half) plus evidence confidence scaled by requirement strength;
/// negated evidence contributes nothing. Core skills are those present
/// in a strict majority of the analyzed postings, with the top-weighted
/// skill as a floor so the profile always has one.
pub fn build_role_profile(role: &str, analyses: &[PostingAnalysis]) -> RoleProfile {
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut doc_counts: BTreeMap<String, usize> = BTreeMap::new();

    for analysis in analyses {
        let mut seen_in_posting: HashSet<String> = HashSet::new();

        for (category, phrases) in &analysis.reqs.by_category {
            let base = if category == "nice_to_have" { 0.5 } else { 1.0 };
            for phrase in phrases {
                let skill = canonicalize(phrase);
                if skill.is_empty() {
                    continue;
                }
                *weights.entry(skill.clone()).or_insert(0.0) += base;
                seen_in_posting.insert(skill);
            }
        }

        for span in &analysis.evidence {
            if span.polarity == "negated" {
                continue;
            }
            let factor = strength_factor(&span.strength);
            for hit in &span.skills {
                let skill = canonicalize(if hit.canonical.is_empty() {
                    &hit.raw
                } else {
                    &hit.canonical
                });
                if skill.is_empty() {
                    continue;
                }
                *weights.entry(skill.clone()).or_insert(0.0) +=
                    hit.confidence.clamp(0.0, 1.0) * factor;
                seen_in_posting.insert(skill);
            }
        }

        for skill in seen_in_posting {
            *doc_counts.entry(skill).or_insert(0) += 1;
        }
    }

    let n = analyses.len();
    let mut core_skills: Vec<String> = doc_counts
        .iter()
        .filter(|&(_, &count)| count * 2 > n)
        .map(|(skill, _)| skill.clone())
        .collect();

    if core_skills.is_empty() {
        if let Some(top) = weights
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(skill, _)| skill.clone())
        {
            core_skills.push(top);
        }
    }
    core_skills.sort();

    RoleProfile { role: role.to_string(), core_skills, skill_weights: weights }
}
