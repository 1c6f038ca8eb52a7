use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One job posting. `id` is the filename stem it was loaded from and is
/// unique across the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub raw_text: String,
}

/// Role profile consumed by the scorer. Keys of `skill_weights` are
/// normalized/canonicalized skill strings; weights are non-negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role: String,
    #[serde(default)]
    pub core_skills: Vec<String>,
    #[serde(default)]
    pub skill_weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bullet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub bullets: Vec<Bullet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub bullets: Vec<Bullet>,
}

/// Resume content as authored, before any role-specific selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbstractResume {
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl AbstractResume {
    pub fn bullet_count(&self) -> usize {
        self.experiences.iter().map(|e| e.bullets.len()).sum::<usize>()
            + self.projects.iter().map(|p| p.bullets.len()).sum::<usize>()
    }
}
