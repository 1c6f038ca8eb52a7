use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::scorer::{sort_scored, ScoredBullet, Section};

/// Selection caps. All counts, so non-negativity is enforced by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub max_total_bullets: usize,
    pub max_bullets_per_parent: usize,
    pub max_experience_bullets: usize,
    pub max_project_bullets: usize,
    pub min_unique_parents: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_total_bullets: 10,
            max_bullets_per_parent: 3,
            max_experience_bullets: 6,
            max_project_bullets: 4,
            min_unique_parents: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Selected,
    TotalCap,
    ParentCap,
    ExperienceCap,
    ProjectCap,
}

/// One decision per candidate, in score order. The trail is total: every
/// candidate bullet gets exactly one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub bullet_id: String,
    pub accepted: bool,
    pub reason: SelectionReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorResult {
    pub config: SelectorConfig,
    pub selected: Vec<ScoredBullet>,
    pub decisions: Vec<SelectionDecision>,
}

/// Running counters over the selected set. Every mutation goes through
/// `admit` / `remove`, so the counters never drift from the slots.
struct SelectionState<'a> {
    cfg: &'a SelectorConfig,
    selected: Vec<ScoredBullet>,
    parent_counts: HashMap<String, usize>,
    experience_count: usize,
    project_count: usize,
}

impl<'a> SelectionState<'a> {
    fn new(cfg: &'a SelectorConfig) -> Self {
        Self {
            cfg,
            selected: Vec::new(),
            parent_counts: HashMap::new(),
            experience_count: 0,
            project_count: 0,
        }
    }

    fn can_take(&self, b: &ScoredBullet) -> Result<(), SelectionReason> {
        if self.selected.len() >= self.cfg.max_total_bullets {
            return Err(SelectionReason::TotalCap);
        }
        let pc = self.parent_counts.get(&b.parent_key()).copied().unwrap_or(0);
        if pc >= self.cfg.max_bullets_per_parent {
            return Err(SelectionReason::ParentCap);
        }
        match b.section {
            Section::Experience if self.experience_count >= self.cfg.max_experience_bullets => {
                Err(SelectionReason::ExperienceCap)
            }
            Section::Project if self.project_count >= self.cfg.max_project_bullets => {
                Err(SelectionReason::ProjectCap)
            }
            _ => Ok(()),
        }
    }

    fn admit(&mut self, b: ScoredBullet) {
        *self.parent_counts.entry(b.parent_key()).or_insert(0) += 1;
        match b.section {
            Section::Experience => self.experience_count += 1,
            Section::Project => self.project_count += 1,
        }
        self.selected.push(b);
    }

    /// Remove slot `i` and return its bullet so a failed swap can be
    /// reverted with `admit`.
    fn remove(&mut self, i: usize) -> ScoredBullet {
        let b = self.selected.remove(i);
        let key = b.parent_key();
        if let Some(c) = self.parent_counts.get_mut(&key) {
            *c -= 1;
            if *c == 0 {
                self.parent_counts.remove(&key);
            }
        }
        match b.section {
            Section::Experience => self.experience_count -= 1,
            Section::Project => self.project_count -= 1,
        }
        b
    }

    fn unique_parents(&self) -> usize {
        self.selected.iter().map(ScoredBullet::parent_key).collect::<HashSet<_>>().len()
    }

    fn has_parent(&self, key: &str) -> bool {
        self.parent_counts.contains_key(key)
    }

    /// Lowest-total bullet in `section` whose parent holds more than one
    /// selected bullet; swapping it out increases diversity without
    /// touching the section caps.
    fn lowest_replaceable(&self, section: Section, new_parent: &str) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, b) in self.selected.iter().enumerate() {
            if b.section != section {
                continue;
            }
            let key = b.parent_key();
            if key == new_parent {
                continue;
            }
            if self.parent_counts.get(&key).copied().unwrap_or(0) <= 1 {
                continue;
            }
            match best {
                Some(j) if self.selected[j].score.total <= b.score.total => {}
                _ => best = Some(i),
            }
        }
        best
    }
}

/// Greedy, constraint-respecting selection with diversity repair.
///
/// The greedy pass walks candidates in score order and records exactly
/// one decision each. If the result covers fewer than
/// `min_unique_parents` parents, the repair pass appends or swaps in
/// candidates from unrepresented parents, re-validating every caps check
/// per swap and reverting swaps that would violate one. Output ordering
/// reuses the scorer's total ordering, so identical input and config
/// produce byte-identical results.
pub fn select_bullets(scored: &[ScoredBullet], cfg: &SelectorConfig) -> SelectorResult {
    let mut state = SelectionState::new(cfg);
    let mut decisions = Vec::with_capacity(scored.len());

    for b in scored {
        match state.can_take(b) {
            Ok(()) => {
                state.admit(b.clone());
                decisions.push(SelectionDecision {
                    bullet_id: b.bullet_id.clone(),
                    accepted: true,
                    reason: SelectionReason::Selected,
                });
            }
            Err(reason) => {
                decisions.push(SelectionDecision {
                    bullet_id: b.bullet_id.clone(),
                    accepted: false,
                    reason,
                });
            }
        }
    }

    if cfg.min_unique_parents > 0 && !state.selected.is_empty() {
        repair_diversity(scored, &mut state);
    }

    let mut selected = state.selected;
    sort_scored(&mut selected);

    SelectorResult { config: cfg.clone(), selected, decisions }
}

fn repair_diversity(scored: &[ScoredBullet], state: &mut SelectionState<'_>) {
    loop {
        if state.unique_parents() >= state.cfg.min_unique_parents {
            return;
        }

        let mut changed = false;
        for cand in scored {
            if state.unique_parents() >= state.cfg.min_unique_parents {
                return;
            }
            let cand_key = cand.parent_key();
            if state.has_parent(&cand_key) {
                continue;
            }

            // Room left: plain append under the normal checks.
            if state.selected.len() < state.cfg.max_total_bullets {
                if state.can_take(cand).is_ok() {
                    state.admit(cand.clone());
                    changed = true;
                }
                continue;
            }

            // Full: swap out the weakest bullet of an over-represented
            // parent in the same section, atomically re-checking caps.
            let Some(i) = state.lowest_replaceable(cand.section, &cand_key) else {
                continue;
            };
            let old = state.remove(i);
            if state.can_take(cand).is_ok() {
                state.admit(cand.clone());
                changed = true;
            } else {
                state.admit(old);
            }
        }

        if !changed {
            return;
        }
    }
}
