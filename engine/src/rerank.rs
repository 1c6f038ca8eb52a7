use std::collections::HashSet;

use crate::lexical::TfidfIndex;
use crate::tokenizer;
use crate::zones;

/// Languages/technologies that name a role identity. A query containing
/// one of these gates the title-conflict penalty.
const LANGUAGE_IDENTITIES: &[&str] = &[
    "c++", "c#", "java", "python", "javascript", "typescript", "go", "golang", "rust", "ruby",
    "php", "scala", "kotlin", "swift", "perl", "haskell", "elixir",
];

/// Weights and penalty constants for the hybrid ranking formula. The
/// defaults are tuned values carried over from production runs; header
/// zones dominate and embedding similarity acts as a tie-breaker only.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    pub title_weight: f64,
    pub lead_weight: f64,
    pub requirements_weight: f64,
    pub body_weight: f64,
    pub base_lexical_weight: f64,
    pub embedding_weight: f64,
    pub conflict_penalty: f64,
    pub identity_missing_penalty: f64,
    pub identity_title_bonus: f64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            title_weight: 200.0,
            lead_weight: 80.0,
            requirements_weight: 20.0,
            body_weight: 4.0,
            base_lexical_weight: 1.0,
            embedding_weight: 5.0,
            conflict_penalty: 500.0,
            identity_missing_penalty: 150.0,
            identity_title_bonus: 100.0,
        }
    }
}

/// One candidate entering the reranker: posting text plus its dense
/// retrieval score.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub doc_id: &'a str,
    pub raw_text: &'a str,
    pub embedding_score: f64,
}

/// Per-zone idf-overlap scores.
#[derive(Debug, Clone, Default)]
pub struct ZoneScores {
    pub title: f64,
    pub lead: f64,
    pub requirements: f64,
    pub body: f64,
}

/// Fully scored candidate, ready for display or downstream extraction.
#[derive(Debug, Clone)]
pub struct RankedPosting {
    pub doc_id: String,
    pub title: String,
    pub embedding_score: f64,
    pub lexical_score: f64,
    pub zone_scores: ZoneScores,
    pub identity_match: bool,
    pub identity_conflict: bool,
    pub final_score: f64,
}

fn token_set(text: &str) -> HashSet<String> {
    tokenizer::canonical_tokens(text).into_iter().collect()
}

fn overlap_idf(query: &HashSet<String>, zone: &HashSet<String>, index: &TfidfIndex) -> f64 {
    query
        .iter()
        .filter(|t| zone.contains(*t))
        .filter_map(|t| index.idf(t))
        .sum()
}

fn identities_in(tokens: &HashSet<String>) -> HashSet<&'static str> {
    LANGUAGE_IDENTITIES.iter().copied().filter(|id| tokens.contains(*id)).collect()
}

/// Hybrid zone-aware rerank.
///
/// Exact header matches are stronger relevance evidence than embedding
/// similarity alone, which is known to surface same-boilerplate postings
/// for the wrong role. Candidates whose title or lead shares any query
/// token form a first partition that always outranks the rest; within
/// each partition the combined score decides, and ties keep the incoming
/// candidate order.
pub fn rerank(
    role: &str,
    candidates: &[Candidate<'_>],
    index: &TfidfIndex,
    cfg: &RerankConfig,
    k: usize,
) -> Vec<RankedPosting> {
    let query_tokens = token_set(role);
    let query_identities = identities_in(&query_tokens);

    let mut ranked: Vec<RankedPosting> = Vec::with_capacity(candidates.len());
    let query_vec = index.query_vector(role);

    for cand in candidates {
        let z = zones::extract(cand.raw_text);

        let title_tokens = token_set(&z.title);
        let lead_tokens = token_set(&z.lead);
        let req_tokens = token_set(&z.requirements);
        let body_tokens = token_set(cand.raw_text);

        let zone_scores = ZoneScores {
            title: overlap_idf(&query_tokens, &title_tokens, index),
            lead: overlap_idf(&query_tokens, &lead_tokens, index),
            requirements: overlap_idf(&query_tokens, &req_tokens, index),
            body: overlap_idf(&query_tokens, &body_tokens, index),
        };

        let lexical_score =
            query_vec.as_ref().map_or(0.0, |qv| index.cosine(qv, cand.doc_id));

        // Identity adjustment: a title naming a different language than
        // the query is a hard negative signal; a title naming the query's
        // language is a hard positive one.
        let title_identities = identities_in(&title_tokens);
        let has_query_identity = !query_identities.is_empty();
        let title_has_query_identity = !query_identities.is_disjoint(&title_identities);
        let lead_has_query_identity =
            query_identities.iter().any(|id| lead_tokens.contains(*id));

        let identity_conflict = has_query_identity
            && !title_has_query_identity
            && !title_identities.is_empty();

        let mut adjustment = 0.0;
        if has_query_identity {
            if identity_conflict {
                adjustment -= cfg.conflict_penalty;
            }
            if !title_has_query_identity && !lead_has_query_identity {
                adjustment -= cfg.identity_missing_penalty;
            }
            if title_has_query_identity {
                adjustment += cfg.identity_title_bonus;
            }
        }

        let final_score = cfg.title_weight * zone_scores.title
            + cfg.lead_weight * zone_scores.lead
            + cfg.requirements_weight * zone_scores.requirements
            + cfg.body_weight * zone_scores.body
            + cfg.base_lexical_weight * lexical_score
            + adjustment
            + cfg.embedding_weight * cand.embedding_score;

        let identity_match = query_tokens
            .iter()
            .any(|t| title_tokens.contains(t) || lead_tokens.contains(t));

        ranked.push(RankedPosting {
            doc_id: cand.doc_id.to_string(),
            title: z.title,
            embedding_score: cand.embedding_score,
            lexical_score,
            zone_scores,
            identity_match,
            identity_conflict,
            final_score,
        });
    }

    // Stable: identity matches first, then score; equal scores keep the
    // original candidate order.
    ranked.sort_by(|a, b| {
        b.identity_match
            .cmp(&a.identity_match)
            .then_with(|| b.final_score.total_cmp(&a.final_score))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Posting;

    fn corpus() -> Vec<Posting> {
        vec![
            Posting {
                id: "cpp".into(),
                raw_text: "C++ Backend Engineer\n\nWe build low latency trading systems in C++.\n\nRequirements:\n5+ years C++\nLinux\n".into(),
            },
            Posting {
                id: "java".into(),
                raw_text: "Java Backend Engineer\n\nWe build enterprise services in Java.\n\nRequirements:\n5+ years Java\nSpring\n".into(),
            },
            Posting {
                id: "cook".into(),
                raw_text: "Head Chef\n\nRun the kitchen of our busy restaurant.\n".into(),
            },
        ]
    }

    fn candidates<'a>(postings: &'a [Posting], emb: &'a [f64]) -> Vec<Candidate<'a>> {
        postings
            .iter()
            .zip(emb)
            .map(|(p, &e)| Candidate { doc_id: &p.id, raw_text: &p.raw_text, embedding_score: e })
            .collect()
    }

    #[test]
    fn exact_title_match_beats_embedding_similarity() {
        let postings = corpus();
        let index = TfidfIndex::build(&postings);
        // The wrong-language posting gets a far higher embedding score.
        let cands = candidates(&postings[..2], &[0.2, 0.9]);

        let ranked = rerank("C++ Backend Engineer", &cands, &index, &RerankConfig::default(), 2);
        assert_eq!(ranked[0].doc_id, "cpp");
        assert!(ranked[0].final_score > ranked[1].final_score);
        assert!(ranked[1].identity_conflict);
    }

    #[test]
    fn identity_matches_partition_first() {
        let postings = corpus();
        let index = TfidfIndex::build(&postings);
        let cands = candidates(&postings, &[0.1, 0.1, 0.99]);

        let ranked = rerank("backend engineer", &cands, &index, &RerankConfig::default(), 3);
        // The chef posting shares no header token, so it ranks last even
        // with the highest embedding score.
        assert_eq!(ranked[2].doc_id, "cook");
        assert!(!ranked[2].identity_match);
    }

    #[test]
    fn no_identity_in_query_means_no_conflict_penalty() {
        let postings = corpus();
        let index = TfidfIndex::build(&postings);
        let cands = candidates(&postings[..2], &[0.5, 0.5]);

        let ranked = rerank("backend engineer", &cands, &index, &RerankConfig::default(), 2);
        assert!(ranked.iter().all(|r| !r.identity_conflict));
    }

    #[test]
    fn truncates_to_requested_k() {
        let postings = corpus();
        let index = TfidfIndex::build(&postings);
        let cands = candidates(&postings, &[0.3, 0.2, 0.1]);
        let ranked = rerank("engineer", &cands, &index, &RerankConfig::default(), 1);
        assert_eq!(ranked.len(), 1);
    }
}
