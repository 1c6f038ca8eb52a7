//! End-to-end flow over an in-memory corpus: embed + index, dense
//! retrieval, zone-aware rerank, requirement extraction, profile build,
//! bullet scoring, and selection.

use engine::embedder::{HashEmbedder, TextEmbedder};
use engine::extract;
use engine::lexical::TfidfIndex;
use engine::llm::{LlmClient, NullLlmClient};
use engine::models::{AbstractResume, Bullet, Experience, Posting, Project};
use engine::profile::{build_role_profile, PostingAnalysis};
use engine::rerank::{rerank, Candidate, RerankConfig};
use engine::scorer::{score_bullets, ScoreConfig};
use engine::selector::{select_bullets, SelectorConfig};
use engine::vector_index::EmbeddingIndex;
use engine::wordpiece::WordPieceTokenizer;

fn corpus() -> Vec<Posting> {
    vec![
        Posting {
            id: "backend-1".into(),
            raw_text: "C++ Backend Engineer\n\nBuild low latency services.\n\nRequirements:\nC++\nLinux\nDocker\n".into(),
        },
        Posting {
            id: "backend-2".into(),
            raw_text: "Software Engineer, Backend\n\nServer side work in C++ and Python.\n\nRequirements:\nC++\nPython\nLinux\n".into(),
        },
        Posting {
            id: "frontend-1".into(),
            raw_text: "Frontend Engineer\n\nReact and TypeScript interfaces.\n\nRequirements:\nJavaScript\nTypeScript\nReact\n".into(),
        },
    ]
}

fn embedder() -> HashEmbedder {
    let vocab: Vec<String> = [
        "[CLS]", "[SEP]", "[UNK]", "c", "+", "#", "backend", "engineer", "build", "low",
        "latency", "services", "requirements", "linux", "docker", "software", "server", "side",
        "work", "in", "and", "python", "frontend", "react", "typescript", "interfaces",
        "javascript", ",", ".", ":",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    HashEmbedder::new(WordPieceTokenizer::from_tokens(vocab), 384)
}

fn resume() -> AbstractResume {
    AbstractResume {
        experiences: vec![Experience {
            id: "exp-acme".into(),
            title: "Backend Engineer".into(),
            organization: "Acme".into(),
            dates: "2021-2024".into(),
            bullets: vec![
                Bullet {
                    id: "acme-1".into(),
                    text: "Cut p99 latency of the C++ order gateway".into(),
                    tags: vec!["C++".into(), "Linux".into()],
                },
                Bullet {
                    id: "acme-2".into(),
                    text: "Containerized the build fleet".into(),
                    tags: vec!["Docker".into()],
                },
            ],
        }],
        projects: vec![Project {
            id: "proj-ray".into(),
            name: "Ray Tracer".into(),
            context: "personal".into(),
            bullets: vec![Bullet {
                id: "ray-1".into(),
                text: "Wrote a multithreaded ray tracer".into(),
                tags: vec!["C++".into(), "Multithreading".into()],
            }],
        }],
    }
}

#[test]
fn three_doc_corpus_flows_to_full_selection() {
    let postings = corpus();
    let emb = embedder();

    // Embed + index every posting.
    let mut index = EmbeddingIndex::new();
    for p in &postings {
        let v = emb.embed(&p.raw_text, 256);
        assert!(!v.is_empty(), "corpus embedding failed for {}", p.id);
        index.push(p.id.clone(), v).unwrap();
    }

    // Dense retrieval with a permissive floor returns the whole corpus.
    let min_score = 0.0f32;
    let query = emb.embed("engineer", 64);
    assert!(!query.is_empty());
    let hits = index.topk(&query, 3).unwrap();
    let kept: Vec<_> = hits.iter().filter(|h| h.score >= min_score).collect();
    assert_eq!(kept.len(), 3);

    // Zone-aware rerank over the retrieved candidates.
    let tfidf = TfidfIndex::build(&postings);
    let candidates: Vec<Candidate<'_>> = kept
        .iter()
        .map(|h| {
            let p = postings.iter().find(|p| p.id == h.doc_id).unwrap();
            Candidate {
                doc_id: &p.id,
                raw_text: &p.raw_text,
                embedding_score: f64::from(h.score),
            }
        })
        .collect();
    let ranked = rerank("backend engineer", &candidates, &tfidf, &RerankConfig::default(), 3);
    assert_eq!(ranked.len(), 3);
    assert!(ranked[0].identity_match);
    assert_ne!(ranked[0].doc_id, "frontend-1");

    // Requirement extraction + profile build over the top hits.
    let llm = NullLlmClient;
    let analyses: Vec<PostingAnalysis> = ranked
        .iter()
        .map(|r| {
            let p = postings.iter().find(|p| p.id == r.doc_id).unwrap();
            PostingAnalysis {
                posting_id: p.id.clone(),
                reqs: extract::extract(&p.raw_text),
                evidence: llm.analyze_posting(&p.id, &p.raw_text),
            }
        })
        .collect();
    let profile = build_role_profile("backend engineer", &analyses);
    assert!(profile.skill_weights.contains_key("c++"));
    assert!(profile.skill_weights.contains_key("linux"));

    // Score and select with caps above the bullet count: everything is
    // selected and every candidate has a decision.
    let scored = score_bullets(&resume(), &profile, &ScoreConfig::default(), None).unwrap();
    let cfg = SelectorConfig {
        max_total_bullets: 10,
        max_bullets_per_parent: 10,
        max_experience_bullets: 10,
        max_project_bullets: 10,
        min_unique_parents: 1,
    };
    let result = select_bullets(&scored, &cfg);

    assert_eq!(result.decisions.len(), scored.len());
    assert_eq!(result.selected.len(), scored.len());
    assert!(result.decisions.iter().all(|d| d.accepted));
}

#[test]
fn identical_runs_produce_identical_artifacts() {
    let postings = corpus();
    let tfidf = TfidfIndex::build(&postings);
    let candidates: Vec<Candidate<'_>> = postings
        .iter()
        .map(|p| Candidate { doc_id: &p.id, raw_text: &p.raw_text, embedding_score: 0.5 })
        .collect();

    let run = || {
        let ranked = rerank("c++ backend engineer", &candidates, &tfidf, &RerankConfig::default(), 3);
        let analyses: Vec<PostingAnalysis> = ranked
            .iter()
            .map(|r| {
                let p = postings.iter().find(|p| p.id == r.doc_id).unwrap();
                PostingAnalysis {
                    posting_id: p.id.clone(),
                    reqs: extract::extract(&p.raw_text),
                    evidence: Vec::new(),
                }
            })
            .collect();
        let profile = build_role_profile("c++ backend engineer", &analyses);
        let scored = score_bullets(&resume(), &profile, &ScoreConfig::default(), None).unwrap();
        let result = select_bullets(&scored, &SelectorConfig::default());
        serde_json::to_string(&(&result.selected, &result.decisions)).unwrap()
    };

    assert_eq!(run(), run());
}
