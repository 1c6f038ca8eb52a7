//! Drives the embed -> analyze -> build -> validate commands over a tiny
//! on-disk corpus, the same way `agent run` sequences them.

use std::fs;
use std::path::Path;

use agent::commands::{analyze, build, embed, validate};

const VOCAB: &[&str] = &[
    "[CLS]", "[SEP]", "[UNK]", "+", "#", ",", ".", ":", "c", "backend", "engineer", "build",
    "low", "latency", "services", "requirements", "linux", "docker", "software", "server",
    "side", "work", "in", "and", "python", "frontend", "react", "typescript", "javascript",
    "we", "modern", "title",
];

fn write_fixtures(root: &Path) {
    let jobs = root.join("jobs");
    fs::create_dir_all(&jobs).unwrap();
    fs::write(
        jobs.join("backend-1.txt"),
        "C++ Backend Engineer\n\nWe build low latency services in modern C++.\n\nRequirements:\nC++\nLinux\nDocker\n",
    )
    .unwrap();
    fs::write(
        jobs.join("backend-2.txt"),
        "Software Engineer, Backend\n\nServer side work in C++ and Python.\n\nRequirements:\nC++\nPython\nLinux\n",
    )
    .unwrap();
    fs::write(
        jobs.join("frontend-1.txt"),
        "Frontend Engineer\n\nReact and TypeScript work.\n\nRequirements:\nJavaScript\nTypeScript\nReact\n",
    )
    .unwrap();

    fs::write(root.join("vocab.txt"), VOCAB.join("\n")).unwrap();

    let resume = serde_json::json!({
        "experiences": [{
            "id": "exp-acme",
            "title": "Backend Engineer",
            "organization": "Acme",
            "dates": "2021-2024",
            "bullets": [
                {"id": "acme-1", "text": "Cut p99 latency of the C++ gateway", "tags": ["C++", "Linux"]},
                {"id": "acme-2", "text": "Containerized the build fleet", "tags": ["Docker"]}
            ]
        }],
        "projects": [{
            "id": "proj-ray",
            "name": "Ray Tracer",
            "context": "personal",
            "bullets": [
                {"id": "ray-1", "text": "Wrote a multithreaded ray tracer", "tags": ["C++", "Multithreading"]}
            ]
        }]
    });
    fs::write(root.join("resume.json"), serde_json::to_string_pretty(&resume).unwrap()).unwrap();
}

#[test]
fn full_command_pipeline_validates() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_fixtures(root);

    let jobs = root.join("jobs");
    let vocab = root.join("vocab.txt");
    let emb = root.join("embeddings/jobs.bin");
    let out = root.join("out");
    let dim = 256usize;

    embed::execute(&embed::EmbedArgs {
        jobs: jobs.clone(),
        vocab: vocab.clone(),
        dim,
        out: emb.clone(),
    })
    .unwrap();
    assert!(emb.exists());

    analyze::execute(&analyze::AnalyzeArgs {
        role: "C++ Backend Engineer".into(),
        jobs,
        topk: 3,
        min_score: 0.0,
        emb,
        vocab: vocab.clone(),
        dim,
        llm_cache: None,
        out: out.clone(),
    })
    .unwrap();
    assert!(out.join("profile.json").exists());
    assert!(out.join("mentions.jsonl").exists());

    build::execute(&build::BuildArgs {
        role: None,
        resume: root.join("resume.json"),
        profile: out.join("profile.json"),
        out: out.clone(),
        semantic: true,
        vocab,
        dim,
        semantic_threshold: 0.66,
        semantic_topk: 1,
        semantic_weight_scale: 0.25,
        semantic_min_contribution: 0.01,
        semantic_cache: Some(out.join("profile_skill_index.bin")),
        core_bonus: 0.15,
        max_total_bullets: 10,
        max_bullets_per_parent: 3,
        max_experience_bullets: 6,
        max_project_bullets: 4,
        min_unique_parents: 2,
    })
    .unwrap();
    assert!(out.join("bullet_scores.json").exists());
    assert!(out.join("explainability.json").exists());
    assert!(out.join("resume.md").exists());

    validate::execute(&validate::ValidateArgs { resume: root.join("resume.json"), out: out.clone() })
        .unwrap();
    assert!(out.join("validation_report.json").exists());

    // All three resume bullets fit comfortably under the caps.
    let explain: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("explainability.json")).unwrap())
            .unwrap();
    assert_eq!(explain["decisions"].as_array().unwrap().len(), 3);
    assert_eq!(explain["selected"].as_array().unwrap().len(), 3);

    let md = fs::read_to_string(out.join("resume.md")).unwrap();
    assert!(md.contains("### Acme") || md.contains("### Backend Engineer"));
}

#[test]
fn analyze_without_index_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_fixtures(root);

    let err = analyze::execute(&analyze::AnalyzeArgs {
        role: "C++ Backend Engineer".into(),
        jobs: root.join("jobs"),
        topk: 3,
        min_score: 0.0,
        emb: root.join("missing/jobs.bin"),
        vocab: root.join("vocab.txt"),
        dim: 256,
        llm_cache: None,
        out: root.join("out"),
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("agent embed"));
}
