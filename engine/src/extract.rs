use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::tokenizer;

/// Ordered category → canonical phrase hits for one posting.
#[derive(Debug, Clone, Default)]
pub struct ExtractedReqs {
    pub by_category: Vec<(String, Vec<String>)>,
}

struct LexiconItem {
    canon: &'static str,
    phrase: &'static str,
}

struct Category {
    name: &'static str,
    items: &'static [LexiconItem],
}

macro_rules! items {
    ($(($canon:expr, $phrase:expr)),* $(,)?) => {
        &[$(LexiconItem { canon: $canon, phrase: $phrase }),*]
    };
}

/// Fixed keyword-category lexicon. Phrases are matched against
/// normalized text with word boundaries.
static CATEGORIES: &[Category] = &[
    Category {
        name: "languages",
        items: items![
            ("C++", "c++"),
            ("C", "c"),
            ("C#", "c#"),
            ("Java", "java"),
            ("Python", "python"),
            ("JavaScript", "javascript"),
            ("TypeScript", "typescript"),
            ("SQL", "sql"),
            ("Go", "go"),
            ("Rust", "rust"),
        ],
    },
    Category {
        name: "frameworks",
        items: items![
            ("gRPC", "grpc"),
            ("Protocol Buffers", "protobuf"),
            ("Boost", "boost"),
            ("Qt", "qt"),
            ("Spring", "spring"),
            ("React", "react"),
            ("Node.js", "node"),
            ("Express", "express"),
        ],
    },
    Category {
        name: "systems",
        items: items![
            ("Linux", "linux"),
            ("Windows", "windows"),
            ("Multithreading", "multithreading"),
            ("Concurrency", "concurrency"),
            ("Networking", "networking"),
            ("Sockets", "sockets"),
            ("Low latency", "low latency"),
            ("Performance", "performance"),
        ],
    },
    Category {
        name: "tools",
        items: items![
            ("Git", "git"),
            ("Docker", "docker"),
            ("Kubernetes", "kubernetes"),
            ("CMake", "cmake"),
            ("Bazel", "bazel"),
            ("Jira", "jira"),
        ],
    },
    Category {
        name: "cloud",
        items: items![("AWS", "aws"), ("GCP", "gcp"), ("Azure", "azure")],
    },
    Category {
        name: "databases",
        items: items![
            ("PostgreSQL", "postgresql"),
            ("PostgreSQL", "postgres"),
            ("MySQL", "mysql"),
            ("MongoDB", "mongodb"),
            ("Redis", "redis"),
        ],
    },
    // small general bucket so non-tech postings still yield something
    Category {
        name: "general",
        items: items![
            ("Communication", "communication"),
            ("Leadership", "leadership"),
            ("Project management", "project management"),
            ("Customer service", "customer service"),
            ("Sales", "sales"),
            ("Marketing", "marketing"),
            ("Social media", "social media"),
            ("Branding", "branding"),
            ("Content creation", "content creation"),
        ],
    },
];

lazy_static! {
    static ref MUST_HEADINGS: HashSet<&'static str> = [
        "requirements",
        "qualifications",
        "skills",
        "what you bring",
        "what you will bring",
        "what we're looking for",
        "what we are looking for",
        "must have",
        "minimum qualifications",
        "required qualifications",
    ]
    .into_iter()
    .collect();
    static ref PREFERRED_HEADINGS: HashSet<&'static str> = [
        "preferred",
        "preferred qualifications",
        "nice to have",
        "bonus",
        "bonus points",
        "assets",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Default)]
struct SectionSlices {
    must: String,
    preferred: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    None,
    Must,
    Preferred,
}

fn heading_kind(line_lc: &str) -> Option<Mode> {
    let key = line_lc.strip_suffix(':').unwrap_or(line_lc);
    if MUST_HEADINGS.contains(key) {
        Some(Mode::Must)
    } else if PREFERRED_HEADINGS.contains(key) {
        Some(Mode::Preferred)
    } else {
        None
    }
}

/// Capture must/preferred requirement sections. A run of three blank
/// lines or a short trailing-colon line ends the current section.
fn slice_requirement_sections(raw_text: &str) -> SectionSlices {
    let mut out = SectionSlices::default();
    let mut mode = Mode::None;
    let mut blank_run = 0;

    for line in raw_text.lines() {
        let t = line.trim();
        if t.is_empty() {
            blank_run += 1;
            if blank_run >= 3 {
                mode = Mode::None;
            }
            continue;
        }
        blank_run = 0;

        let lc = t.to_lowercase();
        if let Some(next) = heading_kind(&lc) {
            mode = next;
            continue;
        }

        // Any other short heading-looking line stops the section.
        if lc.len() <= 40 && lc.ends_with(':') {
            mode = Mode::None;
            continue;
        }

        match mode {
            Mode::Must => {
                out.must.push_str(t);
                out.must.push('\n');
            }
            Mode::Preferred => {
                out.preferred.push_str(t);
                out.preferred.push('\n');
            }
            Mode::None => {}
        }
    }

    out
}

/// Word-boundary phrase containment over already-normalized text.
fn contains_phrase(normalized_haystack: &str, normalized_phrase: &str) -> bool {
    let h = format!(" {normalized_haystack} ");
    let p = format!(" {normalized_phrase} ");
    h.contains(&p)
}

/// Fixed phrase-matching lookup against the category lexicon.
///
/// Section hits take priority when requirement sections exist; otherwise
/// the full text is all there is. Preferred-section-only hits land in a
/// trailing `nice_to_have` bucket.
pub fn extract(raw_text: &str) -> ExtractedReqs {
    let slices = slice_requirement_sections(raw_text);

    let norm_all = tokenizer::normalize(raw_text);
    let norm_must = tokenizer::normalize(&slices.must);
    let norm_pref = tokenizer::normalize(&slices.preferred);

    let mut out = ExtractedReqs::default();
    let mut nice_to_have: Vec<String> = Vec::new();
    let mut nice_seen: HashSet<&'static str> = HashSet::new();

    for cat in CATEGORIES {
        let mut hits: Vec<String> = Vec::new();
        let mut seen: HashSet<&'static str> = HashSet::new();

        for item in cat.items {
            let in_must = !norm_must.is_empty() && contains_phrase(&norm_must, item.phrase);
            let in_pref = !norm_pref.is_empty() && contains_phrase(&norm_pref, item.phrase);
            let in_any = contains_phrase(&norm_all, item.phrase);

            if in_must || (norm_must.is_empty() && in_any) {
                if seen.insert(item.canon) {
                    hits.push(item.canon.to_string());
                }
            } else if in_pref && nice_seen.insert(item.canon) {
                nice_to_have.push(item.canon.to_string());
            }
        }

        out.by_category.push((cat.name.to_string(), hits));
    }

    if !nice_to_have.is_empty() {
        out.by_category.push(("nice_to_have".to_string(), nice_to_have));
    }

    out
}
