use lazy_static::lazy_static;
use regex::Regex;

/// Heuristic structural slices of one posting. Absent zones are empty
/// strings, never errors.
#[derive(Debug, Clone, Default)]
pub struct Zones {
    pub title: String,
    pub lead: String,
    pub requirements: String,
}

pub const LEAD_CHARS: usize = 1400;
const TITLE_MAX_CHARS: usize = 90;
const BLOCK_CHAR_CAP: usize = 3500;
const TOTAL_CHAR_CAP: usize = 6000;
const MAX_BLOCKS: usize = 2;

lazy_static! {
    static ref TITLE_FIELD: Regex =
        Regex::new(r"(?i)^\s*(?:job\s+)?title\s*[:\-]\s*(\S.*)$").expect("valid regex");
    static ref REQ_HEADING: Regex = Regex::new(
        r"(?i)^(?:requirements?|qualifications?|skills|what you(?:'ll| will)? bring|what (?:we're|we are) looking for|must[- ]haves?|minimum qualifications|required qualifications|what you(?:'ll| will)? need)\s*:?\s*$"
    )
    .expect("valid regex");
    static ref STOP_HEADING: Regex = Regex::new(
        r"(?i)^(?:benefits|perks|compensation|salary|what we offer|why join.*|how to apply|about (?:us|the (?:company|team))|equal opportunity.*)\s*:?\s*$"
    )
    .expect("valid regex");
}

/// Slice a posting into title / lead / requirements zones.
pub fn extract(raw_text: &str) -> Zones {
    Zones {
        title: extract_title(raw_text),
        lead: raw_text.chars().take(LEAD_CHARS).collect(),
        requirements: extract_requirements(raw_text),
    }
}

/// Structured `title:` field wins; otherwise the first non-blank line
/// short enough to plausibly be a heading.
fn extract_title(raw_text: &str) -> String {
    for line in raw_text.lines() {
        if let Some(caps) = TITLE_FIELD.captures(line) {
            return caps[1].trim().to_string();
        }
    }

    for line in raw_text.lines() {
        let t = line.trim();
        if !t.is_empty() && t.chars().count() <= TITLE_MAX_CHARS {
            return t.to_string();
        }
    }

    String::new()
}

/// Block capture: start at a requirements-style heading, stop at a
/// stop-heading, a new requirements heading, or the per-block cap. At
/// most two blocks, hard-capped overall.
fn extract_requirements(raw_text: &str) -> String {
    let mut out = String::new();
    let mut blocks = 0;
    let mut capturing = false;
    let mut block_len = 0usize;

    for line in raw_text.lines() {
        let trimmed = line.trim();

        if REQ_HEADING.is_match(trimmed) {
            if blocks >= MAX_BLOCKS {
                break;
            }
            blocks += 1;
            capturing = true;
            block_len = 0;
            continue;
        }

        if !capturing {
            continue;
        }

        if STOP_HEADING.is_match(trimmed) {
            capturing = false;
            continue;
        }

        let line_chars = trimmed.chars().count() + 1;
        if block_len + line_chars > BLOCK_CHAR_CAP {
            capturing = false;
            continue;
        }
        if out.chars().count() + line_chars > TOTAL_CHAR_CAP {
            break;
        }

        block_len += line_chars;
        out.push_str(trimmed);
        out.push('\n');
    }

    out
}
