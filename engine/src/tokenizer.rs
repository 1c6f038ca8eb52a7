use lazy_static::lazy_static;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Single-token synonym folding applied after tokenization.
    static ref FOLD: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("dev", "engineer"),
            ("developer", "engineer"),
            ("programmer", "engineer"),
            ("engineering", "engineer"),
            ("eng", "engineer"),
            ("serverside", "backend"),
        ];
        pairs.iter().copied().collect()
    };
}

/// Lowercase, keep only `[a-z0-9+#]`, collapse everything else to single
/// spaces. NFKD decomposition runs first so accented text ("résumé")
/// keeps its base letters. Preserves "c++" and "c#".
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = true;

    for ch in text.nfkd() {
        let c = ch.to_ascii_lowercase();
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '+' || c == '#';
        if keep {
            out.push(c);
            prev_space = false;
        } else if !prev_space && !is_combining(ch) {
            out.push(' ');
            prev_space = true;
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

// Combining marks left over from NFKD must not split a word in two.
fn is_combining(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036f}')
}

/// Split normalized text on spaces, dropping tokens shorter than two
/// chars except the literal "c++".
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split(' ')
        .filter(|t| t.len() >= 2 || *t == "c++")
        .map(|t| t.to_string())
        .collect()
}

/// Apply the synonym fold map and merge fixed bigrams
/// ("back","end") and ("server","side") into "backend".
pub fn fold(tokens: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        if i + 1 < tokens.len() {
            let (t, n) = (tokens[i].as_str(), tokens[i + 1].as_str());
            if (t == "back" && n == "end") || (t == "server" && n == "side") {
                out.push("backend".to_string());
                i += 2;
                continue;
            }
        }

        match FOLD.get(tokens[i].as_str()) {
            Some(folded) => out.push((*folded).to_string()),
            None => out.push(tokens[i].clone()),
        }
        i += 1;
    }

    out
}

/// normalize + tokenize + fold in one step.
pub fn canonical_tokens(text: &str) -> Vec<String> {
    fold(&tokenize(&normalize(text)))
}
