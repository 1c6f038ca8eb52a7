use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{EngineError, Result};

const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const UNK: &str = "[UNK]";

/// WordPiece sub-word tokenizer over a BERT-style vocabulary
/// (one token per line, continuation pieces prefixed with "##").
pub struct WordPieceTokenizer {
    id_to_tok: Vec<String>,
    tok_to_id: HashMap<String, i64>,
}

impl WordPieceTokenizer {
    /// Load a vocabulary file, assigning ids by line order.
    pub fn load_vocab(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EngineError::io(path, e))?;

        let mut id_to_tok = Vec::new();
        let mut tok_to_id = HashMap::new();

        for line in BufReader::new(file).lines() {
            let mut line = line.map_err(|e| EngineError::io(path, e))?;
            if line.ends_with('\r') {
                line.pop();
            }
            let id = id_to_tok.len() as i64;
            tok_to_id.insert(line.clone(), id);
            id_to_tok.push(line);
        }

        if id_to_tok.is_empty() {
            return Err(EngineError::corrupt(path, "empty vocabulary"));
        }
        Ok(Self { id_to_tok, tok_to_id })
    }

    /// Build a tokenizer from an in-memory token list (tests, fixtures).
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let mut tok_to_id = HashMap::with_capacity(tokens.len());
        for (i, t) in tokens.iter().enumerate() {
            tok_to_id.insert(t.clone(), i as i64);
        }
        Self { id_to_tok: tokens, tok_to_id }
    }

    pub fn vocab_size(&self) -> usize {
        self.id_to_tok.len()
    }

    fn id_or(&self, default: i64, tok: &str) -> i64 {
        self.tok_to_id.get(tok).copied().unwrap_or(default)
    }

    fn special_id(&self, tok: &str) -> i64 {
        self.id_or(0, tok)
    }

    fn is_punct(c: char) -> bool {
        c.is_ascii_punctuation()
    }

    /// Whitespace + punctuation split after ASCII lowercasing; punctuation
    /// characters become their own tokens.
    fn basic_tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_ascii_lowercase();
        let mut out = Vec::new();
        let mut cur = String::new();

        for c in lowered.chars() {
            if c.is_whitespace() {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            } else if Self::is_punct(c) {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                out.push(c.to_string());
            } else {
                cur.push(c);
            }
        }
        if !cur.is_empty() {
            out.push(cur);
        }
        out
    }

    /// Greedy longest-match-first segmentation of one basic token.
    /// Any unmatchable remainder collapses the whole token to `[UNK]`.
    fn wordpiece(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return vec![UNK.to_string()];
        }

        let chars: Vec<char> = token.chars().collect();
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = chars.len();
            let mut best: Option<String> = None;

            while end > start {
                let mut sub: String = chars[start..end].iter().collect();
                if start > 0 {
                    sub = format!("##{sub}");
                }
                if self.tok_to_id.contains_key(&sub) {
                    best = Some(sub);
                    break;
                }
                end -= 1;
            }

            match best {
                Some(piece) => {
                    pieces.push(piece);
                    start = end;
                }
                None => return vec![UNK.to_string()],
            }
        }

        pieces
    }

    /// Encode text as `[CLS] pieces... [SEP]`, truncated to `max_len` with
    /// room reserved for the trailing `[SEP]`.
    pub fn encode(&self, text: &str, max_len: usize) -> Vec<i64> {
        let cls = self.special_id(CLS);
        let sep = self.special_id(SEP);
        let unk = self.special_id(UNK);

        let mut ids = Vec::with_capacity(max_len.min(64));
        ids.push(cls);

        'outer: for tok in Self::basic_tokenize(text) {
            for piece in self.wordpiece(&tok) {
                if ids.len() + 1 >= max_len {
                    break 'outer;
                }
                ids.push(self.id_or(unk, &piece));
            }
        }

        ids.push(sep);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> WordPieceTokenizer {
        WordPieceTokenizer::from_tokens(
            ["[CLS]", "[SEP]", "[UNK]", "back", "##end", "rust", "engine", "##er", ","]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    #[test]
    fn greedy_longest_match_segments_word() {
        let t = vocab();
        assert_eq!(t.wordpiece("backend"), vec!["back", "##end"]);
        assert_eq!(t.wordpiece("engineer"), vec!["engine", "##er"]);
    }

    #[test]
    fn unmatchable_token_becomes_unk() {
        let t = vocab();
        assert_eq!(t.wordpiece("zzz"), vec!["[UNK]"]);
    }

    #[test]
    fn encode_wraps_with_cls_and_sep() {
        let t = vocab();
        let ids = t.encode("rust, backend", 16);
        assert_eq!(*ids.first().unwrap(), 0); // [CLS]
        assert_eq!(*ids.last().unwrap(), 1); // [SEP]
        assert!(ids.len() >= 5);
    }

    #[test]
    fn encode_respects_max_len() {
        let t = vocab();
        let ids = t.encode("rust rust rust rust rust rust rust rust", 6);
        assert!(ids.len() <= 6);
        assert_eq!(*ids.last().unwrap(), 1);
    }

    #[test]
    fn punctuation_is_its_own_token() {
        let toks = WordPieceTokenizer::basic_tokenize("rust, backend");
        assert_eq!(toks, vec!["rust", ",", "backend"]);
    }
}
