use std::collections::{HashMap, HashSet};

use crate::models::Posting;
use crate::tokenizer;
use crate::TermId;

/// One lexical retrieval hit, scored by cosine similarity.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub doc_id: String,
    pub score: f64,
    pub token_count: usize,
}

/// Sparse TF-IDF vector for one document. `weights` is sorted by term id
/// and deduplicated, which makes the sparse dot product a linear merge.
struct PostingVec {
    doc_id: String,
    token_count: usize,
    weights: Vec<(TermId, f32)>,
    norm: f64,
}

/// Prepared query vector. Terms outside the frozen vocabulary are
/// dropped at construction time.
pub struct QueryVec {
    weights: Vec<(TermId, f32)>,
    norm: f64,
}

/// TF-IDF index over a posting corpus.
///
/// The vocabulary is frozen at build time: term ids are assigned once, in
/// sorted term order, and queries are weighted against the existing idf
/// table. There is no incremental insert; a changed corpus means a
/// rebuild.
pub struct TfidfIndex {
    term_to_id: HashMap<String, TermId>,
    df: Vec<u32>,
    idf: Vec<f64>,
    postings: Vec<PostingVec>,
    doc_index: HashMap<String, usize>,
}

fn sort_and_merge(weights: &mut Vec<(TermId, f32)>) {
    weights.sort_by_key(|&(id, _)| id);
    let mut w = 0;
    let mut i = 0;
    while i < weights.len() {
        let id = weights[i].0;
        let mut sum = 0.0f32;
        let mut j = i;
        while j < weights.len() && weights[j].0 == id {
            sum += weights[j].1;
            j += 1;
        }
        weights[w] = (id, sum);
        w += 1;
        i = j;
    }
    weights.truncate(w);
}

fn dot_sparse(a: &[(TermId, f32)], b: &[(TermId, f32)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut s = 0.0f64;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Equal => {
                s += f64::from(a[i].1) * f64::from(b[j].1);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    s
}

impl TfidfIndex {
    pub fn build(postings: &[Posting]) -> Self {
        let n = postings.len() as f64;

        // Pass 1: document frequencies over normalized tokens.
        let mut df_map: HashMap<String, u32> = HashMap::new();
        let mut doc_tokens: Vec<Vec<String>> = Vec::with_capacity(postings.len());

        for p in postings {
            let toks = tokenizer::canonical_tokens(&p.raw_text);
            let seen: HashSet<&str> = toks.iter().map(String::as_str).collect();
            for t in seen {
                *df_map.entry(t.to_string()).or_insert(0) += 1;
            }
            doc_tokens.push(toks);
        }

        // Freeze the vocabulary in sorted order so term ids are stable
        // across runs regardless of hash iteration order.
        let mut terms: Vec<String> = df_map.keys().cloned().collect();
        terms.sort();

        let mut term_to_id = HashMap::with_capacity(terms.len());
        let mut df = Vec::with_capacity(terms.len());
        for (id, term) in terms.iter().enumerate() {
            term_to_id.insert(term.clone(), id as TermId);
            df.push(df_map[term]);
        }

        // Smoothed idf, always > 0.
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((n + 1.0) / (f64::from(d) + 1.0)).ln() + 1.0)
            .collect();

        // Pass 2: per-document sparse weight vectors.
        let mut built: Vec<PostingVec> = Vec::with_capacity(postings.len());
        let mut doc_index = HashMap::with_capacity(postings.len());

        for (doc_i, (p, toks)) in postings.iter().zip(doc_tokens).enumerate() {
            let mut tf: HashMap<TermId, u32> = HashMap::new();
            for t in &toks {
                if let Some(&id) = term_to_id.get(t.as_str()) {
                    *tf.entry(id).or_insert(0) += 1;
                }
            }

            let mut weights = Vec::with_capacity(tf.len());
            let mut norm2 = 0.0f64;
            for (term_id, freq) in tf {
                let w = (1.0 + f64::from(freq).ln()) * idf[term_id as usize];
                weights.push((term_id, w as f32));
                norm2 += w * w;
            }
            sort_and_merge(&mut weights);

            doc_index.insert(p.id.clone(), doc_i);
            built.push(PostingVec {
                doc_id: p.id.clone(),
                token_count: toks.len(),
                weights,
                norm: norm2.sqrt(),
            });
        }

        Self { term_to_id, df, idf, postings: built, doc_index }
    }

    pub fn num_docs(&self) -> usize {
        self.postings.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.term_to_id.len()
    }

    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.term_to_id.get(term).map_or(0, |&id| self.df[id as usize])
    }

    /// Smoothed idf for a known term; `None` when the term is outside the
    /// frozen vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_to_id.get(term).map(|&id| self.idf[id as usize])
    }

    /// Weight query text against the frozen idf table. Unknown terms are
    /// dropped; `None` means the query has no lexical signal at all.
    pub fn query_vector(&self, query: &str) -> Option<QueryVec> {
        let toks = tokenizer::canonical_tokens(query);

        let mut tf: HashMap<TermId, u32> = HashMap::new();
        for t in &toks {
            if let Some(&id) = self.term_to_id.get(t.as_str()) {
                *tf.entry(id).or_insert(0) += 1;
            }
        }
        if tf.is_empty() {
            return None;
        }

        let mut weights = Vec::with_capacity(tf.len());
        let mut norm2 = 0.0f64;
        for (term_id, freq) in tf {
            let w = (1.0 + f64::from(freq).ln()) * self.idf[term_id as usize];
            weights.push((term_id, w as f32));
            norm2 += w * w;
        }
        sort_and_merge(&mut weights);

        let norm = norm2.sqrt();
        if norm == 0.0 {
            return None;
        }
        Some(QueryVec { weights, norm })
    }

    /// Cosine similarity between a prepared query and one document;
    /// 0.0 for unknown documents or zero-norm documents.
    pub fn cosine(&self, query: &QueryVec, doc_id: &str) -> f64 {
        let Some(&i) = self.doc_index.get(doc_id) else {
            return 0.0;
        };
        let p = &self.postings[i];
        if p.norm == 0.0 {
            return 0.0;
        }
        dot_sparse(&query.weights, &p.weights) / (query.norm * p.norm)
    }

    /// Cosine top-k over the whole corpus. A query with no known terms
    /// returns an empty result set; ties keep document insertion order.
    pub fn topk(&self, query: &str, k: usize) -> Vec<LexicalHit> {
        let Some(qv) = self.query_vector(query) else {
            return Vec::new();
        };

        let mut hits: Vec<LexicalHit> = Vec::with_capacity(self.postings.len());
        for p in &self.postings {
            if p.norm == 0.0 {
                continue;
            }
            let score = dot_sparse(&qv.weights, &p.weights) / (qv.norm * p.norm);
            if score > 0.0 {
                hits.push(LexicalHit {
                    doc_id: p.doc_id.clone(),
                    score,
                    token_count: p.token_count,
                });
            }
        }

        // Stable sort: equal scores keep corpus order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: &str, text: &str) -> Posting {
        Posting { id: id.to_string(), raw_text: text.to_string() }
    }

    #[test]
    fn single_doc_idf_is_uniform_and_self_query_is_exact() {
        let corpus = vec![posting("a", "rust backend services in rust")];
        let idx = TfidfIndex::build(&corpus);

        let idf_rust = idx.idf("rust").unwrap();
        let idf_backend = idx.idf("backend").unwrap();
        let idf_services = idx.idf("services").unwrap();
        assert!((idf_rust - idf_backend).abs() < 1e-12);
        assert!((idf_rust - idf_services).abs() < 1e-12);

        let hits = idx.topk("rust backend services in rust", 1);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_query_terms_give_empty_result() {
        let corpus = vec![posting("a", "rust backend")];
        let idx = TfidfIndex::build(&corpus);
        assert!(idx.topk("quantum basketweaving", 5).is_empty());
    }

    #[test]
    fn topk_orders_by_similarity() {
        let corpus = vec![
            posting("cooking", "pastry chef baking croissants daily"),
            posting("rust1", "rust engineer building rust services"),
            posting("mixed", "engineer working on deployment"),
        ];
        let idx = TfidfIndex::build(&corpus);
        let hits = idx.topk("rust engineer", 3);
        assert_eq!(hits[0].doc_id, "rust1");
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn term_ids_are_deterministic() {
        let corpus = vec![
            posting("a", "zebra apple mango"),
            posting("b", "apple banana"),
        ];
        let x = TfidfIndex::build(&corpus);
        let y = TfidfIndex::build(&corpus);
        for term in ["zebra", "apple", "mango", "banana"] {
            assert_eq!(x.idf(term).unwrap(), y.idf(term).unwrap());
            assert_eq!(x.doc_frequency(term), y.doc_frequency(term));
        }
    }

    #[test]
    fn idf_is_always_positive() {
        let corpus = vec![
            posting("a", "shared term alpha"),
            posting("b", "shared term beta"),
        ];
        let idx = TfidfIndex::build(&corpus);
        assert!(idx.idf("shared").unwrap() > 0.0);
        assert!(idx.idf("alpha").unwrap() > idx.idf("shared").unwrap());
    }
}
