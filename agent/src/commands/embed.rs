use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use engine::embedder::{HashEmbedder, TextEmbedder};
use engine::vector_index::EmbeddingIndex;
use engine::wordpiece::WordPieceTokenizer;

use crate::corpus;

pub const CORPUS_EMBED_MAX_LEN: usize = 256;

#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// Directory of posting .txt files
    #[arg(long, default_value = "data/jobs/raw")]
    pub jobs: PathBuf,
    /// Wordpiece vocabulary file
    #[arg(long, default_value = "models/emb/vocab.txt")]
    pub vocab: PathBuf,
    /// Embedding dimension
    #[arg(long, default_value_t = HashEmbedder::DEFAULT_DIM)]
    pub dim: usize,
    /// Output index path
    #[arg(long, default_value = "data/embeddings/jobs.bin")]
    pub out: PathBuf,
}

pub fn execute(args: &EmbedArgs) -> Result<()> {
    anyhow::ensure!(args.dim > 0, "invalid configuration: --dim must be positive");

    let postings = corpus::load_dir(&args.jobs)?;
    let tokenizer = WordPieceTokenizer::load_vocab(&args.vocab)
        .context("loading embedder vocabulary")?;
    let embedder = HashEmbedder::new(tokenizer, args.dim);

    let mut index = EmbeddingIndex::new();
    let mut skipped = 0usize;

    for p in &postings {
        let v = embedder.embed(&p.raw_text, CORPUS_EMBED_MAX_LEN);
        if v.is_empty() {
            // A partial corpus is tolerable; a partial index file is not.
            warn!(posting_id = %p.id, "no embedding produced, excluding from index");
            skipped += 1;
            continue;
        }
        index.push(p.id.clone(), v)?;
    }

    index.save(&args.out)?;
    info!(
        n = index.len(),
        dim = index.dim(),
        skipped,
        out = %args.out.display(),
        "embedding index saved"
    );
    Ok(())
}
