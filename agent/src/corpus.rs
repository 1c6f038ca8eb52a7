use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::warn;
use walkdir::WalkDir;

use engine::models::Posting;

/// Load a corpus from a directory of UTF-8 `.txt` files; the file stem
/// becomes the posting id. A missing directory is fatal, a single
/// unreadable file is skipped with a warning.
pub fn load_dir(dir: &Path) -> Result<Vec<Posting>> {
    if !dir.is_dir() {
        bail!("jobs directory not found: {}", dir.display());
    }

    let mut postings = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping file with non-utf8 name");
            continue;
        };

        match fs::read_to_string(path) {
            Ok(raw_text) => postings.push(Posting { id: stem.to_string(), raw_text }),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable posting"),
        }
    }

    // Filename order varies by platform; sort for stable posting ids.
    postings.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(postings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_txt_files_by_stem_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in [("b.txt", "beta"), ("a.txt", "alpha"), ("notes.md", "ignored")] {
            let mut f = fs::File::create(dir.path().join(name)).unwrap();
            f.write_all(text.as_bytes()).unwrap();
        }

        let postings = load_dir(dir.path()).unwrap();
        let ids: Vec<&str> = postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(postings[0].raw_text, "alpha");
    }

    #[test]
    fn missing_directory_is_fatal() {
        assert!(load_dir(Path::new("/definitely/not/here")).is_err());
    }
}
