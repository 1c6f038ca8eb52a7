use engine::vector_index::EmbeddingIndex;
use engine::EngineError;

fn filled_index(n: usize, dim: usize) -> EmbeddingIndex {
    if n == 0 {
        // An empty index still carries its dimension in the header.
        return EmbeddingIndex::set(Vec::new(), Vec::new(), dim).unwrap();
    }
    let mut idx = EmbeddingIndex::new();
    for i in 0..n {
        let mut v = vec![0.0f32; dim];
        v[i % dim] = 1.0;
        v[(i + 1) % dim] = 0.5 + i as f32 * 0.01;
        idx.push(format!("doc-{i:03}"), v).unwrap();
    }
    idx
}

#[test]
fn round_trip_preserves_ids_dim_and_bytes() {
    for n in [0usize, 1, 50] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.bin");

        let idx = filled_index(n, 8);
        idx.save(&path).unwrap();

        let loaded = EmbeddingIndex::load(&path).unwrap();
        assert_eq!(loaded, idx, "round trip mismatch for n={n}");
    }
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.bin");
    filled_index(3, 4).save(&path).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["jobs.bin"]);
}

#[test]
fn truncated_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.bin");
    filled_index(5, 8).save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 7]).unwrap();

    assert!(EmbeddingIndex::load(&path).is_err());
}

#[test]
fn trailing_garbage_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.bin");
    filled_index(2, 4).save(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(b"junk");
    std::fs::write(&path, &bytes).unwrap();

    match EmbeddingIndex::load(&path) {
        Err(EngineError::CorruptIndex { .. }) => {}
        other => panic!("expected CorruptIndex, got {other:?}"),
    }
}

#[test]
fn zero_dim_header_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.bin");

    // dim = 0, n = 0, element_count = 0
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    match EmbeddingIndex::load(&path) {
        Err(EngineError::CorruptIndex { .. }) => {}
        other => panic!("expected CorruptIndex, got {other:?}"),
    }
}

#[test]
fn element_count_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.bin");

    // dim = 2, n = 1, one id, but element_count claims 3
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(b"a");
    bytes.extend_from_slice(&3u64.to_le_bytes());
    for _ in 0..3 {
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
    }
    std::fs::write(&path, &bytes).unwrap();

    match EmbeddingIndex::load(&path) {
        Err(EngineError::CorruptIndex { .. }) => {}
        other => panic!("expected CorruptIndex, got {other:?}"),
    }
}

#[test]
fn binary_layout_is_bit_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.bin");

    let mut idx = EmbeddingIndex::new();
    idx.push("ab".into(), vec![1.0f32, -2.5f32]).unwrap();
    idx.save(&path).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&2u32.to_le_bytes()); // dim
    expected.extend_from_slice(&1u32.to_le_bytes()); // n
    expected.extend_from_slice(&2u32.to_le_bytes()); // id_len
    expected.extend_from_slice(b"ab");
    expected.extend_from_slice(&2u64.to_le_bytes()); // element count
    expected.extend_from_slice(&1.0f32.to_le_bytes());
    expected.extend_from_slice(&(-2.5f32).to_le_bytes());

    assert_eq!(std::fs::read(&path).unwrap(), expected);
}
