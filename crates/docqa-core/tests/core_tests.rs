use std::fs;

use proptest::prelude::*;
use tempfile::TempDir;

use docqa_core::config::{Config, FusionStrategy};
use docqa_core::normalize::{is_meaningful_line, normalize};
use docqa_core::{Chunker, ConfigError, DocumentId};

fn reassemble(chunks: &[docqa_core::Chunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, c) in chunks.iter().enumerate() {
        if i == 0 { out.push_str(&c.content); } else { out.extend(c.content.chars().skip(overlap)); }
    }
    out
}

#[test]
fn config_files_layer_over_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("docqa.toml"), "[chunking]\nsize = 256\n\n[retrieval]\nlexical_k = 4\nfusion = \"min_max\"\n").unwrap();
    fs::write(tmp.path().join("docqa.test.toml"), "[chunking]\noverlap = 32\n\n[generation.credential]\ninline = \"gsk_test\"\n").unwrap();

    let settings = Config::load_from(tmp.path(), "test").expect("load").settings().expect("settings");
    assert_eq!(settings.chunking.size, 256);
    assert_eq!(settings.chunking.overlap, 32);
    assert_eq!(settings.retrieval.lexical_k, 4);
    assert_eq!(settings.retrieval.semantic_k, 2, "untouched keys keep defaults");
    assert_eq!(settings.retrieval.fusion, FusionStrategy::MinMax);
    assert_eq!(settings.generation.credential.resolve_with(|_| None).unwrap(), "gsk_test", "inline wins over the default env source");
}

#[test]
fn invalid_chunking_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("docqa.toml"), "[chunking]\nsize = 64\noverlap = 64\n").unwrap();
    let err = Config::load_from(tmp.path(), "prod").expect("load").settings().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidChunking { size: 64, overlap: 64 }));
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![
        4 => "[a-zA-Z]{1,12}",
        2 => Just(" ".to_string()),
        1 => Just(". ".to_string()),
        1 => Just("\n".to_string()),
        1 => Just("\n\n".to_string()),
        1 => "[äöüßé€]{1,3}",
    ], 0..200).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn chunks_reassemble_losslessly(text in text_strategy(), size in 8usize..120, overlap_frac in 0.0f64..0.9) {
        let overlap = ((size as f64) * overlap_frac) as usize;
        let chunker = Chunker::new(size, overlap).unwrap();
        let chunks = chunker.split(&text, &DocumentId::from_bytes(text.as_bytes()));
        prop_assert_eq!(reassemble(&chunks, overlap), text.clone());
        if text.is_empty() { prop_assert!(chunks.is_empty()); }
        if !text.is_empty() && text.chars().count() <= size { prop_assert_eq!(chunks.len(), 1); }
        for c in &chunks { prop_assert!(c.content.chars().count() <= size); }
        for w in chunks.windows(2) {
            let prev: Vec<char> = w[0].content.chars().collect();
            let next: Vec<char> = w[1].content.chars().collect();
            prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
        }
    }

    #[test]
    fn normalizer_keeps_a_meaningful_subsequence(lines in prop::collection::vec("[ \\-_.*a-z0-9]{0,10}", 0..20)) {
        let text = lines.join("\n");
        let out = normalize(&text);
        let kept: Vec<&str> = if out.is_empty() { vec![] } else { out.split('\n').collect() };
        let mut input = text.split('\n');
        for line in &kept {
            prop_assert!(is_meaningful_line(line));
            prop_assert!(input.any(|l| l == *line), "output must be an ordered subsequence of the input");
        }
        prop_assert_eq!(normalize(&out), out.clone());
    }
}
