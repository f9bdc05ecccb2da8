use proptest::prelude::*;

use docqa_core::traits::Retriever;
use docqa_core::{Chunk, DocumentId, SourceKind};
use docqa_text::LexicalIndex;

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    let doc = DocumentId::from_bytes(b"lexical");
    texts.iter().enumerate().map(|(i, t)| Chunk { index: i, content: t.to_string(), start: 0, end: t.len(), document: doc.clone() }).collect()
}

const PETS: &[&str] = &[
    "Cats are small carnivorous mammals. Cats purr when content.",
    "Dogs are loyal companions and bark at strangers.",
    "Fish live in water and breathe through gills.",
];

#[test]
fn best_matching_chunk_ranks_first() {
    let idx = LexicalIndex::build(&chunks(PETS)).unwrap();
    let hits = idx.search("Why do cats purr?", 2).unwrap();
    assert_eq!(hits.len(), 1, "only the cat chunk shares terms with the query");
    assert_eq!(hits[0].chunk, 0);
    assert_eq!(hits[0].source, SourceKind::Text);
    assert!(hits[0].score > 0.0);

    let hits = idx.search("dogs bark, fish swim", 3).unwrap();
    let ids: Vec<usize> = hits.iter().map(|h| h.chunk).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&1) && ids.contains(&2));
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn equal_scores_follow_chunk_order() {
    let idx = LexicalIndex::build(&chunks(&["parrots talk", "cats purr", "lizards bask", "cats purr"])).unwrap();
    let hits = idx.search("purr", 5).unwrap();
    let ids: Vec<usize> = hits.iter().map(|h| h.chunk).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(hits[0].score, hits[1].score);

    let top = idx.search("purr", 1).unwrap();
    assert_eq!(top[0].chunk, 1);
}

#[test]
fn k_bounds_the_result() {
    let idx = LexicalIndex::build(&chunks(&["alpha beta", "alpha gamma", "alpha delta", "alpha"])).unwrap();
    assert_eq!(idx.search("alpha", 2).unwrap().len(), 2);
    assert_eq!(idx.search("alpha", 10).unwrap().len(), 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn repeated_queries_are_deterministic(words in prop::collection::vec("[a-e]{1,3}", 1..6), k in 1usize..5) {
        let idx = LexicalIndex::build(&chunks(&["a b c", "b c d", "c d e", "a e", "b b b"])).unwrap();
        let q = words.join(" ");
        let first = idx.search(&q, k).unwrap();
        prop_assert!(first.len() <= k);
        for w in first.windows(2) { prop_assert!(w[0].score >= w[1].score); }
        prop_assert_eq!(first, idx.search(&q, k).unwrap());
    }
}
