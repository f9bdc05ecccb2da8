//! Score fusion for ranked hit lists.

use std::collections::HashMap;

use docqa_core::config::FusionStrategy;
use docqa_core::types::{SearchHit, SourceKind};

/// Default reciprocal-rank constant.
pub const RRF_C: f32 = 60.0;

/// 1-based competition ranks for a list sorted best first: equal scores share a rank.
pub fn competition_ranks(hits: &[SearchHit]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(hits.len());
    for (i, h) in hits.iter().enumerate() {
        let rank = match ranks.last() {
            Some(&prev) if hits[i - 1].score == h.score => prev,
            _ => i + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// Per-list normalized scores, aligned with `hits`.
pub fn normalized(hits: &[SearchHit], strategy: FusionStrategy, rrf_c: f32) -> Vec<f32> {
    match strategy {
        FusionStrategy::ReciprocalRank => competition_ranks(hits).into_iter().map(|r| 1.0 / (rrf_c + r as f32)).collect(),
        FusionStrategy::MinMax => {
            let min = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
            let max = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
            let span = max - min;
            hits.iter().map(|h| if span > 0.0 { (h.score - min) / span } else { 1.0 }).collect()
        }
    }
}

/// Weighted additive fusion of `(hits, weight)` lists, each sorted best first.
///
/// A chunk in several lists accumulates every contribution. The result is
/// sorted by fused score; equal scores keep first-appearance order across
/// the lists in the order given.
pub fn fuse(lists: &[(&[SearchHit], f32)], strategy: FusionStrategy, rrf_c: f32) -> Vec<SearchHit> {
    let mut order: Vec<(usize, f32)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for (hits, weight) in lists {
        for (hit, score) in hits.iter().zip(normalized(hits, strategy, rrf_c)) {
            let i = *slot.entry(hit.chunk).or_insert_with(|| { order.push((hit.chunk, 0.0)); order.len() - 1 });
            order[i].1 += weight * score;
        }
    }
    // Stable sort keeps first appearance on ties.
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order.into_iter().map(|(chunk, score)| SearchHit { chunk, score, source: SourceKind::Hybrid }).collect()
}
