//! Storage implementations for fitrag
//!
//! In-memory [`VectorStore`](crate::rag::VectorStore) and
//! [`SourceStore`](crate::rag::SourceStore) implementations, plus the
//! similarity helpers shared with the SQLite store.

pub mod memory;
pub use memory::{MemorySourceStore, MemoryVectorStore};

use std::cmp::Ordering;

use crate::rag::ScoredDocument;

/// Cosine similarity between two vectors; 0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Sort by descending score (ties by id, so results are stable) and keep `k`
pub fn rank(mut scored: Vec<ScoredDocument>, k: usize) -> Vec<ScoredDocument> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    scored.truncate(k);
    scored
}
