use rayon::prelude::*;

/// Compute cosine similarity between two embedding vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut mag_a = 0.0_f64;
    let mut mag_b = 0.0_f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Highest cosine similarity between `query` and any row of `table`.
///
/// Returns 0.0 for an empty table. Negative similarities are reported as is.
#[must_use]
pub fn max_similarity(query: &[f32], table: &[Vec<f32>]) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    table
        .par_iter()
        .map(|row| cosine_similarity(query, row))
        .reduce(|| f64::NEG_INFINITY, f64::max)
}
