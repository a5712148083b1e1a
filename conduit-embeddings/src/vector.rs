//! Dot product, cosine similarity, Euclidean distance, and batched cosine
//! ranking over embedding vectors (`spec.md §4.10`).
//!
//! Dimension mismatches and zero-norm vectors are sentinel values, not
//! errors: `spec.md` treats comparing incompatible embeddings as a
//! predictable no-match rather than a failure mode callers must handle.

use conduit_core::EmbeddingResult;

/// Dot product of `a` and `b`.
///
/// Returns `0.0` if the vectors have different lengths.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of `a` and `b`, in `[-1.0, 1.0]`.
///
/// Returns `0.0` on a dimension mismatch or if either vector has zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

/// Euclidean (L2) distance between `a` and `b`.
///
/// Returns `f32::INFINITY` on a dimension mismatch, a sentinel rather than
/// an error per `spec.md §4.10`.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Computes `cosine_similarity(query, row_i)` for each row of a flat
/// `rows` buffer laid out as `n` contiguous rows of `dim` floats.
///
/// Returns a zero vector of length `n` if `query` has zero norm. Panics if
/// `rows.len()` is not a multiple of `dim`, or if `query.len() != dim`,
/// since that indicates a caller-side layout bug rather than a runtime
/// mismatch between two independently-sourced embeddings.
#[must_use]
pub fn batch_cosine_similarity(query: &[f32], rows: &[f32], dim: usize) -> Vec<f32> {
    assert_eq!(query.len(), dim, "query dimension must match `dim`");
    assert_eq!(rows.len() % dim, 0, "rows buffer must hold whole rows of `dim` floats");

    let n = rows.len() / dim;
    let query_norm = norm(query);
    if query_norm == 0.0 {
        return vec![0.0; n];
    }

    (0..n)
        .map(|i| {
            let row = &rows[i * dim..(i + 1) * dim];
            let row_norm = norm(row);
            if row_norm == 0.0 {
                0.0
            } else {
                dot(query, row) / (query_norm * row_norm)
            }
        })
        .collect()
}

/// Ranks `candidates` against `query` by cosine similarity, descending.
///
/// Returns `(original_index, similarity)` pairs. Ties are broken by
/// original index to keep the ordering deterministic.
#[must_use]
pub fn rank_by_similarity<'a>(
    query: &[f32],
    candidates: &'a [EmbeddingResult],
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, cosine_similarity(query, &c.vector)))
        .collect();
    scored.sort_by(|(ia, a), (ib, b)| {
        b.partial_cmp(a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.cmp(ib))
    });
    scored
}
