//! Bernoulli score functions for one block pair.
//!
//! # Score formula (profile log-likelihood of a block pair)
//!
//! ```text
//! p = edge / total
//! score(edge, total) = edge * ln(p) + (total - edge) * ln(1 - p)
//! ```
//!
//! with `0 * ln(0) = 0`, so pairs without possible edges, pairs without
//! observed edges, and saturated pairs all score zero.

use matrix_util::ndarray_util::xlogy;

/// Maximum-likelihood edge probability; 0 when no pair is possible
#[inline]
pub fn edge_probability(edge: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        edge as f64 / total as f64
    }
}

/// Bernoulli profile log-likelihood of one block pair.
///
/// This is the hot path of the samplers, called O(K) times per move.
///
/// * `edge` - observed edges between the two blocks
/// * `total` - possible vertex pairs between the two blocks
#[inline]
pub fn bernoulli_score(edge: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = edge_probability(edge, total);
    let non_edge = total.saturating_sub(edge);
    xlogy(edge as f64, p) + xlogy(non_edge as f64, 1.0 - p)
}
