//! Even-sieve downsampling for range queries.

use crate::store::Reading;

/// Reduce `rows` to at most `target` representative points.
///
/// Picks are positional, not temporal: index `k * (len-1) / (target-1)` for
/// each of `target` slots, so the first and last rows are always kept and
/// intermediate picks are evenly spaced by position. Only real rows are
/// returned, never interpolated ones. When `target` is close to `len` the
/// index formula can repeat an index; duplicates are kept as is (no dedup),
/// so slightly fewer distinct rows than `target` may come back.
///
/// `target` must be >= 1; the API layer clamps it before calling.
pub fn sieve_evenly(rows: Vec<Reading>, target: usize) -> Vec<Reading> {
    let count = rows.len();
    if count <= target {
        return rows;
    }
    if target == 1 {
        return vec![rows[count - 1].clone()];
    }

    let last_index = count - 1;
    let step_count = target - 1;
    (0..target)
        .map(|k| rows[k * last_index / step_count].clone())
        .collect()
}
