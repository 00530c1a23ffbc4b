//! Score evolution as traces accumulate.
//!
//! For one key byte, scores every guess over growing trace prefixes. The
//! output is plain numbers, one row per guess; rendering the curves is the
//! plotting side's business.

use ndarray::{Array1, Array2, ArrayView2, s};
use num_traits::AsPrimitive;
use rayon::prelude::*;

use crate::attack::GUESS_RANGE;
use crate::distinguishers::{LeakageModel, cpa, dpa};

/// Per-guess score curves over growing trace prefixes.
#[derive(Debug, Clone)]
pub struct Convergence {
    /// Prefix sizes, one per column of `scores`
    pub trace_counts: Vec<usize>,
    /// 256 x `trace_counts.len()` score matrix, one row per guess
    pub scores: Array2<f64>,
}

/// Compute the convergence curves of one key byte.
///
/// Prefix sizes run from `start` (inclusive) to the full trace count
/// (exclusive) in steps of `step`. Prefixes too small to score degenerate to
/// 0, like any other degenerate partition.
///
/// # Panics
/// Panics if `step` is 0 or if the matrices disagree on row count.
pub fn convergence<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    model: LeakageModel,
    start: usize,
    step: usize,
) -> Convergence
where
    T: AsPrimitive<f64> + Sync,
{
    assert!(step > 0);
    assert_eq!(traces.shape()[0], plaintexts.shape()[0]);

    let trace_counts: Vec<usize> = (start..traces.shape()[0]).step_by(step).collect();

    let rows: Vec<Array1<f64>> = (0..GUESS_RANGE)
        .into_par_iter()
        .map(|guess| {
            let mut row = Array1::zeros(trace_counts.len());
            for (k, &n) in trace_counts.iter().enumerate() {
                let trace_prefix = traces.slice(s![..n, ..]);
                let plaintext_prefix = plaintexts.slice(s![..n, ..]);

                row[k] = match model {
                    LeakageModel::Dpa => {
                        dpa::score(trace_prefix, plaintext_prefix, byte_index, guess as u8)
                    }
                    LeakageModel::Cpa => {
                        cpa::score(trace_prefix, plaintext_prefix, byte_index, guess as u8)
                    }
                };
            }

            row
        })
        .collect();

    let mut scores = Array2::zeros((GUESS_RANGE, trace_counts.len()));
    for (guess, row) in rows.iter().enumerate() {
        scores.row_mut(guess).assign(row);
    }

    Convergence {
        trace_counts,
        scores,
    }
}
