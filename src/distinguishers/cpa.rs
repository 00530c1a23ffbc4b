//! Pearson-correlation distinguisher (CPA[^1]).
//!
//! The Hamming weight of the modeled intermediate value is correlated with
//! each time-sample column of the traces; a guess is scored by its largest
//! absolute correlation.
//!
//! [^1]: <https://www.iacr.org/archive/ches2004/31560016/31560016.pdf>

use ndarray::{Array1, ArrayView2};
use num_traits::AsPrimitive;

use crate::leakage_model::{aes::intermediate, hw};
use crate::util::max_abs;

/// Signed Pearson correlation curve of one key-byte guess, one coefficient
/// per time sample.
///
/// A zero-variance column (or a constant prediction vector) yields a
/// coefficient of 0: a flat signal carries no information and is not an
/// error, so no division by zero ever happens.
///
/// # Panics
/// Panics in debug if the matrices disagree on row count.
pub fn correlation_curve<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    guess: u8,
) -> Array1<f64>
where
    T: AsPrimitive<f64>,
{
    debug_assert_eq!(traces.shape()[0], plaintexts.shape()[0]);

    let num_traces = traces.shape()[0];
    let num_samples = traces.shape()[1];

    let predictions: Array1<f64> = plaintexts
        .rows()
        .into_iter()
        .map(|plaintext| f64::from(hw(intermediate(guess, plaintext[byte_index]))))
        .collect();
    let prediction_mean = predictions.sum() / num_traces as f64;

    let centered_predictions = predictions.mapv(|p| p - prediction_mean);
    let prediction_ss: f64 = centered_predictions.iter().map(|p| p * p).sum();

    let mut curve = Array1::zeros(num_samples);
    if prediction_ss == 0.0 {
        return curve;
    }

    for j in 0..num_samples {
        let column = traces.column(j);

        let mut column_mean = 0.0;
        for i in 0..num_traces {
            column_mean += column[i].as_();
        }
        column_mean /= num_traces as f64;

        let mut covariance = 0.0;
        let mut column_ss = 0.0;
        for i in 0..num_traces {
            let centered = column[i].as_() - column_mean;
            covariance += centered_predictions[i] * centered;
            column_ss += centered * centered;
        }

        let denominator = f64::sqrt(prediction_ss * column_ss);
        curve[j] = if denominator == 0.0 {
            0.0
        } else {
            covariance / denominator
        };
    }

    curve
}

/// Scalar CPA score of one guess: the peak absolute correlation.
///
/// The sign of a correlation is uninformative for ranking, so the score is
/// always non-negative even though the underlying curve is signed.
pub fn score<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    guess: u8,
) -> f64
where
    T: AsPrimitive<f64>,
{
    max_abs(
        correlation_curve(traces, plaintexts, byte_index, guess).view(),
    )
}
