//! Difference-of-means distinguisher (DPA[^1]).
//!
//! Traces are partitioned by the least significant bit of the modeled
//! intermediate value; a guess is scored by the largest absolute gap between
//! the two partitions' mean traces.
//!
//! [^1]: <https://paulkocher.com/doc/DifferentialPowerAnalysis.pdf>

use ndarray::{Array1, ArrayView2};
use num_traits::AsPrimitive;
use std::iter::zip;

use crate::leakage_model::{aes::intermediate, lsb};
use crate::util::max_value;

/// Absolute difference-of-means curve of one key-byte guess, one value per
/// time sample.
///
/// If every trace lands in the same partition the curve is all zeros; an
/// empty partition carries no information and is not an error.
///
/// # Panics
/// Panics in debug if the matrices disagree on row count.
pub fn differential_curve<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    guess: u8,
) -> Array1<f64>
where
    T: AsPrimitive<f64>,
{
    debug_assert_eq!(traces.shape()[0], plaintexts.shape()[0]);

    let num_samples = traces.shape()[1];

    let mut sum_0 = Array1::<f64>::zeros(num_samples);
    let mut sum_1 = Array1::<f64>::zeros(num_samples);
    let mut count_0 = 0usize;
    let mut count_1 = 0usize;

    for (trace, plaintext) in zip(traces.rows(), plaintexts.rows()) {
        if lsb(intermediate(guess, plaintext[byte_index])) {
            for i in 0..num_samples {
                sum_1[i] += trace[i].as_();
            }
            count_1 += 1;
        } else {
            for i in 0..num_samples {
                sum_0[i] += trace[i].as_();
            }
            count_0 += 1;
        }
    }

    if count_0 == 0 || count_1 == 0 {
        return Array1::zeros(num_samples);
    }

    let mut curve = Array1::zeros(num_samples);
    for i in 0..num_samples {
        let mean_0 = sum_0[i] / count_0 as f64;
        let mean_1 = sum_1[i] / count_1 as f64;
        curve[i] = f64::abs(mean_1 - mean_0);
    }

    curve
}

/// Scalar DPA score of one guess: the peak of its differential curve.
///
/// Always non-negative.
pub fn score<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    guess: u8,
) -> f64
where
    T: AsPrimitive<f64>,
{
    max_value(
        differential_curve(traces, plaintexts, byte_index, guess).view(),
    )
}
