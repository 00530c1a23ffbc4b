//! Convenient utility functions.

use ndarray::ArrayView1;

#[cfg(feature = "progress_bar")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress_bar")]
use std::time::Duration;

/// Creates a [`ProgressBar`] sized for one tick per completed key byte.
#[cfg(feature = "progress_bar")]
pub fn progress_bar(len: usize) -> ProgressBar {
    let progress_bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::with_template("{elapsed_precise} {wide_bar} {pos}/{len}").unwrap(),
    );
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

/// Return the maximum of the given non-negative values, or 0 if the array is
/// empty.
///
/// Ties resolve to the earliest sample; a strictly-greater scan keeps the
/// result deterministic.
pub fn max_value(array: ArrayView1<f64>) -> f64 {
    let mut max = 0.0;
    for &value in array.iter() {
        if value > max {
            max = value;
        }
    }

    max
}

/// Return the maximum absolute value of the given array, or 0 if it is empty.
pub fn max_abs(array: ArrayView1<f64>) -> f64 {
    let mut max = 0.0;
    for &value in array.iter() {
        if value.abs() > max {
            max = value.abs();
        }
    }

    max
}

#[cfg(test)]
mod tests {
    use super::{max_abs, max_value};
    use ndarray::{Array1, array};

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(array![0.3, 1.5, 0.2, 1.5].view()), 1.5);
        assert_eq!(max_value(Array1::zeros(0).view()), 0.0);
    }

    #[test]
    fn test_max_abs() {
        assert_eq!(max_abs(array![0.3, -1.5, 0.2, 1.2].view()), 1.5);
        assert_eq!(max_abs(Array1::zeros(0).view()), 0.0);
    }
}
