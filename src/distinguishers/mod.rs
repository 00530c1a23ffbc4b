//! Leakage-scoring distinguishers.

use serde::{Deserialize, Serialize};

pub mod cpa;
pub mod dpa;

/// Leakage model used to score key-byte guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeakageModel {
    /// Difference of means over a one-bit partition of the traces.
    Dpa,
    /// Pearson correlation against Hamming-weight predictions.
    Cpa,
}
