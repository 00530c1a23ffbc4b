//! Full-key recovery: one worker per key byte, fanned out over a rayon pool.
//!
//! Workers only borrow read-only views of the shared matrices; every
//! accumulator they build is private to the task, so no locking is involved.
//! Scoring itself is infallible. All preconditions are checked before any
//! task is scheduled, and a panic inside a worker unwinds through the pool
//! and aborts the whole attack, so the caller always gets either a complete
//! 16-byte [`KeyGuess`] or an error, never a partial key.

use std::fs::File;
use std::iter::zip;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array1, ArrayView2};
use num_traits::AsPrimitive;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    distinguishers::{LeakageModel, cpa, dpa},
    error::Result,
    ranking,
    shared::{Element, SharedMatrix},
};

/// Number of key bytes recovered per attack.
pub const KEY_BYTES: usize = 16;

/// Number of candidate values per key byte.
pub const GUESS_RANGE: usize = 256;

/// Attack parameters beyond the input matrices.
#[derive(Debug, Clone, Copy)]
pub struct AttackOptions {
    /// Leakage model scoring the guesses
    pub model: LeakageModel,
    /// Keep the winning guess's differential/correlation curve per byte
    pub report_curves: bool,
}

impl AttackOptions {
    pub fn new(model: LeakageModel) -> Self {
        Self {
            model,
            report_curves: false,
        }
    }

    pub fn with_curves(mut self) -> Self {
        self.report_curves = true;
        self
    }
}

/// Ranked outcome for one key-byte position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteResult {
    /// Highest-scoring guess
    pub guess: u8,
    /// Contrast between the two best scores, in [0, 1]
    pub confidence: f64,
    pub best_score: f64,
    pub second_best_score: f64,
    pub second_best_guess: u8,
    /// Differential or correlation curve of the winning guess, when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub curve: Option<Array1<f64>>,
}

/// Recovered round key: one [`ByteResult`] per byte position, in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyGuess {
    bytes: Vec<ByteResult>,
}

impl KeyGuess {
    /// Per-byte results, indexed by key-byte position.
    pub fn byte_results(&self) -> &[ByteResult] {
        &self.bytes
    }

    /// The recovered key bytes.
    pub fn key(&self) -> [u8; KEY_BYTES] {
        let mut key = [0u8; KEY_BYTES];
        for (slot, result) in zip(&mut key, &self.bytes) {
            *slot = result.guess;
        }

        key
    }

    /// The recovered key as a lowercase hex string.
    pub fn hex(&self) -> String {
        hex::encode(self.key())
    }

    /// Compare against a known key, byte for byte.
    pub fn matches(&self, key: &[u8; KEY_BYTES]) -> bool {
        self.key() == *key
    }

    /// Save the [`KeyGuess`] to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;

        Ok(())
    }

    /// Load a [`KeyGuess`] from a JSON file.
    ///
    /// A key guess always holds exactly 16 ordered byte results; a file with
    /// any other count is rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let guess: KeyGuess = serde_json::from_reader(file)?;

        if guess.bytes.len() != KEY_BYTES {
            return Err(Error::KeyGuessLength {
                expected: KEY_BYTES,
                actual: guess.bytes.len(),
            });
        }

        Ok(guess)
    }
}

/// Score all 256 guesses of one key byte and rank them.
///
/// Guess scores are independent of each other and of any other byte; given
/// identical inputs the result is bit-identical.
pub fn guess_byte<T>(
    traces: ArrayView2<T>,
    plaintexts: ArrayView2<u8>,
    byte_index: usize,
    options: AttackOptions,
) -> ByteResult
where
    T: AsPrimitive<f64> + Sync,
{
    let mut scores = vec![0.0f64; GUESS_RANGE];
    for (guess, score) in scores.iter_mut().enumerate() {
        *score = match options.model {
            LeakageModel::Dpa => dpa::score(traces, plaintexts, byte_index, guess as u8),
            LeakageModel::Cpa => cpa::score(traces, plaintexts, byte_index, guess as u8),
        };
    }

    let ranking = ranking::rank(&scores);

    // Recomputed for the winner only, instead of retaining 256 curves
    let curve = options.report_curves.then(|| match options.model {
        LeakageModel::Dpa => {
            dpa::differential_curve(traces, plaintexts, byte_index, ranking.best_guess)
        }
        LeakageModel::Cpa => {
            cpa::correlation_curve(traces, plaintexts, byte_index, ranking.best_guess)
        }
    });

    ByteResult {
        guess: ranking.best_guess,
        confidence: ranking.confidence,
        best_score: ranking.best_score,
        second_best_score: ranking.second_best_score,
        second_best_guess: ranking.second_best_guess,
        curve,
    }
}

/// Recover all 16 key bytes from the shared matrices.
///
/// Byte tasks run in parallel and may finish in any order; each result is
/// stored at the slot of its byte index, so the returned [`KeyGuess`] is
/// always in key order. `on_progress` is invoked once per completed byte
/// task with the number of bytes finished so far; increment and callback
/// happen under one lock, so the observer receives 1 up to 16 in order.
pub fn recover_key_with_progress<T, F>(
    traces: &SharedMatrix<T>,
    plaintexts: &SharedMatrix<u8>,
    options: AttackOptions,
    on_progress: F,
) -> Result<KeyGuess>
where
    T: Element + AsPrimitive<f64>,
    F: Fn(usize) + Sync,
{
    check_preconditions(traces, plaintexts)?;

    let traces_view = traces.view();
    let plaintexts_view = plaintexts.view();
    let completed = Mutex::new(0usize);

    // An indexed parallel iterator collects in task order, whatever the
    // completion order.
    let bytes: Vec<ByteResult> = (0..KEY_BYTES)
        .into_par_iter()
        .map(|byte_index| {
            let result = guess_byte(traces_view, plaintexts_view, byte_index, options);

            let mut count = completed.lock().unwrap();
            *count += 1;
            on_progress(*count);
            drop(count);

            result
        })
        .collect();

    Ok(KeyGuess { bytes })
}

/// Recover all 16 key bytes, without progress reporting.
pub fn recover_key<T>(
    traces: &SharedMatrix<T>,
    plaintexts: &SharedMatrix<u8>,
    options: AttackOptions,
) -> Result<KeyGuess>
where
    T: Element + AsPrimitive<f64>,
{
    recover_key_with_progress(traces, plaintexts, options, |_| {})
}

fn check_preconditions<T: Element>(
    traces: &SharedMatrix<T>,
    plaintexts: &SharedMatrix<u8>,
) -> Result<()> {
    if traces.rows() != plaintexts.rows() {
        return Err(Error::RowCountMismatch {
            traces: traces.rows(),
            plaintexts: plaintexts.rows(),
        });
    }
    if traces.rows() == 0 {
        return Err(Error::EmptyTraceSet);
    }
    if plaintexts.cols() != KEY_BYTES {
        return Err(Error::PlaintextWidth {
            expected: KEY_BYTES,
            actual: plaintexts.cols(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        AttackOptions, KEY_BYTES, KeyGuess, guess_byte, recover_key, recover_key_with_progress,
    };
    use crate::{
        Error,
        distinguishers::LeakageModel,
        leakage_model::{aes::intermediate, hw, lsb},
        shared::SharedMatrix,
    };
    use ndarray::Array2;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
    use ndarray_rand::rand_distr::Uniform;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: [u8; KEY_BYTES] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];

    fn random_plaintexts(num_traces: usize, rng: &mut StdRng) -> Array2<u8> {
        Array2::random_using((num_traces, KEY_BYTES), Uniform::new_inclusive(0, 255), rng)
    }

    /// Noise everywhere except column 7, which encodes the intermediate's
    /// LSB for `KEY[0]` as +/-1.
    fn dpa_leaky_traces(plaintexts: &Array2<u8>, rng: &mut StdRng) -> Array2<f64> {
        let num_traces = plaintexts.shape()[0];
        let mut traces = Array2::random_using((num_traces, 24), Uniform::new(-0.05, 0.05), rng);
        for (i, plaintext) in plaintexts.rows().into_iter().enumerate() {
            traces[[i, 7]] = if lsb(intermediate(KEY[0], plaintext[0])) {
                1.0
            } else {
                -1.0
            };
        }

        traces
    }

    #[test]
    fn test_dpa_recovers_planted_byte() {
        let mut rng = StdRng::seed_from_u64(1);
        let plaintexts = random_plaintexts(200, &mut rng);
        let traces = dpa_leaky_traces(&plaintexts, &mut rng);

        let result = guess_byte(
            traces.view(),
            plaintexts.view(),
            0,
            AttackOptions::new(LeakageModel::Dpa),
        );

        assert_eq!(result.guess, KEY[0]);
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn test_cpa_recovers_planted_byte() {
        let mut rng = StdRng::seed_from_u64(2);
        let plaintexts = random_plaintexts(100, &mut rng);

        // Column 7 amplitude is proportional to the intermediate's Hamming
        // weight.
        let mut traces = Array2::random_using((100, 24), Uniform::new(-0.05, 0.05), &mut rng);
        for (i, plaintext) in plaintexts.rows().into_iter().enumerate() {
            traces[[i, 7]] = 0.1 * f64::from(hw(intermediate(KEY[0], plaintext[0])));
        }

        let result = guess_byte(
            traces.view(),
            plaintexts.view(),
            0,
            AttackOptions::new(LeakageModel::Cpa),
        );

        assert_eq!(result.guess, KEY[0]);
    }

    #[test]
    fn test_byte_worker_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let plaintexts = random_plaintexts(60, &mut rng);
        let traces = dpa_leaky_traces(&plaintexts, &mut rng);

        let options = AttackOptions::new(LeakageModel::Dpa).with_curves();
        let first = guess_byte(traces.view(), plaintexts.view(), 0, options);
        let second = guess_byte(traces.view(), plaintexts.view(), 0, options);

        assert_eq!(first, second);
    }

    #[test]
    fn test_full_key_is_assembled_in_byte_order() {
        let mut rng = StdRng::seed_from_u64(4);
        let plaintexts = random_plaintexts(150, &mut rng);

        // One leaky column per key byte, so every slot of the result must
        // line up with its byte index whatever order the workers finish in.
        let num_traces = plaintexts.shape()[0];
        let mut traces = Array2::random_using(
            (num_traces, KEY_BYTES + 4),
            Uniform::new(-0.05, 0.05),
            &mut rng,
        );
        for (i, plaintext) in plaintexts.rows().into_iter().enumerate() {
            for (j, &key_byte) in KEY.iter().enumerate() {
                traces[[i, j]] = if lsb(intermediate(key_byte, plaintext[j])) {
                    1.0
                } else {
                    -1.0
                };
            }
        }

        let traces = SharedMatrix::from_array(traces);
        let plaintexts = SharedMatrix::from_array(plaintexts);

        let completions = AtomicUsize::new(0);
        let result = recover_key_with_progress(
            &traces,
            &plaintexts,
            AttackOptions::new(LeakageModel::Dpa),
            |done| {
                completions.fetch_add(1, Ordering::SeqCst);
                assert!((1..=KEY_BYTES).contains(&done));
            },
        )
        .unwrap();

        assert_eq!(completions.load(Ordering::SeqCst), KEY_BYTES);
        assert_eq!(result.key(), KEY);
        assert!(result.matches(&KEY));
        assert_eq!(result.hex(), "2b7e151628aed2a6abf7158809cf4f3c");
        for (i, byte) in result.byte_results().iter().enumerate() {
            assert_eq!(byte.guess, KEY[i]);
        }
    }

    #[test]
    fn test_progress_is_delivered_in_order() {
        let mut rng = StdRng::seed_from_u64(6);
        let plaintexts = SharedMatrix::from_array(random_plaintexts(40, &mut rng));
        let traces = SharedMatrix::from_array(Array2::random_using(
            (40, 8),
            Uniform::new(-1.0, 1.0),
            &mut rng,
        ));

        // Workers race to report; delivery must still reach the observer as
        // 1 up to 16 with no inversion, every run.
        for _ in 0..20 {
            let delivered = Mutex::new(Vec::new());
            recover_key_with_progress(
                &traces,
                &plaintexts,
                AttackOptions::new(LeakageModel::Dpa),
                |done| delivered.lock().unwrap().push(done),
            )
            .unwrap();

            let delivered = delivered.into_inner().unwrap();
            assert_eq!(delivered, (1..=KEY_BYTES).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut rng = StdRng::seed_from_u64(9);
        let plaintexts = SharedMatrix::from_array(random_plaintexts(30, &mut rng));
        let traces = SharedMatrix::from_array(Array2::random_using(
            (30, 8),
            Uniform::new(-1.0, 1.0),
            &mut rng,
        ));

        let result =
            recover_key(&traces, &plaintexts, AttackOptions::new(LeakageModel::Cpa)).unwrap();

        let path = std::env::temp_dir().join("keylift_test_key_guess.json");
        result.save(&path).unwrap();
        let restored = KeyGuess::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(result, restored);
    }

    #[test]
    fn test_load_rejects_wrong_result_count() {
        let path = std::env::temp_dir().join("keylift_test_short_key_guess.json");
        std::fs::write(
            &path,
            r#"{"bytes":[{"guess":43,"confidence":1.0,"best_score":2.0,"second_best_score":0.0,"second_best_guess":0}]}"#,
        )
        .unwrap();

        let loaded = KeyGuess::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            loaded,
            Err(Error::KeyGuessLength {
                expected: KEY_BYTES,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_row_count_mismatch_is_fatal() {
        let traces = SharedMatrix::from_array(Array2::<f64>::zeros((4, 8)));
        let plaintexts = SharedMatrix::from_array(Array2::<u8>::zeros((5, KEY_BYTES)));

        assert!(matches!(
            recover_key(&traces, &plaintexts, AttackOptions::new(LeakageModel::Dpa)),
            Err(Error::RowCountMismatch {
                traces: 4,
                plaintexts: 5
            })
        ));
    }

    #[test]
    fn test_empty_trace_set_is_fatal() {
        let traces = SharedMatrix::from_array(Array2::<f64>::zeros((0, 8)));
        let plaintexts = SharedMatrix::from_array(Array2::<u8>::zeros((0, KEY_BYTES)));

        assert!(matches!(
            recover_key(&traces, &plaintexts, AttackOptions::new(LeakageModel::Cpa)),
            Err(Error::EmptyTraceSet)
        ));
    }

    #[test]
    fn test_narrow_plaintexts_are_fatal() {
        let traces = SharedMatrix::from_array(Array2::<f64>::zeros((4, 8)));
        let plaintexts = SharedMatrix::from_array(Array2::<u8>::zeros((4, 2)));

        assert!(matches!(
            recover_key(&traces, &plaintexts, AttackOptions::new(LeakageModel::Dpa)),
            Err(Error::PlaintextWidth {
                expected: KEY_BYTES,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_curves_are_reported_on_request() {
        let mut rng = StdRng::seed_from_u64(5);
        let plaintexts = random_plaintexts(60, &mut rng);
        let traces = dpa_leaky_traces(&plaintexts, &mut rng);
        let num_samples = traces.shape()[1];

        let without = guess_byte(
            traces.view(),
            plaintexts.view(),
            0,
            AttackOptions::new(LeakageModel::Dpa),
        );
        assert!(without.curve.is_none());

        let with = guess_byte(
            traces.view(),
            plaintexts.view(),
            0,
            AttackOptions::new(LeakageModel::Dpa).with_curves(),
        );
        let curve = with.curve.unwrap();
        assert_eq!(curve.len(), num_samples);
        // The planted column carries the peak
        assert_eq!(curve[7], with.best_score);
    }
}
