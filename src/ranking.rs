//! Guess ranking and confidence, shared by both distinguishers.

/// Floor applied to the runner-up score when computing the contrast ratio.
const CONTRAST_EPSILON: f64 = 1e-15;

/// Outcome of ranking the guess scores of one key byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    pub best_guess: u8,
    pub best_score: f64,
    pub second_best_guess: u8,
    pub second_best_score: f64,
    /// Contrast between the two best scores, in [0, 1]
    pub confidence: f64,
}

/// Rank non-negative guess scores, indexed by guess value.
///
/// Both ranks are found in a single scan rather than by overwriting the
/// winner's slot with a sentinel, so the score vector stays intact. Ties
/// break towards the lower guess.
///
/// Confidence is a contrast measure, not a calibrated probability: 1.0 means
/// the best score at least doubles the runner-up (or the runner-up is ~0),
/// 0.0 means the top two are indistinguishable.
///
/// # Panics
/// Panics if `scores` has fewer than two entries.
pub fn rank(scores: &[f64]) -> Ranking {
    assert!(scores.len() >= 2);

    let mut best = 0usize;
    let mut second = None;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            second = Some(best);
            best = i;
        } else if second.is_none_or(|s| score > scores[s]) {
            second = Some(i);
        }
    }
    let second = second.unwrap();

    let best_score = scores[best];
    let second_best_score = scores[second];
    let contrast =
        (best_score - second_best_score) / f64::max(second_best_score, CONTRAST_EPSILON);

    Ranking {
        best_guess: best as u8,
        best_score,
        second_best_guess: second as u8,
        second_best_score,
        confidence: contrast.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::rank;

    #[test]
    fn test_rank_finds_top_two() {
        let mut scores = vec![0.0; 256];
        scores[0x2b] = 0.9;
        scores[0x7e] = 0.4;

        let ranking = rank(&scores);
        assert_eq!(ranking.best_guess, 0x2b);
        assert_eq!(ranking.second_best_guess, 0x7e);
        assert_eq!(ranking.best_score, 0.9);
        assert_eq!(ranking.second_best_score, 0.4);
    }

    #[test]
    fn test_confidence_is_one_when_runner_up_is_zero() {
        let mut scores = vec![0.0; 256];
        scores[17] = 0.5;

        let ranking = rank(&scores);
        assert_eq!(ranking.best_guess, 17);
        assert_eq!(ranking.confidence, 1.0);
    }

    #[test]
    fn test_confidence_is_zero_on_equal_top_scores() {
        let mut scores = vec![0.0; 256];
        scores[3] = 0.7;
        scores[200] = 0.7;

        let ranking = rank(&scores);
        assert_eq!(ranking.confidence, 0.0);
    }

    #[test]
    fn test_ties_break_towards_the_lower_guess() {
        let mut scores = vec![0.1; 256];
        scores[8] = 0.7;
        scores[42] = 0.7;
        scores[99] = 0.7;

        let ranking = rank(&scores);
        assert_eq!(ranking.best_guess, 8);
        assert_eq!(ranking.second_best_guess, 42);
    }

    #[test]
    fn test_confidence_stays_in_unit_interval() {
        let mut scores = vec![0.0; 256];
        scores[1] = 100.0;
        scores[2] = 1.0;

        // Contrast far above 1 clamps to 1
        assert_eq!(rank(&scores).confidence, 1.0);

        scores[2] = 99.0;
        let confidence = rank(&scores).confidence;
        assert!((0.0..=1.0).contains(&confidence));
    }
}
