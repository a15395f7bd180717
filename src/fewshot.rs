//! Few-shot example assembly.
//!
//! Examples come from one of two places:
//! - the question distribution's own statistics, at fixed ladder points
//!   chosen by the shot count (deterministic)
//! - a pool of generated example distributions, drawn at random without
//!   replacement, each contributing one random statistic
//!
//! Every example renders to the same block layout:
//!
//! ```text
//! Example 1:
//! Distribution:
//! <description>
//! Question:
//! <question>
//! Answer:
//! <answer>...</answer>
//! ```

use crate::sampler::{Outcome, OutcomeSet, Sample};
use crate::stats::{format_value, PercentileMap, RangeMap};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while assembling few-shot examples
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FewShotError {
    #[error("Unsupported number of shots: {0}")]
    UnsupportedShots(usize),

    #[error("No statistics available for {0}")]
    MissingOutcome(String),
}

/// Which fixed set of anchor points the statistics mode uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ladder {
    /// Anchors taken from the primary percentile / probability sets
    Primary,
    /// Anchors offset from the primary ones, so examples never repeat a question
    Intermediate,
}

impl Ladder {
    /// Percentile anchors for `shots` examples
    ///
    /// # Errors
    ///
    /// Returns `FewShotError::UnsupportedShots` for counts outside {0, 1, 3, 5, 7, 9}.
    pub fn percentiles(self, shots: usize) -> Result<&'static [f64], FewShotError> {
        let ladder: &'static [f64] = match (self, shots) {
            (_, 0) => &[],
            (Self::Primary, 1) => &[50.0],
            (Self::Primary, 3) => &[30.0, 50.0, 70.0],
            (Self::Primary, 5) => &[10.0, 30.0, 50.0, 70.0, 90.0],
            (Self::Primary, 7) => &[1.0, 10.0, 30.0, 50.0, 70.0, 90.0, 99.0],
            (Self::Primary, 9) => &[1.0, 10.0, 20.0, 30.0, 50.0, 70.0, 80.0, 90.0, 99.0],
            (Self::Intermediate, 1) => &[55.0],
            (Self::Intermediate, 3) => &[35.0, 55.0, 75.0],
            (Self::Intermediate, 5) => &[15.0, 35.0, 55.0, 75.0, 95.0],
            (Self::Intermediate, 7) => &[5.0, 15.0, 35.0, 45.0, 55.0, 75.0, 95.0],
            (Self::Intermediate, 9) => &[5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 75.0, 85.0, 95.0],
            _ => return Err(FewShotError::UnsupportedShots(shots)),
        };
        Ok(ladder)
    }

    /// Nominal probability anchors for `shots` examples
    ///
    /// # Errors
    ///
    /// Returns `FewShotError::UnsupportedShots` for counts outside {0, 1, 3, 5, 7, 9}.
    pub fn probabilities(self, shots: usize) -> Result<&'static [f64], FewShotError> {
        let ladder: &'static [f64] = match (self, shots) {
            (_, 0) => &[],
            (Self::Primary, 1) => &[0.5],
            (Self::Primary, 3) => &[0.3, 0.5, 0.7],
            (Self::Primary, 5) => &[0.1, 0.3, 0.5, 0.7, 0.9],
            (Self::Primary, 7) => &[0.1, 0.2, 0.3, 0.5, 0.7, 0.8, 0.9],
            (Self::Primary, 9) => &[0.1, 0.2, 0.3, 0.4, 0.5, 0.7, 0.8, 0.9, 1.0],
            (Self::Intermediate, 1) => &[0.55],
            (Self::Intermediate, 3) => &[0.33, 0.55, 0.75],
            (Self::Intermediate, 5) => &[0.15, 0.35, 0.55, 0.75, 0.95],
            (Self::Intermediate, 7) => &[0.15, 0.25, 0.35, 0.55, 0.75, 0.85, 0.95],
            (Self::Intermediate, 9) => &[0.05, 0.15, 0.25, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95],
            _ => return Err(FewShotError::UnsupportedShots(shots)),
        };
        Ok(ladder)
    }
}

/// One generated example distribution and its statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Example<T> {
    pub description: String,
    pub stats: T,
}

/// Question text for the percentile task
#[must_use]
pub fn percentile_question(target: &str, outcome: Option<Outcome>) -> String {
    match outcome {
        Some(outcome) => format!(
            "If outcome {} appears {target} times, what is the percentile of this occurrence within the provided distribution?",
            outcome.number()
        ),
        None => format!("What is the percentile of {target} within the provided distribution?"),
    }
}

/// Question text for the sampling task
#[must_use]
pub fn sampling_question(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(outcome) => format!(
            "Sample a number from the outcome {} distribution and output only the numerical value.",
            outcome.number()
        ),
        None => "Sample a number from the provided distribution and output only the numerical value."
            .to_string(),
    }
}

/// Question text for the probability task
#[must_use]
pub fn probability_question(lower: &str, upper: &str, outcome: Option<Outcome>) -> String {
    let prefix = "Considering only values including and between the 1st percentile and the 99th percentile, what is the probability that a value from";
    match outcome {
        Some(outcome) => format!(
            "{prefix} outcome {} is between {lower} and {upper} within the provided distribution?",
            outcome.number()
        ),
        None => format!("{prefix} the provided distribution is between {lower} and {upper}?"),
    }
}

/// Render one numbered example block
#[must_use]
pub fn render_example(number: usize, description: &str, question: &str, answer: &str) -> String {
    format!(
        "\nExample {number}:\nDistribution:\n{description}\nQuestion:\n{question}\nAnswer:\n<answer>{answer}</answer>\n"
    )
}

fn outcome_stats<'a, T>(stats: &'a OutcomeSet<T>, outcome: Option<Outcome>) -> Result<&'a T, FewShotError> {
    stats.get(outcome).ok_or_else(|| {
        FewShotError::MissingOutcome(outcome.map_or_else(|| "a single-column distribution".to_string(), |o| o.to_string()))
    })
}

/// Examples built from the question distribution's own percentiles.
///
/// Ladder points absent from `stats` are skipped without consuming an
/// example number.
///
/// # Errors
///
/// Returns an error for an unsupported shot count or an outcome that
/// `stats` does not hold.
pub fn percentile_stats_examples(
    description: &str,
    stats: &OutcomeSet<PercentileMap>,
    ladder: Ladder,
    shots: usize,
    outcome: Option<Outcome>,
) -> Result<String, FewShotError> {
    let anchors = ladder.percentiles(shots)?;
    if anchors.is_empty() {
        return Ok(String::new());
    }
    let values = outcome_stats(stats, outcome)?;

    let mut text = String::new();
    let mut number = 1;
    for percentile in anchors {
        if let Some(value) = values.get(*percentile) {
            let question = percentile_question(&format_value(value), outcome);
            text.push_str(&render_example(number, description, &question, &format_value(*percentile)));
            number += 1;
        }
    }
    Ok(text)
}

/// Closest key of `sorted` to `target`.
///
/// Binary search for the insertion point, then compare the two neighbours;
/// a tie goes to the smaller key.
#[must_use]
pub fn closest_probability(sorted: &[f64], target: f64) -> Option<f64> {
    let pos = sorted.partition_point(|p| *p < target);
    if pos == 0 {
        return sorted.first().copied();
    }
    if pos == sorted.len() {
        return sorted.last().copied();
    }
    let (before, after) = (sorted[pos - 1], sorted[pos]);
    if after - target < target - before {
        Some(after)
    } else {
        Some(before)
    }
}

/// Examples built from the question distribution's own ranges, keyed by
/// the achieved probability closest to each ladder point.
///
/// # Errors
///
/// Returns an error for an unsupported shot count or an outcome that
/// `stats` does not hold.
pub fn probability_stats_examples(
    description: &str,
    stats: &OutcomeSet<RangeMap>,
    ladder: Ladder,
    shots: usize,
    outcome: Option<Outcome>,
) -> Result<String, FewShotError> {
    let anchors = ladder.probabilities(shots)?;
    if anchors.is_empty() {
        return Ok(String::new());
    }
    let ranges = outcome_stats(stats, outcome)?;
    let keys = ranges.probabilities();

    let mut text = String::new();
    for (i, target) in anchors.iter().enumerate() {
        let Some(closest) = closest_probability(&keys, *target) else {
            break;
        };
        if let Some((lower, upper)) = ranges.get(closest) {
            let question = probability_question(&format_value(lower), &format_value(upper), outcome);
            text.push_str(&render_example(i + 1, description, &question, &format_value(closest)));
        }
    }
    Ok(text)
}

/// Examples drawn from the question distribution's own sample, with replacement.
///
/// # Errors
///
/// Returns `FewShotError::MissingOutcome` if `samples` has no column for `outcome`.
pub fn sampling_stats_examples<R: Rng + ?Sized>(
    rng: &mut R,
    description: &str,
    samples: &OutcomeSet<Sample>,
    shots: usize,
    outcome: Option<Outcome>,
) -> Result<String, FewShotError> {
    if shots == 0 {
        return Ok(String::new());
    }
    let sample = outcome_stats(samples, outcome)?;
    let question = sampling_question(outcome);

    let mut text = String::new();
    for number in 1..=shots {
        if let Some(value) = sample.choose(rng) {
            text.push_str(&render_example(number, description, &question, &sample.render(value)));
        }
    }
    Ok(text)
}

/// Statistics that can pose a random worked question about themselves
pub trait PoolStats {
    /// Pick a random `(question, answer)` pair, or `None` if there is nothing to ask
    fn draw_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(String, String)>;
}

fn choose_outcome<'a, T, R: Rng + ?Sized>(stats: &'a OutcomeSet<T>, rng: &mut R) -> Option<(Option<Outcome>, &'a T)> {
    let outcome = *stats.outcomes().choose(rng)?;
    stats.get(outcome).map(|value| (outcome, value))
}

impl PoolStats for OutcomeSet<PercentileMap> {
    fn draw_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(String, String)> {
        let (outcome, values) = choose_outcome(self, rng)?;
        let entries: Vec<(f64, f64)> = values.iter().collect();
        let (percentile, value) = *entries.choose(rng)?;
        Some((
            percentile_question(&format_value(value), outcome),
            format_value(percentile),
        ))
    }
}

impl PoolStats for OutcomeSet<RangeMap> {
    fn draw_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(String, String)> {
        let (outcome, ranges) = choose_outcome(self, rng)?;
        let entries: Vec<(f64, (f64, f64))> = ranges.iter().collect();
        let (probability, (lower, upper)) = *entries.choose(rng)?;
        Some((
            probability_question(&format_value(lower), &format_value(upper), outcome),
            format_value(probability),
        ))
    }
}

impl PoolStats for OutcomeSet<Sample> {
    fn draw_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(String, String)> {
        let (outcome, sample) = choose_outcome(self, rng)?;
        let value = sample.choose(rng)?;
        Some((sampling_question(outcome), sample.render(value)))
    }
}

/// Examples drawn from a pool of generated distributions.
///
/// Picks `min(shots, pool.len())` examples without replacement; each one
/// contributes a single random statistic (and, for multinomial examples, a
/// random outcome).
pub fn pool_examples<R, T>(rng: &mut R, pool: &[Example<T>], shots: usize) -> String
where
    R: Rng + ?Sized,
    T: PoolStats,
{
    let chosen: Vec<&Example<T>> = pool.choose_multiple(rng, shots.min(pool.len())).collect();
    let mut text = String::new();
    let mut number = 1;
    for example in chosen {
        if let Some((question, answer)) = example.stats.draw_question(rng) {
            text.push_str(&render_example(number, &example.description, &question, &answer));
            number += 1;
        }
    }
    text
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn percentiles() -> OutcomeSet<PercentileMap> {
        OutcomeSet::Single(
            [(10.0, 87.2), (30.0, 94.8), (50.0, 100.0), (70.0, 105.2), (90.0, 112.8)]
                .into_iter()
                .collect(),
        )
    }

    fn ranges() -> RangeMap {
        [
            (0.102, (97.4, 102.6)),
            (0.204, (94.8, 105.2)),
            (0.5, (93.2, 106.8)),
            (1.0, (76.7, 123.3)),
        ]
        .into_iter()
        .collect()
    }

    // =========================================================================
    // Ladders
    // =========================================================================

    #[test]
    fn test_ladders_sizes_match_shots() {
        for shots in [1, 3, 5, 7, 9] {
            assert_eq!(Ladder::Primary.percentiles(shots).unwrap().len(), shots);
            assert_eq!(Ladder::Intermediate.percentiles(shots).unwrap().len(), shots);
            assert_eq!(Ladder::Primary.probabilities(shots).unwrap().len(), shots);
            assert_eq!(Ladder::Intermediate.probabilities(shots).unwrap().len(), shots);
        }
        assert!(Ladder::Primary.percentiles(0).unwrap().is_empty());
    }

    #[test]
    fn test_ladders_reject_unknown_counts() {
        assert_eq!(
            Ladder::Primary.probabilities(4),
            Err(FewShotError::UnsupportedShots(4))
        );
        assert_eq!(
            Ladder::Intermediate.percentiles(11),
            Err(FewShotError::UnsupportedShots(11))
        );
        assert_eq!(
            FewShotError::UnsupportedShots(4).to_string(),
            "Unsupported number of shots: 4"
        );
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_render_example_layout() {
        let block = render_example(2, "Distribution Type: X", "Q?", "42");
        assert_eq!(
            block,
            "\nExample 2:\nDistribution:\nDistribution Type: X\nQuestion:\nQ?\nAnswer:\n<answer>42</answer>\n"
        );
    }

    #[test]
    fn test_question_texts() {
        assert_eq!(
            percentile_question("100.0", None),
            "What is the percentile of 100.0 within the provided distribution?"
        );
        assert_eq!(
            percentile_question("300.0", Some(Outcome::new(2))),
            "If outcome 2 appears 300.0 times, what is the percentile of this occurrence within the provided distribution?"
        );
        assert!(sampling_question(Some(Outcome::new(3))).contains("outcome 3 distribution"));
        assert!(probability_question("1.0", "2.0", None).ends_with("is between 1.0 and 2.0?"));
        assert!(probability_question("1.0", "2.0", Some(Outcome::new(1)))
            .ends_with("outcome 1 is between 1.0 and 2.0 within the provided distribution?"));
    }

    // =========================================================================
    // Statistics mode
    // =========================================================================

    #[test]
    fn test_percentile_stats_examples_skip_missing_points() {
        // The 3-shot ladder asks for 30, 50 and 70; all exist
        let text = percentile_stats_examples("D", &percentiles(), Ladder::Primary, 3, None).unwrap();
        assert!(text.contains("Example 3:"));
        assert!(text.contains("What is the percentile of 100.0 within"));
        assert!(text.contains("<answer>50.0</answer>"));

        // The 7-shot ladder includes 1 and 99, which are absent here
        let text = percentile_stats_examples("D", &percentiles(), Ladder::Primary, 7, None).unwrap();
        assert!(text.contains("Example 5:"));
        assert!(!text.contains("Example 6:"));
    }

    #[test]
    fn test_percentile_stats_zero_shots() {
        let text = percentile_stats_examples("D", &percentiles(), Ladder::Primary, 0, None).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_percentile_stats_missing_outcome() {
        let result = percentile_stats_examples(
            "D",
            &percentiles(),
            Ladder::Primary,
            1,
            Some(Outcome::new(1)),
        );
        assert!(matches!(result, Err(FewShotError::MissingOutcome(_))));
    }

    #[test]
    fn test_closest_probability() {
        let keys = [0.102, 0.204, 0.5, 1.0];
        assert_eq!(closest_probability(&keys, 0.05), Some(0.102));
        assert_eq!(closest_probability(&keys, 0.1), Some(0.102));
        assert_eq!(closest_probability(&keys, 0.3), Some(0.204));
        assert_eq!(closest_probability(&keys, 0.4), Some(0.5));
        assert_eq!(closest_probability(&keys, 1.2), Some(1.0));
        assert_eq!(closest_probability(&[0.2, 0.4], 0.3), Some(0.2));
        assert_eq!(closest_probability(&[], 0.5), None);
    }

    #[test]
    fn test_probability_stats_examples_use_achieved_keys() {
        let stats = OutcomeSet::PerOutcome(vec![ranges(), ranges()]);
        let text =
            probability_stats_examples("D", &stats, Ladder::Primary, 3, Some(Outcome::new(2)))
                .unwrap();
        assert!(text.contains("outcome 2 is between 94.8 and 105.2"));
        assert!(text.contains("<answer>0.204</answer>"));
        assert!(text.contains("<answer>0.5</answer>"));
        assert!(text.contains("Example 3:"));
    }

    #[test]
    fn test_sampling_stats_examples() {
        let samples = OutcomeSet::Single(Sample::new(vec![3.0, 4.0], true));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let text = sampling_stats_examples(&mut rng, "D", &samples, 4, None).unwrap();
        assert_eq!(text.matches("Example ").count(), 4);
        assert!(text.contains("<answer>3</answer>") || text.contains("<answer>4</answer>"));
        assert!(!text.contains(".0</answer>"));
    }

    // =========================================================================
    // Pool mode
    // =========================================================================

    #[test]
    fn test_pool_examples_without_replacement() {
        let pool: Vec<Example<OutcomeSet<PercentileMap>>> = (0..3)
            .map(|i| Example {
                description: format!("Pool {i}"),
                stats: percentiles(),
            })
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let text = pool_examples(&mut rng, &pool, 9);
        assert_eq!(text.matches("Example ").count(), 3);
        for i in 0..3 {
            assert_eq!(text.matches(&format!("Pool {i}\n")).count(), 1);
        }

        assert!(pool_examples(&mut rng, &pool, 0).is_empty());
    }

    #[test]
    fn test_pool_examples_multinomial_outcomes() {
        let pool = vec![Example {
            description: "M".to_string(),
            stats: OutcomeSet::PerOutcome(vec![ranges(), ranges(), ranges()]),
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let text = pool_examples(&mut rng, &pool, 1);
        assert!(text.contains("a value from outcome "));
        assert!(text.contains("within the provided distribution?"));
    }

    #[test]
    fn test_pool_examples_sampling() {
        let pool = vec![Example {
            description: "S".to_string(),
            stats: OutcomeSet::Single(Sample::new(vec![1.5], false)),
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let text = pool_examples(&mut rng, &pool, 1);
        assert!(text.contains("<answer>1.5</answer>"));
    }
}
