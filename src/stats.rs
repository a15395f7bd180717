//! Percentile and range statistics computed from drawn samples.
//!
//! Range statistics operate on a sample truncated to its own
//! [1st, 99th] percentile band, so every reported probability is
//! conditioned on excluding the extreme 2% of tail mass.
//!
//! Quantiles use linear interpolation between order statistics (R-7),
//! which is the default in most numerical packages.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Primary percentile set
pub const PERCENTILES: [f64; 11] = [
    1.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 99.0,
];

/// Intermediate percentile set, offset by five from the primary one
pub const INTERMEDIATE_PERCENTILES: [f64; 10] =
    [5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0, 95.0];

/// Primary nominal coverage probabilities
pub const PROBABILITIES: [f64; 10] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Intermediate nominal coverage probabilities
pub const INTERMEDIATE_PROBABILITIES: [f64; 10] =
    [0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95];

/// Lower edge of the truncation band, in percent
const BAND_LOW: f64 = 1.0;
/// Upper edge of the truncation band, in percent
const BAND_HIGH: f64 = 99.0;

/// Round to three decimal digits
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Render a number the way it appears in prompt text (`50.0`, `0.102`, `8028.321`)
#[must_use]
pub fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// A value rounded to three decimals, stored as integer thousandths.
///
/// Rounded keys compare exactly, which lets percentile and achieved-probability
/// keys live in ordered maps. Two inputs that round to the same thousandth are
/// the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rounded(i64);

impl Rounded {
    /// Round `value` to the nearest thousandth
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(value: f64) -> Self {
        Self((value * 1000.0).round() as i64)
    }

    /// The rounded value
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for Rounded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_value(self.get()))
    }
}

impl Serialize for Rounded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mapping from percentile (0-100) to the sample value at that percentile.
///
/// Keys and values are both rounded to three decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PercentileMap(BTreeMap<Rounded, f64>);

impl PercentileMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a percentile/value pair, rounding both
    pub fn insert(&mut self, percentile: f64, value: f64) {
        self.0.insert(Rounded::new(percentile), round3(value));
    }

    /// Value at `percentile`, if it was computed
    #[must_use]
    pub fn get(&self, percentile: f64) -> Option<f64> {
        self.0.get(&Rounded::new(percentile)).copied()
    }

    /// Iterate `(percentile, value)` pairs in ascending percentile order
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.iter().map(|(k, v)| (k.get(), *v))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no percentile was computed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(f64, f64)> for PercentileMap {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (percentile, value) in iter {
            map.insert(percentile, value);
        }
        map
    }
}

/// Mapping from achieved coverage probability to a `(lower, upper)` interval.
///
/// Keys are the measured probability of the interval, not the nominal one used
/// to build it. When two intervals round to the same key the later insert wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RangeMap(BTreeMap<Rounded, (f64, f64)>);

impl RangeMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interval under `probability`, replacing any interval with the same rounded key
    pub fn insert(&mut self, probability: f64, lower: f64, upper: f64) {
        self.0
            .insert(Rounded::new(probability), (round3(lower), round3(upper)));
    }

    /// Interval stored under `probability`
    #[must_use]
    pub fn get(&self, probability: f64) -> Option<(f64, f64)> {
        self.0.get(&Rounded::new(probability)).copied()
    }

    /// Achieved probabilities in ascending order
    #[must_use]
    pub fn probabilities(&self) -> Vec<f64> {
        self.0.keys().map(|k| k.get()).collect()
    }

    /// Iterate `(probability, (lower, upper))` in ascending probability order
    pub fn iter(&self) -> impl Iterator<Item = (f64, (f64, f64))> + '_ {
        self.0.iter().map(|(k, v)| (k.get(), *v))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the map holds no interval
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(f64, (f64, f64))> for RangeMap {
    fn from_iter<I: IntoIterator<Item = (f64, (f64, f64))>>(iter: I) -> Self {
        let mut map = Self::new();
        for (probability, (lower, upper)) in iter {
            map.insert(probability, lower, upper);
        }
        map
    }
}

/// A sample sorted in non-decreasing order, with NaN values removed.
///
/// Sorting once lets every percentile, truncation and range count run
/// on the same buffer in O(log n).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSample {
    values: Vec<f64>,
}

impl SortedSample {
    /// Sort an owned sample
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Self {
        values.retain(|v| !v.is_nan());
        values.sort_unstable_by(f64::total_cmp);
        Self { values }
    }

    /// Sort a copy of `values`
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }

    /// Sorted values
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the sample is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest value
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    /// Largest value
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// The `p`-th quantile for `p` in `[0, 1]`, linearly interpolated.
    ///
    /// # Returns
    /// - `None` if the sample is empty or `p` lies outside `[0, 1]`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn quantile(&self, p: f64) -> Option<f64> {
        let n = self.values.len();
        if n == 0 || !(0.0..=1.0).contains(&p) {
            return None;
        }
        if n == 1 {
            return Some(self.values[0]);
        }

        let h = (n - 1) as f64 * p;
        let j = h.floor() as usize;
        let g = h - h.floor();

        if j + 1 >= n {
            Some(self.values[n - 1])
        } else {
            Some(g.mul_add(self.values[j + 1] - self.values[j], self.values[j]))
        }
    }

    /// The `q`-th percentile for `q` in `[0, 100]`
    #[must_use]
    pub fn percentile(&self, q: f64) -> Option<f64> {
        self.quantile(q / 100.0)
    }

    /// Values lying within `[lower, upper]`, inclusive on both ends
    #[must_use]
    pub fn count_between(&self, lower: f64, upper: f64) -> usize {
        let start = self.values.partition_point(|v| *v < lower);
        let end = self.values.partition_point(|v| *v <= upper);
        end.saturating_sub(start)
    }

    /// The sample restricted to its own [1st, 99th] percentile band
    #[must_use]
    pub fn truncated(&self) -> Self {
        let (Some(low), Some(high)) = (self.percentile(BAND_LOW), self.percentile(BAND_HIGH))
        else {
            return Self::default();
        };
        let start = self.values.partition_point(|v| *v < low);
        let end = self.values.partition_point(|v| *v <= high);
        Self {
            values: self.values[start..end.max(start)].to_vec(),
        }
    }

    /// Share of the truncated sample lying in `[lower, upper]`.
    ///
    /// An empty sample yields `0.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn probability_within(&self, lower: f64, upper: f64) -> f64 {
        let band = self.truncated();
        if band.is_empty() {
            return 0.0;
        }
        band.count_between(lower, upper) as f64 / band.len() as f64
    }

    /// Percentile map for the requested percentiles
    #[must_use]
    pub fn percentile_values(&self, targets: &[f64]) -> PercentileMap {
        targets
            .iter()
            .filter_map(|&q| self.percentile(q).map(|value| (q, value)))
            .collect()
    }

    /// Central intervals for each nominal probability, keyed by achieved probability
    #[must_use]
    pub fn target_ranges(&self, probabilities: &[f64]) -> RangeMap {
        let band = self.truncated();
        let mut ranges = RangeMap::new();
        for &p in probabilities {
            let (Some(lower), Some(upper)) =
                (band.quantile((1.0 - p) / 2.0), band.quantile((1.0 + p) / 2.0))
            else {
                continue;
            };
            let achieved = band.probability_within(lower, upper);
            ranges.insert(achieved, lower, upper);
        }
        ranges
    }
}

/// Percentile values of `sample` at each of `targets` (expressed as 0-100)
#[must_use]
pub fn percentile_values(sample: &[f64], targets: &[f64]) -> PercentileMap {
    SortedSample::from_slice(sample).percentile_values(targets)
}

/// Probability that a value of `sample`, truncated to its [1st, 99th]
/// percentile band, lies in `[lower, upper]`
#[must_use]
pub fn probability_within_range(sample: &[f64], lower: f64, upper: f64) -> f64 {
    SortedSample::from_slice(sample).probability_within(lower, upper)
}

/// Central intervals of the truncated sample for each nominal probability.
///
/// The achieved coverage of each interval is re-measured with
/// [`probability_within_range`] on the truncated sample and becomes the key.
#[must_use]
pub fn target_ranges(sample: &[f64], probabilities: &[f64]) -> RangeMap {
    SortedSample::from_slice(sample).target_ranges(probabilities)
}
