//! Distribution sampling and per-task artifacts.
//!
//! [`sample_distribution`] is the single entry point shared by every family:
//! it reseeds a fresh generator from the spec's seed, draws the sample, builds
//! the description and derives the artifact the requested [`Task`] needs.

use crate::family::{Family, Law};
use crate::params::ParameterSet;
use crate::stats::{
    format_value, PercentileMap, RangeMap, SortedSample, INTERMEDIATE_PERCENTILES,
    INTERMEDIATE_PROBABILITIES, PERCENTILES, PROBABILITIES,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default number of values drawn per distribution
pub const DEFAULT_SAMPLE_SIZE: usize = 100_000;
/// Default seed for question distributions
pub const DEFAULT_SEED: u64 = 1337;
/// Number of values shown when logging a drawn sample
const PREVIEW_LEN: usize = 10;

/// Errors raised while sampling a distribution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("Unsupported task: {0}. Please pick from percentiles, sampling, or probabilities.")]
    UnsupportedTask(String),

    #[error("Unknown distribution family: {0}")]
    UnknownFamily(String),

    #[error("Missing parameter '{name}' for {family} distribution")]
    MissingParameter { family: Family, name: String },

    #[error("Invalid parameter '{name}' for {family} distribution: {reason}")]
    InvalidParameter {
        family: Family,
        name: String,
        reason: String,
    },

    #[error("Sample size must be at least 1")]
    EmptySample,
}

/// What a generated question asks the model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Name the percentile of a given value
    Percentiles,
    /// Produce a single draw
    Sampling,
    /// Estimate the probability mass between two bounds
    Probabilities,
}

impl Task {
    /// Canonical name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Percentiles => "percentiles",
            Self::Sampling => "sampling",
            Self::Probabilities => "probabilities",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentiles" => Ok(Self::Percentiles),
            "sampling" => Ok(Self::Sampling),
            "probabilities" => Ok(Self::Probabilities),
            other => Err(SamplerError::UnsupportedTask(other.to_string())),
        }
    }
}

/// One category of a multinomial law, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Outcome(usize);

impl Outcome {
    /// Outcome with the given 1-based number
    #[must_use]
    pub const fn new(number: usize) -> Self {
        Self(number)
    }

    /// 1-based outcome number
    #[must_use]
    pub const fn number(self) -> usize {
        self.0
    }

    const fn index(self) -> Option<usize> {
        self.0.checked_sub(1)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outcome {}", self.0)
    }
}

/// A value for a single-column law, or one value per multinomial outcome
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeSet<T> {
    Single(T),
    PerOutcome(Vec<T>),
}

impl<T> OutcomeSet<T> {
    /// Value for `outcome`; `None` addresses a single-column set
    #[must_use]
    pub fn get(&self, outcome: Option<Outcome>) -> Option<&T> {
        match (self, outcome) {
            (Self::Single(value), None) => Some(value),
            (Self::PerOutcome(values), Some(outcome)) => values.get(outcome.index()?),
            _ => None,
        }
    }

    /// Addressable outcomes in order
    #[must_use]
    pub fn outcomes(&self) -> Vec<Option<Outcome>> {
        match self {
            Self::Single(_) => vec![None],
            Self::PerOutcome(values) => (1..=values.len()).map(|k| Some(Outcome(k))).collect(),
        }
    }

    /// Iterate `(outcome, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Option<Outcome>, &T)> {
        let values: Vec<&T> = match self {
            Self::Single(value) => vec![value],
            Self::PerOutcome(values) => values.iter().collect(),
        };
        self.outcomes().into_iter().zip(values)
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::PerOutcome(values) => values.len(),
        }
    }

    /// True for a multinomial set with no outcome
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to every column
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> OutcomeSet<U> {
        match self {
            Self::Single(value) => OutcomeSet::Single(f(value)),
            Self::PerOutcome(values) => OutcomeSet::PerOutcome(values.iter().map(f).collect()),
        }
    }

    /// Consuming variant of [`OutcomeSet::map`]
    pub fn into_map<U>(self, mut f: impl FnMut(T) -> U) -> OutcomeSet<U> {
        match self {
            Self::Single(value) => OutcomeSet::Single(f(value)),
            Self::PerOutcome(values) => OutcomeSet::PerOutcome(values.into_iter().map(f).collect()),
        }
    }
}

impl<T: Serialize> Serialize for OutcomeSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(value) => value.serialize(serializer),
            Self::PerOutcome(values) => {
                let mut map = serializer.serialize_map(Some(values.len()))?;
                for (k, value) in values.iter().enumerate() {
                    map.serialize_entry(&Outcome(k + 1).to_string(), value)?;
                }
                map.end()
            }
        }
    }
}

/// Raw drawn values of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    values: Vec<f64>,
    discrete: bool,
}

impl Sample {
    /// Wrap drawn values; discrete samples render as integers
    #[must_use]
    pub const fn new(values: Vec<f64>, discrete: bool) -> Self {
        Self { values, discrete }
    }

    /// Drawn values in draw order
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing was drawn
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True for integer-valued families
    #[must_use]
    pub const fn is_discrete(&self) -> bool {
        self.discrete
    }

    /// Render one value as it appears in prompt text
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn render(&self, value: f64) -> String {
        if self.discrete {
            format!("{}", value as i64)
        } else {
            format_value(value)
        }
    }

    /// Pick one value uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        self.values.choose(rng).copied()
    }
}

/// Task-specific statistics of a sampled distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Artifact {
    Percentiles {
        primary: OutcomeSet<PercentileMap>,
        intermediate: OutcomeSet<PercentileMap>,
    },
    Sampling {
        samples: OutcomeSet<Sample>,
    },
    Probabilities {
        primary: OutcomeSet<RangeMap>,
        intermediate: OutcomeSet<RangeMap>,
    },
}

impl Artifact {
    /// Task this artifact answers
    #[must_use]
    pub const fn task(&self) -> Task {
        match self {
            Self::Percentiles { .. } => Task::Percentiles,
            Self::Sampling { .. } => Task::Sampling,
            Self::Probabilities { .. } => Task::Probabilities,
        }
    }
}

/// A family with concrete parameters, sample size and seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub family: Family,
    pub params: ParameterSet,
    pub sample_size: usize,
    pub seed: u64,
}

impl DistributionSpec {
    /// Spec with the default sample size and seed
    #[must_use]
    pub const fn new(family: Family, params: ParameterSet) -> Self {
        Self {
            family,
            params,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: DEFAULT_SEED,
        }
    }

    /// Set the number of drawn values
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set the seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validated law for this spec
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is missing or out of domain.
    pub fn law(&self) -> Result<Law, SamplerError> {
        Law::from_params(self.family, &self.params)
    }

    /// Draw the sample from a generator freshly seeded with `self.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid parameters or a zero sample size.
    pub fn draw(&self) -> Result<OutcomeSet<Vec<f64>>, SamplerError> {
        self.draw_law(&self.law()?)
    }

    fn draw_law(&self, law: &Law) -> Result<OutcomeSet<Vec<f64>>, SamplerError> {
        if self.sample_size == 0 {
            return Err(SamplerError::EmptySample);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        law.draw(&mut rng, self.sample_size)
    }
}

/// Flags that change what a sampling call reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOptions {
    /// Log the description and every computed statistic
    pub debug: bool,
    /// Describe the distribution by a normal approximation
    pub approximate_as_normal: bool,
}

/// Description plus task artifact of one sampled distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionOutput {
    pub description: String,
    #[serde(flatten)]
    pub artifact: Artifact,
}

/// Sample `spec` for the task named by `task`.
///
/// # Errors
///
/// Returns `SamplerError::UnsupportedTask` for anything other than
/// `percentiles`, `sampling` or `probabilities`, before drawing. Parameter
/// errors are reported as for [`sample_for_task`].
pub fn sample_distribution(
    spec: &DistributionSpec,
    task: &str,
    options: SampleOptions,
) -> Result<DistributionOutput, SamplerError> {
    let task: Task = task.parse()?;
    sample_for_task(spec, task, options)
}

/// Sample `spec` and derive the statistics `task` needs.
///
/// # Errors
///
/// Returns an error for invalid parameters or a zero sample size.
pub fn sample_for_task(
    spec: &DistributionSpec,
    task: Task,
    options: SampleOptions,
) -> Result<DistributionOutput, SamplerError> {
    let law = spec.law()?;
    let drawn = spec.draw_law(&law)?;

    let mut description = law.describe();
    if options.approximate_as_normal {
        let column: &[f64] = match &drawn {
            OutcomeSet::Single(values) => values,
            OutcomeSet::PerOutcome(_) => &[],
        };
        match law.describe_as_normal(column) {
            Some(approximate) => description = approximate,
            None => tracing::info!(
                family = %spec.family,
                "The description will not be changed since this is a normal distribution"
            ),
        }
    }

    let artifact = match task {
        Task::Sampling => {
            let discrete = spec.family.is_discrete();
            Artifact::Sampling {
                samples: drawn.into_map(|values| Sample::new(values, discrete)),
            }
        }
        Task::Percentiles => {
            let sorted = drawn.into_map(SortedSample::new);
            Artifact::Percentiles {
                primary: sorted.map(|s| s.percentile_values(&PERCENTILES)),
                intermediate: sorted.map(|s| s.percentile_values(&INTERMEDIATE_PERCENTILES)),
            }
        }
        Task::Probabilities => {
            let sorted = drawn.into_map(SortedSample::new);
            Artifact::Probabilities {
                primary: sorted.map(|s| s.target_ranges(&PROBABILITIES)),
                intermediate: sorted.map(|s| s.target_ranges(&INTERMEDIATE_PROBABILITIES)),
            }
        }
    };

    if options.debug {
        log_output(spec, &description, &artifact);
    }
    Ok(DistributionOutput {
        description,
        artifact,
    })
}

fn log_output(spec: &DistributionSpec, description: &str, artifact: &Artifact) {
    tracing::info!(
        family = %spec.family,
        seed = spec.seed,
        sample_size = spec.sample_size,
        "{description}"
    );
    let label = |outcome: Option<Outcome>| outcome.map_or_else(String::new, |o| o.to_string());
    match artifact {
        Artifact::Percentiles { primary, .. } => {
            for (outcome, values) in primary.iter() {
                for (percentile, value) in values.iter() {
                    tracing::info!(outcome = %label(outcome), percentile, value, "Percentile");
                }
            }
        }
        Artifact::Sampling { samples } => {
            for (outcome, sample) in samples.iter() {
                let preview = &sample.values()[..sample.len().min(PREVIEW_LEN)];
                tracing::info!(
                    outcome = %label(outcome),
                    count = sample.len(),
                    preview = ?preview,
                    "Drew samples for a {} distribution",
                    spec.family
                );
            }
        }
        Artifact::Probabilities { primary, .. } => {
            for (outcome, ranges) in primary.iter() {
                for (probability, (lower, upper)) in ranges.iter() {
                    tracing::info!(
                        outcome = %label(outcome),
                        probability,
                        lower,
                        upper,
                        "Range"
                    );
                }
            }
        }
    }
}
