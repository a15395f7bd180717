//! Parameter sets and randomized parameter generation.
//!
//! Example distributions get their parameters drawn uniformly from
//! configured ranges. Multinomial category weights come from a flat
//! Dirichlet draw. A generated set that lands too close to a reserved
//! question set is thrown away and drawn again, so few-shot examples
//! never duplicate the distribution being asked about.

use crate::stats::{format_value, round3};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Absolute tolerance used when comparing a parameter named `rate`
pub const RATE_TOLERANCE: f64 = 1e-3;
/// Absolute tolerance used for every other parameter
pub const GENERAL_TOLERANCE: f64 = 1e-2;
/// Relative tolerance added on top of the absolute one
const RELATIVE_TOLERANCE: f64 = 1e-5;
/// Default lower bound on every generated category probability
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.1;
/// Allowed drift of generated probabilities from a unit sum
const SUM_TOLERANCE: f64 = 1e-9;

/// Errors raised while generating parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("min_threshold {threshold} is too high for {categories} categories")]
    InfeasibleThreshold { threshold: f64, categories: usize },

    #[error("Rounding issue with probs: sum is {0} instead of 1.0")]
    RoundingSum(f64),

    #[error("Probability vector needs at least one category")]
    NoCategories,

    #[error("Invalid range for '{name}': low ({low}) must not exceed high ({high})")]
    InvalidRange { name: String, low: f64, high: f64 },

    #[error("Dirichlet draw failed: {0}")]
    Dirichlet(String),
}

/// A scalar parameter that remembers whether it was written as an integer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Value as a float
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn get(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// True for integer-valued parameters
    #[must_use]
    pub const fn is_int(self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{}", format_value(*v)),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Value of a single named parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(Number),
    Vector(Vec<f64>),
}

impl ParamValue {
    /// Scalar value, if this is one
    #[must_use]
    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Scalar(n) => Some(*n),
            Self::Vector(_) => None,
        }
    }

    /// Vector value, if this is one
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(n) => write!(f, "{n}"),
            Self::Vector(values) => {
                let items: Vec<String> = values.iter().map(|v| format_value(*v)).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<Number> for ParamValue {
    fn from(n: Number) -> Self {
        Self::Scalar(n)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

/// Named parameters of one distribution instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Look up a parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set holds no parameter
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{{{}}}", items.join(", "))
    }
}

/// How a single parameter of an example distribution is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRange {
    /// Uniform draw from `[low, high)`; integer-valued when both bounds are integers
    Between(Number, Number),
    /// Probability vector over `categories` outcomes, drawn from a flat Dirichlet
    Simplex { categories: usize },
    /// Always the given value
    Fixed(ParamValue),
}

impl ParamRange {
    /// Range between two bounds
    #[must_use]
    pub fn between(low: impl Into<Number>, high: impl Into<Number>) -> Self {
        Self::Between(low.into(), high.into())
    }

    /// Probability vector over `categories` outcomes
    #[must_use]
    pub const fn simplex(categories: usize) -> Self {
        Self::Simplex { categories }
    }

    /// Fixed value
    #[must_use]
    pub fn fixed(value: impl Into<ParamValue>) -> Self {
        Self::Fixed(value.into())
    }

    fn validate(&self, name: &str) -> Result<(), ParamError> {
        match self {
            Self::Between(low, high) if low.get() > high.get() => Err(ParamError::InvalidRange {
                name: name.to_string(),
                low: low.get(),
                high: high.get(),
            }),
            Self::Simplex { categories } => check_feasible(DEFAULT_MIN_PROBABILITY, *categories),
            _ => Ok(()),
        }
    }
}

/// Generation rule per parameter name
pub type ParameterRanges = BTreeMap<String, ParamRange>;

fn check_feasible(min_threshold: f64, num_categories: usize) -> Result<(), ParamError> {
    if num_categories == 0 {
        return Err(ParamError::NoCategories);
    }
    #[allow(clippy::cast_precision_loss)]
    if min_threshold * num_categories as f64 > 1.0 {
        return Err(ParamError::InfeasibleThreshold {
            threshold: min_threshold,
            categories: num_categories,
        });
    }
    Ok(())
}

/// Draw a probability vector whose components are all at least `min_threshold`.
///
/// Vectors come from a flat Dirichlet and are redrawn until every component
/// clears the threshold. Components are then rounded to three decimals and the
/// rounding residue is folded into the largest one so the vector sums to 1.
///
/// # Errors
///
/// Returns `ParamError::InfeasibleThreshold` before drawing anything when
/// `min_threshold * num_categories > 1`, and `ParamError::RoundingSum` if the
/// corrected vector still does not sum to 1.
pub fn generate_probabilities<R: Rng + ?Sized>(
    rng: &mut R,
    min_threshold: f64,
    num_categories: usize,
) -> Result<Vec<f64>, ParamError> {
    check_feasible(min_threshold, num_categories)?;
    if num_categories == 1 {
        return Ok(vec![1.0]);
    }

    let dirichlet = Dirichlet::new_with_size(1.0, num_categories)
        .map_err(|e| ParamError::Dirichlet(e.to_string()))?;
    let probs = loop {
        let candidate: Vec<f64> = dirichlet.sample(rng);
        if candidate.iter().all(|p| *p >= min_threshold) {
            break candidate;
        }
    };

    let mut rounded: Vec<f64> = probs.into_iter().map(round3).collect();
    let residue = 1.0 - rounded.iter().sum::<f64>();
    if residue.abs() > SUM_TOLERANCE {
        let largest = rounded
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > rounded[best] { i } else { best });
        rounded[largest] += residue;
    }

    let total: f64 = rounded.iter().sum();
    if (total - 1.0).abs() > SUM_TOLERANCE {
        return Err(ParamError::RoundingSum(total));
    }
    Ok(rounded)
}

fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE.mul_add(b.abs(), tolerance)
}

fn values_close(a: &ParamValue, b: &ParamValue, tolerance: f64) -> bool {
    match (a, b) {
        (ParamValue::Scalar(x), ParamValue::Scalar(y)) => is_close(x.get(), y.get(), tolerance),
        (ParamValue::Vector(xs), ParamValue::Vector(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| is_close(*x, *y, tolerance))
        }
        _ => false,
    }
}

/// True if every parameter of `a` exists in `b` and matches it within tolerance.
///
/// `rate` is compared with [`RATE_TOLERANCE`], everything else with
/// [`GENERAL_TOLERANCE`]; vectors are compared element-wise.
#[must_use]
pub fn params_equal(a: &ParameterSet, b: &ParameterSet) -> bool {
    params_equal_with(a, b, RATE_TOLERANCE, GENERAL_TOLERANCE)
}

/// [`params_equal`] with explicit tolerances
#[must_use]
pub fn params_equal_with(
    a: &ParameterSet,
    b: &ParameterSet,
    rate_tolerance: f64,
    general_tolerance: f64,
) -> bool {
    a.iter().all(|(name, value)| {
        let tolerance = if name == "rate" {
            rate_tolerance
        } else {
            general_tolerance
        };
        b.get(name)
            .is_some_and(|other| values_close(value, other, tolerance))
    })
}

/// Draw one parameter set from `ranges` that matches none of `reserved`.
///
/// Ranged scalars are drawn uniformly; if both bounds are integers the draw is
/// truncated to an integer, otherwise rounded to three decimals. Draws that
/// collide with a reserved set are discarded and repeated.
///
/// # Errors
///
/// Returns an error before any draw if a range is inverted or a probability
/// vector cannot satisfy the minimum threshold.
pub fn generate_random_params<R: Rng + ?Sized>(
    rng: &mut R,
    ranges: &ParameterRanges,
    reserved: &[ParameterSet],
) -> Result<ParameterSet, ParamError> {
    for (name, range) in ranges {
        range.validate(name)?;
    }

    loop {
        let mut params = ParameterSet::new();
        for (name, range) in ranges {
            let value = match range {
                ParamRange::Fixed(value) => value.clone(),
                ParamRange::Simplex { categories } => ParamValue::Vector(generate_probabilities(
                    rng,
                    DEFAULT_MIN_PROBABILITY,
                    *categories,
                )?),
                ParamRange::Between(low, high) => draw_between(rng, *low, *high).into(),
            };
            params.insert(name, value);
        }

        if !reserved.iter().any(|question| params_equal(&params, question)) {
            return Ok(params);
        }
        tracing::debug!(
            params = %params,
            "Generated parameters collide with a question configuration, retrying"
        );
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_between<R: Rng + ?Sized>(rng: &mut R, low: Number, high: Number) -> Number {
    let (lo, hi) = (low.get(), high.get());
    let value = if lo < hi { rng.gen_range(lo..hi) } else { lo };
    if low.is_int() && high.is_int() {
        Number::Int(value.trunc() as i64)
    } else {
        Number::Float(round3(value))
    }
}
