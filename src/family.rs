//! The twelve parametric families and their validated laws.
//!
//! A [`Family`] is just the name. A [`Law`] is a family bound to checked
//! parameters; it knows how to draw a sample and how to describe itself
//! in prompt text.
//!
//! Sampling uses `rand_distr` for every family except:
//! - power law: inverse-CDF transform with an `xmin - 0.5` offset
//! - multinomial: one conditional binomial per category

use crate::params::{Number, ParamValue, ParameterSet, DEFAULT_MIN_PROBABILITY};
use crate::sampler::{OutcomeSet, SamplerError};
use crate::stats::{format_value, round3};
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{
    Binomial, Distribution, Exp, Gamma, Geometric, Gumbel, LogNormal, Normal, Poisson, SkewNormal,
};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use std::str::FromStr;

/// Tolerance on the sum of multinomial category probabilities
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Distribution family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Normal,
    LogNormal,
    Exponential,
    PowerLaw,
    Uniform,
    Gamma,
    SkewNormal,
    Gumbel,
    Poisson,
    Geometric,
    Binomial,
    Multinomial,
}

impl Family {
    /// Every family, in canonical order
    pub const ALL: [Self; 12] = [
        Self::Normal,
        Self::LogNormal,
        Self::Exponential,
        Self::PowerLaw,
        Self::Uniform,
        Self::Gamma,
        Self::SkewNormal,
        Self::Gumbel,
        Self::Poisson,
        Self::Geometric,
        Self::Binomial,
        Self::Multinomial,
    ];

    /// Canonical snake_case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::LogNormal => "log_normal",
            Self::Exponential => "exponential",
            Self::PowerLaw => "power_law",
            Self::Uniform => "uniform",
            Self::Gamma => "gamma",
            Self::SkewNormal => "skew_normal",
            Self::Gumbel => "gumbel",
            Self::Poisson => "poisson",
            Self::Geometric => "geometric",
            Self::Binomial => "binomial",
            Self::Multinomial => "multinomial",
        }
    }

    /// Title used in the `Distribution Type:` line
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::LogNormal => "Log-Normal",
            Self::Exponential => "Exponential",
            Self::PowerLaw => "Power Law",
            Self::Uniform => "Uniform",
            Self::Gamma => "Gamma",
            Self::SkewNormal => "Skew-Normal",
            Self::Gumbel => "Gumbel",
            Self::Poisson => "Poisson",
            Self::Geometric => "Geometric",
            Self::Binomial => "Binomial",
            Self::Multinomial => "Multinomial",
        }
    }

    /// Integer-valued families
    #[must_use]
    pub const fn is_discrete(self) -> bool {
        matches!(
            self,
            Self::Poisson | Self::Geometric | Self::Binomial | Self::Multinomial
        )
    }

    /// Families whose samples split into one column per outcome
    #[must_use]
    pub const fn has_outcomes(self) -> bool {
        matches!(self, Self::Multinomial)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Family {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name() == s.to_lowercase())
            .ok_or_else(|| SamplerError::UnknownFamily(s.to_string()))
    }
}

/// A family bound to validated parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Law {
    Normal { mean: Number, std: Number },
    LogNormal { mean: Number, sigma: Number },
    Exponential { rate: Number },
    PowerLaw { alpha: Number, xmin: Number },
    Uniform { a: Number, b: Number },
    Gamma { shape: Number, scale: Number },
    SkewNormal { location: Number, scale: Number, skew: Number },
    Gumbel { loc: Number, scale: Number },
    Poisson { lam: Number },
    Geometric { p: Number },
    Binomial { n: u64, p: Number },
    Multinomial { n: u64, probs: Vec<f64> },
}

/// Reads and checks named parameters for one family
struct Reader<'a> {
    family: Family,
    params: &'a ParameterSet,
}

impl Reader<'_> {
    fn invalid(&self, name: &str, reason: impl Into<String>) -> SamplerError {
        SamplerError::InvalidParameter {
            family: self.family,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    fn value(&self, name: &str) -> Result<&ParamValue, SamplerError> {
        self.params
            .get(name)
            .ok_or_else(|| SamplerError::MissingParameter {
                family: self.family,
                name: name.to_string(),
            })
    }

    fn number(&self, name: &str) -> Result<Number, SamplerError> {
        let number = self
            .value(name)?
            .as_number()
            .ok_or_else(|| self.invalid(name, "expected a number"))?;
        if number.get().is_finite() {
            Ok(number)
        } else {
            Err(self.invalid(name, "must be finite"))
        }
    }

    fn positive(&self, name: &str) -> Result<Number, SamplerError> {
        let number = self.number(name)?;
        if number.get() > 0.0 {
            Ok(number)
        } else {
            Err(self.invalid(name, "must be positive"))
        }
    }

    fn probability(&self, name: &str, allow_zero: bool) -> Result<Number, SamplerError> {
        let number = self.number(name)?;
        let p = number.get();
        let lower_ok = if allow_zero { p >= 0.0 } else { p > 0.0 };
        if lower_ok && p <= 1.0 {
            Ok(number)
        } else if allow_zero {
            Err(self.invalid(name, "must lie in [0, 1]"))
        } else {
            Err(self.invalid(name, "must lie in (0, 1]"))
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&self, name: &str) -> Result<u64, SamplerError> {
        match self.number(name)? {
            Number::Int(v) => u64::try_from(v).map_err(|_| self.invalid(name, "must not be negative")),
            Number::Float(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
            Number::Float(_) => Err(self.invalid(name, "must be a non-negative integer")),
        }
    }

    fn probabilities(&self, name: &str) -> Result<Vec<f64>, SamplerError> {
        let probs = self
            .value(name)?
            .as_vector()
            .ok_or_else(|| self.invalid(name, "expected a list of probabilities"))?;
        if probs.is_empty() {
            return Err(self.invalid(name, "needs at least one category"));
        }
        if probs
            .iter()
            .any(|p| !(DEFAULT_MIN_PROBABILITY - PROBABILITY_SUM_TOLERANCE..=1.0).contains(p))
        {
            return Err(self.invalid(
                name,
                format!("every probability must lie in [{DEFAULT_MIN_PROBABILITY}, 1]"),
            ));
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(self.invalid(name, format!("must sum to 1, got {total}")));
        }
        Ok(probs.to_vec())
    }
}

impl Law {
    /// Build a law from named parameters, checking the family's domain.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError::MissingParameter` for absent names and
    /// `SamplerError::InvalidParameter` when a value is out of domain
    /// (non-positive scale, `alpha <= 1`, `a >= b`, `p` outside its range,
    /// probabilities not summing to 1 ...).
    pub fn from_params(family: Family, params: &ParameterSet) -> Result<Self, SamplerError> {
        let r = Reader { family, params };
        let law = match family {
            Family::Normal => Self::Normal {
                mean: r.number("mean")?,
                std: r.positive("std")?,
            },
            Family::LogNormal => Self::LogNormal {
                mean: r.number("mean")?,
                sigma: r.positive("sigma")?,
            },
            Family::Exponential => Self::Exponential {
                rate: r.positive("rate")?,
            },
            Family::PowerLaw => {
                let alpha = r.number("alpha")?;
                if alpha.get() <= 1.0 {
                    return Err(r.invalid("alpha", "must be greater than 1"));
                }
                Self::PowerLaw {
                    alpha,
                    xmin: r.positive("xmin")?,
                }
            }
            Family::Uniform => {
                let (a, b) = (r.number("a")?, r.number("b")?);
                if a.get() >= b.get() {
                    return Err(r.invalid("b", "must be greater than a"));
                }
                Self::Uniform { a, b }
            }
            Family::Gamma => Self::Gamma {
                shape: r.positive("shape")?,
                scale: r.positive("scale")?,
            },
            Family::SkewNormal => Self::SkewNormal {
                location: r.number("location")?,
                scale: r.positive("scale")?,
                skew: r.number("skew")?,
            },
            Family::Gumbel => Self::Gumbel {
                loc: r.number("loc")?,
                scale: r.positive("scale")?,
            },
            Family::Poisson => Self::Poisson {
                lam: r.positive("lam")?,
            },
            Family::Geometric => Self::Geometric {
                p: r.probability("p", false)?,
            },
            Family::Binomial => Self::Binomial {
                n: r.count("n")?,
                p: r.probability("p", true)?,
            },
            Family::Multinomial => Self::Multinomial {
                n: r.count("n")?,
                probs: r.probabilities("probs")?,
            },
        };
        Ok(law)
    }

    /// Family of this law
    #[must_use]
    pub const fn family(&self) -> Family {
        match self {
            Self::Normal { .. } => Family::Normal,
            Self::LogNormal { .. } => Family::LogNormal,
            Self::Exponential { .. } => Family::Exponential,
            Self::PowerLaw { .. } => Family::PowerLaw,
            Self::Uniform { .. } => Family::Uniform,
            Self::Gamma { .. } => Family::Gamma,
            Self::SkewNormal { .. } => Family::SkewNormal,
            Self::Gumbel { .. } => Family::Gumbel,
            Self::Poisson { .. } => Family::Poisson,
            Self::Geometric { .. } => Family::Geometric,
            Self::Binomial { .. } => Family::Binomial,
            Self::Multinomial { .. } => Family::Multinomial,
        }
    }

    fn rejected(&self, err: &impl fmt::Display) -> SamplerError {
        SamplerError::InvalidParameter {
            family: self.family(),
            name: "parameters".to_string(),
            reason: err.to_string(),
        }
    }

    /// Draw `n` values, rounded to three decimals.
    ///
    /// Multinomial laws yield one column per category; every other law
    /// yields a single column.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError::InvalidParameter` if `rand_distr` rejects the
    /// parameters.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> Result<OutcomeSet<Vec<f64>>, SamplerError> {
        let values = match self {
            Self::Normal { mean, std } => {
                let dist = Normal::new(mean.get(), std.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::LogNormal { mean, sigma } => {
                let dist =
                    LogNormal::new(mean.get(), sigma.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::Exponential { rate } => {
                let dist = Exp::new(rate.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::PowerLaw { alpha, xmin } => {
                let exponent = -1.0 / (alpha.get() - 1.0);
                let offset = xmin.get() - 0.5;
                (0..n)
                    .map(|_| round3(offset * (1.0 - rng.gen::<f64>()).powf(exponent)))
                    .collect()
            }
            Self::Uniform { a, b } => collect(rng, &Uniform::new(a.get(), b.get()), n),
            Self::Gamma { shape, scale } => {
                let dist = Gamma::new(shape.get(), scale.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::SkewNormal {
                location,
                scale,
                skew,
            } => {
                let dist = SkewNormal::new(location.get(), scale.get(), skew.get())
                    .map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::Gumbel { loc, scale } => {
                let dist = Gumbel::new(loc.get(), scale.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::Poisson { lam } => {
                let dist: Poisson<f64> = Poisson::new(lam.get()).map_err(|e| self.rejected(&e))?;
                collect(rng, &dist, n)
            }
            Self::Geometric { p } => {
                // rand_distr counts failures; trials = failures + 1
                let dist = Geometric::new(p.get()).map_err(|e| self.rejected(&e))?;
                (0..n).map(|_| as_f64(dist.sample(rng) + 1)).collect()
            }
            Self::Binomial { n: trials, p } => {
                let dist = Binomial::new(*trials, p.get()).map_err(|e| self.rejected(&e))?;
                (0..n).map(|_| as_f64(dist.sample(rng))).collect()
            }
            Self::Multinomial { n: trials, probs } => {
                return self.draw_multinomial(rng, *trials, probs, n);
            }
        };
        Ok(OutcomeSet::Single(values))
    }

    fn draw_multinomial<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        trials: u64,
        probs: &[f64],
        n: usize,
    ) -> Result<OutcomeSet<Vec<f64>>, SamplerError> {
        let mut columns = vec![Vec::with_capacity(n); probs.len()];
        for _ in 0..n {
            let mut remaining = trials;
            let mut mass = 1.0;
            for (i, column) in columns.iter_mut().enumerate() {
                let count = if i + 1 == probs.len() || mass <= 0.0 {
                    remaining
                } else {
                    let q = (probs[i] / mass).clamp(0.0, 1.0);
                    Binomial::new(remaining, q)
                        .map_err(|e| self.rejected(&e))?
                        .sample(rng)
                };
                column.push(as_f64(count));
                remaining -= count;
                mass -= probs[i];
            }
        }
        Ok(OutcomeSet::PerOutcome(columns))
    }

    /// Analytic description of the law, as shown to the model.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut lines = vec![format!(
            "Distribution Type: {} Distribution",
            self.family().title()
        )];
        match self {
            Self::Normal { mean, std } => {
                lines.push(format!("Mean: {mean}"));
                lines.push(format!("Standard Deviation: {std}"));
            }
            Self::LogNormal { mean, sigma } => {
                lines.push("Characteristics: This distribution models values that are the result of the multiplicative product of many independent random variables, such as income levels, stock prices, or city sizes.".to_string());
                lines.push(format!("Log Mean (mu): {mean}"));
                lines.push(format!("Log Sigma (sigma): {sigma}"));
                lines.push("These parameters mean that the natural logarithm of the values follows a normal distribution with the specified mean and standard deviation.".to_string());
            }
            Self::Exponential { rate } => {
                lines.push("Characteristics: Models the time between events in a process where events occur continuously and independently at a constant average rate.".to_string());
                lines.push(format!(
                    "Rate: {rate} (The average number of events per unit time is {:.2}.)",
                    1.0 / rate.get()
                ));
            }
            Self::PowerLaw { alpha, xmin } => {
                lines.push("Characteristics: Known for its heavy tails suitable for describing phenomena with a high incidence of extreme values.".to_string());
                lines.push(format!(
                    "Alpha: {alpha} (Controls the tail heaviness\u{2014}the smaller the alpha, the fatter the tail.)"
                ));
                lines.push(format!(
                    "Xmin: {xmin} (Minimum value for which the power law behavior holds.)"
                ));
            }
            Self::Uniform { a, b } => {
                lines.push("Characteristics: All values within the interval have equal probability of occurring.".to_string());
                lines.push(format!("Min: {a} (Minimum value of the distribution.)"));
                lines.push(format!("Max: {b} (Maximum value of the distribution.)"));
            }
            Self::Gamma { shape, scale } => {
                lines.push("Characteristics: Used to model waiting times and life data among other things.".to_string());
                lines.push(format!("Shape: {shape} (Controls the skewness of the distribution.)"));
                lines.push(format!("Scale: {scale} (Controls the spread of the distribution.)"));
            }
            Self::SkewNormal {
                location,
                scale,
                skew,
            } => {
                lines.push("Characteristics: A generalization of the normal distribution to accommodate skewness.".to_string());
                lines.push(format!(
                    "Location: {location} (Shifts the distribution along the x-axis.)"
                ));
                lines.push(format!("Scale: {scale} (Controls the spread of the distribution.)"));
                lines.push(format!(
                    "Skew: {skew} (Determines the direction and degree of skewness.)"
                ));
            }
            Self::Gumbel { loc, scale } => {
                lines.push("Characteristics: Often used to model the distribution of extreme values.".to_string());
                lines.push(format!("Location: {loc} (Centers the distribution.)"));
                lines.push(format!("Scale: {scale} (Controls the spread of the distribution.)"));
            }
            Self::Poisson { lam } => {
                lines.push("Characteristics: Suitable for modeling the number of events happening in a fixed interval of time or space.".to_string());
                lines.push(format!("Lambda: {lam} (Average rate of events per interval.)"));
            }
            Self::Geometric { p } => {
                lines.push("Characteristics: Models the number of trials until the first success.".to_string());
                lines.push(format!("Probability of Success: {p}"));
            }
            Self::Binomial { n, p } => {
                lines.push("Characteristics: Describes the number of successes in a fixed number of trials with a given probability of success.".to_string());
                lines.push(format!("Trials: {n} (Total number of trials.)"));
                lines.push(format!(
                    "Probability of Success: {p} (Probability of success in each trial.)"
                ));
            }
            Self::Multinomial { n, probs } => {
                lines.push("Characteristics: Generalizes the binomial distribution for scenarios where each trial can result in more than two outcomes.".to_string());
                lines.push(format!("Trials: {n} (Total number of trials.)"));
                lines.push(format!("Probabilities: {}", format_list(probs)));
            }
        }
        lines.join("\n")
    }

    /// Description built from a normal approximation of the law.
    ///
    /// Multinomial laws report the analytic per-outcome moments `n * p` and
    /// `sqrt(n * p * (1 - p))`. Other laws report the sample's mean and
    /// population standard deviation. Returns `None` for the normal family,
    /// whose description is already in normal form.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn describe_as_normal(&self, sample: &[f64]) -> Option<String> {
        let title = match self {
            Self::Normal { .. } => return None,
            Self::Multinomial { n, probs } => {
                let trials = *n as f64;
                let means: Vec<f64> = probs.iter().map(|p| trials * p).collect();
                let stds: Vec<f64> = probs
                    .iter()
                    .map(|p| (trials * p * (1.0 - p)).sqrt())
                    .collect();
                return Some(
                    [
                        "Distribution Type: Normal Distribution (For each outcome)".to_string(),
                        "Characteristics: This distribution approximates the multinomial distribution for each outcome using the calculated means and standard deviations based on the probabilities.".to_string(),
                        format!("Means: {}", format_list(&means)),
                        format!("Standard Deviations: {}", format_list(&stds)),
                    ]
                    .join("\n"),
                );
            }
            // The binomial approximation is presented as a plain normal
            Self::Binomial { .. } => Family::Normal.title(),
            other => other.family().title(),
        };
        let mean = sample.mean();
        let std = sample.population_std_dev();
        Some(format!(
            "Distribution Type: {title} Distribution\nMean: {}\nStandard Deviation: {}",
            format_value(mean),
            format_value(std)
        ))
    }
}

fn collect<R, D>(rng: &mut R, dist: &D, n: usize) -> Vec<f64>
where
    R: Rng + ?Sized,
    D: Distribution<f64>,
{
    (0..n).map(|_| round3(dist.sample(rng))).collect()
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(count: u64) -> f64 {
    count as f64
}

fn format_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format_value(*v)).collect();
    format!("[{}]", items.join(", "))
}
