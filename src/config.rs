//! Configuration for prompt generation runs.
//!
//! A run is described by [`GenerationConfig`], loaded from YAML with every
//! field optional. Omitted question and example sections fall back to the
//! built-in twelve-family set.

use crate::family::{Family, Law};
use crate::params::{ParamRange, ParameterRanges, ParameterSet};
use crate::prompts::PromptSettings;
use crate::sampler::{SampleOptions, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid shot source: {0}")]
    InvalidShotSource(String),
}

/// Where few-shot examples come from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShotSource {
    /// Randomly generated example distributions
    #[default]
    Examples,
    /// The question distribution's primary statistics
    DistributionStats,
    /// The question distribution's intermediate statistics
    IntermediateStats,
}

impl std::str::FromStr for ShotSource {
    type Err = ConfigError;

    /// Parse a shot source from string
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidShotSource` for unknown names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "examples" => Ok(Self::Examples),
            "distribution_stats" | "distribution-stats" | "stats" => Ok(Self::DistributionStats),
            "intermediate_stats" | "intermediate-stats" | "intermediate" => {
                Ok(Self::IntermediateStats)
            }
            _ => Err(ConfigError::InvalidShotSource(s.to_string())),
        }
    }
}

/// A question distribution: family plus fixed parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionConfig {
    pub family: Family,
    pub params: ParameterSet,
}

/// Parameter ranges for generated example distributions of one family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExampleConfig {
    pub family: Family,
    pub params: ParameterRanges,
}

/// Settings for one generation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Values drawn per distribution
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Generated example distributions per family
    #[serde(default = "default_num_examples")]
    pub num_examples: usize,
    /// Seed for question distributions and the run's generator
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Describe question distributions by a normal approximation
    #[serde(default)]
    pub approximate_as_normal: bool,
    /// Log every computed statistic
    #[serde(default)]
    pub debug: bool,
    /// Copies of each prompt
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Shot counts to generate prompts for
    #[serde(default = "default_shots")]
    pub shots: Vec<usize>,
    #[serde(default)]
    pub shot_source: ShotSource,
    /// Use the nearest-shot percentile templates
    #[serde(default)]
    pub nearest_shot: bool,
    #[serde(default = "default_questions")]
    pub questions: Vec<QuestionConfig>,
    #[serde(default = "default_examples")]
    pub examples: Vec<ExampleConfig>,
}

const fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}
const fn default_num_examples() -> usize {
    20
}
const fn default_seed() -> u64 {
    DEFAULT_SEED
}
const fn default_sample_count() -> usize {
    10
}
fn default_shots() -> Vec<usize> {
    vec![0, 1, 3, 5, 7, 9]
}

/// The twelve built-in question distributions
#[must_use]
pub fn default_questions() -> Vec<QuestionConfig> {
    let question = |family, params| QuestionConfig { family, params };
    vec![
        question(Family::Normal, ParameterSet::new().with("mean", 100).with("std", 10)),
        question(Family::LogNormal, ParameterSet::new().with("mean", 4.0).with("sigma", 0.5)),
        question(Family::Exponential, ParameterSet::new().with("rate", 0.01)),
        question(Family::PowerLaw, ParameterSet::new().with("alpha", 1.8).with("xmin", 100)),
        question(Family::Uniform, ParameterSet::new().with("a", 70).with("b", 130)),
        question(Family::Gamma, ParameterSet::new().with("shape", 2.0).with("scale", 20)),
        question(
            Family::SkewNormal,
            ParameterSet::new()
                .with("location", 100)
                .with("scale", 10)
                .with("skew", -10),
        ),
        question(Family::Gumbel, ParameterSet::new().with("loc", 1000).with("scale", 1000)),
        question(Family::Poisson, ParameterSet::new().with("lam", 70)),
        question(Family::Geometric, ParameterSet::new().with("p", 0.05)),
        question(Family::Binomial, ParameterSet::new().with("n", 1000).with("p", 0.5)),
        question(
            Family::Multinomial,
            ParameterSet::new()
                .with("n", 1000)
                .with("probs", vec![0.2, 0.3, 0.5]),
        ),
    ]
}

/// Parameter ranges for the twelve built-in example families
#[must_use]
pub fn default_examples() -> Vec<ExampleConfig> {
    let example = |family, ranges: &[(&str, ParamRange)]| ExampleConfig {
        family,
        params: ranges
            .iter()
            .map(|(name, range)| ((*name).to_string(), range.clone()))
            .collect(),
    };
    vec![
        example(
            Family::Normal,
            &[("mean", ParamRange::between(80, 120)), ("std", ParamRange::between(5, 20))],
        ),
        example(
            Family::LogNormal,
            &[
                ("mean", ParamRange::between(3.0, 10.0)),
                ("sigma", ParamRange::between(0.3, 1.5)),
            ],
        ),
        example(Family::Exponential, &[("rate", ParamRange::between(0.005, 0.02))]),
        example(
            Family::PowerLaw,
            &[
                ("alpha", ParamRange::between(1.5, 2.0)),
                ("xmin", ParamRange::between(80, 200)),
            ],
        ),
        example(
            Family::Uniform,
            &[("a", ParamRange::between(50, 100)), ("b", ParamRange::between(100, 150))],
        ),
        example(
            Family::Gamma,
            &[
                ("shape", ParamRange::between(1.5, 2.5)),
                ("scale", ParamRange::between(15, 30)),
            ],
        ),
        example(
            Family::SkewNormal,
            &[
                ("location", ParamRange::between(80, 120)),
                ("scale", ParamRange::between(5, 20)),
                ("skew", ParamRange::between(-10, 10)),
            ],
        ),
        example(
            Family::Gumbel,
            &[
                ("loc", ParamRange::between(800, 1200)),
                ("scale", ParamRange::between(800, 1200)),
            ],
        ),
        example(Family::Poisson, &[("lam", ParamRange::between(50, 90))]),
        example(Family::Geometric, &[("p", ParamRange::between(0.01, 0.07))]),
        example(
            Family::Binomial,
            &[("n", ParamRange::between(800, 1200)), ("p", ParamRange::between(0.3, 0.7))],
        ),
        example(
            Family::Multinomial,
            &[("n", ParamRange::between(800, 1200)), ("probs", ParamRange::simplex(3))],
        ),
    ]
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            num_examples: default_num_examples(),
            seed: default_seed(),
            approximate_as_normal: false,
            debug: false,
            sample_count: default_sample_count(),
            shots: default_shots(),
            shot_source: ShotSource::default(),
            nearest_shot: false,
            questions: default_questions(),
            examples: default_examples(),
        }
    }
}

impl GenerationConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or fails validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero sample size or sample
    /// count, a duplicated question family, question parameters outside the
    /// family's domain, an inverted example range, or example ranges for a
    /// family without a question.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::InvalidValue("sample_size must be at least 1".to_string()));
        }
        if self.sample_count == 0 {
            return Err(ConfigError::InvalidValue("sample_count must be at least 1".to_string()));
        }

        let mut families = BTreeSet::new();
        for question in &self.questions {
            if !families.insert(question.family) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate question for family {}",
                    question.family
                )));
            }
            Law::from_params(question.family, &question.params)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        for example in &self.examples {
            if !families.contains(&example.family) {
                return Err(ConfigError::InvalidValue(format!(
                    "examples configured for {} but no question uses that family",
                    example.family
                )));
            }
            for (name, range) in &example.params {
                if let ParamRange::Between(low, high) = range {
                    if low.get() > high.get() {
                        return Err(ConfigError::InvalidValue(format!(
                            "{} range for '{name}' has low {low} above high {high}",
                            example.family
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Question configuration for `family`
    #[must_use]
    pub fn question(&self, family: Family) -> Option<&QuestionConfig> {
        self.questions.iter().find(|q| q.family == family)
    }

    /// Every question parameter set; generated examples must avoid all of them
    #[must_use]
    pub fn reserved_params(&self) -> Vec<ParameterSet> {
        self.questions.iter().map(|q| q.params.clone()).collect()
    }

    /// Sampling flags for question distributions
    #[must_use]
    pub const fn question_options(&self) -> SampleOptions {
        SampleOptions {
            debug: self.debug,
            approximate_as_normal: self.approximate_as_normal,
        }
    }

    /// Prompt assembly settings
    #[must_use]
    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            sample_count: self.sample_count,
            shots: self.shots.clone(),
            shot_source: self.shot_source,
            nearest_shot: self.nearest_shot,
        }
    }
}
