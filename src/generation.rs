//! Question and example distribution generation.
//!
//! Every configured question distribution is sampled once with the run seed.
//! Each example configuration then contributes `num_examples` freshly drawn
//! parameter sets, sampled with seeds taken from the caller's generator, to
//! the pool of the question with the same family.

use crate::config::{ConfigError, GenerationConfig};
use crate::family::Family;
use crate::fewshot::{Example, FewShotError};
use crate::params::{generate_random_params, ParamError};
use crate::prompts::{self, PromptSet};
use crate::sampler::{
    sample_for_task, Artifact, DistributionSpec, OutcomeSet, Sample, SampleOptions, SamplerError,
    Task,
};
use crate::stats::{PercentileMap, RangeMap};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Exclusive upper bound of example seeds
pub const EXAMPLE_SEED_BOUND: u64 = 100_000;

/// Errors raised while generating distributions or prompts
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    FewShot(#[from] FewShotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Expected {expected} statistics but the sampler produced {found}")]
    ArtifactMismatch { expected: Task, found: Task },

    #[error("No question configured for the {0} family")]
    MissingQuestion(Family),
}

/// Statistic type that a task's prompts are built from
pub trait TaskStats: Sized {
    /// Task whose artifact carries this statistic
    const TASK: Task;

    /// Split an artifact into primary and optional intermediate statistics
    fn split(artifact: Artifact) -> Option<(OutcomeSet<Self>, Option<OutcomeSet<Self>>)>;
}

impl TaskStats for PercentileMap {
    const TASK: Task = Task::Percentiles;

    fn split(artifact: Artifact) -> Option<(OutcomeSet<Self>, Option<OutcomeSet<Self>>)> {
        match artifact {
            Artifact::Percentiles {
                primary,
                intermediate,
            } => Some((primary, Some(intermediate))),
            _ => None,
        }
    }
}

impl TaskStats for Sample {
    const TASK: Task = Task::Sampling;

    fn split(artifact: Artifact) -> Option<(OutcomeSet<Self>, Option<OutcomeSet<Self>>)> {
        match artifact {
            Artifact::Sampling { samples } => Some((samples, None)),
            _ => None,
        }
    }
}

impl TaskStats for RangeMap {
    const TASK: Task = Task::Probabilities;

    fn split(artifact: Artifact) -> Option<(OutcomeSet<Self>, Option<OutcomeSet<Self>>)> {
        match artifact {
            Artifact::Probabilities {
                primary,
                intermediate,
            } => Some((primary, Some(intermediate))),
            _ => None,
        }
    }
}

/// A sampled question distribution with its pool of examples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionInfo<S> {
    pub family: Family,
    pub description: String,
    pub primary: OutcomeSet<S>,
    /// Offset statistics; sampling has none
    pub intermediate: Option<OutcomeSet<S>>,
    pub examples: Vec<Example<OutcomeSet<S>>>,
}

/// Question distributions of one run, typed by task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", content = "distributions", rename_all = "snake_case")]
pub enum GeneratedDistributions {
    Percentiles(Vec<DistributionInfo<PercentileMap>>),
    Sampling(Vec<DistributionInfo<Sample>>),
    Probabilities(Vec<DistributionInfo<RangeMap>>),
}

impl GeneratedDistributions {
    #[must_use]
    pub const fn task(&self) -> Task {
        match self {
            Self::Percentiles(_) => Task::Percentiles,
            Self::Sampling(_) => Task::Sampling,
            Self::Probabilities(_) => Task::Probabilities,
        }
    }

    /// Number of question distributions
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Percentiles(d) => d.len(),
            Self::Sampling(d) => d.len(),
            Self::Probabilities(d) => d.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sample_stats<S: TaskStats>(
    spec: &DistributionSpec,
    options: SampleOptions,
) -> Result<(String, OutcomeSet<S>, Option<OutcomeSet<S>>), GenerationError> {
    let output = sample_for_task(spec, S::TASK, options)?;
    let found = output.artifact.task();
    let (primary, intermediate) =
        S::split(output.artifact).ok_or(GenerationError::ArtifactMismatch {
            expected: S::TASK,
            found,
        })?;
    Ok((output.description, primary, intermediate))
}

/// Sample every question and build its example pool for the statistic `S`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a distribution
/// cannot be sampled.
pub fn collect_distributions<S, R>(
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<Vec<DistributionInfo<S>>, GenerationError>
where
    S: TaskStats,
    R: Rng + ?Sized,
{
    config.validate()?;

    let mut distributions = Vec::with_capacity(config.questions.len());
    for question in &config.questions {
        let spec = DistributionSpec::new(question.family, question.params.clone())
            .with_sample_size(config.sample_size)
            .with_seed(config.seed);
        let (description, primary, intermediate) =
            sample_stats::<S>(&spec, config.question_options())?;
        distributions.push(DistributionInfo {
            family: question.family,
            description,
            primary,
            intermediate,
            examples: Vec::new(),
        });
    }

    let reserved = config.reserved_params();
    let example_options = SampleOptions {
        debug: config.debug,
        approximate_as_normal: false,
    };
    for example in &config.examples {
        let info = distributions
            .iter_mut()
            .find(|info| info.family == example.family)
            .ok_or(GenerationError::MissingQuestion(example.family))?;

        for _ in 0..config.num_examples {
            let params = generate_random_params(rng, &example.params, &reserved)?;
            let seed = rng.gen_range(0..EXAMPLE_SEED_BOUND);
            let spec = DistributionSpec::new(example.family, params)
                .with_sample_size(config.sample_size)
                .with_seed(seed);
            let (description, stats, _) = sample_stats::<S>(&spec, example_options)?;
            info.examples.push(Example { description, stats });
        }
        tracing::debug!(
            family = %example.family,
            examples = info.examples.len(),
            "Generated example distributions"
        );
    }

    Ok(distributions)
}

/// Sample every question and example distribution for `task`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a distribution
/// cannot be sampled.
pub fn generate_distributions_and_examples<R: Rng + ?Sized>(
    config: &GenerationConfig,
    task: Task,
    rng: &mut R,
) -> Result<GeneratedDistributions, GenerationError> {
    Ok(match task {
        Task::Percentiles => GeneratedDistributions::Percentiles(collect_distributions(config, rng)?),
        Task::Sampling => GeneratedDistributions::Sampling(collect_distributions(config, rng)?),
        Task::Probabilities => {
            GeneratedDistributions::Probabilities(collect_distributions(config, rng)?)
        }
    })
}

/// Generate distributions for `task` and assemble its prompt set.
///
/// # Errors
///
/// Returns an error if generation fails or a shot count has no ladder in
/// the statistics modes.
pub fn generate_prompts<R: Rng + ?Sized>(
    config: &GenerationConfig,
    task: Task,
    rng: &mut R,
) -> Result<PromptSet, GenerationError> {
    let settings = config.prompt_settings();
    let distributions = generate_distributions_and_examples(config, task, rng)?;
    tracing::info!(
        task = %task,
        distributions = distributions.len(),
        "Sampled question distributions"
    );

    let prompts = match &distributions {
        GeneratedDistributions::Percentiles(d) => {
            prompts::generate_percentile_prompts(rng, d, &settings)?
        }
        GeneratedDistributions::Sampling(d) => prompts::generate_sampling_prompts(rng, d, &settings)?,
        GeneratedDistributions::Probabilities(d) => {
            prompts::generate_probability_prompts(rng, d, &settings)?
        }
    };
    Ok(prompts)
}
