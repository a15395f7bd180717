//! Prompt assembly.
//!
//! Prompts are grouped by name,
//! `{task}_{shots}_shots_{family}[_outcome_{k}]_{sample_count}_samples`.
//! Percentile and probability prompts are identical copies repeated
//! `sample_count` times; sampling prompts are rebuilt for every copy so each
//! one carries freshly drawn shots.

use crate::config::ShotSource;
use crate::family::Family;
use crate::fewshot::{
    percentile_stats_examples, pool_examples, probability_stats_examples, sampling_stats_examples,
    FewShotError, Ladder, PoolStats,
};
use crate::generation::DistributionInfo;
use crate::sampler::{Outcome, OutcomeSet, Sample, Task};
use crate::stats::{format_value, PercentileMap, RangeMap};
use crate::templates::{self, placeholder, Template};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prompt texts grouped by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSet(BTreeMap<String, Vec<String>>);

impl PromptSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one prompt under `name`
    pub fn push(&mut self, name: &str, prompt: String) {
        self.0.entry(name.to_string()).or_default().push(prompt);
    }

    /// Append `count` copies of `prompt` under `name`
    pub fn push_repeated(&mut self, name: &str, prompt: &str, count: usize) {
        self.0
            .entry(name.to_string())
            .or_default()
            .extend(std::iter::repeat(prompt.to_string()).take(count));
    }

    /// Prompts stored under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Prompt names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(name, prompts)| (name.as_str(), prompts.as_slice()))
    }

    /// Number of names
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of prompts across all names
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Move every prompt of `other` into this set
    pub fn merge(&mut self, other: Self) {
        for (name, prompts) in other.0 {
            self.0.entry(name).or_default().extend(prompts);
        }
    }
}

/// How prompts are assembled from sampled distributions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSettings {
    pub sample_count: usize,
    pub shots: Vec<usize>,
    pub shot_source: ShotSource,
    /// Percentile prompts only
    pub nearest_shot: bool,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            sample_count: 10,
            shots: vec![0, 1, 3, 5, 7, 9],
            shot_source: ShotSource::Examples,
            nearest_shot: false,
        }
    }
}

/// Name under which a group of prompts is stored
#[must_use]
pub fn prompt_name(
    task: Task,
    shots: usize,
    family: Family,
    outcome: Option<Outcome>,
    sample_count: usize,
) -> String {
    match outcome {
        Some(outcome) => format!(
            "{task}_{shots}_shots_{family}_outcome_{}_{sample_count}_samples",
            outcome.number()
        ),
        None => format!("{task}_{shots}_shots_{family}_{sample_count}_samples"),
    }
}

/// Statistics that can also be rendered as examples of their own distribution
pub trait StatsExamples: Sized {
    /// Render `shots` examples from the question's own statistics
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported shot count or a missing outcome.
    fn stats_examples<R: Rng + ?Sized>(
        rng: &mut R,
        description: &str,
        stats: &OutcomeSet<Self>,
        ladder: Ladder,
        shots: usize,
        outcome: Option<Outcome>,
    ) -> Result<String, FewShotError>;
}

impl StatsExamples for PercentileMap {
    fn stats_examples<R: Rng + ?Sized>(
        _rng: &mut R,
        description: &str,
        stats: &OutcomeSet<Self>,
        ladder: Ladder,
        shots: usize,
        outcome: Option<Outcome>,
    ) -> Result<String, FewShotError> {
        percentile_stats_examples(description, stats, ladder, shots, outcome)
    }
}

impl StatsExamples for RangeMap {
    fn stats_examples<R: Rng + ?Sized>(
        _rng: &mut R,
        description: &str,
        stats: &OutcomeSet<Self>,
        ladder: Ladder,
        shots: usize,
        outcome: Option<Outcome>,
    ) -> Result<String, FewShotError> {
        probability_stats_examples(description, stats, ladder, shots, outcome)
    }
}

impl StatsExamples for Sample {
    fn stats_examples<R: Rng + ?Sized>(
        rng: &mut R,
        description: &str,
        stats: &OutcomeSet<Self>,
        _ladder: Ladder,
        shots: usize,
        outcome: Option<Outcome>,
    ) -> Result<String, FewShotError> {
        sampling_stats_examples(rng, description, stats, shots, outcome)
    }
}

fn few_shot_block<R, S>(
    rng: &mut R,
    info: &DistributionInfo<S>,
    shots: usize,
    source: ShotSource,
    outcome: Option<Outcome>,
) -> Result<String, FewShotError>
where
    R: Rng + ?Sized,
    S: StatsExamples,
    OutcomeSet<S>: PoolStats,
{
    let description = info.description.as_str();
    match (source, &info.intermediate) {
        (ShotSource::Examples, _) => Ok(pool_examples(rng, &info.examples, shots)),
        (ShotSource::IntermediateStats, Some(intermediate)) => S::stats_examples(
            rng,
            description,
            intermediate,
            Ladder::Intermediate,
            shots,
            outcome,
        ),
        (ShotSource::DistributionStats | ShotSource::IntermediateStats, _) => {
            S::stats_examples(rng, description, &info.primary, Ladder::Primary, shots, outcome)
        }
    }
}

fn outcome_stats<'a, S>(
    info: &'a DistributionInfo<S>,
    outcome: Option<Outcome>,
) -> Result<&'a S, FewShotError> {
    info.primary.get(outcome).ok_or_else(|| {
        FewShotError::MissingOutcome(format!("{} question distribution", info.family))
    })
}

fn fill(
    template: &Template,
    examples: &str,
    description: &str,
    outcome: Option<Outcome>,
    targets: &[(&str, &str)],
) -> String {
    let outcome_num = outcome.map(|o| o.number().to_string()).unwrap_or_default();
    let mut values = vec![
        (placeholder::FEW_SHOT_EXAMPLES, examples),
        (placeholder::DISTRIBUTION_DESCRIPTION, description),
        (placeholder::OUTCOME_NUM, outcome_num.as_str()),
    ];
    values.extend_from_slice(targets);
    template.fill(&values)
}

/// Prompts asking for the percentile of each of the question's percentile values.
///
/// # Errors
///
/// Returns an error for a shot count without a ladder in the statistics modes.
pub fn generate_percentile_prompts<R: Rng + ?Sized>(
    rng: &mut R,
    distributions: &[DistributionInfo<PercentileMap>],
    settings: &PromptSettings,
) -> Result<PromptSet, FewShotError> {
    let mut prompts = PromptSet::new();
    for info in distributions {
        let template = templates::percentile(info.family.has_outcomes(), settings.nearest_shot);
        for outcome in info.primary.outcomes() {
            let targets: Vec<String> = outcome_stats(info, outcome)?
                .iter()
                .map(|(_, value)| format_value(value))
                .collect();
            for &shots in &settings.shots {
                let examples = few_shot_block(rng, info, shots, settings.shot_source, outcome)?;
                let name = prompt_name(
                    Task::Percentiles,
                    shots,
                    info.family,
                    outcome,
                    settings.sample_count,
                );
                for target in &targets {
                    let prompt = fill(
                        template,
                        &examples,
                        &info.description,
                        outcome,
                        &[(placeholder::TARGET_NUMBER, target.as_str())],
                    );
                    prompts.push_repeated(&name, &prompt, settings.sample_count);
                }
            }
        }
    }
    Ok(prompts)
}

/// Prompts asking for a single draw, rebuilt for every copy.
///
/// # Errors
///
/// Returns an error if a question distribution lacks samples for an outcome.
pub fn generate_sampling_prompts<R: Rng + ?Sized>(
    rng: &mut R,
    distributions: &[DistributionInfo<Sample>],
    settings: &PromptSettings,
) -> Result<PromptSet, FewShotError> {
    let mut prompts = PromptSet::new();
    for info in distributions {
        let template = templates::sample(info.family.has_outcomes());
        for &shots in &settings.shots {
            for _ in 0..settings.sample_count {
                for outcome in info.primary.outcomes() {
                    let examples =
                        few_shot_block(rng, info, shots, settings.shot_source, outcome)?;
                    let name = prompt_name(
                        Task::Sampling,
                        shots,
                        info.family,
                        outcome,
                        settings.sample_count,
                    );
                    prompts.push(
                        &name,
                        fill(template, &examples, &info.description, outcome, &[]),
                    );
                }
            }
        }
    }
    Ok(prompts)
}

/// Prompts asking for the probability mass of each of the question's ranges.
///
/// # Errors
///
/// Returns an error for a shot count without a ladder in the statistics modes.
pub fn generate_probability_prompts<R: Rng + ?Sized>(
    rng: &mut R,
    distributions: &[DistributionInfo<RangeMap>],
    settings: &PromptSettings,
) -> Result<PromptSet, FewShotError> {
    let mut prompts = PromptSet::new();
    for info in distributions {
        let template = templates::probability(info.family.has_outcomes());
        for outcome in info.primary.outcomes() {
            let targets: Vec<(String, String)> = outcome_stats(info, outcome)?
                .iter()
                .map(|(_, (lower, upper))| (format_value(lower), format_value(upper)))
                .collect();
            for &shots in &settings.shots {
                let examples = few_shot_block(rng, info, shots, settings.shot_source, outcome)?;
                let name = prompt_name(
                    Task::Probabilities,
                    shots,
                    info.family,
                    outcome,
                    settings.sample_count,
                );
                for (lower, upper) in &targets {
                    let prompt = fill(
                        template,
                        &examples,
                        &info.description,
                        outcome,
                        &[
                            (placeholder::LOWER_TARGET_NUMBER, lower.as_str()),
                            (placeholder::UPPER_TARGET_NUMBER, upper.as_str()),
                        ],
                    );
                    prompts.push_repeated(&name, &prompt, settings.sample_count);
                }
            }
        }
    }
    Ok(prompts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fewshot::Example;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn percentile_info() -> DistributionInfo<PercentileMap> {
        let primary: PercentileMap = [(10.0, 87.2), (50.0, 100.0), (90.0, 112.8)]
            .into_iter()
            .collect();
        let intermediate: PercentileMap = [(15.0, 89.6), (55.0, 101.3)].into_iter().collect();
        DistributionInfo {
            family: Family::Normal,
            description: "Distribution Type: Normal Distribution".to_string(),
            primary: OutcomeSet::Single(primary.clone()),
            intermediate: Some(OutcomeSet::Single(intermediate)),
            examples: vec![Example {
                description: "Distribution Type: Example".to_string(),
                stats: OutcomeSet::Single(primary),
            }],
        }
    }

    fn range_info() -> DistributionInfo<RangeMap> {
        let ranges: RangeMap = [(0.102, (97.4, 102.6)), (0.5, (93.2, 106.8)), (1.0, (76.7, 123.3))]
            .into_iter()
            .collect();
        DistributionInfo {
            family: Family::Multinomial,
            description: "Distribution Type: Multinomial Distribution".to_string(),
            primary: OutcomeSet::PerOutcome(vec![ranges.clone(), ranges.clone()]),
            intermediate: Some(OutcomeSet::PerOutcome(vec![ranges.clone(), ranges])),
            examples: Vec::new(),
        }
    }

    fn settings(shots: Vec<usize>, shot_source: ShotSource) -> PromptSettings {
        PromptSettings {
            sample_count: 2,
            shots,
            shot_source,
            nearest_shot: false,
        }
    }

    #[test]
    fn test_prompt_names() {
        assert_eq!(
            prompt_name(Task::Percentiles, 3, Family::LogNormal, None, 10),
            "percentiles_3_shots_log_normal_10_samples"
        );
        assert_eq!(
            prompt_name(Task::Sampling, 0, Family::Multinomial, Some(Outcome::new(2)), 5),
            "sampling_0_shots_multinomial_outcome_2_5_samples"
        );
    }

    #[test]
    fn test_prompt_set_counts() {
        let mut set = PromptSet::new();
        set.push_repeated("a", "x", 3);
        set.push("a", "y".to_string());
        set.push("b", "z".to_string());
        assert_eq!(set.len(), 2);
        assert_eq!(set.total(), 5);
        assert_eq!(set.get("a").unwrap().last().unwrap(), "y");

        let mut other = PromptSet::new();
        other.push("b", "w".to_string());
        set.merge(other);
        assert_eq!(set.get("b").unwrap(), ["z".to_string(), "w".to_string()]);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_percentile_prompts_from_distribution_stats() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let prompts = generate_percentile_prompts(
            &mut rng,
            &[percentile_info()],
            &settings(vec![0, 1], ShotSource::DistributionStats),
        )
        .unwrap();

        let zero = prompts.get("percentiles_0_shots_normal_2_samples").unwrap();
        assert_eq!(zero.len(), 6);
        assert_eq!(zero[0], zero[1]);
        assert!(zero.iter().all(|p| !p.contains("Example 1:")));
        assert!(zero[0].contains("87.2"));

        let one = prompts.get("percentiles_1_shots_normal_2_samples").unwrap();
        assert!(one[0].contains("What is the percentile of 100.0 within"));
        assert!(one[0].contains("<answer>50.0</answer>"));
        assert!(!one[0].contains("{few_shot_examples}"));
    }

    #[test]
    fn test_percentile_prompts_intermediate_ladder() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let prompts = generate_percentile_prompts(
            &mut rng,
            &[percentile_info()],
            &settings(vec![1], ShotSource::IntermediateStats),
        )
        .unwrap();
        let one = prompts.get("percentiles_1_shots_normal_2_samples").unwrap();
        assert!(one[0].contains("<answer>55.0</answer>"));
    }

    #[test]
    fn test_nearest_shot_template() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut nearest = settings(vec![0], ShotSource::Examples);
        nearest.nearest_shot = true;
        let plain = generate_percentile_prompts(
            &mut rng,
            &[percentile_info()],
            &settings(vec![0], ShotSource::Examples),
        )
        .unwrap();
        let near = generate_percentile_prompts(&mut rng, &[percentile_info()], &nearest).unwrap();
        let name = "percentiles_0_shots_normal_2_samples";
        assert_ne!(plain.get(name).unwrap()[0], near.get(name).unwrap()[0]);
    }

    #[test]
    fn test_probability_prompts_per_outcome() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let prompts = generate_probability_prompts(
            &mut rng,
            &[range_info()],
            &settings(vec![0, 3], ShotSource::DistributionStats),
        )
        .unwrap();
        assert_eq!(prompts.len(), 4);
        let outcome_two = prompts
            .get("probabilities_3_shots_multinomial_outcome_2_2_samples")
            .unwrap();
        assert_eq!(outcome_two.len(), 6);
        assert!(outcome_two[0].contains("outcome 2"));
        assert!(outcome_two.iter().any(|p| p.contains("93.2") && p.contains("106.8")));
    }

    #[test]
    fn test_unsupported_shots_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = generate_probability_prompts(
            &mut rng,
            &[range_info()],
            &settings(vec![2], ShotSource::IntermediateStats),
        );
        assert_eq!(result.unwrap_err(), FewShotError::UnsupportedShots(2));
    }

    #[test]
    fn test_sampling_prompts_regenerated() {
        let info = DistributionInfo {
            family: Family::Poisson,
            description: "Distribution Type: Poisson Distribution".to_string(),
            primary: OutcomeSet::Single(Sample::new((0..50).map(f64::from).collect(), true)),
            intermediate: None,
            examples: Vec::new(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut config = settings(vec![0, 5], ShotSource::IntermediateStats);
        config.sample_count = 20;
        let prompts = generate_sampling_prompts(&mut rng, &[info], &config).unwrap();

        let five = prompts.get("sampling_5_shots_poisson_20_samples").unwrap();
        assert_eq!(five.len(), 20);
        assert_eq!(five[0].matches("\nExample ").count(), 5);
        assert!(five.iter().any(|p| p != &five[0]));
        assert_eq!(prompts.get("sampling_0_shots_poisson_20_samples").unwrap().len(), 20);
    }
}
