//! Output documents for generated prompts and inspected distributions.
//!
//! A [`PromptReport`] wraps a prompt set with run metadata and is written
//! as pretty JSON. The inspection helpers render a sampled distribution's
//! statistics as text tables.

use crate::config::{GenerationConfig, ShotSource};
use crate::prompts::PromptSet;
use crate::sampler::{Artifact, DistributionOutput, Outcome, OutcomeSet, Sample};
use crate::stats::{format_value, PercentileMap, RangeMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt::Write as FmtWrite;
use tabled::{Table, Tabled};

/// Prompt set with metadata and summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub prompts: PromptSet,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Task the prompts ask about
    pub task: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Framework version
    pub framework_version: String,
    /// Generation settings, absent for table-driven prompts
    pub settings: Option<SettingsSummary>,
}

/// Generation settings that shaped the prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSummary {
    pub seed: u64,
    pub sample_size: usize,
    pub num_examples: usize,
    pub sample_count: usize,
    pub shots: Vec<usize>,
    pub shot_source: ShotSource,
    pub nearest_shot: bool,
    pub approximate_as_normal: bool,
}

impl From<&GenerationConfig> for SettingsSummary {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            seed: config.seed,
            sample_size: config.sample_size,
            num_examples: config.num_examples,
            sample_count: config.sample_count,
            shots: config.shots.clone(),
            shot_source: config.shot_source,
            nearest_shot: config.nearest_shot,
            approximate_as_normal: config.approximate_as_normal,
        }
    }
}

/// Prompt counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Named prompt groups
    pub total_groups: usize,
    /// Prompts across all groups
    pub total_prompts: usize,
    /// Size of the largest group
    pub largest_group: usize,
}

impl From<&PromptSet> for ReportSummary {
    fn from(prompts: &PromptSet) -> Self {
        Self {
            total_groups: prompts.len(),
            total_prompts: prompts.total(),
            largest_group: prompts.iter().map(|(_, p)| p.len()).max().unwrap_or(0),
        }
    }
}

/// Builder for [`PromptReport`]
pub struct ReportBuilder {
    task: String,
    settings: Option<SettingsSummary>,
}

impl ReportBuilder {
    /// Create a new report builder
    #[must_use]
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            settings: None,
        }
    }

    /// Record the settings of a generation run
    #[must_use]
    pub fn with_config(mut self, config: &GenerationConfig) -> Self {
        self.settings = Some(SettingsSummary::from(config));
        self
    }

    /// Build the report around `prompts`
    #[must_use]
    pub fn build(self, prompts: PromptSet) -> PromptReport {
        PromptReport {
            metadata: ReportMetadata {
                title: format!("Distribution Prompts: {}", self.task),
                task: self.task,
                generated_at: Utc::now(),
                framework_version: env!("CARGO_PKG_VERSION").to_string(),
                settings: self.settings,
            },
            summary: ReportSummary::from(&prompts),
            prompts,
        }
    }
}

/// Table row for prompt group counts
#[derive(Tabled)]
struct GroupTableRow {
    #[tabled(rename = "Prompt Group")]
    name: String,
    #[tabled(rename = "Prompts")]
    count: usize,
}

impl PromptReport {
    /// Render report as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render the summary and group sizes as plain text
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        writeln!(output, "{}", self.metadata.title).ok();
        writeln!(
            output,
            "Generated: {}",
            self.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .ok();
        writeln!(output, "Groups:    {}", self.summary.total_groups).ok();
        writeln!(output, "Prompts:   {}", self.summary.total_prompts).ok();
        writeln!(output).ok();

        let rows: Vec<GroupTableRow> = self
            .prompts
            .iter()
            .map(|(name, prompts)| GroupTableRow {
                name: name.to_string(),
                count: prompts.len(),
            })
            .collect();
        writeln!(output, "{}", Table::new(rows)).ok();

        output
    }
}

#[derive(Tabled)]
struct PercentileTableRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Percentile")]
    percentile: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct RangeTableRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Lower")]
    lower: String,
    #[tabled(rename = "Upper")]
    upper: String,
}

#[derive(Tabled)]
struct SampleTableRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

fn outcome_label(outcome: Option<Outcome>) -> String {
    outcome.map_or_else(|| "-".to_string(), |o| o.to_string())
}

/// Table of percentile values, one row per outcome and percentile
#[must_use]
pub fn percentile_table(stats: &OutcomeSet<PercentileMap>) -> String {
    let rows: Vec<PercentileTableRow> = stats
        .iter()
        .flat_map(|(outcome, values)| {
            values.iter().map(move |(percentile, value)| PercentileTableRow {
                outcome: outcome_label(outcome),
                percentile: format_value(percentile),
                value: format_value(value),
            })
        })
        .collect();
    Table::new(rows).to_string()
}

/// Table of central ranges keyed by achieved probability
#[must_use]
pub fn range_table(stats: &OutcomeSet<RangeMap>) -> String {
    let rows: Vec<RangeTableRow> = stats
        .iter()
        .flat_map(|(outcome, ranges)| {
            ranges.iter().map(move |(probability, (lower, upper))| RangeTableRow {
                outcome: outcome_label(outcome),
                probability: format_value(probability),
                lower: format_value(lower),
                upper: format_value(upper),
            })
        })
        .collect();
    Table::new(rows).to_string()
}

/// Summary statistics of raw samples
#[must_use]
pub fn sample_table(stats: &OutcomeSet<Sample>) -> String {
    let rows: Vec<SampleTableRow> = stats
        .iter()
        .map(|(outcome, sample)| {
            let values = sample.values();
            SampleTableRow {
                outcome: outcome_label(outcome),
                count: sample.len(),
                mean: format!("{:.3}", values.mean()),
                std_dev: format!("{:.3}", values.population_std_dev()),
                min: format_value(Statistics::min(values)),
                max: format_value(Statistics::max(values)),
            }
        })
        .collect();
    Table::new(rows).to_string()
}

/// Description followed by the primary statistics table
#[must_use]
pub fn render_inspection(output: &DistributionOutput) -> String {
    let mut text = String::new();
    writeln!(text, "{}", output.description).ok();
    writeln!(text).ok();
    match &output.artifact {
        Artifact::Percentiles { primary, .. } => {
            writeln!(text, "{}", percentile_table(primary)).ok();
        }
        Artifact::Sampling { samples } => {
            writeln!(text, "{}", sample_table(samples)).ok();
        }
        Artifact::Probabilities { primary, .. } => {
            writeln!(text, "{}", range_table(primary)).ok();
        }
    }
    text
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn prompts() -> PromptSet {
        let mut set = PromptSet::new();
        set.push_repeated("percentiles_0_shots_normal_2_samples", "p", 4);
        set.push_repeated("percentiles_1_shots_normal_2_samples", "q", 2);
        set
    }

    #[test]
    fn test_report_builder_build() {
        let report = ReportBuilder::new("percentiles").build(prompts());
        assert_eq!(report.metadata.task, "percentiles");
        assert!(report.metadata.title.contains("percentiles"));
        assert!(report.metadata.settings.is_none());
        assert_eq!(report.summary.total_groups, 2);
        assert_eq!(report.summary.total_prompts, 6);
        assert_eq!(report.summary.largest_group, 4);
    }

    #[test]
    fn test_report_with_config() {
        let config = GenerationConfig::default();
        let report = ReportBuilder::new("sampling")
            .with_config(&config)
            .build(PromptSet::new());
        let settings = report.metadata.settings.unwrap();
        assert_eq!(settings.seed, 1337);
        assert_eq!(settings.shots, vec![0, 1, 3, 5, 7, 9]);
        assert_eq!(report.summary.largest_group, 0);
    }

    #[test]
    fn test_prompt_report_to_json() {
        let report = ReportBuilder::new("percentiles").build(prompts());
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["prompts"]["percentiles_1_shots_normal_2_samples"][1],
            "q"
        );
        assert_eq!(value["summary"]["total_prompts"], 6);

        let parsed: PromptReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.prompts, report.prompts);
    }

    #[test]
    fn test_prompt_report_to_text() {
        let text = ReportBuilder::new("percentiles").build(prompts()).to_text();
        assert!(text.contains("Prompt Group"));
        assert!(text.contains("percentiles_0_shots_normal_2_samples"));
        assert!(text.contains("Prompts:   6"));
    }

    #[test]
    fn test_percentile_table_rows() {
        let stats = OutcomeSet::PerOutcome(vec![
            [(50.0, 200.0)].into_iter().collect::<PercentileMap>(),
            [(50.0, 500.0)].into_iter().collect(),
        ]);
        let table = percentile_table(&stats);
        assert!(table.contains("Outcome 2"));
        assert!(table.contains("500.0"));
    }

    #[test]
    fn test_range_and_sample_tables() {
        let ranges = OutcomeSet::Single(
            [(0.512, (93.2, 106.8))].into_iter().collect::<RangeMap>(),
        );
        let table = range_table(&ranges);
        assert!(table.contains("0.512"));
        assert!(table.contains("106.8"));

        let samples = OutcomeSet::Single(Sample::new(vec![1.0, 2.0, 3.0], false));
        let table = sample_table(&samples);
        assert!(table.contains("2.000"));
        assert!(table.contains("3.0"));
    }
}
