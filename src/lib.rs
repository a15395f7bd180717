//! # Distribution Prompts
//!
//! Generates prompts that test how well a language model understands
//! probability distributions: which percentile a value falls at, what a
//! fresh draw looks like, and how much mass lies inside a range.
//!
//! ## Architecture
//!
//! ```text
//! GenerationConfig (YAML)
//!        ↓
//! Question distributions (fixed seed) + example distributions (random params)
//!        ↓
//! Sampler → description + task artifact (percentiles | samples | ranges)
//!        ↓
//! Few-shot assembly (example pool | distribution stats | intermediate stats)
//!        ↓
//! Template fill → PromptSet
//!        ↓
//! PromptReport (JSON)
//! ```
//!
//! Real-world prompts skip sampling entirely and fill their templates from
//! fixed ground-truth tables.

pub mod config;
pub mod family;
pub mod fewshot;
pub mod generation;
pub mod params;
pub mod prompts;
pub mod real_world;
pub mod report;
pub mod sampler;
pub mod stats;
pub mod templates;

pub use config::{ConfigError, ExampleConfig, GenerationConfig, QuestionConfig, ShotSource};
pub use family::{Family, Law};
pub use fewshot::{Example, FewShotError, Ladder};
pub use generation::{
    generate_distributions_and_examples, generate_prompts, DistributionInfo,
    GeneratedDistributions, GenerationError,
};
pub use params::{
    generate_probabilities, generate_random_params, params_equal, Number, ParamError, ParamRange,
    ParamValue, ParameterRanges, ParameterSet,
};
pub use prompts::{
    generate_percentile_prompts, generate_probability_prompts, generate_sampling_prompts,
    PromptSet, PromptSettings,
};
pub use real_world::{generate_real_world_percentile_prompts, Domain, GroundTruth, TemplateVariant};
pub use report::{render_inspection, PromptReport, ReportBuilder, ReportMetadata, ReportSummary};
pub use sampler::{
    sample_distribution, sample_for_task, Artifact, DistributionOutput, DistributionSpec, Outcome,
    OutcomeSet, Sample, SampleOptions, SamplerError, Task,
};
pub use stats::{
    percentile_values, probability_within_range, target_ranges, PercentileMap, RangeMap,
    SortedSample,
};
pub use templates::Template;
