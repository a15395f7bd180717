//! Integration tests for the distribution-prompts CLI and library.
//!
//! These tests verify end-to-end functionality including:
//! - CLI commands write well-formed prompt reports
//! - Sampling scenarios on the public API
//! - Shipped and user configurations drive full generation runs

#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use distribution_prompts::{
    generate_distributions_and_examples, generate_prompts, generate_real_world_percentile_prompts,
    sample_distribution, Artifact, DistributionSpec, Family, GeneratedDistributions,
    GenerationConfig, Outcome, ParameterSet, SampleOptions, SamplerError, ShotSource, Task,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::process::Command;

const SMALL_CONFIG: &str = r"
sample_size: 1000
num_examples: 2
sample_count: 2
shots: [0, 1]
questions:
  - family: poisson
    params: {lam: 30}
  - family: multinomial
    params: {n: 100, probs: [0.2, 0.3, 0.5]}
examples:
  - family: poisson
    params: {lam: [10, 50]}
  - family: multinomial
    params: {n: [80, 120], probs: {categories: 3}}
";

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_distribution-prompts"))
}

// ============================================================================
// CLI Integration Tests
// ============================================================================

#[test]
fn test_cli_help_command() {
    let output = cli().arg("--help").output().expect("Failed to execute CLI");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("generate"), "Help should list generate command");
    assert!(stdout.contains("real-world"), "Help should list real-world command");
    assert!(stdout.contains("inspect"), "Help should list inspect command");
}

#[test]
fn test_cli_real_world_writes_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path().join("real_world.json");

    let status = cli()
        .args(["real-world", "--sample-count", "2", "--output"])
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["summary"]["total_groups"], 24);
    assert_eq!(report["summary"]["total_prompts"], 24 * 11 * 2);
    assert!(report["metadata"]["generated_at"].is_string());
    assert!(report["prompts"]["percentiles_zero_shot_idealized_average_wind_speed_2_samples"]
        .is_array());
}

#[test]
fn test_cli_generate_with_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("small.yaml");
    let out = temp_dir.path().join("prompts.json");
    std::fs::write(&config, SMALL_CONFIG).unwrap();

    let output = cli()
        .args(["generate", "--task", "probabilities", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    // poisson: 2 shot counts; multinomial: 3 outcomes x 2 shot counts
    assert_eq!(report["summary"]["total_groups"], 2 + 6);
    assert_eq!(report["metadata"]["settings"]["sample_size"], 1000);
    let prompts = report["prompts"]["probabilities_1_shots_multinomial_outcome_3_2_samples"]
        .as_array()
        .unwrap();
    assert!(prompts[0].as_str().unwrap().contains("Example 1:"));
}

#[test]
fn test_cli_generate_overrides_to_stdout() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("small.yaml");
    std::fs::write(&config, SMALL_CONFIG).unwrap();

    let output = cli()
        .args([
            "generate",
            "--task",
            "sampling",
            "--shots",
            "3",
            "--sample-count",
            "4",
            "--shot-source",
            "distribution_stats",
            "--config",
        ])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let prompts = report["prompts"]["sampling_3_shots_poisson_4_samples"]
        .as_array()
        .unwrap();
    assert_eq!(prompts.len(), 4);
    assert_eq!(report["metadata"]["settings"]["shot_source"], "distribution_stats");
}

#[test]
fn test_cli_rejects_invalid_task() {
    let output = cli()
        .args(["generate", "--task", "invalid_task"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported task: invalid_task"), "stderr: {stderr}");
}

#[test]
fn test_cli_inspect_prints_table() {
    let output = cli()
        .args(["inspect", "--family", "normal", "--sample-size", "2000"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Distribution Type: Normal Distribution"));
    assert!(stdout.contains("Percentile"));
}

#[test]
fn test_cli_inspect_missing_config() {
    let output = cli()
        .args(["inspect", "--family", "gamma", "--config", "nonexistent.yaml"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nonexistent.yaml"));
}

// ============================================================================
// Sampling scenarios
// ============================================================================

#[test]
fn test_normal_median_scenario() {
    let spec = DistributionSpec::new(
        Family::Normal,
        ParameterSet::new().with("mean", 100).with("std", 10),
    );
    let output = sample_distribution(&spec, "percentiles", SampleOptions::default()).unwrap();
    let Artifact::Percentiles { primary, .. } = output.artifact else {
        panic!("expected percentiles");
    };
    let median = primary.get(None).unwrap().get(50.0).unwrap();
    assert!((median - 100.0).abs() < 0.5);
}

#[test]
fn test_exponential_sampling_scenario() {
    let spec = DistributionSpec::new(Family::Exponential, ParameterSet::new().with("rate", 0.01));
    let output = sample_distribution(&spec, "sampling", SampleOptions::default()).unwrap();
    let Artifact::Sampling { samples } = output.artifact else {
        panic!("expected samples");
    };
    assert!(samples.get(None).unwrap().values().iter().all(|v| *v >= 0.0));
}

#[test]
fn test_multinomial_outcome_scenario() {
    let spec = DistributionSpec::new(
        Family::Multinomial,
        ParameterSet::new()
            .with("n", 1000)
            .with("probs", vec![0.2, 0.3, 0.5]),
    );
    let output = sample_distribution(&spec, "percentiles", SampleOptions::default()).unwrap();
    let json = serde_json::to_value(&output).unwrap();
    for key in ["Outcome 1", "Outcome 2", "Outcome 3"] {
        assert!(json["primary"].get(key).is_some(), "{key}");
    }
    let Artifact::Percentiles { primary, .. } = output.artifact else {
        panic!("expected percentiles");
    };
    let first = primary.get(Some(Outcome::new(1))).unwrap().get(50.0).unwrap();
    let third = primary.get(Some(Outcome::new(3))).unwrap().get(50.0).unwrap();
    assert!(third > first);
}

#[test]
fn test_invalid_task_on_every_family() {
    let config = GenerationConfig::default();
    for question in &config.questions {
        let spec = DistributionSpec::new(question.family, question.params.clone());
        let err = sample_distribution(&spec, "invalid_task", SampleOptions::default()).unwrap_err();
        assert_eq!(err, SamplerError::UnsupportedTask("invalid_task".to_string()));
    }
}

// ============================================================================
// Generation runs
// ============================================================================

#[test]
fn test_shipped_config_generates_every_family() {
    let mut config = GenerationConfig::load("configs/default.yaml").unwrap();
    config.sample_size = 1000;
    config.num_examples = 2;
    config.sample_count = 1;
    config.shots = vec![0, 1];

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let distributions =
        generate_distributions_and_examples(&config, Task::Percentiles, &mut rng).unwrap();
    let GeneratedDistributions::Percentiles(infos) = distributions else {
        panic!("expected percentile distributions");
    };
    assert_eq!(infos.len(), 12);
    assert!(infos.iter().all(|info| info.examples.len() == 2));

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let prompts = generate_prompts(&config, Task::Percentiles, &mut rng).unwrap();
    // eleven single-column families plus three multinomial outcomes, two shot counts each
    assert_eq!(prompts.len(), (11 + 3) * 2);
}

#[test]
fn test_stats_sources_are_deterministic() {
    let mut config = GenerationConfig::from_yaml(SMALL_CONFIG).unwrap();
    config.shot_source = ShotSource::IntermediateStats;
    config.shots = vec![0, 3, 9];

    let a = generate_prompts(&config, Task::Probabilities, &mut ChaCha8Rng::seed_from_u64(1))
        .unwrap();
    let b = generate_prompts(&config, Task::Probabilities, &mut ChaCha8Rng::seed_from_u64(2))
        .unwrap();
    let name = "probabilities_9_shots_poisson_2_samples";
    assert_eq!(a.get(name), b.get(name));
}

#[test]
fn test_real_world_prompts_from_library() {
    let prompts = generate_real_world_percentile_prompts(1);
    assert_eq!(prompts.total(), 24 * 11);
    assert!(prompts
        .names()
        .all(|name| name.starts_with("percentiles_zero_shot_") && name.ends_with("_1_samples")));
}
