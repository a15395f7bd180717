//! Property tests over the public statistics, sampling and parameter APIs.

#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use distribution_prompts::config::{default_examples, default_questions};
use distribution_prompts::stats::{INTERMEDIATE_PROBABILITIES, PERCENTILES, PROBABILITIES};
use distribution_prompts::{
    generate_probabilities, generate_random_params, params_equal, percentile_values,
    probability_within_range, target_ranges, DistributionSpec, Family, ParameterSet, SortedSample,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn sample_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6..1.0e6_f64, 3..400)
}

fn question_params(family: Family) -> ParameterSet {
    default_questions()
        .into_iter()
        .find(|q| q.family == family)
        .map(|q| q.params)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_identical_seed_identical_sample(
        family in prop::sample::select(Family::ALL.to_vec()),
        seed in any::<u64>(),
    ) {
        let spec = DistributionSpec::new(family, question_params(family))
            .with_sample_size(300)
            .with_seed(seed);
        prop_assert_eq!(spec.draw().unwrap(), spec.draw().unwrap());
    }

    #[test]
    fn prop_percentiles_non_decreasing(sample in sample_strategy()) {
        let values: Vec<f64> = percentile_values(&sample, &PERCENTILES)
            .iter()
            .map(|(_, value)| value)
            .collect();
        prop_assert_eq!(values.len(), PERCENTILES.len());
        prop_assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_ranges_widen_with_probability(sample in sample_strategy()) {
        for probabilities in [&PROBABILITIES, &INTERMEDIATE_PROBABILITIES] {
            let ranges = target_ranges(&sample, probabilities);
            let entries: Vec<(f64, (f64, f64))> = ranges.iter().collect();
            for pair in entries.windows(2) {
                let (_, (lo_a, hi_a)) = pair[0];
                let (_, (lo_b, hi_b)) = pair[1];
                prop_assert!(lo_b <= lo_a && hi_a <= hi_b);
            }
        }
    }

    #[test]
    fn prop_full_band_has_probability_one(sample in sample_strategy()) {
        let band = SortedSample::from_slice(&sample).truncated();
        let (low, high) = (band.min().unwrap(), band.max().unwrap());
        prop_assert_eq!(probability_within_range(&sample, low, high), 1.0);
    }

    #[test]
    fn prop_generated_probabilities_sum_to_one(seed in any::<u64>(), categories in 2usize..=8) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let threshold = 0.5 / categories as f64;
        let probs = generate_probabilities(&mut rng, threshold, categories).unwrap();
        prop_assert_eq!(probs.len(), categories);
        prop_assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!(probs.iter().all(|p| *p >= threshold - 1e-9));
    }

    #[test]
    fn prop_generated_params_avoid_questions(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let reserved: Vec<ParameterSet> = default_questions().into_iter().map(|q| q.params).collect();
        for example in default_examples() {
            let params = generate_random_params(&mut rng, &example.params, &reserved).unwrap();
            prop_assert!(reserved.iter().all(|question| !params_equal(&params, question)));
        }
    }
}
