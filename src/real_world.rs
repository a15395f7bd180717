//! Zero-shot percentile prompts about measured real-world distributions.
//!
//! Nothing is sampled here: every dataset carries fixed ground-truth
//! percentiles and central ranges, and each percentile value becomes the
//! target of one prompt per template variant.

use crate::prompts::PromptSet;
use crate::stats::{format_value, PercentileMap, RangeMap};
use crate::templates::{self, placeholder, Template, REAL_WORLD, REAL_WORLD_IDEALIZED};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject area of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Health,
    Finance,
    Climate,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Health => "health",
            Self::Finance => "finance",
            Self::Climate => "climate",
        })
    }
}

/// How a dataset is presented in the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    /// Plain distribution description of the data
    Idealized,
    /// Narrative about the real population
    RealWorld,
}

impl TemplateVariant {
    pub const ALL: [Self; 2] = [Self::Idealized, Self::RealWorld];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idealized => "idealized",
            Self::RealWorld => "real_world",
        }
    }

    const fn templates(self) -> &'static [Template] {
        match self {
            Self::Idealized => &REAL_WORLD_IDEALIZED,
            Self::RealWorld => &REAL_WORLD,
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed statistics of one labelled real-world distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruth {
    pub label: &'static str,
    pub domain: Domain,
    percentiles: &'static [(f64, f64)],
    ranges: &'static [(f64, (f64, f64))],
}

impl GroundTruth {
    /// Label in snake case, as used in prompt and template names
    #[must_use]
    pub fn slug(&self) -> String {
        self.label.replace(' ', "_").to_lowercase()
    }

    #[must_use]
    pub fn percentile_map(&self) -> PercentileMap {
        self.percentiles.iter().copied().collect()
    }

    #[must_use]
    pub fn range_map(&self) -> RangeMap {
        self.ranges.iter().copied().collect()
    }

    /// Template for this dataset in `variant`
    #[must_use]
    pub fn template(&self, variant: TemplateVariant) -> Option<&'static Template> {
        templates::find(variant.templates(), &self.slug())
    }
}

const fn percentiles(values: [f64; 11]) -> [(f64, f64); 11] {
    [
        (1.0, values[0]),
        (10.0, values[1]),
        (20.0, values[2]),
        (30.0, values[3]),
        (40.0, values[4]),
        (50.0, values[5]),
        (60.0, values[6]),
        (70.0, values[7]),
        (80.0, values[8]),
        (90.0, values[9]),
        (99.0, values[10]),
    ]
}

/// The twelve datasets, grouped health, finance, climate
pub static DATASETS: [GroundTruth; 12] = [
    GroundTruth {
        label: "Average Step Count",
        domain: Domain::Health,
        percentiles: &percentiles([
            2174.61, 4433.794, 5558.104, 6445.293, 7244.214, 8028.321, 8845.736, 9791.713,
            11000.567, 12792.197, 17510.718,
        ]),
        ranges: &[
            (0.102, (7635.28, 8418.632)),
            (0.204, (7258.529, 8827.968)),
            (0.306, (6867.371, 9267.069)),
            (0.408, (6475.844, 9750.122)),
            (0.51, (6049.556, 10295.755)),
            (0.612, (5615.236, 10912.331)),
            (0.714, (5121.244, 11654.698)),
            (0.816, (4540.99, 12599.002)),
            (0.918, (3762.946, 14040.506)),
            (1.0, (2174.624, 17510.715)),
        ],
    },
    GroundTruth {
        label: "Average Resting Heart Rate",
        domain: Domain::Health,
        percentiles: &percentiles([
            52.286, 57.838, 60.905, 63.324, 65.49, 67.552, 69.692, 71.971, 74.651, 78.33, 85.438,
        ]),
        ranges: &[
            (0.102, (66.533, 68.593)),
            (0.204, (65.529, 69.652)),
            (0.306, (64.483, 70.719)),
            (0.408, (63.411, 71.87)),
            (0.51, (62.275, 73.109)),
            (0.612, (61.06, 74.471)),
            (0.714, (59.7, 76.052)),
            (0.816, (58.127, 77.973)),
            (0.918, (56.125, 80.6)),
            (1.0, (52.286, 85.437)),
        ],
    },
    GroundTruth {
        label: "Average Sleep Minutes",
        domain: Domain::Health,
        percentiles: &percentiles([
            280.833, 331.325, 354.023, 369.714, 382.807, 394.37, 405.83, 417.892, 431.841,
            450.636, 493.97,
        ]),
        ranges: &[
            (0.102, (388.837, 399.956)),
            (0.204, (383.053, 405.594)),
            (0.306, (376.862, 411.435)),
            (0.408, (370.266, 417.4)),
            (0.51, (363.193, 423.8)),
            (0.612, (355.048, 430.84)),
            (0.714, (345.566, 439.116)),
            (0.816, (333.671, 448.76)),
            (0.918, (316.5, 462.952)),
            (1.0, (280.833, 493.97)),
        ],
    },
    GroundTruth {
        label: "Average AZM Count",
        domain: Domain::Health,
        percentiles: &percentiles([
            7.286, 13.788, 19.158, 24.212, 29.466, 35.226, 42.0, 50.431, 62.089, 82.821, 153.72,
        ]),
        ranges: &[
            (0.102, (32.327, 38.413)),
            (0.204, (29.563, 41.859)),
            (0.306, (27.005, 45.641)),
            (0.408, (24.434, 50.072)),
            (0.51, (21.923, 55.143)),
            (0.612, (19.473, 61.21)),
            (0.714, (16.934, 69.305)),
            (0.816, (14.239, 80.5)),
            (0.918, (11.343, 98.569)),
            (1.0, (7.286, 153.72)),
        ],
    },
    GroundTruth {
        label: "Monthly Gross Rent",
        domain: Domain::Finance,
        percentiles: &percentiles([
            331.0, 666.0, 813.0, 937.0, 1055.0, 1187.0, 1355.0, 1548.0, 1800.0, 2235.0, 3635.0,
        ]),
        ranges: &[
            (0.103, (1118.0, 1263.0)),
            (0.205, (1058.0, 1350.0)),
            (0.308, (1000.0, 1440.0)),
            (0.408, (942.0, 1539.0)),
            (0.511, (882.0, 1650.0)),
            (0.614, (820.0, 1782.0)),
            (0.715, (755.0, 1950.0)),
            (0.818, (680.0, 2189.0)),
            (0.918, (580.0, 2597.0)),
            (1.0, (331.0, 3635.0)),
        ],
    },
    GroundTruth {
        label: "Annual Electricity Cost",
        domain: Domain::Finance,
        percentiles: &percentiles([
            360.0, 720.0, 960.0, 1200.0, 1320.0, 1560.0, 1800.0, 2160.0, 2520.0, 3240.0, 4800.0,
        ]),
        ranges: &[
            (0.21, (1440.0, 1800.0)),
            (0.244, (1320.0, 1800.0)),
            (0.387, (1200.0, 2040.0)),
            (0.425, (1200.0, 2160.0)),
            (0.562, (1080.0, 2400.0)),
            (0.634, (960.0, 2520.0)),
            (0.725, (840.0, 2880.0)),
            (0.816, (720.0, 3240.0)),
            (0.908, (600.0, 3600.0)),
            (1.0, (360.0, 4800.0)),
        ],
    },
    GroundTruth {
        label: "Annual Water Cost",
        domain: Domain::Finance,
        percentiles: &percentiles([
            20.0, 50.0, 90.0, 180.0, 360.0, 480.0, 600.0, 780.0, 1000.0, 1200.0, 2400.0,
        ]),
        ranges: &[
            (0.103, (420.0, 580.0)),
            (0.22, (360.0, 600.0)),
            (0.307, (270.0, 700.0)),
            (0.409, (190.0, 780.0)),
            (0.518, (120.0, 870.0)),
            (0.606, (100.0, 980.0)),
            (0.721, (70.0, 1100.0)),
            (0.848, (50.0, 1200.0)),
            (0.923, (40.0, 1500.0)),
            (1.0, (20.0, 2400.0)),
        ],
    },
    GroundTruth {
        label: "Annual Household Income",
        domain: Domain::Finance,
        percentiles: &percentiles([
            0.0, 14400.0, 24500.0, 33600.0, 42900.0, 52800.0, 64800.0, 79000.0, 99000.0,
            132_400.0, 267_000.0,
        ]),
        ranges: &[
            (0.103, (47400.0, 58000.0)),
            (0.205, (42200.0, 64000.0)),
            (0.307, (38000.0, 70000.0)),
            (0.405, (33200.0, 77700.0)),
            (0.507, (29000.0, 86000.0)),
            (0.606, (24200.0, 96900.0)),
            (0.711, (19600.0, 110_000.0)),
            (0.808, (14400.0, 128_600.0)),
            (0.91, (8600.0, 160_000.0)),
            (1.0, (0.0, 267_000.0)),
        ],
    },
    GroundTruth {
        label: "Average Temperature",
        domain: Domain::Climate,
        percentiles: &percentiles([
            -21.7, -6.4, -0.4, 3.8, 8.0, 11.8, 15.3, 18.9, 22.8, 26.8, 30.9,
        ]),
        ranges: &[
            (0.106, (10.0, 13.6)),
            (0.208, (8.1, 15.3)),
            (0.308, (6.1, 17.0)),
            (0.411, (4.0, 18.8)),
            (0.511, (1.9, 20.6)),
            (0.613, (-0.1, 22.6)),
            (0.715, (-2.5, 24.7)),
            (0.818, (-5.7, 26.6)),
            (0.921, (-10.7, 28.2)),
            (1.0, (-21.7, 30.9)),
        ],
    },
    GroundTruth {
        label: "Annual Precipitation",
        domain: Domain::Climate,
        percentiles: &percentiles([
            17.8, 178.47, 293.6, 402.2, 517.8, 647.5, 802.2, 975.6, 1216.46, 1526.86, 2025.849,
        ]),
        ranges: &[
            (0.102, (582.23, 717.57)),
            (0.204, (520.46, 799.1)),
            (0.306, (462.9, 884.01)),
            (0.408, (406.6, 968.46)),
            (0.51, (352.15, 1071.75)),
            (0.612, (299.6, 1199.22)),
            (0.714, (247.6, 1341.98)),
            (0.816, (188.44, 1497.18)),
            (0.918, (114.3, 1675.48)),
            (1.0, (17.8, 2025.6)),
        ],
    },
    GroundTruth {
        label: "Average Wind Speed",
        domain: Domain::Climate,
        percentiles: &percentiles([0.5, 1.3, 1.8, 2.2, 2.6, 3.0, 3.5, 4.0, 4.7, 5.7, 8.2]),
        ranges: &[
            (0.122, (2.8, 3.2)),
            (0.251, (2.6, 3.5)),
            (0.314, (2.5, 3.7)),
            (0.45, (2.2, 4.0)),
            (0.526, (2.1, 4.3)),
            (0.627, (1.8, 4.6)),
            (0.739, (1.6, 5.1)),
            (0.837, (1.3, 5.6)),
            (0.923, (1.0, 6.4)),
            (1.0, (0.5, 8.2)),
        ],
    },
    GroundTruth {
        label: "Average Relative Humidity",
        domain: Domain::Climate,
        percentiles: &percentiles([
            23.0, 45.0, 55.0, 62.0, 67.0, 71.0, 75.0, 79.0, 83.0, 88.0, 96.0,
        ]),
        ranges: &[
            (0.127, (69.0, 73.0)),
            (0.227, (67.0, 75.0)),
            (0.322, (65.0, 77.0)),
            (0.432, (62.0, 79.0)),
            (0.532, (59.0, 81.0)),
            (0.623, (56.0, 83.0)),
            (0.725, (51.0, 85.0)),
            (0.827, (46.0, 88.0)),
            (0.921, (38.0, 91.0)),
            (1.0, (23.0, 96.0)),
        ],
    },
];

/// Dataset with the given label, compared case-insensitively
#[must_use]
pub fn lookup(label: &str) -> Option<&'static GroundTruth> {
    DATASETS
        .iter()
        .find(|d| d.label.eq_ignore_ascii_case(label) || d.slug() == label)
}

/// Datasets of one domain
pub fn by_domain(domain: Domain) -> impl Iterator<Item = &'static GroundTruth> {
    DATASETS.iter().filter(move |d| d.domain == domain)
}

/// Name of a real-world prompt group
#[must_use]
pub fn prompt_name(variant: TemplateVariant, dataset: &GroundTruth, sample_count: usize) -> String {
    format!(
        "percentiles_zero_shot_{variant}_{}_{sample_count}_samples",
        dataset.slug()
    )
}

/// One prompt per dataset, template variant and ground-truth percentile
/// value, each repeated `sample_count` times.
#[must_use]
pub fn generate_real_world_percentile_prompts(sample_count: usize) -> PromptSet {
    let mut prompts = PromptSet::new();
    for dataset in &DATASETS {
        for variant in TemplateVariant::ALL {
            let Some(template) = dataset.template(variant) else {
                tracing::warn!(label = dataset.label, %variant, "No template for dataset");
                continue;
            };
            let name = prompt_name(variant, dataset, sample_count);
            for (_, value) in dataset.percentiles {
                let target = format_value(*value);
                let prompt = template.fill(&[(placeholder::TARGET_NUMBER, target.as_str())]);
                prompts.push_repeated(&name, &prompt, sample_count);
            }
        }
    }
    prompts
}
