//! Prompt templates.
//!
//! Template text lives under `templates/` and is embedded at compile time.
//! Placeholders are written `{name}` and filled by [`Template::fill`].

/// Placeholder names understood by the templates
pub mod placeholder {
    pub const FEW_SHOT_EXAMPLES: &str = "few_shot_examples";
    pub const DISTRIBUTION_DESCRIPTION: &str = "distribution_description";
    pub const TARGET_NUMBER: &str = "target_number";
    pub const LOWER_TARGET_NUMBER: &str = "lower_target_number";
    pub const UPPER_TARGET_NUMBER: &str = "upper_target_number";
    pub const OUTCOME_NUM: &str = "outcome_num";
}

/// A named prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    name: &'static str,
    text: &'static str,
}

impl Template {
    #[must_use]
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn text(&self) -> &'static str {
        self.text
    }

    /// Placeholder names in order of appearance, duplicates included
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.text;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else { break };
            names.push(&after[..end]);
            rest = &after[end + 1..];
        }
        names
    }

    /// Substitute `{key}` with its value in a single pass.
    ///
    /// Unknown placeholders are left as written, and substituted values are
    /// never scanned again, so a description containing braces is safe.
    #[must_use]
    pub fn fill(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len() + 256);
        let mut rest = self.text;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let replacement = after.find('}').and_then(|end| {
                let key = &after[..end];
                values
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| (*value, end))
            });
            match replacement {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

macro_rules! embed {
    ($dir:literal / $name:literal) => {
        Template::new(
            $name,
            include_str!(concat!("../templates/", $dir, "/", $name, ".txt")),
        )
    };
}

pub const PERCENTILE: Template = embed!("idealized" / "percentile");
pub const MULTINOMIAL_PERCENTILE: Template = embed!("idealized" / "multinomial_percentile");
pub const NEAREST_SHOT_PERCENTILE: Template = embed!("idealized" / "nearest_shot_percentile");
pub const NEAREST_SHOT_MULTINOMIAL_PERCENTILE: Template =
    embed!("idealized" / "nearest_shot_multinomial_percentile");
pub const SAMPLE: Template = embed!("idealized" / "sample");
pub const MULTINOMIAL_SAMPLE: Template = embed!("idealized" / "multinomial_sample");
pub const PROBABILITY: Template = embed!("idealized" / "probability");
pub const MULTINOMIAL_PROBABILITY: Template = embed!("idealized" / "multinomial_probability");

/// Real-world narrative percentile templates, one per labelled dataset
pub const REAL_WORLD: [Template; 12] = [
    embed!("real_world" / "average_step_count"),
    embed!("real_world" / "average_resting_heart_rate"),
    embed!("real_world" / "average_sleep_minutes"),
    embed!("real_world" / "average_azm_count"),
    embed!("real_world" / "monthly_gross_rent"),
    embed!("real_world" / "annual_electricity_cost"),
    embed!("real_world" / "annual_water_cost"),
    embed!("real_world" / "annual_household_income"),
    embed!("real_world" / "average_temperature"),
    embed!("real_world" / "annual_precipitation"),
    embed!("real_world" / "average_wind_speed"),
    embed!("real_world" / "average_relative_humidity"),
];

/// The same datasets described as plain distributions
pub const REAL_WORLD_IDEALIZED: [Template; 12] = [
    embed!("real_world_idealized" / "average_step_count"),
    embed!("real_world_idealized" / "average_resting_heart_rate"),
    embed!("real_world_idealized" / "average_sleep_minutes"),
    embed!("real_world_idealized" / "average_azm_count"),
    embed!("real_world_idealized" / "monthly_gross_rent"),
    embed!("real_world_idealized" / "annual_electricity_cost"),
    embed!("real_world_idealized" / "annual_water_cost"),
    embed!("real_world_idealized" / "annual_household_income"),
    embed!("real_world_idealized" / "average_temperature"),
    embed!("real_world_idealized" / "annual_precipitation"),
    embed!("real_world_idealized" / "average_wind_speed"),
    embed!("real_world_idealized" / "average_relative_humidity"),
];

/// Template named `name` within `set`
#[must_use]
pub fn find(set: &'static [Template], name: &str) -> Option<&'static Template> {
    set.iter().find(|t| t.name == name)
}

/// Percentile question template
#[must_use]
pub const fn percentile(multinomial: bool, nearest_shot: bool) -> &'static Template {
    match (multinomial, nearest_shot) {
        (false, false) => &PERCENTILE,
        (true, false) => &MULTINOMIAL_PERCENTILE,
        (false, true) => &NEAREST_SHOT_PERCENTILE,
        (true, true) => &NEAREST_SHOT_MULTINOMIAL_PERCENTILE,
    }
}

/// Sampling question template
#[must_use]
pub const fn sample(multinomial: bool) -> &'static Template {
    if multinomial {
        &MULTINOMIAL_SAMPLE
    } else {
        &SAMPLE
    }
}

/// Probability question template
#[must_use]
pub const fn probability(multinomial: bool) -> &'static Template {
    if multinomial {
        &MULTINOMIAL_PROBABILITY
    } else {
        &PROBABILITY
    }
}

#[cfg(test)]
mod tests {
    use super::placeholder::*;
    use super::*;

    #[test]
    fn test_fill_replaces_known_placeholders() {
        let t = Template::new("t", "A {x} and {y}, {x} again");
        assert_eq!(t.fill(&[("x", "1"), ("y", "2")]), "A 1 and 2, 1 again");
    }

    #[test]
    fn test_fill_leaves_unknown_and_unbalanced() {
        let t = Template::new("t", "{known} {unknown} {open");
        assert_eq!(t.fill(&[("known", "k")]), "k {unknown} {open");
    }

    #[test]
    fn test_fill_does_not_rescan_values() {
        let t = Template::new("t", "{a}{b}");
        assert_eq!(t.fill(&[("a", "{b}"), ("b", "x")]), "{b}x");
    }

    #[test]
    fn test_idealized_placeholders() {
        for multinomial in [false, true] {
            for nearest in [false, true] {
                let names = percentile(multinomial, nearest).placeholders();
                assert!(names.contains(&FEW_SHOT_EXAMPLES));
                assert!(names.contains(&DISTRIBUTION_DESCRIPTION));
                assert!(names.contains(&TARGET_NUMBER));
                assert_eq!(names.contains(&OUTCOME_NUM), multinomial);
            }
            let names = probability(multinomial).placeholders();
            assert!(names.contains(&LOWER_TARGET_NUMBER));
            assert!(names.contains(&UPPER_TARGET_NUMBER));
            assert_eq!(sample(multinomial).placeholders().contains(&OUTCOME_NUM), multinomial);
        }
    }

    #[test]
    fn test_real_world_templates_take_only_target() {
        for template in REAL_WORLD.iter().chain(REAL_WORLD_IDEALIZED.iter()) {
            assert_eq!(template.placeholders(), vec![TARGET_NUMBER], "{}", template.name());
        }
        assert!(find(&REAL_WORLD, "average_step_count").is_some());
        assert!(find(&REAL_WORLD_IDEALIZED, "nonexistent").is_none());
    }

    #[test]
    fn test_percentile_template_fill() {
        let text = PERCENTILE.fill(&[
            (FEW_SHOT_EXAMPLES, ""),
            (DISTRIBUTION_DESCRIPTION, "Distribution Type: Normal Distribution"),
            (TARGET_NUMBER, "100.0"),
        ]);
        assert!(text.contains("What is the percentile of the value 100.0 within"));
        assert!(!text.contains('{'));
    }
}
