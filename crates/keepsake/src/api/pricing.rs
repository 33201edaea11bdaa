//! Approximate per-model pricing for benchmark cost estimates.
//!
//! Figures are rough list prices. They exist to compare strategies against
//! each other, not for billing.

/// Per-model pricing (USD per 1M tokens).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Estimate cost for given token counts.
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self::new(3.0, 15.0)
    }
}

/// Ordered `(name fragment, pricing)` table. First match wins, so more
/// specific fragments come first.
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("opus", ModelPricing::new(15.0, 75.0)),
    ("sonnet", ModelPricing::new(3.0, 15.0)),
    ("haiku", ModelPricing::new(0.80, 4.0)),
    ("4o-mini", ModelPricing::new(0.15, 0.60)),
    ("gpt-4o", ModelPricing::new(2.50, 10.0)),
    ("gpt-4", ModelPricing::new(2.50, 10.0)),
    ("flash", ModelPricing::new(0.10, 0.40)),
    ("gemini", ModelPricing::new(1.25, 5.0)),
    ("deepseek", ModelPricing::new(0.27, 1.10)),
];

/// Lookup approximate pricing for a model by name.
///
/// Matches on the segment after the last `/` so that org prefixes like
/// `"my-org/custom-sonnet-finetune"` don't produce false positives.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(fragment, _)| name.contains(fragment))
        .map(|(_, pricing)| *pricing)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_estimation() {
        let pricing = ModelPricing::new(3.0, 15.0);
        let cost = pricing.estimate_cost(1_000_000, 100_000);
        assert!((cost - 4.5).abs() < 0.01);
    }

    #[test]
    fn pricing_lookup_known_models() {
        let opus = pricing_for_model("anthropic/claude-opus-4");
        assert!(opus.input_per_million > 10.0);

        let haiku = pricing_for_model("anthropic/claude-3.5-haiku");
        assert!(haiku.input_per_million < 1.0);

        let mini = pricing_for_model("openai/gpt-4o-mini");
        assert!(mini.input_per_million < 1.0);

        let unknown = pricing_for_model("some-unknown-model");
        assert_eq!(unknown, ModelPricing::default());
    }

    #[test]
    fn org_prefix_is_ignored() {
        let p = pricing_for_model("opus-labs/tiny-model");
        assert_eq!(p, ModelPricing::default());
    }
}
