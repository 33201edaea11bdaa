//! One completed job's metrics, as persisted in the result log.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub strategy: String,
    pub scenario: String,
    pub turns: usize,
    pub probes_total: usize,
    pub probes_passed: usize,
    /// Mean probe score in `[0, 1]`; `1.0` for a scenario without probes.
    pub retention_score: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Tokens spent on delegation calls, not included in the counts above.
    pub overhead_tokens: u64,
    pub compression_cycles: u32,
    /// Largest estimated context sent on any turn.
    pub peak_context_tokens: usize,
    pub estimated_cost_usd: f64,
    pub duration_ms: u64,
    /// RFC 3339 completion time.
    pub completed_at: String,
}

impl ResultRecord {
    /// The `(strategy, scenario)` identity used for resume-by-skip.
    pub fn key(&self) -> (String, String) {
        (self.strategy.clone(), self.scenario.clone())
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.overhead_tokens
    }
}
