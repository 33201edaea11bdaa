//! Benchmark run configuration with sensible defaults.
//!
//! [`RunConfig`] captures what a run needs beyond the strategies and
//! scenarios themselves: where results go, how many jobs run at once,
//! which subset to run and how the evaluated model is called.

use keepsake::{KeepsakeError, Result};
use std::path::PathBuf;

/// System prompt for the evaluated assistant. Strategy context is appended.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant in a long conversation. Answer the user's latest message. \
When asked about something mentioned earlier, quote names, numbers, codes and dates exactly.";

/// Configuration for one benchmark run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Result log path. Default: `"results.json"`.
    pub output: PathBuf,
    /// Maximum jobs in flight. Default: `4`.
    pub concurrency: usize,
    /// Run jobs one after another instead of through the limiter.
    pub sequential: bool,
    /// Strategy names to run. Empty runs all.
    pub strategy_filter: Vec<String>,
    /// Scenario name substring to run. `None` runs all.
    pub scenario_filter: Option<String>,
    /// Keep only the first `n` scenarios after filtering.
    pub sample: Option<usize>,
    /// Model override for the evaluated turns. `None` uses the client default.
    pub model: Option<String>,
    /// Maximum tokens per assistant reply. Default: `1024`.
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("results.json"),
            concurrency: 4,
            sequential: false,
            strategy_filter: Vec::new(),
            scenario_filter: None,
            sample: None,
            model: None,
            max_tokens: 1024,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl RunConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn with_strategy_filter(mut self, names: Vec<String>) -> Self {
        self.strategy_filter = names;
        self
    }

    pub fn with_scenario_filter(mut self, filter: Option<String>) -> Self {
        self.scenario_filter = filter;
        self
    }

    pub fn with_sample(mut self, sample: Option<usize>) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Reject settings that would fail later, before any job starts.
    pub fn validate(&self) -> Result<()> {
        if !self.sequential && self.concurrency == 0 {
            return Err(KeepsakeError::Config(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.sample == Some(0) {
            return Err(KeepsakeError::Config("sample must be at least 1".into()));
        }
        if self.max_tokens == 0 {
            return Err(KeepsakeError::Config("max_tokens must be at least 1".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(KeepsakeError::Config("output path is empty".into()));
        }
        Ok(())
    }

    /// Whether `strategy` passes the strategy filter.
    pub fn wants_strategy(&self, strategy: &str) -> bool {
        self.strategy_filter.is_empty()
            || self
                .strategy_filter
                .iter()
                .any(|name| name.eq_ignore_ascii_case(strategy))
    }

    /// Whether `scenario` passes the scenario filter.
    pub fn wants_scenario(&self, scenario: &str) -> bool {
        self.scenario_filter
            .as_deref()
            .is_none_or(|filter| scenario.to_lowercase().contains(&filter.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = RunConfig::default();
        assert_eq!(config.concurrency, 4);
        assert!(!config.sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_rejected_unless_sequential() {
        assert!(RunConfig::default().with_concurrency(0).validate().is_err());
        assert!(
            RunConfig::default()
                .with_concurrency(0)
                .with_sequential(true)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn zero_sample_rejected() {
        assert!(RunConfig::default().with_sample(Some(0)).validate().is_err());
        assert!(RunConfig::default().with_sample(Some(2)).validate().is_ok());
    }

    #[test]
    fn filters() {
        let config = RunConfig::default()
            .with_strategy_filter(vec!["Structured".into()])
            .with_scenario_filter(Some("travel".into()));
        assert!(config.wants_strategy("structured"));
        assert!(!config.wants_strategy("sliding-window"));
        assert!(config.wants_scenario("Travel-Kyoto"));
        assert!(!config.wants_scenario("wedding-budget"));

        let open = RunConfig::default();
        assert!(open.wants_strategy("anything"));
        assert!(open.wants_scenario("anything"));
    }
}
