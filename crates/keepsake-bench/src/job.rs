//! A single (strategy × scenario) evaluation.

use crate::config::RunConfig;
use crate::record::ResultRecord;
use crate::scenario::Scenario;
use keepsake::api::{DEFAULT_MODEL, ModelClient, ModelRequest, pricing_for_model};
use keepsake::strategy::StrategyKind;
use keepsake::tokens::estimate_context_tokens;
use keepsake::{Message, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sampling temperature for evaluated turns.
const EVAL_TEMPERATURE: f32 = 0.3;

/// One job: a strategy factory plus the scenario it runs against.
#[derive(Debug, Clone)]
pub struct BenchmarkJob {
    pub strategy: StrategyKind,
    pub scenario: Arc<Scenario>,
}

impl BenchmarkJob {
    pub fn new(strategy: StrategyKind, scenario: Arc<Scenario>) -> Self {
        Self { strategy, scenario }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario.name
    }

    /// The `(strategy, scenario)` identity used for resume-by-skip.
    pub fn key(&self) -> (String, String) {
        (self.strategy_name().to_string(), self.scenario.name.clone())
    }
}

/// Play the scenario through a fresh strategy instance and measure it.
///
/// Any model failure, in a delegation cycle or an evaluated turn, fails
/// the whole job.
pub async fn execute_job(
    job: &BenchmarkJob,
    client: Arc<dyn ModelClient>,
    config: &RunConfig,
) -> Result<ResultRecord> {
    let started = Instant::now();
    let mut strategy = job.strategy.build(Arc::clone(&client));
    strategy.reset();

    let mut input_tokens = 0u64;
    let mut output_tokens = 0u64;
    let mut overhead_tokens = 0u64;
    let mut peak_context_tokens = 0usize;
    let mut probes_total = 0usize;
    let mut probes_passed = 0usize;
    let mut score_sum = 0.0f64;

    for (index, turn) in job.scenario.turns.iter().enumerate() {
        strategy.add_message(Message::user(turn.user.clone()));
        let context = strategy.get_context().await?;
        overhead_tokens += context.overhead_tokens;

        let system = match context.system_context {
            Some(ref extra) => format!("{}\n\n{extra}", config.system_prompt),
            None => config.system_prompt.clone(),
        };
        peak_context_tokens =
            peak_context_tokens.max(estimate_context_tokens(Some(&system), &context.messages));

        let request = ModelRequest {
            model: config.model.clone(),
            system: Some(system),
            messages: context.messages,
            max_tokens: config.max_tokens,
            temperature: EVAL_TEMPERATURE,
        };
        let reply = client.complete(&request).await?;
        input_tokens += reply.input_tokens;
        output_tokens += reply.output_tokens;

        if let Some(ref probe) = turn.probe {
            let score = probe.score(&reply.text);
            probes_total += 1;
            score_sum += score;
            if probe.passed(&reply.text) {
                probes_passed += 1;
            }
            debug!(
                "[{} × {}] turn {index}: probe score {score:.2}",
                job.strategy_name(),
                job.scenario_name()
            );
        }

        strategy.add_message(Message::assistant(reply.text));
    }

    let retention_score = if probes_total == 0 {
        1.0
    } else {
        score_sum / probes_total as f64
    };
    let pricing = pricing_for_model(config.model.as_deref().unwrap_or(DEFAULT_MODEL));
    // Delegation overhead is priced as input.
    let estimated_cost_usd = pricing.estimate_cost(input_tokens + overhead_tokens, output_tokens);

    Ok(ResultRecord {
        strategy: job.strategy_name().to_string(),
        scenario: job.scenario.name.clone(),
        turns: job.scenario.turns.len(),
        probes_total,
        probes_passed,
        retention_score,
        input_tokens,
        output_tokens,
        overhead_tokens,
        compression_cycles: strategy.compression_cycles(),
        peak_context_tokens,
        estimated_cost_usd,
        duration_ms: started.elapsed().as_millis() as u64,
        completed_at: chrono::Utc::now().to_rfc3339(),
    })
}
