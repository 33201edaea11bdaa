//! Running-summary baseline.
//!
//! Same trigger and split as the structured engine, but the delegated span
//! is folded into a single prose summary that replaces the previous one
//! every cycle. Facts the model leaves out of a rewrite are lost, which is
//! exactly what the structured stores are meant to prevent.

use super::{ContextFuture, MemoryStrategy, StrategyContext};
use crate::api::{ModelClient, ModelRequest};
use crate::knowledge::{CompressionConfig, CompressionScheduler};
use crate::{Message, format_transcript};
use std::sync::Arc;
use tracing::debug;

/// Instructs the model to produce a standalone summary suitable for
/// injecting into the conversation as context.
const SUMMARIZATION_PROMPT: &str = "\
Summarize the following conversation messages concisely. Focus on:
- Names, numbers, codes, dates and amounts mentioned
- Decisions made and facts that changed
- What the user is trying to accomplish and what remains open

Rules:
- Only include facts explicitly stated in the messages. Do not infer or extrapolate.
- Preserve identifiers and figures verbatim.
- If there is an existing summary, merge the new information into it to produce a single \
  cohesive summary. Do not simply append. The result must be a standalone summary that \
  replaces the existing one entirely.";

const SUMMARY_PREAMBLE: &str = "SUMMARY OF EARLIER CONVERSATION:\n\n";

pub struct RunningSummary {
    client: Arc<dyn ModelClient>,
    scheduler: CompressionScheduler,
    summary: Option<String>,
    cycles: u32,
}

impl RunningSummary {
    pub fn new(client: Arc<dyn ModelClient>, config: CompressionConfig) -> Self {
        Self {
            client,
            scheduler: CompressionScheduler::new(config),
            summary: None,
            cycles: 0,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    fn build_request(&self, span: &[Message]) -> ModelRequest {
        let mut content = String::new();
        if let Some(ref existing) = self.summary {
            content.push_str("=== EXISTING SUMMARY ===\n");
            content.push_str(existing);
            content.push_str("\n\n=== NEW MESSAGES TO SUMMARIZE ===\n");
        }
        content.push_str(&format_transcript(span));

        let config = self.scheduler.config();
        ModelRequest::single(SUMMARIZATION_PROMPT, content)
            .with_model(config.model.clone())
            .with_max_tokens(config.max_delegation_tokens)
    }
}

impl MemoryStrategy for RunningSummary {
    fn name(&self) -> &str {
        "running-summary"
    }

    fn reset(&mut self) {
        self.scheduler.reset();
        self.summary = None;
        self.cycles = 0;
    }

    fn add_message(&mut self, message: Message) {
        self.scheduler.push(message);
    }

    fn get_context(&mut self) -> ContextFuture<'_> {
        Box::pin(async move {
            let mut overhead_tokens = 0;

            if let Some(span) = self.scheduler.pending_span() {
                let request = self.build_request(span);
                let reply = self.client.complete(&request).await?;
                overhead_tokens = reply.total_tokens();

                self.summary = Some(reply.text.trim().to_string());
                self.scheduler.commit();
                self.cycles += 1;
                debug!(
                    cycle = self.cycles,
                    overhead_tokens, "Running summary rewritten"
                );
            }

            Ok(StrategyContext {
                messages: self.scheduler.context_messages(),
                system_context: self
                    .summary
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{SUMMARY_PREAMBLE}{s}")),
                overhead_tokens,
            })
        })
    }

    fn compression_cycles(&self) -> u32 {
        self.cycles
    }
}
