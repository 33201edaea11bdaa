//! The structured compression engine as a [`MemoryStrategy`].
//!
//! Owns one [`CompressionScheduler`] and one [`KnowledgeStore`]. Each
//! `get_context` call may run a delegation cycle; the stores are then
//! rendered into the system context ahead of the recent window. The stores
//! are the only state that outlives a cycle and are cleared only by
//! [`reset`](MemoryStrategy::reset).

use super::{ContextFuture, MemoryStrategy, StrategyContext};
use crate::Message;
use crate::api::ModelClient;
use crate::knowledge::{CompressionConfig, CompressionScheduler, KnowledgeStore, render_store};
use std::sync::Arc;

/// Heading placed before the rendered stores in the system context.
pub const KNOWN_FACTS_PREAMBLE: &str = "KNOWN FACTS FROM EARLIER IN THIS CONVERSATION:\n\n";

pub struct StructuredMemory {
    client: Arc<dyn ModelClient>,
    scheduler: CompressionScheduler,
    store: KnowledgeStore,
    cycles: u32,
}

impl StructuredMemory {
    pub fn new(client: Arc<dyn ModelClient>, config: CompressionConfig) -> Self {
        Self {
            client,
            scheduler: CompressionScheduler::new(config),
            store: KnowledgeStore::new(),
            cycles: 0,
        }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn buffer(&self) -> &[Message] {
        self.scheduler.buffer()
    }
}

impl MemoryStrategy for StructuredMemory {
    fn name(&self) -> &str {
        "structured"
    }

    fn reset(&mut self) {
        self.scheduler.reset();
        self.store.clear();
        self.cycles = 0;
    }

    fn add_message(&mut self, message: Message) {
        self.scheduler.push(message);
    }

    fn get_context(&mut self) -> ContextFuture<'_> {
        Box::pin(async move {
            let outcome = self
                .scheduler
                .compress_into_store(&mut self.store, self.client.as_ref())
                .await?;
            if outcome.is_some() {
                self.cycles += 1;
            }

            let rendered = render_store(&self.store);
            Ok(StrategyContext {
                messages: self.scheduler.context_messages(),
                system_context: (!rendered.is_empty())
                    .then(|| format!("{KNOWN_FACTS_PREAMBLE}{rendered}")),
                overhead_tokens: outcome.map_or(0, |o| o.overhead_tokens),
            })
        })
    }

    fn compression_cycles(&self) -> u32 {
        self.cycles
    }
}
