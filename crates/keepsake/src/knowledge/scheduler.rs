//! Compression scheduler: owns the recent-message buffer and decides when a
//! delegation cycle runs.
//!
//! The buffer grows with every [`push`](CompressionScheduler::push). Once
//! `compress_every` messages have arrived since the last cycle and the
//! buffer holds more than `recent_window` messages, everything but the last
//! `recent_window` messages is handed to the external model. The split and
//! commit steps are shared with the running-summary baseline; only the
//! structured path goes through [`compress_into_store`](CompressionScheduler::compress_into_store).

use super::parser::parse_sections;
use super::prompt::{DELEGATION_SYSTEM_PROMPT, build_delegation_prompt};
use super::render::render_store;
use super::store::{KnowledgeStore, MergeStats};
use crate::api::{ModelClient, ModelRequest};
use crate::strategy::trim_leading_non_user;
use crate::{KeepsakeError, Message, Result};
use tracing::debug;

/// Configuration for the compression trigger and the delegation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    /// Messages that must arrive between two cycles.
    pub compress_every: usize,
    /// Messages kept verbatim after a cycle.
    pub recent_window: usize,
    /// Model for delegation calls (cheaper than the main model). `None`
    /// uses the client's default.
    pub model: Option<String>,
    /// Response budget for a delegation call.
    pub max_delegation_tokens: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            compress_every: 8,
            recent_window: 4,
            model: None,
            max_delegation_tokens: 2048,
        }
    }
}

impl CompressionConfig {
    pub fn with_compress_every(mut self, n: usize) -> Self {
        self.compress_every = n;
        self
    }

    pub fn with_recent_window(mut self, n: usize) -> Self {
        self.recent_window = n;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_delegation_tokens(mut self, n: u32) -> Self {
        self.max_delegation_tokens = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.compress_every == 0 {
            return Err(KeepsakeError::Config(
                "compress_every must be at least 1".into(),
            ));
        }
        if self.recent_window == 0 {
            return Err(KeepsakeError::Config(
                "recent_window must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of one successful structured compression cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionOutcome {
    /// Input plus output tokens spent on the delegation exchange.
    pub overhead_tokens: u64,
    pub stats: MergeStats,
}

/// Message buffer plus trigger bookkeeping.
#[derive(Debug, Clone)]
pub struct CompressionScheduler {
    config: CompressionConfig,
    buffer: Vec<Message>,
    since_compression: usize,
}

impl CompressionScheduler {
    pub fn new(config: CompressionConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            since_compression: 0,
        }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn push(&mut self, message: Message) {
        self.buffer.push(message);
        self.since_compression += 1;
    }

    /// Clear the buffer and the counter.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.since_compression = 0;
    }

    pub fn buffer(&self) -> &[Message] {
        &self.buffer
    }

    pub fn messages_since_compression(&self) -> usize {
        self.since_compression
    }

    pub fn should_compress(&self) -> bool {
        self.since_compression >= self.config.compress_every
            && self.buffer.len() > self.config.recent_window
    }

    /// The span a cycle would compress, or `None` if no cycle is due.
    pub fn pending_span(&self) -> Option<&[Message]> {
        if !self.should_compress() {
            return None;
        }
        let split = self.buffer.len() - self.config.recent_window;
        self.buffer.get(..split)
    }

    /// Drop the compressed span and reset the counter. Call only after the
    /// delegation result has been applied.
    pub fn commit(&mut self) {
        let split = self.buffer.len().saturating_sub(self.config.recent_window);
        self.buffer.drain(..split);
        self.since_compression = 0;
    }

    /// The buffer as it should be sent: leading non-user messages trimmed.
    pub fn context_messages(&self) -> Vec<Message> {
        trim_leading_non_user(&self.buffer).to_vec()
    }

    /// Run one structured cycle if due: delegate the pending span, parse the
    /// reply, merge it into `store` and commit.
    ///
    /// Returns `Ok(None)` when no cycle is due. On error neither the store
    /// nor the buffer is touched.
    pub async fn compress_into_store(
        &mut self,
        store: &mut KnowledgeStore,
        client: &dyn ModelClient,
    ) -> Result<Option<CompressionOutcome>> {
        let Some(span) = self.pending_span() else {
            return Ok(None);
        };

        let previously_known = render_store(store);
        let request = ModelRequest::single(
            DELEGATION_SYSTEM_PROMPT,
            build_delegation_prompt(&previously_known, span),
        )
        .with_model(self.config.model.clone())
        .with_max_tokens(self.config.max_delegation_tokens);
        let span_len = span.len();

        let reply = client.complete(&request).await?;

        let parsed = parse_sections(&reply.text);
        let stats = store.merge(&parsed);
        self.commit();

        debug!(
            compressed = span_len,
            inserted = stats.inserted,
            replaced = stats.replaced,
            corrections_added = stats.corrections_added,
            overflow = stats.overflow,
            overhead_tokens = reply.total_tokens(),
            "Compression cycle applied"
        );

        Ok(Some(CompressionOutcome {
            overhead_tokens: reply.total_tokens(),
            stats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Section;
    use crate::strategy::testing::ScriptedClient;

    fn config() -> CompressionConfig {
        CompressionConfig::default()
            .with_compress_every(4)
            .with_recent_window(2)
    }

    fn fill(scheduler: &mut CompressionScheduler, turns: usize, offset: usize) {
        for i in 0..turns {
            scheduler.push(Message::user(format!("question {}", offset + i)));
            scheduler.push(Message::assistant(format!("answer {}", offset + i)));
        }
    }

    #[test]
    fn validate_rejects_zero_counts() {
        assert!(CompressionConfig::default().validate().is_ok());
        assert!(config().with_compress_every(0).validate().is_err());
        assert!(config().with_recent_window(0).validate().is_err());
    }

    #[test]
    fn no_compression_below_trigger() {
        let mut scheduler = CompressionScheduler::new(config());
        fill(&mut scheduler, 1, 0);
        assert!(!scheduler.should_compress());
        assert!(scheduler.pending_span().is_none());
    }

    #[test]
    fn no_compression_when_buffer_fits_window() {
        let mut scheduler =
            CompressionScheduler::new(config().with_compress_every(1).with_recent_window(4));
        fill(&mut scheduler, 2, 0);
        assert_eq!(scheduler.buffer().len(), 4);
        assert!(!scheduler.should_compress());
    }

    #[test]
    fn pending_span_excludes_recent_window() {
        let mut scheduler = CompressionScheduler::new(config());
        fill(&mut scheduler, 3, 0);
        let span = scheduler.pending_span().unwrap();
        assert_eq!(span.len(), 4);
        assert_eq!(span[0].content, "question 0");
    }

    #[test]
    fn context_trims_leading_assistant_messages() {
        let mut scheduler = CompressionScheduler::new(config());
        scheduler.push(Message::assistant("orphan"));
        scheduler.push(Message::user("hello"));
        let context = scheduler.context_messages();
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].content, "hello");
    }

    #[tokio::test]
    async fn cycle_leaves_exactly_recent_window() {
        let client = ScriptedClient::new(vec![Ok("IDENTIFIERS:\n- Gate code: 1942".into())]);
        let mut scheduler = CompressionScheduler::new(config());
        let mut store = KnowledgeStore::new();
        fill(&mut scheduler, 3, 0);

        let outcome = scheduler
            .compress_into_store(&mut store, &client)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(scheduler.buffer().len(), 2);
        assert_eq!(scheduler.messages_since_compression(), 0);
        assert_eq!(outcome.overhead_tokens, 60);
        assert_eq!(outcome.stats.inserted, 1);
        assert_eq!(store.fact_count(), 1);
        assert_eq!(scheduler.buffer()[0].content, "question 2");
    }

    #[tokio::test]
    async fn not_due_returns_none_without_calling() {
        let client = ScriptedClient::new(vec![]);
        let mut scheduler = CompressionScheduler::new(config());
        let mut store = KnowledgeStore::new();
        fill(&mut scheduler, 1, 0);

        let outcome = scheduler.compress_into_store(&mut store, &client).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_call_mutates_nothing() {
        let client = ScriptedClient::new(vec![Err(KeepsakeError::Model("HTTP 500".into()))]);
        let mut scheduler = CompressionScheduler::new(config());
        let mut store = KnowledgeStore::new();
        store.add_correction("Hotel changed from the Marriott to the Hilton Garden Inn");
        fill(&mut scheduler, 3, 0);
        let before_store = store.clone();
        let before_buffer = scheduler.buffer().to_vec();

        let err = scheduler.compress_into_store(&mut store, &client).await;
        assert!(err.is_err());
        assert_eq!(store, before_store);
        assert_eq!(scheduler.buffer(), before_buffer.as_slice());
        assert_eq!(scheduler.messages_since_compression(), 6);
    }

    #[tokio::test]
    async fn repeated_correction_across_cycles_is_kept_once() {
        let first = "\
QUANTITIES:
- Budget: $45,000
CORRECTIONS:
- Budget changed from $40,000 to $45,000 after the board meeting";
        let second = "\
QUANTITIES:
- Budget: $45,000
CORRECTIONS:
- Budget changed from $40,000 to $45,000 after the board meeting
- Venue moved from Kyoto station hall to the Osaka convention center";
        let client = ScriptedClient::new(vec![Ok(first.into()), Ok(second.into())]);
        let mut scheduler = CompressionScheduler::new(config());
        let mut store = KnowledgeStore::new();

        fill(&mut scheduler, 3, 0);
        scheduler.compress_into_store(&mut store, &client).await.unwrap();
        fill(&mut scheduler, 2, 3);
        scheduler.compress_into_store(&mut store, &client).await.unwrap();

        assert_eq!(store.corrections().len(), 2);
        assert_eq!(store.keyed(Section::Quantities).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_cycle_sees_previous_store() {
        let client = ScriptedClient::new(vec![
            Ok("IDENTIFIERS:\n- Gate code: 1942".into()),
            Ok("DATES:\n- Arrival: May 3".into()),
        ]);
        let mut scheduler = CompressionScheduler::new(config());
        let mut store = KnowledgeStore::new();

        fill(&mut scheduler, 3, 0);
        scheduler.compress_into_store(&mut store, &client).await.unwrap();
        fill(&mut scheduler, 2, 3);
        scheduler.compress_into_store(&mut store, &client).await.unwrap();

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].messages[0].content.contains("(nothing yet)"));
        assert!(requests[1].messages[0].content.contains("- Gate code: 1942"));
        assert_eq!(requests[1].max_tokens, 2048);
        // Facts the second reply omitted are still in the store.
        assert_eq!(store.fact_count(), 2);
    }
}
