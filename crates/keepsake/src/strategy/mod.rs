//! Memory strategies: what a conversation looks like to the model each turn.
//!
//! Every strategy implements [`MemoryStrategy`]. Callers feed messages in
//! with `add_message` and ask for the next turn's context with
//! `get_context`, which is the only place a strategy does real work.
//!
//! | Strategy | Context handed to the model |
//! |----------|-----------------------------|
//! | [`FullContext`] | Every message so far |
//! | [`SlidingWindow`] | The last `window` messages |
//! | [`RunningSummary`] | A rewritten prose summary plus the recent window |
//! | [`StructuredMemory`] | Rendered knowledge stores plus the recent window |

mod full;
mod structured;
mod summary;
mod window;

pub use full::FullContext;
pub use structured::{KNOWN_FACTS_PREAMBLE, StructuredMemory};
pub use summary::RunningSummary;
pub use window::SlidingWindow;

use crate::api::ModelClient;
use crate::knowledge::CompressionConfig;
use crate::{KeepsakeError, Message, Result, Role};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Default window for the sliding-window baseline.
pub const DEFAULT_WINDOW: usize = 8;

/// The context a strategy hands to the model for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyContext {
    pub messages: Vec<Message>,
    /// Extra system text (summary or rendered stores), if any.
    pub system_context: Option<String>,
    /// Tokens spent producing this context (delegation calls).
    pub overhead_tokens: u64,
}

impl StrategyContext {
    pub fn plain(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// Boxed future returned by [`MemoryStrategy::get_context`].
pub type ContextFuture<'a> = Pin<Box<dyn Future<Output = Result<StrategyContext>> + Send + 'a>>;

/// A per-conversation memory strategy.
///
/// `get_context` takes `&mut self`, so a strategy never runs two
/// compressions at once.
pub trait MemoryStrategy: Send {
    fn name(&self) -> &str;

    /// Forget everything, including any stores. Called between conversations.
    fn reset(&mut self);

    fn add_message(&mut self, message: Message);

    fn get_context(&mut self) -> ContextFuture<'_>;

    /// Number of compression cycles run since the last reset.
    fn compression_cycles(&self) -> u32 {
        0
    }
}

/// Drop assistant messages from the front so the context opens on a user
/// turn, as chat APIs expect.
pub fn trim_leading_non_user(messages: &[Message]) -> &[Message] {
    let start = messages
        .iter()
        .position(|m| m.role == Role::User)
        .unwrap_or(messages.len());
    messages.get(start..).unwrap_or_default()
}

/// Factory for strategy instances. Each job builds a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    FullContext,
    SlidingWindow { window: usize },
    RunningSummary(CompressionConfig),
    Structured(CompressionConfig),
}

impl StrategyKind {
    /// Names accepted by [`StrategyKind::parse`].
    pub const NAMES: [&'static str; 4] = [
        "full-context",
        "sliding-window",
        "running-summary",
        "structured",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::FullContext => "full-context",
            StrategyKind::SlidingWindow { .. } => "sliding-window",
            StrategyKind::RunningSummary(_) => "running-summary",
            StrategyKind::Structured(_) => "structured",
        }
    }

    /// Resolve a strategy name, applying `config` to the compressing
    /// strategies and `window` to the sliding window.
    pub fn parse(name: &str, config: &CompressionConfig, window: usize) -> Result<Self> {
        let kind = match name.trim().to_lowercase().as_str() {
            "full-context" | "full" => StrategyKind::FullContext,
            "sliding-window" | "window" => StrategyKind::SlidingWindow { window },
            "running-summary" | "summary" => StrategyKind::RunningSummary(config.clone()),
            "structured" => StrategyKind::Structured(config.clone()),
            other => {
                return Err(KeepsakeError::Config(format!(
                    "unknown strategy '{other}' (expected one of: {})",
                    Self::NAMES.join(", ")
                )));
            }
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Every strategy with shared settings.
    pub fn all(config: &CompressionConfig, window: usize) -> Vec<Self> {
        vec![
            StrategyKind::FullContext,
            StrategyKind::SlidingWindow { window },
            StrategyKind::RunningSummary(config.clone()),
            StrategyKind::Structured(config.clone()),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyKind::FullContext => Ok(()),
            StrategyKind::SlidingWindow { window } => {
                if *window == 0 {
                    return Err(KeepsakeError::Config("window must be at least 1".into()));
                }
                Ok(())
            }
            StrategyKind::RunningSummary(config) | StrategyKind::Structured(config) => {
                config.validate()
            }
        }
    }

    pub fn build(&self, client: Arc<dyn ModelClient>) -> Box<dyn MemoryStrategy> {
        match self {
            StrategyKind::FullContext => Box::new(FullContext::new()),
            StrategyKind::SlidingWindow { window } => Box::new(SlidingWindow::new(*window)),
            StrategyKind::RunningSummary(config) => {
                Box::new(RunningSummary::new(client, config.clone()))
            }
            StrategyKind::Structured(config) => {
                Box::new(StructuredMemory::new(client, config.clone()))
            }
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_leading_non_user_skips_assistant_prefix() {
        let messages = vec![
            Message::assistant("a"),
            Message::assistant("b"),
            Message::user("c"),
            Message::assistant("d"),
        ];
        let trimmed = trim_leading_non_user(&messages);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].content, "c");

        let only_assistant = vec![Message::assistant("x")];
        assert!(trim_leading_non_user(&only_assistant).is_empty());
    }

    #[test]
    fn parse_known_names() {
        let config = CompressionConfig::default();
        for name in StrategyKind::NAMES {
            let kind = StrategyKind::parse(name, &config, 6).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert_eq!(
            StrategyKind::parse("Window", &config, 6).unwrap(),
            StrategyKind::SlidingWindow { window: 6 }
        );
    }

    #[test]
    fn parse_rejects_unknown_and_invalid() {
        let config = CompressionConfig::default();
        assert!(matches!(
            StrategyKind::parse("vector-rag", &config, 6),
            Err(KeepsakeError::Config(_))
        ));
        assert!(StrategyKind::parse("sliding-window", &config, 0).is_err());
        let bad = CompressionConfig::default().with_recent_window(0);
        assert!(StrategyKind::parse("structured", &bad, 6).is_err());
    }

    #[test]
    fn build_matches_kind_name() {
        let client: Arc<dyn ModelClient> = Arc::new(testing::ScriptedClient::new(vec![]));
        for kind in StrategyKind::all(&CompressionConfig::default(), 4) {
            assert_eq!(kind.build(client.clone()).name(), kind.name());
        }
    }
}
