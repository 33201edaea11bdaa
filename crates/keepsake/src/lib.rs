//! Incremental structured-knowledge compression for long LLM conversations.
//!
//! `keepsake` keeps a bounded, information-preserving representation of an
//! unboundedly long conversation. The core abstraction is the
//! [`MemoryStrategy`](strategy::MemoryStrategy) contract: callers feed it
//! messages with `add_message` and ask it for the context of the next turn
//! with `get_context`. The flagship implementation,
//! [`StructuredMemory`](strategy::StructuredMemory), periodically delegates
//! old messages to an external model, parses the model's sectioned output
//! into typed stores and merges those stores so that facts survive
//! arbitrarily many compression cycles.
//!
//! # Getting started
//!
//! ```ignore
//! use keepsake::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> keepsake::Result<()> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap();
//!     let client: Arc<dyn ModelClient> =
//!         Arc::new(OpenRouterClient::new(api_key, "anthropic/claude-sonnet-4")?);
//!
//!     let mut memory = StructuredMemory::new(client, CompressionConfig::default());
//!     memory.add_message(Message::user("My booking code is ZX-4471."));
//!     memory.add_message(Message::assistant("Noted."));
//!
//!     let context = memory.get_context().await?;
//!     println!("{:?}", context.system_context);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Talk to a model:** the [`ModelClient`](api::ModelClient) trait is the
//!   only boundary to the outside world. [`OpenRouterClient`](api::OpenRouterClient)
//!   is the HTTP backend and [`RetryingClient`](api::RetryingClient) adds
//!   backoff for transient failures.
//!
//! - **Parse and merge model output:** see [`knowledge::parser`] for the
//!   section grammar, [`knowledge::store`] for the merge rules, and
//!   [`knowledge::render`] for the deterministic serializer.
//!
//! - **Decide when to compress:** [`CompressionScheduler`](knowledge::CompressionScheduler)
//!   owns the message buffer and the trigger logic.
//!
//! - **Compare strategies:** [`strategy`] contains the structured engine
//!   plus the full-context, sliding-window and running-summary baselines,
//!   all constructed through [`StrategyKind`](strategy::StrategyKind).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Model client trait, OpenRouter backend, retry, pricing |
//! | [`knowledge`] | Section parser, knowledge store and merger, serializer, scheduler |
//! | [`strategy`] | `MemoryStrategy` trait and its implementations |
//! | [`tokens`] | Character-based token estimation |

pub mod api;
pub mod error;
pub mod knowledge;
pub mod prelude;
pub mod strategy;
pub mod tokens;

use serde::{Deserialize, Serialize};

pub use error::{KeepsakeError, Result};

// ── Message types ──────────────────────────────────────────────────

/// Role of a conversation message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation. Immutable once created.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Flatten messages into a `[role]: content` transcript.
pub fn format_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        out.push_str(&format!("[{}]: {}\n\n", msg.role, msg.content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hello");

        let assistant = Message::assistant("hi there");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_value(Message::assistant("x")).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn transcript_preserves_order_and_roles() {
        let transcript =
            format_transcript(&[Message::user("first"), Message::assistant("second")]);
        let user_pos = transcript.find("[user]: first").unwrap();
        let assistant_pos = transcript.find("[assistant]: second").unwrap();
        assert!(user_pos < assistant_pos);
    }
}
