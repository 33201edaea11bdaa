//! Convenience re-exports for common `keepsake` types.
//!
//! ```ignore
//! use keepsake::prelude::*;
//! ```
//!
//! Covers the message types, the model client boundary, the strategies and
//! their configuration. Parser and store internals stay in
//! [`knowledge`](crate::knowledge).

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{KeepsakeError, Message, Result, Role};

// ── Model boundary ──────────────────────────────────────────────────
pub use crate::api::{
    ModelClient, ModelReply, ModelRequest, OpenRouterClient, RetryConfig, RetryingClient,
};

// ── Strategies ──────────────────────────────────────────────────────
pub use crate::knowledge::{CompressionConfig, KnowledgeStore};
pub use crate::strategy::{
    FullContext, MemoryStrategy, RunningSummary, SlidingWindow, StrategyContext, StrategyKind,
    StructuredMemory,
};
