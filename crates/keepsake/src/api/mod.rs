//! The external-model boundary: client trait, HTTP backend, retry, and pricing.
//!
//! Everything that talks to a language model goes through [`ModelClient`].
//! The compression engine never knows which backend it is using, which lets
//! tests inject scripted fakes and lets several model configurations coexist.
//!
//! - [`client`]: [`ModelClient`], request/reply types, and the
//!   [`OpenRouterClient`] backend.
//! - [`retry`]: transient error detection and exponential backoff, wrapped
//!   around any client by [`RetryingClient`].
//! - [`pricing`]: approximate per-model prices for cost estimates.

pub mod client;
pub mod pricing;
pub mod retry;

pub use client::{
    DEFAULT_MODEL, ModelClient, ModelFuture, ModelReply, ModelRequest, OpenRouterClient,
};
pub use pricing::{ModelPricing, pricing_for_model};
pub use retry::{RetryConfig, RetryingClient};
