//! Model client trait and the OpenRouter chat-completions backend.

use crate::{KeepsakeError, Message, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for all LLM calls.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Default response budget when a request does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Boxed future returned by [`ModelClient::complete`].
pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelReply>> + Send + 'a>>;

/// A single request to the external model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model override. `None` uses the client's default model.
    pub model: Option<String>,
    /// System instruction, sent ahead of the conversation.
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelRequest {
    /// A one-shot request: one system instruction and one user prompt.
    pub fn single(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system: Some(system.into()),
            messages: vec![Message::user(prompt)],
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.3,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text plus token accounting returned by the external model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelReply {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// An opaque, possibly slow, possibly failing language-model endpoint.
///
/// The engine holds clients as `Arc<dyn ModelClient>`, so the trait stays
/// dyn-compatible by returning a boxed future. Implementations own their
/// retry/backoff policy; callers never retry.
pub trait ModelClient: Send + Sync {
    /// Send a request and wait for the full reply.
    fn complete<'a>(&'a self, request: &'a ModelRequest) -> ModelFuture<'a>;

    /// Convenience for the `call(prompt, system)` shape used by delegation.
    fn call<'a>(&'a self, prompt: &'a str, system: &'a str) -> ModelFuture<'a> {
        Box::pin(async move {
            let request = ModelRequest::single(system, prompt);
            self.complete(&request).await
        })
    }
}

// ── OpenRouter wire types ──────────────────────────────────────────

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct UsageInfo {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    default_model: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default model.
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("keepsake/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| KeepsakeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            default_model: default_model.into(),
            referer: "https://github.com/keepsake-rs/keepsake".into(),
            title: "keepsake".into(),
        })
    }

    /// Read the API key from `OPENROUTER_KEY`.
    pub fn from_env(default_model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_KEY")
            .map_err(|_| KeepsakeError::Config("OPENROUTER_KEY is not set".into()))?;
        Self::new(api_key, default_model)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn send(&self, request: &ModelRequest) -> Result<ModelReply> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        for msg in &request.messages {
            let role = match msg.role {
                crate::Role::User => "user",
                crate::Role::Assistant => "assistant",
            };
            messages.push(ChatMessage {
                role,
                content: &msg.content,
            });
        }
        let body = ChatRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "LLM request: model={}, messages={}, max_tokens={}",
            model,
            body.messages.len(),
            body.max_tokens
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| KeepsakeError::Model(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| KeepsakeError::Model(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(KeepsakeError::Model(format!(
                "OpenRouter API HTTP {status}: {text}"
            )));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)
            .map_err(|e| KeepsakeError::Model(format!("failed to parse response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(KeepsakeError::Model(format!(
                "OpenRouter API error: {}",
                err.message
            )));
        }

        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| KeepsakeError::Model("empty LLM response (no choices)".into()))?;

        Ok(ModelReply {
            text: choice.message.content.unwrap_or_default(),
            input_tokens: usage.prompt_tokens.unwrap_or(0),
            output_tokens: usage.completion_tokens.unwrap_or(0),
        })
    }
}

impl ModelClient for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a ModelRequest) -> ModelFuture<'a> {
        Box::pin(self.send(request))
    }
}
