//! Baseline that sends the whole conversation every turn.

use super::{ContextFuture, MemoryStrategy, StrategyContext, trim_leading_non_user};
use crate::Message;

#[derive(Debug, Default)]
pub struct FullContext {
    messages: Vec<Message>,
}

impl FullContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStrategy for FullContext {
    fn name(&self) -> &str {
        "full-context"
    }

    fn reset(&mut self) {
        self.messages.clear();
    }

    fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn get_context(&mut self) -> ContextFuture<'_> {
        let messages = trim_leading_non_user(&self.messages).to_vec();
        Box::pin(async move { Ok(StrategyContext::plain(messages)) })
    }
}
