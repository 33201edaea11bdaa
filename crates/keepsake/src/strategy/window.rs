//! Sliding window: keep the most recent `window` messages, drop the rest.
//!
//! Cheapest baseline. Anything older than the window is gone for good.

use super::{ContextFuture, MemoryStrategy, StrategyContext, trim_leading_non_user};
use crate::Message;

#[derive(Debug)]
pub struct SlidingWindow {
    window: usize,
    messages: Vec<Message>,
}

impl SlidingWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            messages: Vec::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl MemoryStrategy for SlidingWindow {
    fn name(&self) -> &str {
        "sliding-window"
    }

    fn reset(&mut self) {
        self.messages.clear();
    }

    fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > self.window {
            let excess = self.messages.len() - self.window;
            self.messages.drain(..excess);
        }
    }

    fn get_context(&mut self) -> ContextFuture<'_> {
        let messages = trim_leading_non_user(&self.messages).to_vec();
        Box::pin(async move { Ok(StrategyContext::plain(messages)) })
    }
}
