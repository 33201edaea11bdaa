//! Character-based token estimation.
//!
//! Used where the benchmark needs a size figure without calling a tokenizer,
//! such as the peak context size a strategy hands to the model.

use crate::Message;

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Estimate the token count of a string.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 / DEFAULT_CHARS_PER_TOKEN).ceil() as usize
}

/// Estimate the token count of an assembled request: the optional system
/// text plus every message body.
pub fn estimate_context_tokens(system: Option<&str>, messages: &[Message]) -> usize {
    let chars: usize = system.map_or(0, |s| s.chars().count())
        + messages
            .iter()
            .map(|m| m.content.chars().count())
            .sum::<usize>();
    (chars as f64 / DEFAULT_CHARS_PER_TOKEN).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_context_tokens(None, &[]), 0);
    }

    #[test]
    fn rounds_up() {
        // 7 chars / 3.5 = 2 exactly; 8 chars rounds up to 3.
        assert_eq!(estimate_tokens("abcdefg"), 2);
        assert_eq!(estimate_tokens("abcdefgh"), 3);
    }

    #[test]
    fn context_includes_system_and_messages() {
        let messages = vec![Message::user("x".repeat(35)), Message::assistant("y".repeat(35))];
        assert_eq!(estimate_context_tokens(None, &messages), 20);
        assert_eq!(estimate_context_tokens(Some(&"z".repeat(35)), &messages), 30);
    }
}
