//! Delegation prompt for the structured compression cycle.
//!
//! The model sees everything already known (rendered stores) plus the span
//! being compressed, and is asked to answer in the six-section grammar the
//! parser understands. Only the new span is re-read each cycle; the stores
//! are the anchor.

use crate::{Message, format_transcript};

/// System prompt instructing the section grammar.
pub const DELEGATION_SYSTEM_PROMPT: &str = "\
You extract durable facts from a conversation so they can be recalled later.

Answer using these section headers, each on its own line, in this order:
IDENTIFIERS: phone numbers, codes, reference numbers, account ids, addresses
ENTITIES: people, organizations, products and their roles
QUANTITIES: amounts, prices, counts, measurements
DATES: dates, times, deadlines
CORRECTIONS: facts that changed, written as `old → new`
STRUCTURAL: decisions, locations, relationships, constraints, current state

Under each header write one fact per line as `- key: value`.

Rules:
- Copy identifiers, numbers and names verbatim. Never round or paraphrase them.
- Only include facts explicitly stated in the messages. Do not infer.
- Include facts from PREVIOUSLY KNOWN that are still true, using the same key.
- When a new message changes a known fact, write the new value under its section \
  and also add a CORRECTIONS line.
- Omit sections with nothing to report. Do not add commentary before or after.";

/// Build the user half of a delegation request.
pub fn build_delegation_prompt(previously_known: &str, span: &[Message]) -> String {
    let mut content = String::from("=== PREVIOUSLY KNOWN ===\n");
    if previously_known.trim().is_empty() {
        content.push_str("(nothing yet)\n");
    } else {
        content.push_str(previously_known.trim_end());
        content.push('\n');
    }
    content.push_str("\n=== NEW CONVERSATION ===\n");
    content.push_str(&format_transcript(span));
    content
}
