//! Store serializer.

use super::Section;
use super::store::KnowledgeStore;
use std::fmt::Write;

/// Label for the overflow bucket, rendered after the canonical sections.
pub const OVERFLOW_LABEL: &str = "OTHER NOTES";

/// Render the store as one text block: canonical sections in fixed order,
/// overflow last, empty sections omitted, each entry as `- <value>`.
///
/// Returns an empty string for an empty store.
pub fn render_store(store: &KnowledgeStore) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for section in Section::ALL {
        let values: Vec<&str> = match store.keyed(section) {
            Some(keyed) => keyed.entries().iter().map(|e| e.value.as_str()).collect(),
            None => store.corrections().iter().map(String::as_str).collect(),
        };
        if let Some(block) = render_block(section.header(), &values) {
            blocks.push(block);
        }
    }

    let overflow: Vec<&str> = store.overflow().iter().map(String::as_str).collect();
    if let Some(block) = render_block(OVERFLOW_LABEL, &overflow) {
        blocks.push(block);
    }

    blocks.join("\n")
}

fn render_block(header: &str, values: &[&str]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let mut out = format!("{header}:\n");
    for value in values {
        let _ = writeln!(out, "- {value}");
    }
    Some(out)
}
