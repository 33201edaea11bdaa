//! Long-lived knowledge stores and the merge rules that update them.
//!
//! Each section has its own merge semantics:
//!
//! - **Map sections** (identifiers, entities, quantities, dates, structural)
//!   upsert by key similarity. Two keys are the same fact when their
//!   normalized 25-character prefixes overlap; the newer key spelling and
//!   value replace the older ones.
//! - **Corrections** are an append-only audit trail. A new correction is
//!   dropped only when an existing one shares a 30-character substring with
//!   it.
//! - **Overflow** is replaced wholesale every cycle.

use super::Section;
use super::parser::ParsedSections;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Number of normalized key characters compared for similarity.
pub const KEY_PREFIX_CHARS: usize = 25;

/// Minimum shared substring length that marks two corrections as duplicates.
pub const CORRECTION_OVERLAP_CHARS: usize = 30;

/// A single fact. `key` is only used for merge matching; `value` is the
/// original line, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
}

impl StoreEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Lower-case, strip punctuation, collapse whitespace, and truncate to
/// [`KEY_PREFIX_CHARS`].
pub fn normalize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(KEY_PREFIX_CHARS)
        .collect()
}

/// Whether two keys name the same fact: either normalized prefix starts
/// with the other. Keys with nothing left after normalization only match
/// the identical raw key.
pub fn keys_overlap(a: &str, b: &str) -> bool {
    let na = normalize_key(a);
    let nb = normalize_key(b);
    if na.is_empty() || nb.is_empty() {
        return !a.trim().is_empty() && a.trim() == b.trim();
    }
    na.starts_with(&nb) || nb.starts_with(&na)
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `a` and `b` share a substring of at least `min_chars` characters
/// (case-insensitive, whitespace-collapsed). Strings shorter than
/// `min_chars` are compared by containment instead.
pub fn shares_substring(a: &str, b: &str, min_chars: usize) -> bool {
    let a = normalize_text(a);
    let b = normalize_text(b);
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.is_empty() {
        return false;
    }

    let bounds: Vec<usize> = short
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(short.len()))
        .collect();
    let char_count = bounds.len() - 1;
    if char_count < min_chars {
        return long.contains(short.as_str());
    }

    (0..=char_count - min_chars).any(|start| {
        short
            .get(bounds[start]..bounds[start + min_chars])
            .is_some_and(|window| long.contains(window))
    })
}

/// An insertion-ordered key→value section with similarity-based upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedSection {
    entries: Vec<StoreEntry>,
}

/// What [`KeyedSection::upsert`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

impl KeyedSection {
    /// Insert `entry`, dropping every existing entry whose key overlaps.
    /// A replaced fact moves to the end under the new key.
    pub fn upsert(&mut self, entry: StoreEntry) -> Upsert {
        let before = self.entries.len();
        self.entries.retain(|e| {
            let overlaps = keys_overlap(&e.key, &entry.key);
            if overlaps {
                trace!("Replacing '{}' with '{}'", e.key, entry.key);
            }
            !overlaps
        });
        let replaced = self.entries.len() < before;
        self.entries.push(entry);
        if replaced {
            Upsert::Replaced
        } else {
            Upsert::Inserted
        }
    }

    /// Look up an entry by key similarity.
    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.entries.iter().find(|e| keys_overlap(&e.key, key))
    }

    pub fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts reported by [`KnowledgeStore::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    pub corrections_added: usize,
    pub corrections_skipped: usize,
    pub overflow: usize,
}

/// The per-conversation knowledge state: five keyed sections, the
/// corrections trail, and the overflow bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeStore {
    identifiers: KeyedSection,
    entities: KeyedSection,
    quantities: KeyedSection,
    dates: KeyedSection,
    structural: KeyedSection,
    corrections: Vec<String>,
    overflow: Vec<String>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The keyed section for `section`, or `None` for corrections.
    pub fn keyed(&self, section: Section) -> Option<&KeyedSection> {
        match section {
            Section::Identifiers => Some(&self.identifiers),
            Section::Entities => Some(&self.entities),
            Section::Quantities => Some(&self.quantities),
            Section::Dates => Some(&self.dates),
            Section::Structural => Some(&self.structural),
            Section::Corrections => None,
        }
    }

    fn keyed_mut(&mut self, section: Section) -> Option<&mut KeyedSection> {
        match section {
            Section::Identifiers => Some(&mut self.identifiers),
            Section::Entities => Some(&mut self.entities),
            Section::Quantities => Some(&mut self.quantities),
            Section::Dates => Some(&mut self.dates),
            Section::Structural => Some(&mut self.structural),
            Section::Corrections => None,
        }
    }

    pub fn corrections(&self) -> &[String] {
        &self.corrections
    }

    pub fn overflow(&self) -> &[String] {
        &self.overflow
    }

    /// Total number of stored facts, overflow excluded.
    pub fn fact_count(&self) -> usize {
        Section::ALL
            .iter()
            .filter_map(|s| self.keyed(*s))
            .map(KeyedSection::len)
            .sum::<usize>()
            + self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fact_count() == 0 && self.overflow.is_empty()
    }

    /// Add a correction unless an existing one shares a
    /// [`CORRECTION_OVERLAP_CHARS`]-character substring with it.
    /// Returns whether it was appended.
    pub fn add_correction(&mut self, correction: &str) -> bool {
        if self
            .corrections
            .iter()
            .any(|existing| shares_substring(existing, correction, CORRECTION_OVERLAP_CHARS))
        {
            return false;
        }
        self.corrections.push(correction.to_string());
        true
    }

    /// Apply one cycle's parsed sections.
    pub fn merge(&mut self, parsed: &ParsedSections) -> MergeStats {
        let mut stats = MergeStats::default();

        for section in Section::ALL {
            let entries = parsed.entries(section);
            if section == Section::Corrections {
                for entry in entries {
                    if self.add_correction(&entry.value) {
                        stats.corrections_added += 1;
                    } else {
                        stats.corrections_skipped += 1;
                    }
                }
                continue;
            }
            if let Some(keyed) = self.keyed_mut(section) {
                for entry in entries {
                    match keyed.upsert(entry.clone()) {
                        Upsert::Inserted => stats.inserted += 1,
                        Upsert::Replaced => stats.replaced += 1,
                    }
                }
            }
        }

        self.overflow = parsed.overflow.clone();
        stats.overflow = self.overflow.len();
        stats
    }

    /// Drop everything. Only called at the start of a new conversation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
