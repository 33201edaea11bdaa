//! Section parser for the delegation grammar.
//!
//! The external model is asked to answer in six sections, but its output is
//! freeform text and drifts: headers get bolded or renamed, bullets change
//! style, long facts wrap onto indented lines. The parser is a single
//! forward scan. Each line is first classified ([`classify_line`]) and then
//! applied to a small state machine holding the current section and the
//! entry that continuation lines attach to.
//!
//! Classification precedence:
//!
//! 1. **Blank**: empty lines and horizontal rules are ignored.
//! 2. **Header**: capitalized words with an optional colon and nothing else.
//!    Resolved through [`resolve_section`]; an unknown header routes
//!    following lines to overflow rather than leaving the previous section
//!    active.
//! 3. **Inline header**: `HEADER: content` with an upper-case, resolvable
//!    header. Switches section and keeps the content as an entry.
//! 4. **Continuation**: indented two or more columns while an entry is
//!    open. Appended to that entry's value.
//! 5. **Entry**: everything else, parsed by [`parse_entry`].
//!
//! Nothing is dropped. Lines that cannot be placed in a canonical section
//! land in [`ParsedSections::overflow`] verbatim.

use super::store::StoreEntry;
use super::{Section, resolve_section};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Characters of a bare line used as its key.
pub const BARE_KEY_CHARS: usize = 40;

/// Maximum words in a header line.
const MAX_HEADER_WORDS: usize = 5;

static LIST_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•+]|\d{1,3}[.)])\s+").unwrap());

static HEADER_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{Lu}[\p{L}&/]*(?:\s+(?:&|\p{Lu}[\p{L}&/]*))*\s*:?$").unwrap()
});

static INLINE_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z &/_-]*[A-Z])\s*:\s*(\S.*)$").unwrap());

/// Per-section entries produced from one block of model output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSections {
    sections: BTreeMap<Section, Vec<StoreEntry>>,
    /// Lines that could not be routed to a canonical section, verbatim.
    pub overflow: Vec<String>,
}

impl ParsedSections {
    /// Entries parsed for `section`, in output order.
    pub fn entries(&self, section: Section) -> &[StoreEntry] {
        self.sections.get(&section).map_or(&[], Vec::as_slice)
    }

    /// Append an entry and return its index within the section.
    pub fn push(&mut self, section: Section, entry: StoreEntry) -> usize {
        let entries = self.sections.entry(section).or_default();
        entries.push(entry);
        entries.len() - 1
    }

    /// Number of entries across all canonical sections.
    pub fn entry_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0 && self.overflow.is_empty()
    }

    fn entry_mut(&mut self, section: Section, index: usize) -> Option<&mut StoreEntry> {
        self.sections.get_mut(&section)?.get_mut(index)
    }
}

/// The role a single line plays in the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// A header line; `None` when it does not resolve to a canonical section.
    Header(Option<Section>),
    InlineHeader { section: Section, content: String },
    Continuation(String),
    Entry(String),
}

/// Where entries are currently routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Section(Section),
    Overflow,
}

/// Classify one raw line. `has_open_entry` says whether a previous entry in
/// the current section can take a continuation.
pub fn classify_line(raw: &str, has_open_entry: bool) -> LineKind {
    let (text, was_heading) = strip_decoration(raw);
    if text.is_empty() || is_rule(&text) {
        return LineKind::Blank;
    }

    let list_item = LIST_PREFIX_REGEX.find(&text).map(|m| m.end());

    if list_item.is_none() {
        if is_header_line(&text, was_heading) {
            return LineKind::Header(resolve_section(&text));
        }
        if let Some(caps) = INLINE_HEADER_REGEX.captures(&text)
            && let Some(section) = resolve_section(&caps[1])
        {
            return LineKind::InlineHeader {
                section,
                content: caps[2].trim().to_string(),
            };
        }
    }

    let item = match list_item {
        Some(end) => unwrap_emphasis(text.split_at(end).1.trim()),
        None => text,
    };

    if has_open_entry && indent_columns(raw) >= 2 {
        LineKind::Continuation(item)
    } else {
        LineKind::Entry(item)
    }
}

/// Parse one freeform block into per-section entries plus overflow.
///
/// Pure: the same input always yields the same output.
pub fn parse_sections(text: &str) -> ParsedSections {
    let mut parsed = ParsedSections::default();
    let mut target = Target::Overflow;
    let mut open_entry: Option<usize> = None;

    for raw in text.lines() {
        let has_open_entry = matches!(target, Target::Section(_)) && open_entry.is_some();

        match classify_line(raw, has_open_entry) {
            LineKind::Blank => {}
            LineKind::Header(Some(section)) => {
                target = Target::Section(section);
                open_entry = None;
            }
            LineKind::Header(None) => {
                target = Target::Overflow;
                open_entry = None;
                parsed.overflow.push(raw.trim().to_string());
            }
            LineKind::InlineHeader { section, content } => {
                target = Target::Section(section);
                open_entry = Some(parsed.push(section, parse_entry(&content)));
            }
            LineKind::Continuation(more) => {
                if let (Target::Section(section), Some(index)) = (target, open_entry)
                    && let Some(entry) = parsed.entry_mut(section, index)
                {
                    entry.value.push(' ');
                    entry.value.push_str(&more);
                }
            }
            LineKind::Entry(item) => match target {
                Target::Section(section) => {
                    open_entry = Some(parsed.push(section, parse_entry(&item)));
                }
                Target::Overflow => parsed.overflow.push(raw.trim().to_string()),
            },
        }
    }

    parsed
}

/// Parse a single (list-prefix-free) line into a store entry.
///
/// Tries `key: value`, then `old → new` / `old -> new`, then falls back to
/// a bare line keyed by its first [`BARE_KEY_CHARS`] characters. The value
/// is always the full line.
pub fn parse_entry(text: &str) -> StoreEntry {
    let text = text.trim();
    if let Some(key) = key_before_colon(text) {
        return StoreEntry::new(key, text);
    }
    if let Some(key) = key_before_arrow(text) {
        return StoreEntry::new(key, text);
    }
    StoreEntry::new(text.chars().take(BARE_KEY_CHARS).collect::<String>(), text)
}

/// The key of a `key: value` line: text before the first separator colon,
/// which must be at least two characters. Colons inside timestamps (`3:00`)
/// and URL schemes (`https://`) are not separators.
fn key_before_colon(text: &str) -> Option<&str> {
    for (idx, ch) in text.char_indices() {
        if ch != ':' {
            continue;
        }
        let (before, rest) = text.split_at(idx);
        let after = rest.split_at(ch.len_utf8()).1;

        let prev_digit = before.chars().last().is_some_and(|c| c.is_ascii_digit());
        let next_digit = after.chars().next().is_some_and(|c| c.is_ascii_digit());
        if (prev_digit && next_digit) || after.starts_with("//") {
            continue;
        }

        let key = before.trim();
        return (key.chars().count() >= 2).then_some(key);
    }
    None
}

fn key_before_arrow(text: &str) -> Option<&str> {
    let (old, _) = text.split_once('→').or_else(|| text.split_once("->"))?;
    let old = old.trim();
    (!old.is_empty()).then_some(old)
}

/// Strip heading markers and emphasis. Returns the cleaned text and whether
/// the line was a markdown heading.
fn strip_decoration(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    let heading_body = trimmed.trim_start_matches('#');
    let was_heading = heading_body.len() < trimmed.len()
        && (heading_body.is_empty() || heading_body.starts_with(char::is_whitespace));
    let body = if was_heading { heading_body } else { trimmed };
    (unwrap_emphasis(body.trim()), was_heading)
}

/// Remove emphasis wrapping the whole line or a leading key
/// (`**Gate code**: 1942`). Markers inside a value are kept.
fn unwrap_emphasis(text: &str) -> String {
    let mut text = text.to_string();
    for marker in ["**", "__", "*", "_"] {
        if text.len() > 2 * marker.len()
            && !text.chars().nth(marker.len()).is_some_and(char::is_whitespace)
            && let Some(inner) = text
                .strip_prefix(marker)
                .and_then(|rest| rest.strip_suffix(marker))
        {
            text = inner.trim().to_string();
        }
    }

    for marker in ["**", "__"] {
        if let Some(rest) = text.strip_prefix(marker)
            && let Some((inner, after)) = rest.split_once(marker)
            && !inner.trim().is_empty()
            && !inner.trim_end_matches(':').contains(':')
            && (inner.trim_end().ends_with(':') || after.trim_start().starts_with(':'))
        {
            text = format!("{}{after}", inner.trim());
            break;
        }
    }
    text
}

fn is_rule(text: &str) -> bool {
    text.chars().all(|c| matches!(c, '-' | '=' | '*' | '_' | '~' | ' '))
}

fn is_header_line(text: &str, was_heading: bool) -> bool {
    if was_heading {
        return true;
    }
    if !HEADER_LINE_REGEX.is_match(text) {
        return false;
    }
    let name = text.trim_end_matches(':');
    if name.split_whitespace().count() > MAX_HEADER_WORDS {
        return false;
    }
    if resolve_section(name).is_some() {
        return true;
    }
    let has_word = name.split_whitespace().any(|word| {
        word.chars().filter(|c| c.is_alphabetic()).count() >= 3
            && word.chars().any(|c| "AEIOUYaeiouy".contains(c))
    });
    has_word && (text.ends_with(':') || !name.chars().any(char::is_lowercase))
}

fn indent_columns(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}
