//! Structured knowledge: the section grammar, its parser, the stores it
//! feeds, and the scheduler that decides when to run a compression cycle.
//!
//! One compression cycle flows through the submodules in order:
//!
//! 1. **[`scheduler`]**: [`CompressionScheduler`] notices the buffer has
//!    grown past its trigger, splits it, and builds a delegation request via
//!    [`prompt`].
//! 2. **[`parser`]**: [`parse_sections`] turns the model's freeform reply
//!    into per-section entries, routing anything it cannot place into the
//!    overflow bucket.
//! 3. **[`store`]**: [`KnowledgeStore::merge`] applies those entries with
//!    per-section semantics: key-similarity upsert for map sections,
//!    de-duplicated append for corrections, wholesale replacement for
//!    overflow.
//! 4. **[`render`]**: [`render_store`] serializes the stores back into one
//!    deterministic text block for the next turn's context.

pub mod parser;
pub mod prompt;
pub mod render;
pub mod scheduler;
pub mod store;

pub use parser::{ParsedSections, parse_entry, parse_sections};
pub use render::render_store;
pub use scheduler::{CompressionConfig, CompressionOutcome, CompressionScheduler};
pub use store::{KnowledgeStore, StoreEntry};

/// One of the six canonical knowledge categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Identifiers,
    Entities,
    Quantities,
    Dates,
    Corrections,
    Structural,
}

impl Section {
    /// Canonical order, used for both parsing output and rendering.
    pub const ALL: [Section; 6] = [
        Section::Identifiers,
        Section::Entities,
        Section::Quantities,
        Section::Dates,
        Section::Corrections,
        Section::Structural,
    ];

    /// Upper-case header as it appears in the delegation grammar.
    pub fn header(self) -> &'static str {
        match self {
            Section::Identifiers => "IDENTIFIERS",
            Section::Entities => "ENTITIES",
            Section::Quantities => "QUANTITIES",
            Section::Dates => "DATES",
            Section::Corrections => "CORRECTIONS",
            Section::Structural => "STRUCTURAL",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// Many-to-one alias table. Keys are normalized (upper-case, single spaces).
///
/// Words models commonly use as fact keys (`BUDGET`, `SCHEDULE`) are not
/// aliases.
pub const SECTION_ALIASES: &[(&str, Section)] = &[
    ("IDENTIFIERS", Section::Identifiers),
    ("IDENTIFIER", Section::Identifiers),
    ("IDS", Section::Identifiers),
    ("CODES", Section::Identifiers),
    ("REFERENCE NUMBERS", Section::Identifiers),
    ("CONTACT DETAILS", Section::Identifiers),
    ("CONTACT INFO", Section::Identifiers),
    ("ACCOUNTS", Section::Identifiers),
    ("ENTITIES", Section::Entities),
    ("ENTITY", Section::Entities),
    ("PEOPLE", Section::Entities),
    ("NAMES", Section::Entities),
    ("PARTICIPANTS", Section::Entities),
    ("ORGANIZATIONS", Section::Entities),
    ("PEOPLE AND ORGANIZATIONS", Section::Entities),
    ("QUANTITIES", Section::Quantities),
    ("QUANTITY", Section::Quantities),
    ("NUMBERS", Section::Quantities),
    ("AMOUNTS", Section::Quantities),
    ("MEASUREMENTS", Section::Quantities),
    ("METRICS", Section::Quantities),
    ("PRICES", Section::Quantities),
    ("COSTS", Section::Quantities),
    ("DATES", Section::Dates),
    ("DATE", Section::Dates),
    ("DATES AND TIMES", Section::Dates),
    ("TIMES", Section::Dates),
    ("DEADLINES", Section::Dates),
    ("TIMELINE", Section::Dates),
    ("CORRECTIONS", Section::Corrections),
    ("CORRECTION", Section::Corrections),
    ("CHANGES", Section::Corrections),
    ("UPDATES", Section::Corrections),
    ("REVISIONS", Section::Corrections),
    ("STRUCTURAL", Section::Structural),
    ("STRUCTURE", Section::Structural),
    ("CURRENT STATE", Section::Structural),
    ("DECISIONS", Section::Structural),
    ("LOCATIONS", Section::Structural),
    ("RELATIONSHIPS", Section::Structural),
    ("CONSTRAINTS", Section::Structural),
    ("PREFERENCES", Section::Structural),
];

/// Resolve a header (any case, optional trailing colon) to its canonical
/// section. Returns `None` for unknown headers.
pub fn resolve_section(header: &str) -> Option<Section> {
    let normalized = header
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    SECTION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, section)| *section)
}
