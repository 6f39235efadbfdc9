//! dimrules - ordered rule engine for dimlet settings
//!
//! Resolves per-dimlet configuration by walking an ordered list of rules.
//! Each rule pairs a [`Filter`] with a partial [`Settings`] record; every
//! matching rule fills the fields still missing, so the first rule to set a
//! field owns it.
//!
//! # Architecture
//!
//! - [`Settings`] / [`SettingsBuilder`]: struct of optional fields, first-match-wins merge
//! - [`Filter`]: conjunction of type / mod / name / feature clauses, absent clause = wildcard
//! - [`Rule`] / [`RuleEntry`]: rule file codec; `RuleEntry::Boundary` exists only on disk
//! - [`RuleList`]: immutable ordered rules with the resolution walk
//! - [`RuleStore`]: owns the current `RuleList`, runs the load/regenerate protocol
//!
//! # Layered rule files
//!
//! The user rule file (`<config>/rftools/dimlets.json`) is a JSON array of
//! rule objects. A plain string in the array is the boundary marker: every
//! load keeps the rules above it and regenerates everything below it from the
//! bundled defaults. Removing the marker hands full control to the user.
//!
//! # Example
//!
//! ```
//! use dimrules::prelude::*;
//! use serde_json::json;
//!
//! let rules = RuleList::new(vec![
//!     Rule::parse(&json!({
//!         "filter": { "type": "liquid" },
//!         "settings": { "rarity": 2, "worldgen": false }
//!     }))
//!     .unwrap(),
//!     Rule::parse(&json!({
//!         "settings": { "rarity": 5, "create": 100, "maintain": 10, "ticks": 10,
//!                       "worldgen": true, "dimlet": true }
//!     }))
//!     .unwrap(),
//! ]);
//!
//! let key = DimletKey::new(DimletType::Liquid, "minecraft:water");
//! let settings = rules.resolve_key(&key, "minecraft");
//! assert_eq!(settings.rarity(), Some(2));
//! assert_eq!(settings.worldgen(), Some(false));
//! assert_eq!(settings.create_cost(), Some(100));
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod dimlet;
mod filter;
mod load;
mod pattern;
mod rule;
mod settings;
mod store;
mod trace;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use dimlet::{DimletKey, DimletType, Feature, FeatureSet, UnknownName};
pub use filter::Filter;
pub use load::LoadReport;
pub use pattern::NamePattern;
pub use rule::{parse_entries, render_entries, EntryError, ParsedEntries, Rule, RuleEntry};
pub use settings::{Settings, SettingsBuilder};
pub use store::{RuleList, RuleStore};
pub use trace::{ResolveTrace, RuleStep};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use dimrules::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DimletKey, DimletType, Feature, FeatureSet, Filter, LoadReport, ResolveTrace, Rule,
        RuleEntry, RuleError, RuleList, RuleStore, Settings, SettingsBuilder,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Directory under the config root that holds the rule file.
pub const RULES_DIR: &str = "rftools";

/// File name of the user rule file.
pub const RULES_FILE: &str = "dimlets.json";

/// Text written for the boundary marker.
///
/// Only the presence of a string entry matters when reading; the text is
/// advice for whoever edits the file.
pub const BOUNDARY_TEXT: &str = "Everything below this line will be regenerated from defaults every time. Remove this line if you do not want that";

/// Bundled default rules.
pub const BUILTIN_RULES: &str = include_str!("../assets/dimlets.json");

/// Maximum length of a single mod or name pattern.
pub const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum number of entries in one `type`, `mod` or `name` list.
pub const MAX_PATTERNS_PER_CLAUSE: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from parsing and persisting rules.
///
/// None of these are fatal to resolution. Entry-level errors drop the entry,
/// file-level errors degrade to the rules that could be read.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A `settings` object could not be parsed.
    #[error("malformed settings: {source}")]
    MalformedSettings {
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
    /// A `filter` object could not be parsed.
    #[error("malformed filter: {reason}")]
    MalformedFilter {
        /// What was wrong with the filter.
        reason: String,
    },
    /// A mod or name pattern is invalid.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
    /// An array entry is neither a rule object nor a boundary marker.
    #[error("malformed rule entry: {reason}")]
    MalformedEntry {
        /// What was wrong with the entry.
        reason: String,
    },
    /// A rule source is not a JSON array.
    #[error("{origin} is not a rule list: {reason}")]
    MalformedDocument {
        /// Which source failed (file path or `"builtin"`).
        origin: String,
        /// The underlying parse error.
        reason: String,
    },
    /// The user rule file exists but could not be read.
    #[error("failed to read \"{}\": {source}", path.display())]
    FileRead {
        /// Path of the rule file.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The user rule file could not be recreated.
    #[error("failed to write \"{}\": {source}", path.display())]
    FileWrite {
        /// Path of the rule file.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl RuleError {
    /// Report a pattern failure as a filter failure; other errors pass through.
    pub(crate) fn into_filter_error(self) -> Self {
        match self {
            Self::InvalidPattern { pattern, reason } => Self::MalformedFilter {
                reason: format!("invalid pattern \"{pattern}\": {reason}"),
            },
            other => other,
        }
    }
}
