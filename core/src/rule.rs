//! Rule file codec
//!
//! A rule file is a JSON array. Each element is either a rule object
//!
//! ```json
//! { "filter": { "type": "material" }, "settings": { "rarity": 3 } }
//! ```
//!
//! or a plain string, the boundary marker. Entries are parsed one at a time so
//! a bad entry costs only itself.

use serde_json::Value;

use crate::{Filter, RuleError, Settings, BOUNDARY_TEXT};

/// A filter paired with the settings it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    filter: Filter,
    settings: Settings,
}

impl Rule {
    /// Create a rule.
    #[must_use]
    pub fn new(filter: Filter, settings: Settings) -> Self {
        Self { filter, settings }
    }

    /// A rule whose filter matches everything.
    #[must_use]
    pub fn catch_all(settings: Settings) -> Self {
        Self::new(Filter::any(), settings)
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse a rule object. `filter` is optional, `settings` is required.
    ///
    /// Keys other than `filter` and `settings` are ignored.
    ///
    /// # Errors
    ///
    /// - [`RuleError::MalformedEntry`]: not an object, or `settings` missing
    /// - [`RuleError::MalformedFilter`]: the filter is invalid
    /// - [`RuleError::MalformedSettings`]: the settings are invalid
    pub fn parse(value: &Value) -> Result<Self, RuleError> {
        let obj = value.as_object().ok_or_else(|| RuleError::MalformedEntry {
            reason: format!("expected a rule object, found {}", json_kind(value)),
        })?;
        let settings = obj.get("settings").ok_or_else(|| RuleError::MalformedEntry {
            reason: "`settings` is missing".into(),
        })?;
        Ok(Self {
            filter: Filter::parse(obj.get("filter"))?,
            settings: Settings::parse(settings)?,
        })
    }

    /// Render the rule object. A wildcard filter is omitted.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(filter) = self.filter.to_json() {
            map.insert("filter".into(), filter);
        }
        map.insert("settings".into(), self.settings.to_json());
        Value::Object(map)
    }
}

/// One element of a rule file.
///
/// `Boundary` never leaves the load step: in-memory rule lists hold only
/// [`Rule`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEntry {
    /// A rule.
    Rule(Rule),
    /// The regeneration boundary marker.
    Boundary,
}

impl RuleEntry {
    /// Parse one array element. Any JSON string is a boundary marker,
    /// whatever its text.
    ///
    /// # Errors
    ///
    /// Same as [`Rule::parse`], plus [`RuleError::MalformedEntry`] for
    /// numbers, booleans, `null` and arrays.
    pub fn parse(value: &Value) -> Result<Self, RuleError> {
        match value {
            Value::String(_) => Ok(Self::Boundary),
            Value::Object(_) => Rule::parse(value).map(Self::Rule),
            other => Err(RuleError::MalformedEntry {
                reason: format!(
                    "expected a rule object or a boundary string, found {}",
                    json_kind(other)
                ),
            }),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Rule(rule) => rule.to_json(),
            Self::Boundary => Value::String(BOUNDARY_TEXT.to_owned()),
        }
    }

    #[must_use]
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary)
    }

    /// The rule, if this entry is one.
    #[must_use]
    pub fn into_rule(self) -> Option<Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Boundary => None,
        }
    }
}

/// An entry that failed to parse and was dropped.
#[derive(Debug)]
pub struct EntryError {
    /// Position of the entry in the source array.
    pub index: usize,
    /// Why it was dropped.
    pub error: RuleError,
}

/// Result of parsing a rule document.
#[derive(Debug, Default)]
pub struct ParsedEntries {
    /// Entries that parsed, in source order.
    pub entries: Vec<RuleEntry>,
    /// Entries that were dropped.
    pub errors: Vec<EntryError>,
}

impl ParsedEntries {
    /// Returns `true` if the last entry is a boundary marker.
    #[must_use]
    pub fn ends_with_boundary(&self) -> bool {
        self.entries.last().is_some_and(RuleEntry::is_boundary)
    }
}

/// Parse a rule document.
///
/// With `stop_at_boundary`, parsing stops at the first boundary marker, which
/// is kept as the last entry; anything after it is not examined.
///
/// # Errors
///
/// Returns [`RuleError::MalformedDocument`] if `text` is not a JSON array.
/// Per-entry failures do not fail the document; they are collected in
/// [`ParsedEntries::errors`].
pub fn parse_entries(
    text: &str,
    origin: &str,
    stop_at_boundary: bool,
) -> Result<ParsedEntries, RuleError> {
    let values: Vec<Value> =
        serde_json::from_str(text).map_err(|e| RuleError::MalformedDocument {
            origin: origin.to_owned(),
            reason: e.to_string(),
        })?;

    let mut parsed = ParsedEntries::default();
    for (index, value) in values.iter().enumerate() {
        match RuleEntry::parse(value) {
            Ok(entry) => {
                let boundary = entry.is_boundary();
                parsed.entries.push(entry);
                if boundary && stop_at_boundary {
                    break;
                }
            }
            Err(error) => parsed.errors.push(EntryError { index, error }),
        }
    }
    Ok(parsed)
}

/// Render entries as a pretty-printed JSON array.
#[must_use]
pub fn render_entries(entries: &[RuleEntry]) -> String {
    let doc = Value::Array(entries.iter().map(RuleEntry::to_json).collect());
    format!("{doc:#}\n")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
