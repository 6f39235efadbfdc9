//! `NamePattern`: exact or glob matching for mod and identifier clauses
//!
//! A pattern containing `*` or `?` is a glob; anything else is compared
//! exactly. Globs compile once, at parse time, to an anchored regex. The
//! `regex` crate guarantees linear-time matching so a hostile rule file cannot
//! stall resolution.

use std::fmt;

use regex::Regex;

use crate::{RuleError, MAX_PATTERN_LENGTH};

/// A name pattern from a filter clause.
///
/// # Example
///
/// ```
/// use dimrules::NamePattern;
///
/// let p = NamePattern::parse("minecraft:*_ore").unwrap();
/// assert!(p.matches("minecraft:iron_ore"));
/// assert!(!p.matches("minecraft:iron_block"));
///
/// let exact = NamePattern::parse("minecraft:stone").unwrap();
/// assert!(exact.matches("minecraft:stone"));
/// assert!(!exact.matches("minecraft:stonebrick"));
/// ```
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Case-sensitive string equality.
    Exact(String),
    /// `*` matches any run of characters, `?` matches exactly one.
    Glob {
        /// The pattern as written.
        source: String,
        /// Compiled, anchored form.
        regex: Regex,
    },
}

impl NamePattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if the pattern is longer than
    /// [`MAX_PATTERN_LENGTH`] or the glob fails to compile.
    pub fn parse(pattern: &str) -> Result<Self, RuleError> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(RuleError::InvalidPattern {
                pattern: pattern.chars().take(32).collect::<String>() + "...",
                reason: format!(
                    "length is {}, but maximum allowed is {MAX_PATTERN_LENGTH}",
                    pattern.len()
                ),
            });
        }
        if !pattern.contains(['*', '?']) {
            return Ok(Self::Exact(pattern.to_owned()));
        }
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::Glob {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// Check whether `value` matches this pattern.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => value == expected,
            Self::Glob { regex, .. } => regex.is_match(value),
        }
    }

    /// The pattern as written in the rule file.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Glob { source: s, .. } => s,
        }
    }

    /// Returns `true` for glob patterns.
    #[must_use]
    pub fn is_glob(&self) -> bool {
        matches!(self, Self::Glob { .. })
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for NamePattern {}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 12);
    // `.` must also cross newlines for `*` to mean any run.
    out.push_str("(?s)^");
    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_without_wildcards() {
        let p = NamePattern::parse("minecraft:dirt").unwrap();
        assert!(!p.is_glob());
        assert!(p.matches("minecraft:dirt"));
        assert!(!p.matches("Minecraft:dirt"));
        assert!(!p.matches("minecraft:dirt "));
    }

    #[test]
    fn star_matches_any_run() {
        let p = NamePattern::parse("*").unwrap();
        assert!(p.is_glob());
        assert!(p.matches(""));
        assert!(p.matches("anything:at_all"));
    }

    #[test]
    fn question_matches_one_char() {
        let p = NamePattern::parse("wool_?").unwrap();
        assert!(p.matches("wool_1"));
        assert!(!p.matches("wool_"));
        assert!(!p.matches("wool_12"));
    }

    #[test]
    fn wildcards_cross_newlines() {
        assert!(NamePattern::parse("a*").unwrap().matches("a\nb"));
        assert!(NamePattern::parse("a?b").unwrap().matches("a\nb"));
    }

    #[test]
    fn glob_is_anchored() {
        let p = NamePattern::parse("*:stone").unwrap();
        assert!(p.matches("minecraft:stone"));
        assert!(!p.matches("minecraft:stone_slab"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = NamePattern::parse("mod.name[1]*").unwrap();
        assert!(p.matches("mod.name[1]:x"));
        assert!(!p.matches("modXname[1]:x"));
    }

    #[test]
    fn too_long_is_rejected() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        let err = NamePattern::parse(&long).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn equality_uses_source_text() {
        assert_eq!(
            NamePattern::parse("a*").unwrap(),
            NamePattern::parse("a*").unwrap()
        );
        assert_ne!(
            NamePattern::parse("a*").unwrap(),
            NamePattern::parse("a?").unwrap()
        );
    }
}
