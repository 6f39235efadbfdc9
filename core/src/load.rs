//! Load and regenerate protocol
//!
//! Two sources feed one list: the user rule file (may be missing) and the
//! bundled defaults (always present). The user file is read up to its first
//! boundary marker. Then:
//!
//! | User file | Built-ins appended | File rewritten as |
//! |-----------|--------------------|-------------------|
//! | missing or empty | yes | `[marker, ...builtin]` |
//! | `[...user, marker]` | yes | `[...user, marker, ...builtin]` |
//! | `[...user]` (no marker) | no | `[...user]` |
//!
//! Nothing here is fatal. Dropped entries and I/O failures are logged and the
//! store still publishes whatever was read.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::{
    parse_entries, render_entries, ParsedEntries, Rule, RuleEntry, RuleError, RuleList, RuleStore,
};

/// Outcome of [`RuleStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// The user rule file.
    pub path: PathBuf,
    /// Rules kept from the user file.
    pub user_rules: usize,
    /// Rules taken from the defaults (zero unless appended).
    pub builtin_rules: usize,
    /// Whether the defaults were appended after the user rules.
    pub appended_builtin: bool,
    /// Whether the rule file was rewritten.
    pub persisted: bool,
    /// Entries dropped as malformed, across both sources.
    pub dropped_entries: usize,
}

impl LoadReport {
    /// Total rules in the published list.
    #[must_use]
    pub fn total_rules(&self) -> usize {
        self.user_rules + self.builtin_rules
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule file:      {}", self.path.display())?;
        writeln!(f, "user rules:     {}", self.user_rules)?;
        writeln!(
            f,
            "builtin rules:  {}{}",
            self.builtin_rules,
            if self.appended_builtin { "" } else { " (user takeover)" }
        )?;
        writeln!(f, "dropped:        {}", self.dropped_entries)?;
        write!(
            f,
            "persisted:      {}",
            if self.persisted { "yes" } else { "no" }
        )
    }
}

/// What reading the user file produced.
enum UserSource {
    /// No file; start from the defaults.
    Missing,
    /// File present but unusable; leave it untouched.
    Unusable,
    /// Parsed entries, possibly ending in a boundary marker.
    Entries(Vec<RuleEntry>),
}

impl RuleStore {
    /// Load rules from `base_dir` and the defaults, rewrite the user rule
    /// file, and publish the merged list.
    ///
    /// The rule file lives at [`rules_path(base_dir)`](Self::rules_path).
    /// Parent directories are created as needed. If the existing file cannot
    /// be read or is not a JSON array, it is left as is and only the defaults
    /// are published for this run.
    pub fn load(&self, base_dir: impl AsRef<Path>) -> LoadReport {
        let _guard = self.load_guard();
        let path = Self::rules_path(base_dir.as_ref());
        let mut dropped = 0;

        let (mut user_entries, writable) = match read_user_file(&path, &mut dropped) {
            UserSource::Missing => (Vec::new(), true),
            UserSource::Unusable => (Vec::new(), false),
            UserSource::Entries(entries) => (entries, true),
        };

        info!("reading built-in dimlet rules");
        let builtin = read_builtin(self.builtin_source(), &mut dropped);

        let append = match user_entries.last() {
            None => true,
            Some(RuleEntry::Boundary) => {
                user_entries.pop();
                true
            }
            Some(RuleEntry::Rule(_)) => false,
        };
        let user_rules: Vec<Rule> = user_entries
            .into_iter()
            .filter_map(RuleEntry::into_rule)
            .collect();

        let persisted = if writable {
            let mut output: Vec<RuleEntry> =
                user_rules.iter().cloned().map(RuleEntry::Rule).collect();
            if append {
                output.push(RuleEntry::Boundary);
                output.extend(builtin.iter().cloned().map(RuleEntry::Rule));
            }
            match write_rules(&path, &output) {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "error writing dimlet rules; using rules in memory only");
                    false
                }
            }
        } else {
            warn!(path = %path.display(), "leaving unreadable rule file untouched");
            false
        };

        let report = LoadReport {
            path,
            user_rules: user_rules.len(),
            builtin_rules: if append { builtin.len() } else { 0 },
            appended_builtin: append,
            persisted,
            dropped_entries: dropped,
        };

        let mut rules = user_rules;
        if append {
            rules.extend(builtin);
        }
        self.publish(RuleList::new(rules));

        info!(
            user = report.user_rules,
            builtin = report.builtin_rules,
            dropped = report.dropped_entries,
            persisted = report.persisted,
            "dimlet rules loaded"
        );
        report
    }
}

fn read_user_file(path: &Path, dropped: &mut usize) -> UserSource {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        // A file under a non-directory parent is missing too; writing it will fail and say so.
        Err(e) if e.kind() == io::ErrorKind::NotFound || !path.exists() => {
            return UserSource::Missing
        }
        Err(source) => {
            let e = RuleError::FileRead {
                path: path.to_owned(),
                source,
            };
            error!(error = %e, "error reading dimlet rules");
            return UserSource::Unusable;
        }
    };

    info!(path = %path.display(), "reading dimlet rules from config");
    match parse_entries(&text, &path.display().to_string(), true) {
        Ok(parsed) => UserSource::Entries(keep_parsed(parsed, "user", dropped)),
        Err(e) => {
            error!(error = %e, "error parsing dimlet rules");
            UserSource::Unusable
        }
    }
}

fn read_builtin(text: &str, dropped: &mut usize) -> Vec<Rule> {
    match parse_entries(text, "builtin", false) {
        Ok(parsed) => keep_parsed(parsed, "builtin", dropped)
            .into_iter()
            .filter_map(|entry| {
                if entry.is_boundary() {
                    warn!("ignoring boundary marker in built-in rules");
                }
                entry.into_rule()
            })
            .collect(),
        Err(e) => {
            error!(error = %e, "error parsing built-in dimlet rules");
            Vec::new()
        }
    }
}

fn keep_parsed(parsed: ParsedEntries, origin: &str, dropped: &mut usize) -> Vec<RuleEntry> {
    for e in &parsed.errors {
        warn!(origin, index = e.index, error = %e.error, "dropping malformed rule entry");
    }
    *dropped += parsed.errors.len();
    parsed.entries
}

fn write_rules(path: &Path, entries: &[RuleEntry]) -> Result<(), RuleError> {
    let failed = |source| RuleError::FileWrite {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(failed)?;
    }
    if path.exists() {
        fs::remove_file(path).map_err(failed)?;
    }
    fs::write(path, render_entries(entries)).map_err(failed)
}
