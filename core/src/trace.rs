//! Resolution trace for debugging rule order.
//!
//! Mirrors [`RuleList::resolve`](crate::RuleList::resolve) but records every
//! rule it visits. Rules after the short-circuit are not visited and do not
//! appear in the trace.
//!
//! ```ignore
//! let trace = rules.resolve_with_trace(DimletType::Material, "minecraft", "minecraft:stone", &features);
//! for step in trace.steps.iter().filter(|s| s.matched) {
//!     println!("rule[{}] complete={}", step.index, step.complete);
//! }
//! ```

use std::fmt;

use crate::Settings;

/// One visited rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleStep {
    /// Position of the rule in the list.
    pub index: usize,
    /// Whether the rule's filter matched the query.
    pub matched: bool,
    /// Whether the rule's own settings are complete.
    pub complete: bool,
}

/// Full trace of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTrace {
    /// The resolved settings, identical to what `resolve` returns.
    pub settings: Settings,
    /// Every visited rule, in order.
    pub steps: Vec<RuleStep>,
    /// Index of the complete rule that ended the walk, if any.
    pub stopped_at: Option<usize>,
}

impl ResolveTrace {
    /// Indices of the rules that matched and contributed to the result.
    pub fn matched(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().filter(|s| s.matched).map(|s| s.index)
    }
}

impl fmt::Display for ResolveTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            let mark = if step.matched { "match" } else { "skip " };
            write!(f, "rule[{}] {mark}", step.index)?;
            if step.matched && step.complete {
                write!(f, " (complete)")?;
            }
            writeln!(f)?;
        }
        match self.stopped_at {
            Some(index) => writeln!(f, "stopped at rule[{index}]")?,
            None => writeln!(f, "walked all rules")?,
        }
        write!(f, "result: {}", self.settings.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_filters_steps() {
        let trace = ResolveTrace {
            settings: Settings::new(),
            steps: vec![
                RuleStep { index: 0, matched: false, complete: true },
                RuleStep { index: 1, matched: true, complete: false },
                RuleStep { index: 2, matched: true, complete: true },
            ],
            stopped_at: Some(2),
        };
        assert_eq!(trace.matched().collect::<Vec<_>>(), vec![1, 2]);
        let text = trace.to_string();
        assert!(text.contains("rule[0] skip"));
        assert!(text.contains("rule[2] match (complete)"));
        assert!(text.contains("stopped at rule[2]"));
    }
}
