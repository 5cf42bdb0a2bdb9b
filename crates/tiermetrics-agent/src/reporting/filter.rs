//! Name filter applied by reporters on top of the registry's activity gate.

use std::collections::HashSet;

use regex::Regex;

use tiermetrics_core::{MetricsError, Result};

#[derive(Debug, Clone)]
enum Matcher {
    Exact(HashSet<String>),
    Patterns(Vec<Regex>),
}

impl Matcher {
    fn new(values: &[String], use_regex: bool) -> Result<Self> {
        if !use_regex {
            return Ok(Matcher::Exact(values.iter().cloned().collect()));
        }
        let patterns = values
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})$"))
                    .map_err(|e| MetricsError::ReporterBuild(format!("invalid filter pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::Patterns(patterns))
    }

    fn is_empty(&self) -> bool {
        match self {
            Matcher::Exact(set) => set.is_empty(),
            Matcher::Patterns(p) => p.is_empty(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(set) => set.contains(name),
            Matcher::Patterns(p) => p.iter().any(|re| re.is_match(name)),
        }
    }
}

/// Accepts a name when it is included (or no includes are set) and not excluded.
#[derive(Debug, Clone)]
pub struct MetricFilter {
    includes: Matcher,
    excludes: Matcher,
}

impl MetricFilter {
    pub fn all() -> Self {
        Self {
            includes: Matcher::Exact(HashSet::new()),
            excludes: Matcher::Exact(HashSet::new()),
        }
    }

    /// Patterns are anchored: with `use_regex`, `db\..*` matches whole names only.
    pub fn new(includes: &[String], excludes: &[String], use_regex: bool) -> Result<Self> {
        Ok(Self {
            includes: Matcher::new(includes, use_regex)?,
            excludes: Matcher::new(excludes, use_regex)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        (self.includes.is_empty() || self.includes.matches(name)) && !self.excludes.matches(name)
    }
}

impl Default for MetricFilter {
    fn default() -> Self {
        Self::all()
    }
}
