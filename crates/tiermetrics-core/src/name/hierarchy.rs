//! Level map over the name hierarchy.
//!
//! Levels can be configured on any prefix of a dotted name. The effective
//! level of a name is the level of its nearest configured ancestor (the name
//! itself included), or the root level when no ancestor is configured.

use std::collections::HashMap;

use crate::level::Level;
use crate::name::SEPARATOR;

#[derive(Debug, Clone)]
pub struct LevelTree {
    root: Level,
    levels: HashMap<String, Level>,
}

impl LevelTree {
    pub fn new(root: Level) -> Self {
        Self {
            root,
            levels: HashMap::new(),
        }
    }

    pub fn root(&self) -> Level {
        self.root
    }

    pub fn set_root(&mut self, level: Level) {
        self.root = level;
    }

    /// Configure `level` at `prefix`. The empty prefix is the root.
    pub fn set(&mut self, prefix: &str, level: Level) {
        if prefix.is_empty() {
            self.root = level;
        } else {
            self.levels.insert(prefix.to_owned(), level);
        }
    }

    /// Drop an explicit entry so the prefix inherits again.
    pub fn unset(&mut self, prefix: &str) -> Option<Level> {
        self.levels.remove(prefix)
    }

    /// Explicitly configured level at exactly `prefix`.
    pub fn get(&self, prefix: &str) -> Option<Level> {
        if prefix.is_empty() {
            return Some(self.root);
        }
        self.levels.get(prefix).copied()
    }

    /// Walk from the full name towards the root and return the first configured level.
    pub fn effective_level(&self, name: &str) -> Level {
        let mut candidate = name;
        loop {
            if let Some(level) = self.levels.get(candidate) {
                return *level;
            }
            match candidate.rfind(SEPARATOR) {
                Some(idx) => candidate = &candidate[..idx],
                None => return self.root,
            }
        }
    }

    pub fn configured(&self) -> impl Iterator<Item = (&str, Level)> {
        self.levels.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for LevelTree {
    fn default() -> Self {
        Self::new(Level::default())
    }
}
