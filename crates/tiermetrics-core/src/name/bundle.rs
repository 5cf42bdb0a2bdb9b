//! Expansion of annotated names into bundles.
//!
//! `p1.p2[+].p3.metric` expands to the short member `p1.p2.metric` and the
//! full member `p1.p2.p3.metric`, always in that order. A name without the
//! marker is a bundle of one.

use crate::error::{MetricsError, Result};
use crate::level::Level;
use crate::name::SEPARATOR;

pub const BUNDLE_MARKER: &str = "[+]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMember {
    pub name: String,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSpec {
    members: Vec<BundleMember>,
}

impl BundleSpec {
    /// Members in bundle order: short first, full second.
    pub fn members(&self) -> &[BundleMember] {
        &self.members
    }

    pub fn primary(&self) -> &BundleMember {
        &self.members[0]
    }

    pub fn is_bundle(&self) -> bool {
        self.members.len() > 1
    }

    pub fn into_members(self) -> Vec<BundleMember> {
        self.members
    }
}

/// Expand `raw` and pair the resulting members positionally with `levels`.
pub fn expand(raw: &str, levels: &[Level]) -> Result<BundleSpec> {
    let invalid = |why: &str| MetricsError::InvalidName(format!("{raw}: {why}"));

    let mut segments: Vec<&str> = Vec::new();
    let mut marker: Option<usize> = None;
    for (idx, segment) in raw.split(SEPARATOR).enumerate() {
        let plain = match segment.strip_suffix(BUNDLE_MARKER) {
            Some(stripped) => {
                if marker.replace(idx).is_some() {
                    return Err(invalid("bundle marker used more than once"));
                }
                stripped
            }
            None => segment,
        };
        if plain.is_empty() {
            return Err(invalid("empty segment"));
        }
        if plain.contains(['[', ']']) || plain.contains(char::is_whitespace) {
            return Err(invalid("illegal character in segment"));
        }
        segments.push(plain);
    }

    let last = segments.len() - 1;
    let names = match marker {
        None => vec![segments.join(".")],
        Some(idx) if idx == last => {
            return Err(invalid("bundle marker on the metric segment"));
        }
        Some(idx) if idx + 1 == last => {
            return Err(invalid("bundle marker must be followed by a sub-path"));
        }
        Some(idx) => {
            let mut short: Vec<&str> = segments[..=idx].to_vec();
            short.push(segments[last]);
            vec![short.join("."), segments.join(".")]
        }
    };

    if names.len() != levels.len() {
        return Err(invalid(&format!(
            "expected {} level(s), got {}",
            names.len(),
            levels.len()
        )));
    }

    let members = names
        .into_iter()
        .zip(levels.iter().copied())
        .map(|(name, level)| BundleMember { name, level })
        .collect();
    Ok(BundleSpec { members })
}
