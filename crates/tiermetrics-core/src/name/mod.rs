//! Metric names: dotted hierarchy paths and the `[+]` bundle annotation.

pub mod bundle;
pub mod hierarchy;

pub use bundle::{expand, BundleMember, BundleSpec, BUNDLE_MARKER};
pub use hierarchy::LevelTree;

/// Path separator between name segments.
pub const SEPARATOR: char = '.';

/// Join a base name and further segments with `.`, skipping empty parts.
///
/// `name("db.pool", &["conn", "active"])` gives `db.pool.conn.active`.
pub fn name(base: &str, parts: &[&str]) -> String {
    let mut out = String::with_capacity(base.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
    for part in std::iter::once(&base).chain(parts.iter()) {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(part);
    }
    out
}

/// True when `name` equals `prefix` or lies below it in the hierarchy.
///
/// The empty prefix contains every name.
pub fn is_within(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}
