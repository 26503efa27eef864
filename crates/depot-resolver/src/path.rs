//! The set of `id@version` keys on the active traversal path.
//!
//! Each recursive step forks its own copy with [`PathSet::with`], so sibling
//! branches never observe each other's visits. Revisiting a key already on
//! the path means a cycle, and the branch is truncated there.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct PathSet {
    keys: HashSet<String>,
    trail: Vec<String>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this path extended by `key`.
    pub fn with(&self, key: &str) -> Self {
        let mut next = self.clone();
        if next.keys.insert(key.to_string()) {
            next.trail.push(key.to_string());
        }
        next
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Keys from the root of the traversal to the current node.
    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    pub fn depth(&self) -> usize {
        self.trail.len()
    }

    /// Render the cycle closed by revisiting `key`, e.g.
    /// `A@1.0 -> B@2.0 -> A@1.0`. Returns `None` if `key` is not on the path.
    pub fn cycle_through(&self, key: &str) -> Option<String> {
        let start = self.trail.iter().position(|k| k == key)?;
        let mut parts: Vec<&str> = self.trail[start..].iter().map(String::as_str).collect();
        parts.push(key);
        Some(parts.join(" -> "))
    }
}
