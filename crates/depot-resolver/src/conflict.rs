//! Conflicts encountered during resolution.

use std::fmt;

/// A report of all conflicts encountered during one resolve call.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

/// A dependency edge whose version range could not be honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub package_id: String,
    pub range: String,
    /// `id@version` of the package that declared the edge.
    pub required_by: String,
    pub required: bool,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// One message per conflict, in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.required { "required" } else { "optional" };
        write!(
            f,
            "{}@{} ({kind}, needed by {}): {}",
            self.package_id, self.range, self.required_by, self.reason
        )
    }
}
