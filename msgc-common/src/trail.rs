//! Breadcrumb tracking for error reporting
//!
//! Declarations are keyed by name rather than by source position, so
//! diagnostics carry the chain of unit/type/field names that was being
//! processed when they were raised. A `Trail` is threaded explicitly
//! through every pass instead of living in global state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of names from the outermost scope to the innermost
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trail {
    segments: Vec<String>,
}

impl Trail {
    /// Create an empty trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trail rooted at a single name (usually the unit name)
    pub fn root(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    /// Return a copy of this trail extended by one more name
    pub fn with(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Check if `name` already appears anywhere on the trail
    pub fn contains(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s == name)
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<top>");
        }
        write!(f, "{}", self.segments.join(": "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_display() {
        let trail = Trail::root("types.go").with("Player").with("Name");
        assert_eq!(format!("{}", trail), "types.go: Player: Name");
        assert_eq!(format!("{}", Trail::new()), "<top>");
    }

    #[test]
    fn test_trail_with_does_not_mutate() {
        let base = Trail::root("unit");
        let child = base.with("A");
        assert_eq!(base.to_string(), "unit");
        assert_eq!(child.to_string(), "unit: A");
        assert!(child.contains("A"));
        assert!(!base.contains("A"));
    }
}
