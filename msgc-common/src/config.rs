//! Generator configuration
//!
//! Flags collected from the command line and from file-level directives.
//! The finished set is handed to the printer together with the IR.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Annotation namespaces consulted when the configured tag name yields nothing
pub const DEFAULT_TAG_NAMES: [&str; 2] = ["msg", "msgpack"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Struct tag key read before the defaults (`tag` directive)
    pub tag_name: Option<String>,
    /// Generate methods with pointer receivers (`pointer` directive)
    pub pointer_receiver: bool,
    /// Encode time values with the -1 extension (`newtime` directive)
    pub new_time: bool,
    /// Use 32-bit floats when no precision is lost (`compactfloats` directive)
    pub compact_floats: bool,
    /// Zero omitted fields on decode (`clearomitted` directive)
    pub clear_omitted: bool,
    /// Types the printer must not generate code for (`ignore` directive)
    pub suppressed: BTreeSet<String>,
}

impl GenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag keys in lookup order
    pub fn tag_keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(3);
        if let Some(name) = self.tag_name.as_deref() {
            if !name.is_empty() {
                keys.push(name);
            }
        }
        keys.extend(DEFAULT_TAG_NAMES);
        keys
    }

    pub fn is_suppressed(&self, name: &str) -> bool {
        self.suppressed.contains(name)
    }
}
