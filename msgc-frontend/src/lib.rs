//! msgc - Frontend
//!
//! This crate turns declaration fragments into the finished IR:
//! - Decl: the fragment model handed over by the host-language parser
//! - Annotation: struct tag lookup and field annotations
//! - Builder: fragment to IR translation
//! - Directives: `//msgp:` comment directives
//! - FileSet: the full pipeline over one unit

pub mod annotation;
pub mod builder;
pub mod decl;
pub mod directives;
pub mod fileset;

pub use annotation::{Annotation, Marker, TagIndex};
pub use builder::IrBuilder;
pub use decl::{FieldDecl, LenExpr, SourceUnit, TypeExpr, TypeSpec};
pub use directives::{Method, PassDirective};
pub use fileset::FileSet;

use log::debug;
use msgc_common::{GenConfig, GenError, Trail};

/// High-level frontend interface
#[derive(Debug, Clone, Default)]
pub struct Frontend {
    /// Starting configuration; file directives are applied on top
    pub config: GenConfig,
    /// Keep unexported declarations and fields
    pub unexported: bool,
}

impl Frontend {
    pub fn new(config: GenConfig) -> Self {
        Self {
            config,
            unexported: false,
        }
    }

    pub fn with_unexported(mut self, unexported: bool) -> Self {
        self.unexported = unexported;
        self
    }

    /// Process one source unit
    pub fn process_unit(&self, mut unit: SourceUnit) -> Result<FileSet, GenError> {
        if !self.unexported {
            unit.retain_exported();
        }
        FileSet::from_unit(&unit, self.config.clone())
    }

    /// Process a source unit given as JSON
    pub fn process_json(&self, json: &str) -> Result<FileSet, GenError> {
        let unit: SourceUnit =
            serde_json::from_str(json).map_err(|e| GenError::invalid_unit(e.to_string(), &Trail::new()))?;
        debug!("loaded unit {:?} with {} spec(s)", unit.name, unit.specs.len());
        self.process_unit(unit)
    }
}
