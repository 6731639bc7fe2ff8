//! The processed unit handed to the printer

use crate::builder::IrBuilder;
use crate::decl::SourceUnit;
use crate::directives::{apply_early, apply_late, parse_pass_directives, yield_directives, LateContext, PassDirective};
use log::{debug, info};
use msgc_common::{GenConfig, GenError, Trail};
use msgc_ir::passes::{finalize_structs, inline_simple_types, resolve_aliases};
use msgc_ir::{DeclarationSet, Elem};
use serde::{Deserialize, Serialize};

/// Variable name the printer binds the receiver to
pub const RECEIVER_VARNAME: &str = "z";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSet {
    pub package: String,
    /// Finished declarations: resolved, inlined, normalized
    pub identities: DeclarationSet,
    pub config: GenConfig,
    /// Per-method directives left for the printer
    pub directives: Vec<PassDirective>,
}

impl FileSet {
    /// Run the whole pipeline over one unit.
    ///
    /// Either every pass succeeds or nothing is returned.
    pub fn from_unit(unit: &SourceUnit, mut config: GenConfig) -> Result<FileSet, GenError> {
        let unit_name = if unit.name.is_empty() { &unit.package } else { &unit.name };
        let trail = Trail::root(unit_name);

        let specs = unit.type_specs();
        if specs.is_empty() {
            return Err(GenError::NoDefinitions { trail });
        }
        debug!("{}: {} type spec(s)", trail, specs.len());

        let lines = yield_directives(&unit.comments);
        let lines = apply_early(lines, &mut config, &trail)?;

        let builder = IrBuilder::new(&specs, &config);
        let (mut decls, links) = builder.build_all(&trail)?;
        resolve_aliases(&mut decls, links, &trail)?;

        let lines = {
            let mut ctx = LateContext {
                decls: &mut decls,
                config: &mut config,
                builder: &builder,
            };
            apply_late(lines, &mut ctx, &trail)?
        };

        inline_simple_types(&mut decls, &trail)?;
        finalize_structs(&mut decls);

        let directives = parse_pass_directives(&lines, &trail);
        info!("{}: {} declaration(s) ready", trail, decls.len());
        Ok(FileSet {
            package: unit.package.clone(),
            identities: decls,
            config,
            directives,
        })
    }

    /// Declarations the printer generates code for, in name order, each
    /// bound to the receiver variable
    pub fn printable(&self) -> Vec<(String, Elem)> {
        self.identities
            .iter()
            .filter(|(name, _)| !self.config.is_suppressed(name))
            .map(|(name, elem)| {
                let mut elem = elem.clone();
                elem.set_varname(RECEIVER_VARNAME);
                (name.clone(), elem)
            })
            .collect()
    }
}
