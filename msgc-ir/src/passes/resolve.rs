//! Alias chain resolution
//!
//! An identifier element can only express one level of indirection
//! (`Foo -> uint8`), so declarations like
//!
//! ```text
//! type A uint64
//! type B A
//! type C B
//! type D C
//! ```
//!
//! are parked in a [`Linkset`] while everything else is translated, then
//! resolved here until `D` is simply a `uint64` named `D`.

use crate::decls::DeclarationSet;
use crate::elem::Elem;
use log::{debug, warn};
use msgc_common::{GenError, Trail};
use std::collections::BTreeMap;

/// Pending alias name -> the unresolved identifier naming its target
#[derive(Debug, Clone, Default)]
pub struct Linkset {
    pending: BTreeMap<String, Elem>,
}

impl Linkset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `name` until its target is available
    pub fn defer(&mut self, name: &str, target: Elem) {
        self.pending.insert(name.to_string(), target);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Resolve every pending alias against `decls`.
///
/// Each round copies the finished element of every target that is already
/// known, renames the copy after the pending name and installs it. Rounds
/// repeat while they make progress. Whatever is left is reported in one
/// error.
pub fn resolve_aliases(
    decls: &mut DeclarationSet,
    mut links: Linkset,
    trail: &Trail,
) -> Result<(), GenError> {
    let mut progress = true;
    let mut round = 0;
    while progress && !links.is_empty() {
        progress = false;
        round += 1;
        let names: Vec<String> = links.pending.keys().cloned().collect();
        for name in names {
            let Some(target) = links.pending.get(&name).map(Elem::type_name) else {
                continue;
            };
            if let Some(real) = decls.get(&target) {
                let mut resolved = real.clone();
                resolved.set_alias(&name);
                debug!("{}: {} -> {} (round {})", trail, name, target, round);
                decls.insert(&name, resolved);
                links.pending.remove(&name);
                progress = true;
            }
        }
    }

    if links.is_empty() {
        return Ok(());
    }

    let pending: Vec<(String, String)> = links
        .pending
        .iter()
        .map(|(name, target)| (name.clone(), target.type_name()))
        .collect();
    for (name, target) in &pending {
        warn!("{}: couldn't resolve type {} ({})", trail, name, target);
    }
    Err(GenError::UnresolvedTypes {
        trail: trail.clone(),
        pending,
    })
}
