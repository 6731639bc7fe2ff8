//! Inlining of simple named types
//!
//! After translation every non-primitive type is encoded through its own
//! generated routine. Here the definition of a referenced type is pushed
//! into the referencing tree *if* that type is simple enough, so
//!
//! ```text
//! type A [4]int
//! ```
//!
//! is encoded in place by its users, whereas
//!
//! ```text
//! type B [3]map[string]struct{A, B [4]string}
//! ```
//!
//! keeps its own routine.
//!
//! While walking struct fields the pass also checks that no tag is used
//! twice. Duplicate tags and unresolved identifiers are collected across the
//! whole set before the pass fails.

use crate::decls::DeclarationSet;
use crate::elem::Elem;
use log::{debug, info};
use msgc_common::{ErrorReporter, GenError, Trail};
use std::collections::HashSet;

/// Approximate node count below which a type is inlined
pub const MAX_COMPLEXITY: usize = 5;

struct Inliner<'a> {
    decls: &'a DeclarationSet,
    reporter: &'a mut ErrorReporter,
    /// Names whose definitions are currently being walked, outermost first
    roots: Vec<String>,
}

impl Inliner<'_> {
    /// Walk a top-level declaration; problems are recorded in the reporter
    fn visit_decl(&mut self, name: &str, elem: &mut Elem, trail: &Trail) {
        self.roots.clear();
        self.roots.push(name.to_string());
        match elem {
            // a top-level identifier is a registered shim: nothing to inline
            Elem::Base(_) => {}
            Elem::Struct(_) => self.visit(elem, trail),
            _ => {
                for child in elem.children_mut() {
                    self.visit(child, trail);
                }
            }
        }
    }

    fn visit(&mut self, elem: &mut Elem, trail: &Trail) {
        if let Some(typ) = elem.ident_name().map(str::to_string) {
            self.visit_ident(elem, typ, trail);
            return;
        }
        match elem {
            Elem::Struct(s) => {
                let mut seen = HashSet::with_capacity(s.fields.len());
                for field in &mut s.fields {
                    let field_trail = trail.with(&field.name);
                    self.visit(&mut field.elem, &field_trail);
                    if !seen.insert(field.tag) {
                        self.reporter.error(GenError::DuplicateTag {
                            trail: field_trail,
                            tag: field.tag,
                        });
                    }
                }
            }
            Elem::Base(_) | Elem::LocalizedString(_) | Elem::Placeholder(_) => {}
            _ => {
                for child in elem.children_mut() {
                    self.visit(child, trail);
                }
            }
        }
    }

    fn visit_ident(&mut self, elem: &mut Elem, typ: String, trail: &Trail) {
        // never inline a type into itself
        if self.roots.last().is_some_and(|root| *root == typ) {
            return;
        }

        match self.decls.get(&typ) {
            Some(node) if node.complexity() < MAX_COMPLEXITY => {
                // roots hold distinct declared names, so the walk is bounded
                if self.roots.contains(&typ) {
                    debug!("{}: {} refers back to itself, keeping the reference", trail, typ);
                    return;
                }

                info!("{}: inlining {}", trail, typ);
                *elem = node.clone();
                self.roots.push(typ);
                self.visit(elem, trail);
                self.roots.pop();
            }
            Some(_) => {}
            None if !elem.is_resolved() => {
                // not a primitive, not a library builtin, not a processed type
                self.reporter.error(GenError::UnresolvedIdentifier {
                    trail: trail.clone(),
                    name: typ,
                });
            }
            None => {}
        }
    }
}

/// Inline every simple enough reference in `decls`.
///
/// Declarations are processed by ascending complexity, ties broken by
/// name, so the output does not depend on table order.
pub fn inline_simple_types(decls: &mut DeclarationSet, trail: &Trail) -> Result<(), GenError> {
    let mut order: Vec<(usize, String)> = decls
        .iter()
        .map(|(name, elem)| (elem.complexity(), name.clone()))
        .collect();
    order.sort();

    let mut reporter = ErrorReporter::new();
    for (_, name) in order {
        let decl_trail = trail.with(&name);
        let Some(mut elem) = decls.get(&name).cloned() else {
            continue;
        };
        let mut inliner = Inliner {
            decls: &*decls,
            reporter: &mut reporter,
            roots: Vec::new(),
        };
        inliner.visit_decl(&name, &mut elem, &decl_trail);
        decls.insert(&name, elem);
    }
    reporter.finish()
}
