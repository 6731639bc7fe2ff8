//! The declaration set: declared type name -> IR element
//!
//! Every pass takes the set by `&mut` and rewrites entries in place. The
//! table is ordered so that iteration, and therefore logging and error
//! order, is the same on every run.

use crate::elem::Elem;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationSet {
    elems: BTreeMap<String, Elem>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or overwrite) the element for `name`
    pub fn insert(&mut self, name: &str, elem: Elem) -> Option<Elem> {
        self.elems.insert(name.to_string(), elem)
    }

    pub fn get(&self, name: &str) -> Option<&Elem> {
        self.elems.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elems.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Declared names in ascending order
    pub fn names(&self) -> Vec<String> {
        self.elems.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Elem> {
        self.elems.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Elem> {
        self.elems.iter_mut()
    }
}

impl<'a> IntoIterator for &'a DeclarationSet {
    type Item = (&'a String, &'a Elem);
    type IntoIter = btree_map::Iter<'a, String, Elem>;

    fn into_iter(self) -> Self::IntoIter {
        self.elems.iter()
    }
}
