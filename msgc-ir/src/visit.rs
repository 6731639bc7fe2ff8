//! Child traversal shared by the rewriting passes
//!
//! The shim rewrite, the inliner and the string localizer all walk the same
//! set of child positions. Map keys are not among them: a key keeps the
//! exact type it was declared with.

use crate::elem::Elem;

impl Elem {
    /// Child elements a rewrite may descend into (map keys excluded)
    pub fn children(&self) -> Vec<&Elem> {
        match self {
            Elem::Struct(s) => s.fields.iter().map(|f| &f.elem).collect(),
            Elem::Slice(s) => vec![&*s.elem],
            Elem::Array(a) => vec![&*a.elem],
            Elem::Map(m) => vec![&*m.value],
            Elem::Ptr(p) => vec![&*p.value],
            Elem::Base(_) | Elem::LocalizedString(_) | Elem::Placeholder(_) => Vec::new(),
        }
    }

    /// Mutable child elements a rewrite may replace (map keys excluded)
    pub fn children_mut(&mut self) -> Vec<&mut Elem> {
        match self {
            Elem::Struct(s) => s.fields.iter_mut().map(|f| &mut f.elem).collect(),
            Elem::Slice(s) => vec![&mut *s.elem],
            Elem::Array(a) => vec![&mut *a.elem],
            Elem::Map(m) => vec![&mut *m.value],
            Elem::Ptr(p) => vec![&mut *p.value],
            Elem::Base(_) | Elem::LocalizedString(_) | Elem::Placeholder(_) => Vec::new(),
        }
    }

    /// Replace every reference named `id` below this element with a copy of
    /// `replacement`, keeping the variable name of the replaced node.
    /// Returns the number of replaced references.
    pub fn replace_refs(&mut self, id: &str, replacement: &Elem) -> usize {
        let mut replaced = 0;
        for child in self.children_mut() {
            if child.type_name() == id {
                let varname = child.varname().to_string();
                *child = replacement.clone();
                child.set_varname(&varname);
                replaced += 1;
            } else {
                replaced += child.replace_refs(id, replacement);
            }
        }
        replaced
    }
}
