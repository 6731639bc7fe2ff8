//! Struct finalization: string localization and tag normalization
//!
//! Structs are encoded as positional tuples. A tag that no field uses
//! still occupies its position, so missing tags are materialized as
//! placeholders and fields are ordered by tag. String leaves reachable from
//! struct fields are switched to the localized string encoding that the
//! other language bindings expect.

use crate::decls::DeclarationSet;
use crate::elem::{Elem, Field, Primitive, StructElem};
use log::trace;
use std::collections::HashSet;

/// Retag every plain string below `elem` as a localized string.
///
/// Map keys are never visited and localized strings are not descended
/// into. Strings carrying a shim conversion keep their base form.
pub fn localize_strings(elem: &mut Elem) {
    let localized = match elem {
        Elem::Base(b) if b.value == Primitive::String && !b.is_shimmed() => Some(b.common.clone()),
        Elem::LocalizedString(_) => return,
        _ => None,
    };
    match localized {
        Some(common) => *elem = Elem::LocalizedString(common),
        None => {
            for child in elem.children_mut() {
                localize_strings(child);
            }
        }
    }
}

/// Fill unused tag slots with placeholders and sort fields by tag.
///
/// A struct whose field count already equals `max tag + 1` is left
/// untouched. Returns true if the field list changed.
pub fn fill_tag_gaps(s: &mut StructElem) -> bool {
    let Some(max_tag) = s.fields.iter().map(|f| f.tag).max() else {
        return false;
    };
    if usize::from(max_tag) + 1 == s.fields.len() {
        return false;
    }

    let used: HashSet<u16> = s.fields.iter().map(|f| f.tag).collect();
    for tag in 0..=max_tag {
        if !used.contains(&tag) {
            s.fields.push(Field::placeholder(tag));
        }
    }
    s.fields.sort_by_key(|f| f.tag);
    true
}

/// Localize the field strings of every struct reachable from `elem`.
///
/// Structs reached through slices, arrays, maps or pointers are covered, so
/// a struct inlined into a container encodes its strings exactly like its
/// own declaration does.
pub fn localize_struct_fields(elem: &mut Elem) {
    match elem {
        Elem::Struct(s) => {
            for field in &mut s.fields {
                localize_strings(&mut field.elem);
            }
        }
        _ => {
            for child in elem.children_mut() {
                localize_struct_fields(child);
            }
        }
    }
}

/// Gap-fill `elem` and every struct nested below it
pub fn normalize_elem(elem: &mut Elem) -> usize {
    let mut changed = 0;
    if let Elem::Struct(s) = elem {
        if fill_tag_gaps(s) {
            changed += 1;
        }
    }
    for child in elem.children_mut() {
        changed += normalize_elem(child);
    }
    changed
}

/// Finalize every declaration: localize struct field strings, then make
/// every struct's tag space dense.
pub fn finalize_structs(decls: &mut DeclarationSet) {
    for (name, elem) in decls.iter_mut() {
        localize_struct_fields(elem);
        let changed = normalize_elem(elem);
        if changed > 0 {
            trace!("{}: filled tag gaps in {} struct(s)", name, changed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn string() -> Elem {
        Elem::ident("string")
    }

    #[test]
    fn test_gap_fill_scenario() {
        // S { A string@0, C string@3 }
        let mut decls = DeclarationSet::new();
        decls.insert(
            "S",
            Elem::structure(vec![Field::new(3, "C", string()), Field::new(0, "A", string())]),
        );
        finalize_structs(&mut decls);

        let Some(Elem::Struct(s)) = decls.get("S") else {
            panic!("Expected struct");
        };
        let tags: Vec<u16> = s.fields.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
        assert!(matches!(s.fields[0].elem, Elem::LocalizedString(_)));
        assert!(matches!(s.fields[1].elem, Elem::Placeholder(_)));
        assert!(matches!(s.fields[2].elem, Elem::Placeholder(_)));
        assert!(matches!(s.fields[3].elem, Elem::LocalizedString(_)));
        assert_eq!(s.fields[3].name, "C");
    }

    #[test]
    fn test_dense_struct_untouched() {
        let mut s = StructElem {
            common: Default::default(),
            fields: vec![
                Field::new(1, "B", Elem::ident("int")),
                Field::new(0, "A", Elem::ident("int")),
                Field::new(2, "C", Elem::ident("int")),
            ],
        };
        let before = s.clone();
        assert!(!fill_tag_gaps(&mut s));
        assert_eq!(s, before);
    }

    #[test]
    fn test_gap_fill_has_max_plus_one_fields() {
        let mut s = StructElem {
            common: Default::default(),
            fields: vec![
                Field::new(9, "J", Elem::ident("int")),
                Field::new(300, "Far", Elem::ident("int")),
            ],
        };
        assert!(fill_tag_gaps(&mut s));
        assert_eq!(s.fields.len(), 301);
        assert!(s.fields.windows(2).all(|w| w[0].tag + 1 == w[1].tag));
        assert_eq!(s.fields[9].name, "J");
    }

    #[test]
    fn test_empty_struct_untouched() {
        let mut s = StructElem {
            common: Default::default(),
            fields: Vec::new(),
        };
        assert!(!fill_tag_gaps(&mut s));
    }

    #[test]
    fn test_localize_reaches_nested_positions_but_not_keys() {
        let mut elem = Elem::structure(vec![
            Field::new(0, "M", Elem::map(string(), Elem::slice(string()))),
            Field::new(1, "P", Elem::ptr(string())),
            Field::new(2, "A", Elem::array("2", string())),
            Field::new(3, "N", Elem::structure(vec![Field::new(0, "X", string())])),
        ]);
        localize_strings(&mut elem);

        let Elem::Struct(s) = &elem else {
            panic!("Expected struct");
        };
        let Elem::Map(m) = &s.fields[0].elem else {
            panic!("Expected map");
        };
        assert_eq!(*m.key, string());
        assert_eq!(m.value.children()[0], &Elem::LocalizedString(Default::default()));
        assert!(matches!(s.fields[1].elem.children()[0], Elem::LocalizedString(_)));
        assert!(matches!(s.fields[2].elem.children()[0], Elem::LocalizedString(_)));
        assert!(matches!(s.fields[3].elem.children()[0], Elem::LocalizedString(_)));
    }

    #[test]
    fn test_localize_keeps_alias_and_skips_shims() {
        let mut named = string();
        named.set_alias("Name");
        localize_strings(&mut named);
        assert_eq!(named.type_name(), "Name");
        assert!(matches!(named, Elem::LocalizedString(_)));

        let mut shimmed = string();
        if let Elem::Base(b) = &mut shimmed {
            b.shim_to_base = Some("toString".to_string());
        }
        localize_strings(&mut shimmed);
        assert!(matches!(shimmed, Elem::Base(_)));
    }

    #[test]
    fn test_top_level_string_alias_not_localized() {
        let mut decls = DeclarationSet::new();
        let mut named = string();
        named.set_alias("Name");
        decls.insert("Name", named.clone());
        finalize_structs(&mut decls);
        assert_eq!(decls.get("Name"), Some(&named));
    }

    #[test]
    fn test_structs_inside_containers_localized() {
        let row = || Elem::structure(vec![Field::new(0, "Name", string())]);
        let mut decls = DeclarationSet::new();
        decls.insert("Rows", Elem::slice(row()));
        decls.insert("Index", Elem::map(string(), Elem::array("2", row())));
        decls.insert("Names", Elem::slice(string()));
        finalize_structs(&mut decls);

        let Some(Elem::Slice(rows)) = decls.get("Rows") else {
            panic!("Expected slice");
        };
        assert!(matches!(rows.elem.children()[0], Elem::LocalizedString(_)));

        let Some(Elem::Map(index)) = decls.get("Index") else {
            panic!("Expected map");
        };
        assert_eq!(*index.key, string());
        let inner = index.value.children()[0];
        assert!(matches!(inner.children()[0], Elem::LocalizedString(_)));

        // strings outside any struct keep their plain encoding
        assert_eq!(decls.get("Names"), Some(&Elem::slice(string())));
    }

    #[test]
    fn test_nested_struct_gaps_filled() {
        let mut elem = Elem::slice(Elem::structure(vec![Field::new(2, "C", Elem::ident("int"))]));
        assert_eq!(normalize_elem(&mut elem), 1);
        let Elem::Slice(s) = &elem else {
            panic!("Expected slice");
        };
        let Elem::Struct(inner) = &*s.elem else {
            panic!("Expected struct");
        };
        assert_eq!(inner.fields.len(), 3);
    }
}
