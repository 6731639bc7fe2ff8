//! IR builder
//!
//! Translates declaration fragments into IR elements. Structural problems
//! (unsupported key kinds, pointers, malformed tags) fail the translation
//! right away; the error names the declaration and field being built.

use crate::annotation::{Annotation, Marker, TagIndex};
use crate::decl::{FieldDecl, LenExpr, TypeExpr};
use log::{debug, trace, warn};
use msgc_common::{GenConfig, GenError, Trail};
use msgc_ir::passes::Linkset;
use msgc_ir::{DeclarationSet, Elem, Field, Primitive};
use std::collections::BTreeMap;

/// Scalar wrappers the host binding lets through behind a pointer
pub const POINTER_WRAPPERS: [&str; 3] = ["msgp.Extension", "msgp.Raw", "msgp.Number"];

pub struct IrBuilder<'a> {
    specs: &'a BTreeMap<String, TypeExpr>,
    tag_keys: Vec<String>,
}

impl<'a> IrBuilder<'a> {
    pub fn new(specs: &'a BTreeMap<String, TypeExpr>, config: &GenConfig) -> Self {
        Self {
            specs,
            tag_keys: config.tag_keys().into_iter().map(str::to_string).collect(),
        }
    }

    /// Translate every declaration.
    ///
    /// Declarations that are bare names of other user types can't be
    /// finished yet; they are returned in the linkset for the alias
    /// resolver.
    pub fn build_all(&self, trail: &Trail) -> Result<(DeclarationSet, Linkset), GenError> {
        let mut decls = DeclarationSet::new();
        let mut links = Linkset::new();
        for (name, ty) in self.specs {
            let decl_trail = trail.with(name);
            let mut elem = self.parse_expr(ty, &decl_trail)?;
            if elem.ident_name().is_some() {
                trace!("{}: deferring {} -> {}", decl_trail, name, elem);
                links.defer(name, elem);
                continue;
            }
            elem.set_alias(name);
            decls.insert(name, elem);
        }
        debug!(
            "{}: built {} declaration(s), {} pending alias(es)",
            trail,
            decls.len(),
            links.len()
        );
        Ok((decls, links))
    }

    /// Translate one type expression
    pub fn parse_expr(&self, ty: &TypeExpr, trail: &Trail) -> Result<Elem, GenError> {
        match ty {
            TypeExpr::Map { key, value } => {
                let key = self.parse_expr(key, trail)?;
                if !is_valid_map_key(&key) {
                    return Err(GenError::translate(
                        format!("map key only supports string/int-family, found {}", key),
                        trail,
                    ));
                }
                let value = self.parse_expr(value, trail)?;
                Ok(Elem::map(key, value))
            }

            TypeExpr::Ident(name) => {
                let elem = Elem::ident(name);
                if elem.ident_name().is_some() && !self.specs.contains_key(name) {
                    warn!("{}: non-local identifier: {}", trail, name);
                }
                Ok(elem)
            }

            TypeExpr::Selector { .. } => Ok(Elem::ident(&ty.to_string())),

            TypeExpr::Array { len: None, elem } if **elem == TypeExpr::ident("byte") => {
                Ok(Elem::primitive(Primitive::Bytes))
            }

            TypeExpr::Array { len, elem } => {
                let inner = self.parse_expr(elem, trail)?;
                match len {
                    None => Ok(Elem::slice(inner)),
                    Some(LenExpr::Expr(text)) => Err(GenError::translate(
                        format!("unsupported array length expression [{}]", text),
                        trail,
                    )),
                    Some(size) => Ok(Elem::array(&size.to_string(), inner)),
                }
            }

            TypeExpr::Star(inner) => {
                let target = inner.to_string();
                if POINTER_WRAPPERS.contains(&target.as_str()) {
                    return Ok(Elem::ptr(Elem::ident(&target)));
                }
                Err(GenError::translate(
                    format!("pointer types are not supported [{}]", ty),
                    trail,
                ))
            }

            TypeExpr::Struct { fields } => {
                let mut next = 0;
                let fields = self.parse_field_list(fields, &mut next, trail)?;
                Ok(Elem::structure(fields))
            }

            TypeExpr::Interface { methods } if methods.is_empty() => Ok(Elem::primitive(Primitive::Intf)),

            TypeExpr::Interface { .. } => Err(GenError::translate("invalid interface type", trail)),

            TypeExpr::Chan(_) | TypeExpr::Func => Err(GenError::translate(
                format!("types not supported [{}]", ty),
                trail,
            )),
        }
    }

    /// Translate a struct body. `next` is the next implicit tag and is
    /// shared with flattened embeds.
    pub fn parse_field_list(
        &self,
        fields: &[FieldDecl],
        next: &mut u32,
        trail: &Trail,
    ) -> Result<Vec<Field>, GenError> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let field_trail = trail.with(&field.display_name());
            let translated = self.get_field(field, next, &field_trail)?;
            if translated.is_empty() {
                debug!("{}: ignored", field_trail);
            }
            out.extend(translated);
        }
        Ok(out)
    }

    /// Translate one field declaration into zero (skipped), one, or several
    /// (multi-name or flattened) fields
    pub fn get_field(&self, field: &FieldDecl, next: &mut u32, trail: &Trail) -> Result<Vec<Field>, GenError> {
        let annotation = field
            .tag
            .as_deref()
            .map(|raw| Annotation::from_raw(raw, self.tag_keys.as_slice()));
        let (index, marker) = match &annotation {
            Some(a) => (a.index(trail)?, a.marker()),
            None => (TagIndex::Implicit, Marker::None),
        };

        if index == TagIndex::Skip {
            return Ok(Vec::new());
        }

        if marker == Marker::Flatten {
            if !field.names.is_empty() {
                return Err(GenError::translate("flatten field must be anonymous field", trail));
            }
            if let TagIndex::Explicit(seed) = index {
                *next = u32::from(seed);
            }
            return self.fields_from_embedded(&field.ty, next, trail);
        }

        let mut elem = self.parse_expr(&field.ty, trail)?;
        if marker == Marker::Extension {
            cast_extension(&mut elem, trail)?;
        }

        if let [_, _, ..] = field.names.as_slice() {
            // the field's own slot is spent first; the names take the tags
            // after it and carry no annotation
            match index {
                TagIndex::Explicit(tag) => *next = u32::from(tag) + 1,
                _ => *next += 1,
            }
            return field
                .names
                .iter()
                .map(|name| take_tag(next, trail).map(|tag| Field::new(tag, name, elem.clone())))
                .collect();
        }

        if let TagIndex::Explicit(tag) = index {
            *next = u32::from(tag);
        }
        let name = match field.names.first() {
            Some(name) => name.clone(),
            None => field.ty.embedded_name(),
        };
        let mut f = Field::new(take_tag(next, trail)?, &name, elem);
        f.raw_tag = field.tag.clone().unwrap_or_default();
        f.tag_parts = annotation.map(|a| a.parts).unwrap_or_default();
        Ok(vec![f])
    }

    /// Splice the fields of an embedded struct declaration
    fn fields_from_embedded(&self, ty: &TypeExpr, next: &mut u32, trail: &Trail) -> Result<Vec<Field>, GenError> {
        match ty {
            TypeExpr::Ident(name) => {
                let segment = format!("{} (flattened)", name);
                if trail.contains(&segment) {
                    return Err(GenError::translate(format!("{} flattens itself", name), trail));
                }
                match self.specs.get(name) {
                    Some(TypeExpr::Struct { fields }) => self.parse_field_list(fields, next, &trail.with(&segment)),
                    _ => {
                        warn!("{}: {} disabled, not struct type", trail, name);
                        Err(GenError::translate(format!("{} not struct type", name), trail))
                    }
                }
            }
            TypeExpr::Star(_) => {
                warn!("{}: {} disabled, pointer embeds not supported", trail, ty);
                Err(GenError::translate(format!("{} pointer embeds not supported", ty), trail))
            }
            other => {
                warn!("{}: {} cannot be flattened", trail, other);
                Err(GenError::translate(
                    format!("{} cannot be flattened, only local struct declarations can", other),
                    trail,
                ))
            }
        }
    }
}

fn take_tag(next: &mut u32, trail: &Trail) -> Result<u16, GenError> {
    let tag = u16::try_from(*next)
        .map_err(|_| GenError::translate(format!("implicit tag {} out of range", next), trail))?;
    *next += 1;
    Ok(tag)
}

fn is_valid_map_key(key: &Elem) -> bool {
    match key {
        Elem::Base(b) => b.common.alias.is_none() && (b.value == Primitive::String || b.value.is_integer()),
        _ => false,
    }
}

/// Retag a scalar, or the scalar behind a pointer, as an extension
fn cast_extension(elem: &mut Elem, trail: &Trail) -> Result<(), GenError> {
    let target = match elem {
        Elem::Ptr(p) => &mut *p.value,
        other => other,
    };
    match target {
        Elem::Base(b) => {
            b.value = Primitive::Ext;
            Ok(())
        }
        other => {
            warn!("{}: couldn't cast to extension", trail);
            Err(GenError::translate(format!("couldn't cast to extension {}", other), trail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs(items: &[(&str, TypeExpr)]) -> BTreeMap<String, TypeExpr> {
        items.iter().map(|(n, t)| (n.to_string(), t.clone())).collect()
    }

    fn build_one(ty: TypeExpr) -> Result<Elem, GenError> {
        let specs = specs(&[]);
        let builder = IrBuilder::new(&specs, &GenConfig::default());
        builder.parse_expr(&ty, &Trail::root("T"))
    }

    fn tags(elem: &Elem) -> Vec<(u16, String)> {
        match elem {
            Elem::Struct(s) => s.fields.iter().map(|f| (f.tag, f.name.clone())).collect(),
            other => panic!("Expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_map_keys() {
        let key_err = build_one(TypeExpr::map(TypeExpr::ident("bool"), TypeExpr::ident("int"))).unwrap_err();
        assert!(key_err.to_string().contains("map key only supports string/int-family"));

        assert!(build_one(TypeExpr::map(TypeExpr::ident("Name"), TypeExpr::ident("int"))).is_err());
        assert!(build_one(TypeExpr::map(TypeExpr::ident("float64"), TypeExpr::ident("int"))).is_err());

        for key in ["string", "int", "uint8", "int64", "byte"] {
            let m = build_one(TypeExpr::map(TypeExpr::ident(key), TypeExpr::ident("bool"))).unwrap();
            assert!(matches!(m, Elem::Map(_)), "{key}");
        }
    }

    #[test]
    fn test_byte_slice_and_arrays() {
        assert_eq!(
            build_one(TypeExpr::slice(TypeExpr::ident("byte"))).unwrap(),
            Elem::primitive(Primitive::Bytes)
        );
        assert_eq!(
            build_one(TypeExpr::parse("[16]byte").unwrap()).unwrap(),
            Elem::array("16", Elem::ident("byte"))
        );
        assert_eq!(
            build_one(TypeExpr::parse("[cfg.Size]int").unwrap()).unwrap(),
            Elem::array("cfg.Size", Elem::ident("int"))
        );
        assert!(build_one(TypeExpr::Array {
            len: Some(LenExpr::Expr("N*2".to_string())),
            elem: Box::new(TypeExpr::ident("int")),
        })
        .is_err());
    }

    #[test]
    fn test_pointers_rejected_except_wrappers() {
        assert!(build_one(TypeExpr::parse("*int").unwrap()).is_err());
        assert!(build_one(TypeExpr::parse("*Node").unwrap()).is_err());
        assert_eq!(
            build_one(TypeExpr::parse("*msgp.Raw").unwrap()).unwrap(),
            Elem::ptr(Elem::ident("msgp.Raw"))
        );
    }

    #[test]
    fn test_interfaces_and_unsupported() {
        assert_eq!(
            build_one(TypeExpr::Interface { methods: Vec::new() }).unwrap(),
            Elem::primitive(Primitive::Intf)
        );
        assert!(build_one(TypeExpr::Interface {
            methods: vec!["Read".to_string()]
        })
        .is_err());
        assert!(build_one(TypeExpr::Func).is_err());
        assert!(build_one(TypeExpr::Chan(Box::new(TypeExpr::ident("int")))).is_err());
    }

    #[test]
    fn test_tag_assignment() {
        let body = TypeExpr::Struct {
            fields: vec![
                FieldDecl::new(&["A"], TypeExpr::ident("int"), None),
                FieldDecl::new(&["B"], TypeExpr::ident("int"), Some(r#"`msg:"5"`"#)),
                FieldDecl::new(&["C"], TypeExpr::ident("int"), Some(r#"`msg:""`"#)),
                FieldDecl::new(&["D"], TypeExpr::ident("int"), Some(r#"`msg:"-"`"#)),
                FieldDecl::new(&["E"], TypeExpr::ident("int"), Some(r#"`json:"e"`"#)),
            ],
        };
        let elem = build_one(body).unwrap();
        assert_eq!(
            tags(&elem),
            vec![
                (0, "A".to_string()),
                (5, "B".to_string()),
                (6, "C".to_string()),
                (7, "E".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_name_fields() {
        let body = TypeExpr::Struct {
            fields: vec![
                FieldDecl::new(&["X", "Y", "Z"], TypeExpr::slice(TypeExpr::ident("int")), None),
                FieldDecl::new(&["P", "Q"], TypeExpr::ident("bool"), Some(r#"`msg:"10"`"#)),
            ],
        };
        let elem = build_one(body).unwrap();
        assert_eq!(
            tags(&elem),
            vec![
                (1, "X".to_string()),
                (2, "Y".to_string()),
                (3, "Z".to_string()),
                (11, "P".to_string()),
                (12, "Q".to_string()),
            ]
        );

        let Elem::Struct(mut s) = elem else {
            panic!("Expected struct");
        };
        assert!(s.fields.iter().all(|f| f.raw_tag.is_empty() && f.tag_parts.is_empty()));
        s.fields[0].elem.set_varname("x");
        assert_eq!(s.fields[1].elem.varname(), "");
    }

    #[test]
    fn test_multi_name_after_tagged_field() {
        let body = TypeExpr::Struct {
            fields: vec![
                FieldDecl::new(&["A"], TypeExpr::ident("int"), Some(r#"`msg:"4,omitempty"`"#)),
                FieldDecl::new(&["B", "C"], TypeExpr::ident("int"), None),
                FieldDecl::new(&["D"], TypeExpr::ident("int"), None),
            ],
        };
        let elem = build_one(body).unwrap();
        assert_eq!(
            tags(&elem),
            vec![
                (4, "A".to_string()),
                (6, "B".to_string()),
                (7, "C".to_string()),
                (8, "D".to_string()),
            ]
        );
        let Elem::Struct(s) = elem else {
            panic!("Expected struct");
        };
        assert_eq!(s.fields[0].tag_parts, vec!["4".to_string(), "omitempty".to_string()]);
    }

    #[test]
    fn test_malformed_tag() {
        let body = TypeExpr::Struct {
            fields: vec![FieldDecl::new(&["A"], TypeExpr::ident("int"), Some(r#"`msg:"one"`"#))],
        };
        let err = build_one(body).unwrap_err();
        let GenError::Translate { trail, message } = err else {
            panic!("Expected translation error");
        };
        assert_eq!(trail.to_string(), "T: A");
        assert!(message.starts_with("invalid index \"one\""));
    }

    #[test]
    fn test_configured_tag_key() {
        let specs = specs(&[]);
        let config = GenConfig {
            tag_name: Some("wire".to_string()),
            ..GenConfig::default()
        };
        let builder = IrBuilder::new(&specs, &config);
        let body = TypeExpr::Struct {
            fields: vec![FieldDecl::new(&["A"], TypeExpr::ident("int"), Some(r#"`msg:"1" wire:"4"`"#))],
        };
        let elem = builder.parse_expr(&body, &Trail::new()).unwrap();
        assert_eq!(tags(&elem), vec![(4, "A".to_string())]);
    }

    #[test]
    fn test_embedded_field_named_after_type() {
        let body = TypeExpr::Struct {
            fields: vec![FieldDecl::new(
                &[],
                TypeExpr::Selector {
                    package: "msgp".to_string(),
                    name: "Raw".to_string(),
                },
                None,
            )],
        };
        assert_eq!(tags(&build_one(body).unwrap()), vec![(0, "Raw".to_string())]);
    }

    #[test]
    fn test_flatten_splices_fields() {
        let base = TypeExpr::Struct {
            fields: vec![
                FieldDecl::new(&["Id"], TypeExpr::ident("int64"), None),
                FieldDecl::new(&["Name"], TypeExpr::ident("string"), None),
            ],
        };
        let specs = specs(&[("Base", base)]);
        let builder = IrBuilder::new(&specs, &GenConfig::default());
        let body = TypeExpr::Struct {
            fields: vec![
                FieldDecl::new(&["Kind"], TypeExpr::ident("uint8"), None),
                FieldDecl::new(&[], TypeExpr::ident("Base"), Some(r#"`msg:"4,flatten"`"#)),
                FieldDecl::new(&["Extra"], TypeExpr::ident("bool"), None),
            ],
        };
        let elem = builder.parse_expr(&body, &Trail::root("Player")).unwrap();
        assert_eq!(
            tags(&elem),
            vec![
                (0, "Kind".to_string()),
                (4, "Id".to_string()),
                (5, "Name".to_string()),
                (6, "Extra".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_rejections() {
        let specs = specs(&[
            ("Ids", TypeExpr::slice(TypeExpr::ident("int"))),
            (
                "Loop",
                TypeExpr::Struct {
                    fields: vec![FieldDecl::new(&[], TypeExpr::ident("Loop"), Some(r#"`msg:",flatten"`"#))],
                },
            ),
        ]);
        let builder = IrBuilder::new(&specs, &GenConfig::default());
        let flatten = |names: &[&str], ty: TypeExpr| TypeExpr::Struct {
            fields: vec![FieldDecl::new(names, ty, Some(r#"`msg:",flatten"`"#))],
        };
        let trail = Trail::root("T");

        // named field
        assert!(builder.parse_expr(&flatten(&["B"], TypeExpr::ident("Ids")), &trail).is_err());
        // not a struct
        assert!(builder.parse_expr(&flatten(&[], TypeExpr::ident("Ids")), &trail).is_err());
        // pointer and selector embeds
        assert!(builder.parse_expr(&flatten(&[], TypeExpr::parse("*Ids").unwrap()), &trail).is_err());
        assert!(builder.parse_expr(&flatten(&[], TypeExpr::parse("io.Reader").unwrap()), &trail).is_err());
        // flattening itself
        let err = builder.build_all(&Trail::root("unit")).unwrap_err();
        assert!(err.to_string().contains("Loop flattens itself"));
    }

    #[test]
    fn test_extension_casting() {
        let field = |ty: TypeExpr| TypeExpr::Struct {
            fields: vec![FieldDecl::new(&["E"], ty, Some(r#"`msg:"0,extension"`"#))],
        };
        let Elem::Struct(s) = build_one(field(TypeExpr::ident("Custom"))).unwrap() else {
            panic!("Expected struct");
        };
        let Elem::Base(b) = &s.fields[0].elem else {
            panic!("Expected base");
        };
        assert_eq!(b.value, Primitive::Ext);
        assert_eq!(s.fields[0].tag_parts, vec!["0".to_string(), "extension".to_string()]);

        let Elem::Struct(s) = build_one(field(TypeExpr::parse("*msgp.Extension").unwrap())).unwrap() else {
            panic!("Expected struct");
        };
        assert!(matches!(&s.fields[0].elem, Elem::Ptr(p) if matches!(&*p.value, Elem::Base(b) if b.value == Primitive::Ext)));

        assert!(build_one(field(TypeExpr::slice(TypeExpr::ident("int")))).is_err());
    }

    #[test]
    fn test_build_all_defers_aliases() {
        let specs = specs(&[
            ("A", TypeExpr::ident("int32")),
            ("B", TypeExpr::ident("A")),
            ("L", TypeExpr::slice(TypeExpr::ident("A"))),
        ]);
        let builder = IrBuilder::new(&specs, &GenConfig::default());
        let (decls, links) = builder.build_all(&Trail::root("unit")).unwrap();
        assert_eq!(decls.names(), vec!["A".to_string(), "L".to_string()]);
        assert_eq!(links.len(), 1);
        assert_eq!(decls.get("A").map(Elem::type_name), Some("A".to_string()));
    }
}
