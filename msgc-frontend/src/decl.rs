//! Declaration fragments
//!
//! This is the contract with the host-language front end: one `TypeSpec`
//! per declared type, struct bodies as `FieldDecl` lists, and the raw
//! comment lines of the unit. Everything here is plain data and can be
//! loaded from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A type expression as written in the host language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// `Name`
    Ident(String),

    /// `pkg.Name`
    Selector { package: String, name: String },

    /// `*T`
    Star(Box<TypeExpr>),

    /// `[]T` when `len` is absent, `[N]T` otherwise
    Array {
        #[serde(default)]
        len: Option<LenExpr>,
        elem: Box<TypeExpr>,
    },

    /// `map[K]V`
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },

    /// `struct { ... }`
    Struct {
        #[serde(default)]
        fields: Vec<FieldDecl>,
    },

    /// `interface { ... }`, listing declared method names
    Interface {
        #[serde(default)]
        methods: Vec<String>,
    },

    /// `chan T`
    Chan(Box<TypeExpr>),

    /// `func(...)`
    Func,
}

/// Array length expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LenExpr {
    /// `4`, `0x10`
    Literal(String),
    /// `Size`
    Ident(String),
    /// `pkg.Size`
    Selector { package: String, name: String },
    /// Anything else, kept as source text
    Expr(String),
}

/// One line of a struct body: `A, B int `msg:"1"``
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Empty for an embedded field
    #[serde(default)]
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Raw struct tag literal, backticks included or not
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    pub ty: TypeExpr,
}

/// Everything the front end hands over for one input unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// File or directory name, used for diagnostics
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub specs: Vec<TypeSpec>,
    /// Raw comment lines, directive candidates among them
    #[serde(default)]
    pub comments: Vec<String>,
}

impl TypeExpr {
    pub fn ident(name: &str) -> Self {
        TypeExpr::Ident(name.to_string())
    }

    pub fn slice(elem: TypeExpr) -> Self {
        TypeExpr::Array {
            len: None,
            elem: Box::new(elem),
        }
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Check if a declaration of this shape is translated at all
    pub fn is_declarable(&self) -> bool {
        matches!(
            self,
            TypeExpr::Struct { .. }
                | TypeExpr::Array { .. }
                | TypeExpr::Star(_)
                | TypeExpr::Map { .. }
                | TypeExpr::Ident(_)
        )
    }

    /// Name given to an embedded field of this type (`io.Writer` -> `Writer`)
    pub fn embedded_name(&self) -> String {
        match self {
            TypeExpr::Ident(name) => name.clone(),
            TypeExpr::Star(inner) => inner.embedded_name(),
            TypeExpr::Selector { name, .. } => name.clone(),
            _ => String::new(),
        }
    }

    /// Parse a type written as text: names, `pkg.Name`, `*T`, `[]T`,
    /// `[N]T`, `map[K]V` and `interface{}`.
    pub fn parse(src: &str) -> Option<TypeExpr> {
        let (ty, rest) = parse_prefix(src.trim())?;
        if rest.trim().is_empty() {
            Some(ty)
        } else {
            None
        }
    }
}

fn parse_prefix(s: &str) -> Option<(TypeExpr, &str)> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('*') {
        let (inner, rest) = parse_prefix(rest)?;
        return Some((TypeExpr::Star(Box::new(inner)), rest));
    }
    if let Some(rest) = s.strip_prefix("[]") {
        let (elem, rest) = parse_prefix(rest)?;
        return Some((TypeExpr::slice(elem), rest));
    }
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let len = LenExpr::parse(&rest[..end]);
        let (elem, rest) = parse_prefix(&rest[end + 1..])?;
        return Some((
            TypeExpr::Array {
                len: Some(len),
                elem: Box::new(elem),
            },
            rest,
        ));
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let (key, rest) = parse_prefix(rest)?;
        let rest = rest.trim_start().strip_prefix(']')?;
        let (value, rest) = parse_prefix(rest)?;
        return Some((TypeExpr::map(key, value), rest));
    }
    if let Some(rest) = s.strip_prefix("interface{}") {
        return Some((TypeExpr::Interface { methods: Vec::new() }, rest));
    }

    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(s.len());
    let name = &s[..end];
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return None;
    }
    let ty = match name.split_once('.') {
        Some((package, name)) => TypeExpr::Selector {
            package: package.to_string(),
            name: name.to_string(),
        },
        None => TypeExpr::Ident(name.to_string()),
    };
    Some((ty, &s[end..]))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl LenExpr {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.starts_with(|c: char| c.is_ascii_digit())
            && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return LenExpr::Literal(text.to_string());
        }
        if is_identifier(text) {
            return LenExpr::Ident(text.to_string());
        }
        if let Some((package, name)) = text.split_once('.') {
            if is_identifier(package) && is_identifier(name) {
                return LenExpr::Selector {
                    package: package.to_string(),
                    name: name.to_string(),
                };
            }
        }
        LenExpr::Expr(text.to_string())
    }
}

impl fmt::Display for LenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LenExpr::Literal(s) | LenExpr::Ident(s) | LenExpr::Expr(s) => write!(f, "{}", s),
            LenExpr::Selector { package, name } => write!(f, "{}.{}", package, name),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ident(name) => write!(f, "{}", name),
            TypeExpr::Selector { package, name } => write!(f, "{}.{}", package, name),
            TypeExpr::Star(inner) => write!(f, "*{}", inner),
            TypeExpr::Array { len: None, elem } => write!(f, "[]{}", elem),
            TypeExpr::Array { len: Some(len), elem } => write!(f, "[{}]{}", len, elem),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Struct { fields } => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if !field.names.is_empty() {
                        write!(f, "{} ", field.names.join(", "))?;
                    }
                    write!(f, "{}", field.ty)?;
                }
                write!(f, "}}")
            }
            TypeExpr::Interface { methods } if methods.is_empty() => write!(f, "interface{{}}"),
            TypeExpr::Interface { methods } => write!(f, "interface{{{}}}", methods.join("; ")),
            TypeExpr::Chan(inner) => write!(f, "chan {}", inner),
            TypeExpr::Func => write!(f, "func()"),
        }
    }
}

impl FieldDecl {
    pub fn new(names: &[&str], ty: TypeExpr, tag: Option<&str>) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ty,
            tag: tag.map(str::to_string),
        }
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match self.names.len() {
            0 => self.ty.to_string(),
            1 => self.names[0].clone(),
            _ => format!("{} (and others)", self.names[0]),
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn retain_exported_fields(ty: &mut TypeExpr) {
    match ty {
        TypeExpr::Struct { fields } => {
            fields.retain_mut(|field| {
                if field.names.is_empty() {
                    return is_exported(&field.ty.embedded_name());
                }
                field.names.retain(|n| is_exported(n));
                if field.names.is_empty() {
                    return false;
                }
                retain_exported_fields(&mut field.ty);
                true
            });
        }
        TypeExpr::Star(inner) | TypeExpr::Chan(inner) => retain_exported_fields(inner),
        TypeExpr::Array { elem, .. } => retain_exported_fields(elem),
        TypeExpr::Map { value, .. } => retain_exported_fields(value),
        _ => {}
    }
}

impl SourceUnit {
    /// Drop unexported declarations and unexported struct fields
    pub fn retain_exported(&mut self) {
        self.specs.retain(|spec| is_exported(&spec.name));
        for spec in &mut self.specs {
            retain_exported_fields(&mut spec.ty);
        }
    }

    /// Declarations of a translatable shape, by name. A later declaration
    /// of the same name replaces an earlier one.
    pub fn type_specs(&self) -> BTreeMap<String, TypeExpr> {
        self.specs
            .iter()
            .filter(|spec| spec.ty.is_declarable())
            .map(|spec| (spec.name.clone(), spec.ty.clone()))
            .collect()
    }
}
