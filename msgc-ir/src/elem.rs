//! IR element model
//!
//! One `Elem` describes the wire shape of one type. Elements form an owned
//! tree: duplicating a subtree is a plain `clone()`, so the same definition
//! can be substituted into several use sites and each copy can carry its
//! own metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Library identifiers that are known to the printer even though they stay
/// unresolved identifiers in the IR
pub const BUILTINS: [&str; 2] = ["msgp.Raw", "msgp.Number"];

/// Scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Bytes,
    String,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Byte,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Bool,
    /// `interface{}` / `any`
    Intf,
    Time,
    /// Opaque extension-typed scalar
    Ext,
    /// A user-defined name that has not been resolved yet
    Ident,
}

impl Primitive {
    /// Look up a host-language type name
    pub fn from_name(name: &str) -> Option<Primitive> {
        let p = match name {
            "[]byte" => Primitive::Bytes,
            "string" => Primitive::String,
            "float32" => Primitive::Float32,
            "float64" => Primitive::Float64,
            "complex64" => Primitive::Complex64,
            "complex128" => Primitive::Complex128,
            "uint" => Primitive::Uint,
            "uint8" => Primitive::Uint8,
            "uint16" => Primitive::Uint16,
            "uint32" => Primitive::Uint32,
            "uint64" => Primitive::Uint64,
            "byte" => Primitive::Byte,
            "rune" => Primitive::Int32,
            "int" => Primitive::Int,
            "int8" => Primitive::Int8,
            "int16" => Primitive::Int16,
            "int32" => Primitive::Int32,
            "int64" => Primitive::Int64,
            "bool" => Primitive::Bool,
            "interface{}" | "any" => Primitive::Intf,
            "time.Time" => Primitive::Time,
            "msgp.Extension" => Primitive::Ext,
            _ => return None,
        };
        Some(p)
    }

    /// Host-language spelling of the kind. Empty for `Ident`.
    pub fn base_type(&self) -> &'static str {
        match self {
            Primitive::Bytes => "[]byte",
            Primitive::String => "string",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::Complex64 => "complex64",
            Primitive::Complex128 => "complex128",
            Primitive::Uint => "uint",
            Primitive::Uint8 => "uint8",
            Primitive::Uint16 => "uint16",
            Primitive::Uint32 => "uint32",
            Primitive::Uint64 => "uint64",
            Primitive::Byte => "byte",
            Primitive::Int => "int",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Bool => "bool",
            Primitive::Intf => "interface{}",
            Primitive::Time => "time.Time",
            Primitive::Ext => "msgp.Extension",
            Primitive::Ident => "",
        }
    }

    /// Check if this kind is a signed or unsigned integer of any width
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Primitive::Uint
                | Primitive::Uint8
                | Primitive::Uint16
                | Primitive::Uint32
                | Primitive::Uint64
                | Primitive::Byte
                | Primitive::Int
                | Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
        )
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Ident => write!(f, "<ident>"),
            other => write!(f, "{}", other.base_type()),
        }
    }
}

/// Metadata every element carries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Common {
    /// Declared name of the type, if any
    pub alias: Option<String>,
    /// Variable name used by the printer
    pub varname: String,
}

/// How a shimmed type converts to and from its base type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShimMode {
    #[default]
    Cast,
    Convert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseElem {
    pub common: Common,
    pub value: Primitive,
    pub shim_to_base: Option<String>,
    pub shim_from_base: Option<String>,
    pub shim_mode: ShimMode,
    /// Encoded through a conversion to the base type
    pub convert: bool,
    /// Needs a reference to call the shim functions
    pub needs_ref: bool,
}

impl BaseElem {
    pub fn new(value: Primitive) -> Self {
        Self {
            common: Common::default(),
            value,
            shim_to_base: None,
            shim_from_base: None,
            shim_mode: ShimMode::Cast,
            convert: false,
            needs_ref: false,
        }
    }

    /// Translate a type name into a scalar, or an unresolved identifier
    /// aliased to the name
    pub fn ident(name: &str) -> Self {
        match Primitive::from_name(name) {
            Some(p) => Self::new(p),
            None => {
                let mut base = Self::new(Primitive::Ident);
                base.common.alias = Some(name.to_string());
                base
            }
        }
    }

    /// Check if a directive installed conversion functions on this element
    pub fn is_shimmed(&self) -> bool {
        self.shim_to_base.is_some() || self.convert
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructElem {
    pub common: Common,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceElem {
    pub common: Common,
    pub elem: Box<Elem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayElem {
    pub common: Common,
    /// Length expression exactly as declared (literal or constant name)
    pub size: String,
    pub elem: Box<Elem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapElem {
    pub common: Common,
    pub key: Box<Elem>,
    pub value: Box<Elem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtrElem {
    pub common: Common,
    pub value: Box<Elem>,
}

/// IR element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Elem {
    /// Primitive, named primitive, or unresolved identifier
    Base(BaseElem),

    /// Ordered field list, encoded positionally
    Struct(StructElem),

    Slice(SliceElem),

    /// Fixed-length sequence
    Array(ArrayElem),

    Map(MapElem),

    /// Value that may be encoded as absent
    Ptr(PtrElem),

    /// String encoded with the cross-language string convention.
    /// Only produced by finalization, never by the builder.
    LocalizedString(Common),

    /// Filler for an unused tag slot
    Placeholder(Common),
}

/// A struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Position in the encoded tuple
    pub tag: u16,
    pub name: String,
    pub elem: Elem,
    /// Struct tag literal as written
    pub raw_tag: String,
    /// Comma-separated parts of the selected annotation
    pub tag_parts: Vec<String>,
}

impl Field {
    pub fn new(tag: u16, name: &str, elem: Elem) -> Self {
        Self {
            tag,
            name: name.to_string(),
            elem,
            raw_tag: String::new(),
            tag_parts: Vec::new(),
        }
    }

    /// Gap filler for an unused tag
    pub fn placeholder(tag: u16) -> Self {
        Self::new(tag, "", Elem::Placeholder(Common::default()))
    }
}

impl Elem {
    /// Translate a type name: primitives become scalars, anything else an
    /// unresolved identifier aliased to the name
    pub fn ident(name: &str) -> Elem {
        Elem::Base(BaseElem::ident(name))
    }

    pub fn primitive(value: Primitive) -> Elem {
        Elem::Base(BaseElem::new(value))
    }

    pub fn slice(elem: Elem) -> Elem {
        Elem::Slice(SliceElem {
            common: Common::default(),
            elem: Box::new(elem),
        })
    }

    pub fn array(size: &str, elem: Elem) -> Elem {
        Elem::Array(ArrayElem {
            common: Common::default(),
            size: size.to_string(),
            elem: Box::new(elem),
        })
    }

    pub fn map(key: Elem, value: Elem) -> Elem {
        Elem::Map(MapElem {
            common: Common::default(),
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn ptr(value: Elem) -> Elem {
        Elem::Ptr(PtrElem {
            common: Common::default(),
            value: Box::new(value),
        })
    }

    pub fn structure(fields: Vec<Field>) -> Elem {
        Elem::Struct(StructElem {
            common: Common::default(),
            fields,
        })
    }

    pub fn common(&self) -> &Common {
        match self {
            Elem::Base(b) => &b.common,
            Elem::Struct(s) => &s.common,
            Elem::Slice(s) => &s.common,
            Elem::Array(a) => &a.common,
            Elem::Map(m) => &m.common,
            Elem::Ptr(p) => &p.common,
            Elem::LocalizedString(c) | Elem::Placeholder(c) => c,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            Elem::Base(b) => &mut b.common,
            Elem::Struct(s) => &mut s.common,
            Elem::Slice(s) => &mut s.common,
            Elem::Array(a) => &mut a.common,
            Elem::Map(m) => &mut m.common,
            Elem::Ptr(p) => &mut p.common,
            Elem::LocalizedString(c) | Elem::Placeholder(c) => c,
        }
    }

    /// Name the element after a declared type
    pub fn set_alias(&mut self, name: &str) {
        self.common_mut().alias = Some(name.to_string());
    }

    pub fn varname(&self) -> &str {
        &self.common().varname
    }

    pub fn set_varname(&mut self, name: &str) {
        self.common_mut().varname = name.to_string();
    }

    /// The declared alias, or the structural name of the shape
    pub fn type_name(&self) -> String {
        if let Some(alias) = &self.common().alias {
            return alias.clone();
        }
        match self {
            Elem::Base(b) => b.value.base_type().to_string(),
            Elem::Struct(s) => {
                let fields: Vec<String> = s
                    .fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, f.elem.type_name()))
                    .collect();
                format!("struct{{{}}}", fields.join("; "))
            }
            Elem::Slice(s) => format!("[]{}", s.elem.type_name()),
            Elem::Array(a) => format!("[{}]{}", a.size, a.elem.type_name()),
            Elem::Map(m) => format!("map[{}]{}", m.key.type_name(), m.value.type_name()),
            Elem::Ptr(p) => format!("*{}", p.value.type_name()),
            Elem::LocalizedString(_) => "string".to_string(),
            Elem::Placeholder(_) => "nil".to_string(),
        }
    }

    /// Name of the referenced type if this is an unresolved identifier
    pub fn ident_name(&self) -> Option<&str> {
        match self {
            Elem::Base(b) if b.value == Primitive::Ident => b.common.alias.as_deref(),
            _ => None,
        }
    }

    /// Approximate number of nodes; drives the inlining decision
    pub fn complexity(&self) -> usize {
        match self {
            Elem::Base(_) | Elem::LocalizedString(_) | Elem::Placeholder(_) => 1,
            Elem::Struct(s) => 1 + s.fields.iter().map(|f| f.elem.complexity()).sum::<usize>(),
            Elem::Slice(s) => 1 + s.elem.complexity(),
            Elem::Array(a) => 1 + a.elem.complexity(),
            Elem::Map(m) => 2 + m.value.complexity(),
            Elem::Ptr(p) => 1 + p.value.complexity(),
        }
    }

    /// Check if the element only refers to primitives, known builtins and
    /// identifiers encoded through a shim
    pub fn is_resolved(&self) -> bool {
        match self {
            Elem::Base(b) if b.value == Primitive::Ident => {
                b.is_shimmed() || b.common.alias.as_deref().is_some_and(|name| BUILTINS.contains(&name))
            }
            Elem::Map(m) => m.key.is_resolved() && m.value.is_resolved(),
            _ => self.children().into_iter().all(Elem::is_resolved),
        }
    }
}

impl fmt::Display for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_translates_primitives() {
        assert_eq!(Elem::ident("int32"), Elem::primitive(Primitive::Int32));
        assert_eq!(Elem::ident("rune"), Elem::primitive(Primitive::Int32));
        assert_eq!(Elem::ident("any"), Elem::primitive(Primitive::Intf));
        assert_eq!(Elem::ident("time.Time"), Elem::primitive(Primitive::Time));

        let user = Elem::ident("Player");
        assert_eq!(user.ident_name(), Some("Player"));
        assert_eq!(user.type_name(), "Player");
        assert!(!user.is_resolved());
    }

    #[test]
    fn test_builtins_are_resolved() {
        assert!(Elem::ident("msgp.Raw").is_resolved());
        assert!(Elem::ident("msgp.Number").is_resolved());
        assert!(!Elem::ident("pkg.Thing").is_resolved());
        assert!(!Elem::slice(Elem::ident("Thing")).is_resolved());
        assert!(Elem::map(Elem::ident("string"), Elem::ident("int")).is_resolved());

        let mut replaced = BaseElem::ident("Cents");
        replaced.convert = true;
        assert!(Elem::Base(replaced).is_resolved());
    }

    #[test]
    fn test_structural_type_names() {
        let m = Elem::map(Elem::ident("string"), Elem::slice(Elem::ident("int8")));
        assert_eq!(m.type_name(), "map[string][]int8");

        let a = Elem::array("N", Elem::ptr(Elem::ident("Foo")));
        assert_eq!(a.type_name(), "[N]*Foo");

        let mut s = Elem::structure(vec![Field::new(0, "A", Elem::ident("bool"))]);
        assert_eq!(s.type_name(), "struct{A bool}");
        s.set_alias("Flags");
        assert_eq!(format!("{}", s), "Flags");
    }

    #[test]
    fn test_complexity() {
        assert_eq!(Elem::ident("int").complexity(), 1);
        assert_eq!(Elem::array("4", Elem::ident("int")).complexity(), 2);
        assert_eq!(Elem::map(Elem::ident("string"), Elem::ident("int")).complexity(), 3);

        let s = Elem::structure(vec![
            Field::new(0, "A", Elem::ident("int")),
            Field::new(1, "B", Elem::slice(Elem::ident("string"))),
        ]);
        assert_eq!(s.complexity(), 4);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Elem::slice(Elem::ident("string"));
        let mut copy = original.clone();
        copy.set_varname("z");
        copy.set_alias("Names");

        assert_eq!(original.varname(), "");
        assert_eq!(original.type_name(), "[]string");
        assert_eq!(copy.type_name(), "Names");
    }

    #[test]
    fn test_integer_kinds() {
        assert!(Primitive::Byte.is_integer());
        assert!(Primitive::Int64.is_integer());
        assert!(!Primitive::String.is_integer());
        assert!(!Primitive::Float32.is_integer());
    }
}
