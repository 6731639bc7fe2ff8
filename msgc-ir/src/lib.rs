//! msgc - Intermediate Representation
//!
//! This crate defines the IR that sits between the declaration builder and
//! the code printer, the declaration set holding it, and the passes that
//! resolve, optimize and finalize it.

pub mod decls;
pub mod elem;
pub mod passes;
pub mod visit;

pub use decls::DeclarationSet;
pub use elem::{
    ArrayElem, BaseElem, Common, Elem, Field, MapElem, Primitive, PtrElem, ShimMode, SliceElem,
    StructElem, BUILTINS,
};
