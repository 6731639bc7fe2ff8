//! IR passes
//!
//! Each pass takes the declaration set by `&mut` and rewrites it in place.
//! They run in this order: alias resolution, directive substitution
//! (shims), inlining, struct finalization.

pub mod inline;
pub mod normalize;
pub mod resolve;
pub mod shim;

pub use inline::{inline_simple_types, MAX_COMPLEXITY};
pub use normalize::{fill_tag_gaps, finalize_structs, localize_strings};
pub use resolve::{resolve_aliases, Linkset};
pub use shim::substitute;
