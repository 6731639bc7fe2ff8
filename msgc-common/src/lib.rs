//! msgc - Common Types and Utilities
//!
//! This crate contains the error type, breadcrumb trail and configuration
//! shared by every stage of the msgc generator.

pub mod config;
pub mod error;
pub mod trail;

pub use config::GenConfig;
pub use error::{ErrorReporter, GenError};
pub use trail::Trail;
