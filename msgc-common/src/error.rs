//! Error handling for the msgc generator
//!
//! This module defines the error type shared by every pass and a reporter
//! used by the passes that keep sweeping after a problem was found and only
//! fail once the sweep is complete.

use crate::trail::Trail;
use thiserror::Error;

/// Main generator error type that encompasses all passes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenError {
    #[error("Translation error at {trail}: {message}")]
    Translate { trail: Trail, message: String },

    #[error("Directive {line:?} failed: {source}")]
    Directive {
        line: String,
        source: Box<GenError>,
    },

    #[error("Invalid directive at {trail}: {message}")]
    InvalidDirective { trail: Trail, message: String },

    #[error("couldn't resolve type at {trail}.{}", describe_pending(.pending))]
    UnresolvedTypes {
        trail: Trail,
        pending: Vec<(String, String)>,
    },

    #[error("unresolved identifier {name} at {trail}")]
    UnresolvedIdentifier { trail: Trail, name: String },

    #[error("tag value {tag} repeated at {trail}")]
    DuplicateTag { trail: Trail, tag: u16 },

    #[error("no definitions in {trail}")]
    NoDefinitions { trail: Trail },

    #[error("{} errors:{}", .0.len(), describe_all(.0))]
    Aggregate(Vec<GenError>),

    #[error("Invalid source unit at {trail}: {message}")]
    InvalidUnit { trail: Trail, message: String },
}

fn describe_pending(pending: &[(String, String)]) -> String {
    pending
        .iter()
        .map(|(name, target)| format!(" {name}-({target})"))
        .collect()
}

fn describe_all(errors: &[GenError]) -> String {
    errors.iter().map(|e| format!("\n  {e}")).collect()
}

impl GenError {
    /// Create a translation error
    pub fn translate(message: impl Into<String>, trail: &Trail) -> Self {
        GenError::Translate {
            trail: trail.clone(),
            message: message.into(),
        }
    }

    /// Create a directive argument error
    pub fn invalid_directive(message: impl Into<String>, trail: &Trail) -> Self {
        GenError::InvalidDirective {
            trail: trail.clone(),
            message: message.into(),
        }
    }

    /// Create an error for a unit that could not be loaded
    pub fn invalid_unit(message: impl Into<String>, trail: &Trail) -> Self {
        GenError::InvalidUnit {
            trail: trail.clone(),
            message: message.into(),
        }
    }

    /// Wrap an error raised by a directive handler with the offending line
    pub fn in_directive(self, line: &str) -> Self {
        GenError::Directive {
            line: line.to_string(),
            source: Box::new(self),
        }
    }

    /// Collapse a list of errors: one error stays as is, several become an
    /// aggregate. Returns `None` for an empty list.
    pub fn aggregate(mut errors: Vec<GenError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(GenError::Aggregate(errors)),
        }
    }

    /// Iterate over the individual errors (an aggregate yields its members)
    pub fn flatten(&self) -> Vec<&GenError> {
        match self {
            GenError::Aggregate(errors) => errors.iter().flat_map(GenError::flatten).collect(),
            other => vec![other],
        }
    }
}

/// Collects errors raised while sweeping many declarations.
///
/// Passes that accumulate push every problem here and call
/// [`ErrorReporter::finish`] once the sweep is over.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Vec<GenError>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the sweep continues
    pub fn error(&mut self, error: GenError) {
        log::warn!("{}", error);
        self.errors.push(error);
    }

    /// End the sweep: fail with every recorded error, or succeed
    pub fn finish(self) -> Result<(), GenError> {
        match GenError::aggregate(self.errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
