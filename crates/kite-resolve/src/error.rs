//! Errors that stop analysis before it starts.
//!
//! Problems in the analyzed script are diagnostics, not errors.

use kite_types::ClassId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("built-in class {0} is missing from the classpath")]
    MissingBuiltIn(ClassId),
    #[error("default import {0} does not name a package")]
    MissingDefaultImport(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
