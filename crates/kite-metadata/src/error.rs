//! Errors for corrupt or unsupported metadata.
//!
//! These are environment errors: a classpath module that cannot be read.
//! They abort loading of the module; they are never reported as user
//! diagnostics.

use kite_common::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("malformed metadata: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported metadata version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("{table} index {index} out of range (table size {size})")]
    IndexOutOfRange {
        table: &'static str,
        index: u32,
        size: usize,
    },

    #[error("qualified name {index} has parent {parent}, which is not earlier in the table")]
    QualifiedNameOrder { index: u32, parent: u32 },

    #[error("unknown callable kind {kind} for '{name}'")]
    UnknownCallableKind { kind: u32, name: String },

    #[error("missing required field '{field}' in {record}")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("class name {index} is not a class-kind qualified name")]
    NotAClassName { index: u32 },

    #[error("'{name}' has the wrong callable kind for {place}")]
    MisplacedCallable { name: String, place: &'static str },
}

pub type MetadataResult<T> = Result<T, MetadataError>;
