//! Errors that stop the REPL itself.
//!
//! Problems in the submitted text are not errors: they come back as
//! [`crate::LineResult::CompileError`] or [`crate::LineResult::RuntimeError`].

use kite_bytecode::ClassFormatError;
use kite_codegen::CodegenError;
use kite_metadata::MetadataError;
use kite_resolve::ResolveError;
use kite_vm::VmError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A classpath that cannot be turned into an environment.
///
/// Produced on the initialization thread, so it carries only sendable data.
#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("classpath entry {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("{}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },

    #[error("{}: {source}", path.display())]
    ClassFormat {
        path: PathBuf,
        #[source]
        source: ClassFormatError,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("initialization failed: {0}")]
    Init(#[from] ClasspathError),

    /// A second attempt to use an environment whose initialization failed.
    #[error("initialization failed earlier: {0}")]
    Unavailable(String),

    #[error("initialization thread panicked: {0}")]
    InitPanicked(String),

    #[error("cannot start initialization thread: {0}")]
    Spawn(#[source] io::Error),

    /// Generated code the VM refused, or a VM failure not caused by the
    /// user's program. Rendered eagerly since VM values are not `Send`.
    #[error("internal error: {0}")]
    Vm(String),

    #[error("internal error: {0}")]
    Codegen(#[from] CodegenError),

    #[error("REPL output failed: {0}")]
    Io(#[from] io::Error),
}

impl From<VmError> for ReplError {
    fn from(error: VmError) -> Self {
        ReplError::Vm(error.to_string())
    }
}

pub type ReplResult<T> = Result<T, ReplError>;

#[cfg(test)]
#[path = "../tests/error_tests.rs"]
mod error_tests;
