use crate::value::{ObjectRef, display_class_name};
use kite_bytecode::{CfgError, ClassFormatError, Offset};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// One frame of a captured stack trace, innermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    pub class: Arc<str>,
    pub method: Arc<str>,
    pub source_file: Option<String>,
    pub line: Option<u32>,
}

/// Class of the frame every trace ends with: the host call that entered
/// the VM.
pub const ENTRY_FRAME_CLASS: &str = "kite/internal/Entry";

impl StackFrame {
    pub fn entry() -> Self {
        StackFrame {
            class: Arc::from(ENTRY_FRAME_CLASS),
            method: Arc::from("invoke"),
            source_file: None,
            line: None,
        }
    }

    pub fn is_entry(&self) -> bool {
        &*self.class == ENTRY_FRAME_CLASS
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}.{}(", display_class_name(&self.class), self.method)?;
        match (&self.source_file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line})"),
            (Some(file), None) => write!(f, "{file})"),
            (None, _) => f.write_str("Native Method)"),
        }
    }
}

/// An exception that left the outermost frame.
#[derive(Clone, Debug)]
pub struct Thrown {
    pub exception: ObjectRef,
}

impl Thrown {
    pub fn class_name(&self) -> &str {
        &self.exception.class
    }

    pub fn message(&self) -> Option<String> {
        self.exception.message()
    }

    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.exception.stack_trace()
    }

    /// `Class: message` followed by one indented line per frame.
    pub fn render(&self, frames: &[StackFrame]) -> String {
        let mut out = self.exception.to_string();
        for frame in frames {
            out.push_str("\n\t");
            out.push_str(&frame.to_string());
        }
        out
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&self.stack_trace()))
    }
}

#[derive(Debug, Error)]
pub enum VmError {
    #[error("class {0} not found")]
    ClassNotFound(String),

    #[error("class {0} is already defined")]
    DuplicateClass(String),

    #[error(transparent)]
    ClassFormat(#[from] ClassFormatError),

    #[error("{class}.{method} failed verification: {source}")]
    Verify {
        class: String,
        method: String,
        #[source]
        source: CfgError,
    },

    #[error("no method {owner}.{name}{descriptor}")]
    NoSuchMethod {
        owner: String,
        name: String,
        descriptor: String,
    },

    #[error("no field {owner}.{name}")]
    NoSuchField { owner: String, name: String },

    /// Code that passed verification misbehaved at run time, such as
    /// reading a local that was never written.
    #[error("{method} at {offset}: {reason}")]
    Malformed {
        method: String,
        offset: Offset,
        reason: String,
    },

    #[error("execution stopped after {limit} instructions")]
    InstructionLimit { limit: u64 },

    #[error("uncaught exception {0}")]
    Uncaught(Box<Thrown>),
}

impl VmError {
    pub fn thrown(&self) -> Option<&Thrown> {
        match self {
            VmError::Uncaught(thrown) => Some(thrown),
            _ => None,
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;
