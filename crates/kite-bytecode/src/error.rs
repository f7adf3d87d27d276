//! Errors for malformed class files and method bodies.

use crate::instruction::Offset;
use kite_common::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFormatError {
    #[error("malformed class file: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported class file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("constant {index} out of range (pool size {size})")]
    ConstantOutOfRange { index: u32, size: usize },

    #[error("invalid descriptor '{0}'")]
    InvalidDescriptor(String),

    #[error("{method}: instruction {offset} jumps to {target}, past the end of the code")]
    JumpOutOfRange { method: String, offset: Offset, target: Offset },

    #[error("{method}: exception range {from}..{to} with handler {handler} is out of bounds")]
    BadExceptionRange {
        method: String,
        from: Offset,
        to: Offset,
        handler: Offset,
    },

    #[error("{method}: execution falls off the end of the code")]
    FallsOffEnd { method: String },
}

/// Failures of the control-flow graph transformations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgError {
    #[error("empty method body")]
    EmptyCode,

    #[error("jump from {offset} to {target} is out of range")]
    JumpOutOfRange { offset: Offset, target: Offset },

    #[error("jsr at {offset} is the last instruction and has nowhere to return to")]
    JsrWithoutReturn { offset: Offset },

    #[error("execution falls off the end of the code after {offset}")]
    FallsOffEnd { offset: Offset },

    #[error("exception range {from}..{to} with handler {handler} is out of bounds")]
    BadExceptionRange { from: Offset, to: Offset, handler: Offset },

    #[error("jsr inlining did not converge after {rounds} rounds")]
    JsrInliningDiverged { rounds: usize },

    #[error("block {block}: {reason}")]
    Verify { block: u32, reason: String },
}

/// A method body that the builder cannot finish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("label {0} was jumped to but never placed")]
    UnboundLabel(u32),

    #[error("instruction {offset}: {source}")]
    Stack {
        offset: Offset,
        #[source]
        source: crate::stack::StackError,
    },
}
