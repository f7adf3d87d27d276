//! Kite class files.
//!
//! - [`instruction`]: the stack-machine instruction set and descriptors
//! - [`class_file`]: classes, fields, methods and their code
//! - [`codec`]: the binary `.kclass` format
//! - [`builder`]: emitting code with labels and a tracked operand stack
//! - [`cfg`]: basic-block graphs, subroutine inlining, dominators and
//!   stack verification
//! - [`disasm`]: text listings

pub mod builder;
pub mod cfg;
pub mod class_file;
pub mod codec;
pub mod disasm;
pub mod error;
pub mod instruction;
pub mod stack;

pub use builder::{CodeBuilder, Label};
pub use cfg::{BasicBlock, BlockId, ControlFlowGraph, Dominators, ExceptionRange};
pub use class_file::{
    AccessFlags, CONSTRUCTOR_NAME, ClassFile, Code, ExceptionEntry, FieldInfo, LineNumber, MethodInfo,
    STATIC_INITIALIZER_NAME,
};
pub use codec::{decode_class, encode_class, validate_class};
pub use disasm::{CodeListing, disassemble_class, disassemble_class_with};
pub use error::{BuildError, CfgError, ClassFormatError};
pub use instruction::{Condition, FieldRef, Instruction, MethodDescriptor, MethodRef, Offset, TypeDesc};
pub use stack::{Frame, SlotKind, StackError};
