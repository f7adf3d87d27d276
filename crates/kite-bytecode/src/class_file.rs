//! The in-memory class-file model.

use crate::instruction::{Instruction, MethodDescriptor, Offset, TypeDesc};
use bitflags::bitflags;
use serde::Serialize;
use std::sync::Arc;

/// Name of instance constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";
/// Name of the static initializer.
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct AccessFlags: u32 {
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const STATIC    = 1 << 2;
        const FINAL     = 1 << 3;
        const ABSTRACT  = 1 << 4;
        const SYNTHETIC = 1 << 5;
        /// Generated for a REPL line or a source file rather than a
        /// declared class.
        const SCRIPT    = 1 << 6;
    }
}

/// One row of a method's exception table. `from..to` is half-open; a
/// `None` catch type catches everything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExceptionEntry {
    pub from: Offset,
    pub to: Offset,
    pub handler: Offset,
    pub catch_type: Option<Arc<str>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineNumber {
    pub offset: Offset,
    pub line: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionEntry>,
    pub line_numbers: Vec<LineNumber>,
}

impl Code {
    /// The source line of the instruction at `offset`, if recorded.
    pub fn line_at(&self, offset: Offset) -> Option<u32> {
        self.line_numbers
            .iter()
            .take_while(|entry| entry.offset <= offset)
            .last()
            .map(|entry| entry.line)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: Arc<str>,
    pub ty: TypeDesc,
    pub flags: AccessFlags,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: Arc<str>,
    pub descriptor: MethodDescriptor,
    pub flags: AccessFlags,
    /// `None` for methods implemented natively by the VM.
    pub code: Option<Code>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.flags.contains(AccessFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        &*self.name == CONSTRUCTOR_NAME
    }

    /// Local slots taken by the arguments, including `this`.
    pub fn argument_slots(&self) -> u16 {
        let receiver = u16::from(!self.is_static());
        receiver + self.descriptor.parameters.len() as u16
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassFile {
    /// Internal name: package segments joined by `/`.
    pub name: Arc<str>,
    pub super_name: Option<Arc<str>>,
    pub flags: AccessFlags,
    pub source_file: Option<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    pub fn new(name: &str, super_name: Option<&str>, flags: AccessFlags) -> Self {
        ClassFile {
            name: Arc::from(name),
            super_name: super_name.map(Arc::from),
            flags,
            source_file: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| &*field.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &MethodDescriptor) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| &*method.name == name && &method.descriptor == descriptor)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> + 'a {
        self.methods.iter().filter(move |method| &*method.name == name)
    }
}
