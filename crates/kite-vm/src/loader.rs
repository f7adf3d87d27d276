//! Loading and verifying classes.
//!
//! Every class the VM knows about is a [`ClassFile`]. The standard library
//! classes are registered up front as method-less class files whose
//! behaviour lives in [`crate::natives`]; generated classes are validated
//! and every method body is split into basic blocks and stack-verified
//! before the class becomes visible.

use crate::error::{VmError, VmResult};
use crate::natives::BOX_CLASS;
use crate::value::{BOOLEAN_CLASS, INT_CLASS, STRING_CLASS, UNIT_CLASS, Value};
use kite_bytecode::{
    AccessFlags, ClassFile, Code, ControlFlowGraph, FieldInfo, Frame, MethodDescriptor, MethodInfo,
    STATIC_INITIALIZER_NAME, TypeDesc, decode_class, validate_class,
};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

pub const ANY_CLASS: &str = "kite/Any";
pub const THROWABLE_CLASS: &str = "kite/Throwable";
pub const EXCEPTION_CLASS: &str = "kite/Exception";
pub const COMPARABLE_CLASS: &str = "kite/Comparable";
pub const ARITHMETIC_EXCEPTION: &str = "kite/ArithmeticException";
pub const ILLEGAL_STATE_EXCEPTION: &str = "kite/IllegalStateException";
pub const NULL_POINTER_EXCEPTION: &str = "kite/NullPointerException";
pub const CLASS_CAST_EXCEPTION: &str = "kite/ClassCastException";
pub const STACK_OVERFLOW_ERROR: &str = "kite/StackOverflowError";

/// Built-in classes and their superclasses.
const BUILTIN_CLASSES: &[(&str, Option<&str>)] = &[
    (ANY_CLASS, None),
    ("kite/Nothing", Some(ANY_CLASS)),
    (UNIT_CLASS, Some(ANY_CLASS)),
    (INT_CLASS, Some(ANY_CLASS)),
    (BOOLEAN_CLASS, Some(ANY_CLASS)),
    (STRING_CLASS, Some(ANY_CLASS)),
    (COMPARABLE_CLASS, Some(ANY_CLASS)),
    (THROWABLE_CLASS, Some(ANY_CLASS)),
    (EXCEPTION_CLASS, Some(THROWABLE_CLASS)),
    (ARITHMETIC_EXCEPTION, Some(EXCEPTION_CLASS)),
    (ILLEGAL_STATE_EXCEPTION, Some(EXCEPTION_CLASS)),
    (NULL_POINTER_EXCEPTION, Some(EXCEPTION_CLASS)),
    (CLASS_CAST_EXCEPTION, Some(EXCEPTION_CLASS)),
    (STACK_OVERFLOW_ERROR, Some(THROWABLE_CLASS)),
    (BOX_CLASS, Some(ANY_CLASS)),
    ("kite/StandardKt", Some(ANY_CLASS)),
    ("kite/io/ConsoleKt", Some(ANY_CLASS)),
    ("kite/collections/CollectionsKt", Some(ANY_CLASS)),
    ("kite/internal/Intrinsics", Some(ANY_CLASS)),
];

/// Built-in classes implementing `kite/Comparable`.
const COMPARABLE_IMPLEMENTORS: &[&str] = &[INT_CLASS, STRING_CLASS];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InitState {
    Pending,
    Running,
    Done,
}

#[derive(Debug)]
pub struct LoadedClass {
    pub file: ClassFile,
    pub builtin: bool,
    statics: RefCell<FxHashMap<Arc<str>, Value>>,
    init: Cell<InitState>,
}

impl LoadedClass {
    fn new(file: ClassFile, builtin: bool) -> Self {
        let statics = file
            .fields
            .iter()
            .filter(|field| field.flags.contains(AccessFlags::STATIC))
            .map(|field| (Arc::clone(&field.name), Value::default_for(&field.ty)))
            .collect();
        let has_initializer = file
            .methods
            .iter()
            .any(|method| method.is_static() && &*method.name == STATIC_INITIALIZER_NAME);
        LoadedClass {
            file,
            builtin,
            statics: RefCell::new(statics),
            init: Cell::new(if has_initializer { InitState::Pending } else { InitState::Done }),
        }
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn static_field(&self, name: &str) -> Option<Value> {
        self.statics.borrow().get(name).cloned()
    }

    pub(crate) fn set_static_field(&self, name: &str, value: Value) -> bool {
        match self.statics.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn init_state(&self) -> InitState {
        self.init.get()
    }

    pub(crate) fn set_init_state(&self, state: InitState) {
        self.init.set(state);
    }

    pub fn method_at(&self, index: usize) -> &MethodInfo {
        &self.file.methods[index]
    }

    pub(crate) fn code_at(&self, index: usize) -> Option<&Code> {
        self.file.methods[index].code.as_ref()
    }

    pub fn find_method(&self, name: &str, descriptor: &MethodDescriptor) -> Option<usize> {
        self.file
            .methods
            .iter()
            .position(|method| &*method.name == name && &method.descriptor == descriptor)
    }
}

#[derive(Debug)]
pub struct ClassLoader {
    classes: FxHashMap<Arc<str>, Rc<LoadedClass>>,
    /// Generated classes in definition order.
    defined: Vec<Arc<str>>,
}

impl ClassLoader {
    pub fn new() -> Self {
        let mut classes = FxHashMap::default();
        for &(name, super_name) in BUILTIN_CLASSES {
            let mut file = ClassFile::new(name, super_name, AccessFlags::PUBLIC);
            if name == UNIT_CLASS {
                file.fields.push(FieldInfo {
                    name: Arc::from(UNIT_INSTANCE_FIELD),
                    ty: TypeDesc::object(UNIT_CLASS),
                    flags: AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
                });
            }
            let class = LoadedClass::new(file, true);
            if name == UNIT_CLASS {
                class.set_static_field(UNIT_INSTANCE_FIELD, Value::Unit);
            }
            classes.insert(Arc::from(name), Rc::new(class));
        }
        ClassLoader {
            classes,
            defined: Vec::new(),
        }
    }

    /// Validate, verify and register a class.
    pub fn define(&mut self, file: ClassFile) -> VmResult<Rc<LoadedClass>> {
        if self.classes.contains_key(&file.name) {
            return Err(VmError::DuplicateClass(file.name.to_string()));
        }
        validate_class(&file)?;
        for method in &file.methods {
            let Some(code) = &method.code else { continue };
            verify_method(&file, method, code)?;
        }
        debug!(class = %file.name, methods = file.methods.len(), "defined class");
        let name = Arc::clone(&file.name);
        let class = Rc::new(LoadedClass::new(file, false));
        self.classes.insert(Arc::clone(&name), Rc::clone(&class));
        self.defined.push(name);
        Ok(class)
    }

    /// Decode a `.kclass` image and define it.
    pub fn define_bytes(&mut self, bytes: &[u8]) -> VmResult<Rc<LoadedClass>> {
        let file = decode_class(bytes)?;
        self.define(file)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<LoadedClass>> {
        self.classes.get(name)
    }

    pub fn class(&self, name: &str) -> VmResult<Rc<LoadedClass>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::ClassNotFound(name.to_string()))
    }

    /// Generated classes in the order they were defined.
    pub fn defined_classes(&self) -> impl Iterator<Item = &Rc<LoadedClass>> + '_ {
        self.defined.iter().filter_map(|name| self.classes.get(name))
    }

    /// `class` and its superclasses, starting with `class`.
    pub fn superclass_chain(&self, class: &str) -> Vec<Rc<LoadedClass>> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(class).cloned();
        while let Some(loaded) = current {
            current = loaded.file.super_name.as_deref().and_then(|name| self.classes.get(name)).cloned();
            chain.push(loaded);
        }
        chain
    }

    pub fn is_subclass(&self, class: &str, of: &str) -> bool {
        if class == of || of == ANY_CLASS {
            return true;
        }
        if of == COMPARABLE_CLASS && COMPARABLE_IMPLEMENTORS.contains(&class) {
            return true;
        }
        let mut current = self.classes.get(class);
        while let Some(loaded) = current {
            if &*loaded.file.name == of {
                return true;
            }
            current = loaded.file.super_name.as_deref().and_then(|name| self.classes.get(name));
        }
        false
    }

    /// Whether `value` is a non-null instance of `class`.
    pub fn is_instance(&self, value: &Value, class: &str) -> bool {
        value
            .class_name()
            .is_some_and(|runtime| self.is_subclass(runtime, class))
    }

    pub fn is_throwable(&self, class: &str) -> bool {
        self.is_subclass(class, THROWABLE_CLASS)
    }

    /// Default values for the instance fields of `class` and its
    /// superclasses.
    pub(crate) fn instance_fields(&self, class: &str) -> FxHashMap<Arc<str>, Value> {
        let mut fields = FxHashMap::default();
        for loaded in self.superclass_chain(class) {
            for field in &loaded.file.fields {
                if !field.flags.contains(AccessFlags::STATIC) {
                    fields
                        .entry(Arc::clone(&field.name))
                        .or_insert_with(|| Value::default_for(&field.ty));
                }
            }
        }
        fields
    }
}

pub const UNIT_INSTANCE_FIELD: &str = "INSTANCE";

fn verify_method(class: &ClassFile, method: &MethodInfo, code: &Code) -> VmResult<()> {
    trace!(class = %class.name, method = %method.name, instructions = code.instructions.len(), "verifying");
    ControlFlowGraph::build_blocks(code)
        .and_then(|graph| graph.verify(Frame::for_method(method)))
        .map_err(|source| VmError::Verify {
            class: class.name.to_string(),
            method: format!("{}{}", method.name, method.descriptor),
            source,
        })
}

#[cfg(test)]
#[path = "../tests/loader_tests.rs"]
mod loader_tests;
