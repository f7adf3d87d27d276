//! The stack interpreter.
//!
//! Calls between generated methods push a [`CallFrame`] onto one explicit
//! frame stack instead of recursing on the host stack; only static
//! initializers run a nested dispatch loop. Exceptions unwind that stack
//! looking for a handler in each method's exception table, in table order.

use crate::console::Console;
use crate::error::{StackFrame, Thrown, VmError, VmResult};
use crate::loader::{
    ARITHMETIC_EXCEPTION, CLASS_CAST_EXCEPTION, ClassLoader, InitState, LoadedClass, NULL_POINTER_EXCEPTION,
    STACK_OVERFLOW_ERROR,
};
use crate::natives::{NativeContext, NativeFn, Natives};
use crate::value::{MESSAGE_FIELD, Object, ObjectRef, Value, display_class_name};
use kite_bytecode::{
    CONSTRUCTOR_NAME, ClassFile, FieldRef, Instruction, MethodDescriptor, MethodRef, Offset,
    STATIC_INITIALIZER_NAME,
};
use kite_common::limits;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone, Debug)]
pub struct VmOptions {
    /// Frames deeper than this raise `kite.StackOverflowError`.
    pub max_call_depth: usize,
    /// Instructions one host call may execute before it is aborted.
    pub instruction_limit: u64,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_call_depth: limits::MAX_CALL_DEPTH,
            instruction_limit: limits::MAX_INSTRUCTIONS_PER_LINE,
        }
    }
}

struct CallFrame {
    class: Rc<LoadedClass>,
    method: usize,
    /// Index of the next instruction. While an instruction executes this
    /// already points past it.
    pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl CallFrame {
    /// Offset of the instruction being executed, or of the pending call in
    /// a caller frame.
    fn current_offset(&self) -> Offset {
        self.pc.saturating_sub(1) as Offset
    }
}

/// Why an instruction did not complete.
enum Fault {
    Throw(ObjectRef),
    Error(VmError),
}

impl Fault {
    fn into_error(self) -> VmError {
        match self {
            Fault::Throw(exception) => VmError::Uncaught(Box::new(Thrown { exception })),
            Fault::Error(error) => error,
        }
    }
}

impl From<VmError> for Fault {
    fn from(error: VmError) -> Self {
        Fault::Error(error)
    }
}

enum Step {
    Continue,
    Finished(Option<Value>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InvokeKind {
    Virtual,
    Static,
    Special,
}

enum Target {
    Native(NativeFn),
    Code(Rc<LoadedClass>, usize),
}

pub struct Vm {
    loader: ClassLoader,
    natives: Natives,
    console: Box<dyn Console>,
    options: VmOptions,
    frames: Vec<CallFrame>,
    next_object_id: u32,
    executed: u64,
}

impl Vm {
    pub fn new(console: Box<dyn Console>) -> Self {
        Vm::with_options(console, VmOptions::default())
    }

    pub fn with_options(console: Box<dyn Console>, options: VmOptions) -> Self {
        Vm {
            loader: ClassLoader::new(),
            natives: Natives::standard(),
            console,
            options,
            frames: Vec::new(),
            next_object_id: 1,
            executed: 0,
        }
    }

    pub fn loader(&self) -> &ClassLoader {
        &self.loader
    }

    pub fn natives_mut(&mut self) -> &mut Natives {
        &mut self.natives
    }

    pub fn console_mut(&mut self) -> &mut dyn Console {
        &mut *self.console
    }

    /// Verify and define a class.
    pub fn define_class(&mut self, file: ClassFile) -> VmResult<Rc<LoadedClass>> {
        self.loader.define(file)
    }

    pub fn define_class_bytes(&mut self, bytes: &[u8]) -> VmResult<Rc<LoadedClass>> {
        self.loader.define_bytes(bytes)
    }

    /// Create an instance of `class_name` and run its constructor.
    pub fn instantiate(
        &mut self,
        class_name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<Value>,
    ) -> VmResult<ObjectRef> {
        let class = self.loader.class(class_name)?;
        let index = class
            .find_method(CONSTRUCTOR_NAME, descriptor)
            .ok_or_else(|| no_such_method(class_name, CONSTRUCTOR_NAME, descriptor))?;
        self.enter();
        self.initialize_from_host(class_name)?;
        let object = self.allocate(class_name);
        let mut arguments = Vec::with_capacity(args.len() + 1);
        arguments.push(Value::Object(Rc::clone(&object)));
        arguments.extend(args);
        self.call(class, index, arguments)?;
        Ok(object)
    }

    /// Call a static method, native or generated.
    pub fn invoke_static(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<Value>,
    ) -> VmResult<Option<Value>> {
        let class = self.loader.class(owner)?;
        self.enter();
        self.initialize_from_host(owner)?;
        if let Some(native) = self.natives.lookup(owner, name) {
            let value = self.call_native(native, &args).map_err(Fault::into_error)?;
            return Ok((!descriptor.returns.is_void()).then_some(value));
        }
        let index = class
            .find_method(name, descriptor)
            .filter(|&index| class.method_at(index).is_static())
            .ok_or_else(|| no_such_method(owner, name, descriptor))?;
        self.call(class, index, args)
    }

    /// Read a static field, running the owner's static initializer first.
    pub fn get_static(&mut self, owner: &str, name: &str) -> VmResult<Value> {
        self.enter();
        self.initialize_from_host(owner)?;
        let class = self.loader.class(owner)?;
        class.static_field(name).ok_or_else(|| no_such_field(owner, name))
    }

    pub fn allocate(&mut self, class: &str) -> ObjectRef {
        allocate_object(&self.loader, &mut self.next_object_id, &self.frames, class)
    }

    fn enter(&mut self) {
        if self.frames.is_empty() {
            self.executed = 0;
        }
    }

    fn initialize_from_host(&mut self, owner: &str) -> VmResult<()> {
        self.ensure_initialized(owner).map_err(Fault::into_error)
    }

    fn call(&mut self, class: Rc<LoadedClass>, index: usize, args: Vec<Value>) -> VmResult<Option<Value>> {
        let base = self.frames.len();
        self.push_frame(class, index, args).map_err(Fault::into_error)?;
        self.run(base)
    }

    // =========================================================================
    // Dispatch loop
    // =========================================================================

    /// Execute until the frame pushed above `base` returns.
    fn run(&mut self, base: usize) -> VmResult<Option<Value>> {
        loop {
            match self.step(base) {
                Ok(Step::Continue) => {}
                Ok(Step::Finished(value)) => return Ok(value),
                Err(Fault::Throw(exception)) => {
                    if !self.unwind(&exception, base) {
                        debug!(exception = %exception.class, "uncaught exception");
                        return Err(VmError::Uncaught(Box::new(Thrown { exception })));
                    }
                }
                Err(Fault::Error(error)) => {
                    self.frames.truncate(base);
                    return Err(error);
                }
            }
        }
    }

    /// Find a handler for `exception`, popping frames above `base` that
    /// have none. Returns `false` when the exception escapes.
    fn unwind(&mut self, exception: &ObjectRef, base: usize) -> bool {
        while self.frames.len() > base {
            let Some(frame) = self.frames.last() else { break };
            let offset = frame.current_offset();
            let handler = frame.class.code_at(frame.method).and_then(|code| {
                code.exception_table
                    .iter()
                    .find(|entry| {
                        entry.from <= offset
                            && offset < entry.to
                            && entry
                                .catch_type
                                .as_deref()
                                .is_none_or(|catch_type| self.loader.is_subclass(&exception.class, catch_type))
                    })
                    .map(|entry| entry.handler)
            });
            if let Some(handler) = handler {
                trace!(exception = %exception.class, handler, "caught");
                if let Some(frame) = self.frames.last_mut() {
                    frame.stack.clear();
                    frame.stack.push(Value::Object(Rc::clone(exception)));
                    frame.pc = handler as usize;
                }
                return true;
            }
            self.frames.pop();
        }
        false
    }

    fn step(&mut self, base: usize) -> Result<Step, Fault> {
        self.executed += 1;
        if self.executed > self.options.instruction_limit {
            return Err(Fault::Error(VmError::InstructionLimit {
                limit: self.options.instruction_limit,
            }));
        }
        let (class, method, pc) = match self.frames.last_mut() {
            Some(frame) => {
                frame.pc += 1;
                (Rc::clone(&frame.class), frame.method, frame.pc - 1)
            }
            None => return Ok(Step::Finished(None)),
        };
        let Some(instruction) = class.code_at(method).and_then(|code| code.instructions.get(pc)) else {
            return Err(self.malformed("execution ran past the last instruction"));
        };

        match instruction {
            Instruction::Nop => {}
            Instruction::AConstNull => self.push(Value::Null),
            Instruction::IConst(value) => self.push(Value::Int(*value)),
            Instruction::BConst(value) => self.push(Value::Bool(*value)),
            Instruction::Ldc(text) => self.push(Value::Str(Arc::clone(text))),

            Instruction::ILoad(slot) | Instruction::ALoad(slot) => {
                let value = self.local(*slot)?;
                self.push(value);
            }
            Instruction::IStore(slot) | Instruction::AStore(slot) => {
                let value = self.pop()?;
                self.set_local(*slot, value)?;
            }

            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let value = self.pop()?;
                self.push(value.clone());
                self.push(value);
            }
            Instruction::Swap => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(top);
                self.push(below);
            }

            Instruction::IAdd => self.int_binary(i32::wrapping_add)?,
            Instruction::ISub => self.int_binary(i32::wrapping_sub)?,
            Instruction::IMul => self.int_binary(i32::wrapping_mul)?,
            Instruction::IDiv => self.int_division(i32::wrapping_div)?,
            Instruction::IRem => self.int_division(i32::wrapping_rem)?,
            Instruction::INeg => {
                let value = self.pop_int()?;
                self.push(Value::Int(value.wrapping_neg()));
            }

            Instruction::If(condition, target) => {
                let value = self.pop_int()?;
                if condition.test(value, 0) {
                    self.jump(*target);
                }
            }
            Instruction::IfICmp(condition, target) => {
                let right = self.pop_int()?;
                let left = self.pop_int()?;
                if condition.test(left, right) {
                    self.jump(*target);
                }
            }
            Instruction::IfNull(target) => {
                if self.pop()?.is_null() {
                    self.jump(*target);
                }
            }
            Instruction::IfNonNull(target) => {
                if !self.pop()?.is_null() {
                    self.jump(*target);
                }
            }
            Instruction::Goto(target) => self.jump(*target),
            Instruction::Jsr(target) => {
                self.push(Value::ReturnAddress(pc as Offset + 1));
                self.jump(*target);
            }
            Instruction::Ret(slot) => match self.local(*slot)? {
                Value::ReturnAddress(address) => self.jump(address),
                _ => return Err(self.malformed(format!("ret through local {slot}, which holds no return address"))),
            },
            Instruction::LookupSwitch { default, cases } => {
                let key = self.pop_int()?;
                let target = cases
                    .iter()
                    .find(|(case, _)| *case == key)
                    .map_or(*default, |(_, target)| *target);
                self.jump(target);
            }

            Instruction::New(class_name) => {
                self.ensure_initialized(class_name)?;
                let object = self.allocate(class_name);
                self.push(Value::Object(object));
            }
            Instruction::GetField(field) => {
                let receiver = self.pop()?;
                let object = self.field_receiver(&receiver, field, "read")?;
                let value = object.field(&field.name).ok_or_else(|| no_such_field(&field.owner, &field.name))?;
                self.push(value);
            }
            Instruction::PutField(field) => {
                let value = self.pop()?;
                let receiver = self.pop()?;
                self.field_receiver(&receiver, field, "assign")?.set_field(&field.name, value);
            }
            Instruction::GetStatic(field) => {
                self.ensure_initialized(&field.owner)?;
                let owner = self.loader.class(&field.owner)?;
                let value = owner
                    .static_field(&field.name)
                    .ok_or_else(|| no_such_field(&field.owner, &field.name))?;
                self.push(value);
            }
            Instruction::PutStatic(field) => {
                let value = self.pop()?;
                self.ensure_initialized(&field.owner)?;
                let owner = self.loader.class(&field.owner)?;
                if !owner.set_static_field(&field.name, value) {
                    return Err(no_such_field(&field.owner, &field.name).into());
                }
            }

            Instruction::InvokeVirtual(method) => self.invoke(InvokeKind::Virtual, method)?,
            Instruction::InvokeStatic(method) => self.invoke(InvokeKind::Static, method)?,
            Instruction::InvokeSpecial(method) => self.invoke(InvokeKind::Special, method)?,

            Instruction::CheckCast(class_name) => {
                let value = self.pop()?;
                if !value.is_null() && !self.loader.is_instance(&value, class_name) {
                    let found = value.class_name().map(display_class_name).unwrap_or_default();
                    return Err(self.raise(
                        CLASS_CAST_EXCEPTION,
                        Some(format!("{found} cannot be cast to {}", display_class_name(class_name))),
                    ));
                }
                self.push(value);
            }
            Instruction::InstanceOf(class_name) => {
                let value = self.pop()?;
                let is_instance = self.loader.is_instance(&value, class_name);
                self.push(Value::Bool(is_instance));
            }
            Instruction::AThrow => {
                return match self.pop()? {
                    Value::Object(exception) if exception.is_throwable() => Err(Fault::Throw(exception)),
                    Value::Null => Err(self.raise(NULL_POINTER_EXCEPTION, Some("throw of null".to_string()))),
                    other => Err(self.malformed(format!("athrow of non-throwable {other}"))),
                };
            }

            Instruction::IReturn | Instruction::AReturn => {
                let value = self.pop()?;
                return Ok(self.return_from_frame(base, Some(value)));
            }
            Instruction::Return => return Ok(self.return_from_frame(base, None)),
        }
        Ok(Step::Continue)
    }

    fn return_from_frame(&mut self, base: usize, value: Option<Value>) -> Step {
        self.frames.pop();
        if self.frames.len() <= base {
            return Step::Finished(value);
        }
        if let Some(value) = value {
            self.push(value);
        }
        Step::Continue
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn invoke(&mut self, kind: InvokeKind, method: &MethodRef) -> Result<(), Fault> {
        let receiver = usize::from(kind != InvokeKind::Static);
        let args = self.pop_args(method.descriptor.parameters.len() + receiver)?;

        let target = match kind {
            InvokeKind::Static => {
                self.ensure_initialized(&method.owner)?;
                self.resolve(&method.owner, method)
            }
            InvokeKind::Special | InvokeKind::Virtual => {
                let Some(runtime_class) = args.first().and_then(Value::class_name) else {
                    return Err(self.raise(
                        NULL_POINTER_EXCEPTION,
                        Some(format!("Cannot invoke {}.{} on null", display_class_name(&method.owner), method.name)),
                    ));
                };
                let lookup_from = if kind == InvokeKind::Special { &*method.owner } else { runtime_class };
                self.resolve(lookup_from, method)
                    .or_else(|| self.resolve(&method.owner, method))
            }
        };

        match target {
            Some(Target::Native(native)) => {
                let value = self.call_native(native, &args)?;
                if !method.descriptor.returns.is_void() {
                    self.push(value);
                }
                Ok(())
            }
            Some(Target::Code(class, index)) => self.push_frame(class, index, args),
            None => Err(no_such_method(&method.owner, &method.name, &method.descriptor).into()),
        }
    }

    /// The implementation of `method` seen from `class`: natives first,
    /// then code, walking up the superclasses.
    fn resolve(&self, class: &str, method: &MethodRef) -> Option<Target> {
        for loaded in self.loader.superclass_chain(class) {
            if let Some(native) = self.natives.lookup(loaded.name(), &method.name) {
                return Some(Target::Native(native));
            }
            if let Some(index) = loaded.find_method(&method.name, &method.descriptor) {
                if loaded.code_at(index).is_some() {
                    return Some(Target::Code(loaded, index));
                }
            }
        }
        None
    }

    fn call_native(&mut self, native: NativeFn, args: &[Value]) -> Result<Value, Fault> {
        let result = {
            let loader = &self.loader;
            let next_id = &mut self.next_object_id;
            let frames = &self.frames;
            let mut allocate = |class: &str| allocate_object(loader, next_id, frames, class);
            let mut context = NativeContext::new(&mut *self.console, &mut allocate);
            native(&mut context, args)
        };
        result.map_err(|raise| self.raise(raise.class, raise.message))
    }

    fn push_frame(&mut self, class: Rc<LoadedClass>, method: usize, mut args: Vec<Value>) -> Result<(), Fault> {
        if self.frames.len() >= self.options.max_call_depth {
            return Err(self.raise(STACK_OVERFLOW_ERROR, None));
        }
        let Some(code) = class.code_at(method) else {
            let info = class.method_at(method);
            return Err(no_such_method(class.name(), &info.name, &info.descriptor).into());
        };
        let locals = usize::from(code.max_locals).max(args.len());
        args.resize(locals, Value::Null);
        let stack = Vec::with_capacity(usize::from(code.max_stack));
        trace!(
            class = class.name(),
            method = %class.method_at(method).name,
            depth = self.frames.len(),
            "call"
        );
        self.frames.push(CallFrame {
            class,
            method,
            pc: 0,
            locals: args,
            stack,
        });
        Ok(())
    }

    /// Run the static initializer of `owner` the first time the class is
    /// used. A class whose initializer is running counts as initialized.
    fn ensure_initialized(&mut self, owner: &str) -> Result<(), Fault> {
        let class = self.loader.class(owner)?;
        if class.init_state() != InitState::Pending {
            return Ok(());
        }
        class.set_init_state(InitState::Running);
        let Some(index) = class
            .file
            .methods
            .iter()
            .position(|method| method.is_static() && &*method.name == STATIC_INITIALIZER_NAME)
        else {
            class.set_init_state(InitState::Done);
            return Ok(());
        };
        debug!(class = owner, "running static initializer");
        let base = self.frames.len();
        self.push_frame(Rc::clone(&class), index, Vec::new())?;
        let result = self.run(base);
        class.set_init_state(InitState::Done);
        match result {
            Ok(_) => Ok(()),
            Err(VmError::Uncaught(thrown)) => Err(Fault::Throw(thrown.exception)),
            Err(error) => Err(Fault::Error(error)),
        }
    }

    // =========================================================================
    // Operand stack and locals
    // =========================================================================

    fn push(&mut self, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.stack.push(value);
        }
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        let value = self.frames.last_mut().and_then(|frame| frame.stack.pop());
        value.ok_or_else(|| self.malformed("operand stack underflow"))
    }

    fn pop_int(&mut self) -> Result<i32, Fault> {
        let value = self.pop()?;
        value
            .as_int()
            .ok_or_else(|| self.malformed(format!("expected an integer, found {value}")))
    }

    fn pop_args(&mut self, count: usize) -> Result<Vec<Value>, Fault> {
        let args = self.frames.last_mut().and_then(|frame| {
            let split = frame.stack.len().checked_sub(count)?;
            Some(frame.stack.split_off(split))
        });
        args.ok_or_else(|| self.malformed("operand stack underflow"))
    }

    fn local(&self, slot: u16) -> Result<Value, Fault> {
        self.frames
            .last()
            .and_then(|frame| frame.locals.get(usize::from(slot)))
            .cloned()
            .ok_or_else(|| self.malformed(format!("local {slot} out of range")))
    }

    fn set_local(&mut self, slot: u16, value: Value) -> Result<(), Fault> {
        let stored = self.frames.last_mut().and_then(|frame| {
            let local = frame.locals.get_mut(usize::from(slot))?;
            *local = value;
            Some(())
        });
        stored.ok_or_else(|| self.malformed(format!("local {slot} out of range")))
    }

    fn jump(&mut self, target: Offset) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = target as usize;
        }
    }

    fn int_binary(&mut self, op: fn(i32, i32) -> i32) -> Result<(), Fault> {
        let right = self.pop_int()?;
        let left = self.pop_int()?;
        self.push(Value::Int(op(left, right)));
        Ok(())
    }

    fn int_division(&mut self, op: fn(i32, i32) -> i32) -> Result<(), Fault> {
        let right = self.pop_int()?;
        let left = self.pop_int()?;
        if right == 0 {
            return Err(self.raise(ARITHMETIC_EXCEPTION, Some("/ by zero".to_string())));
        }
        self.push(Value::Int(op(left, right)));
        Ok(())
    }

    fn field_receiver<'v>(&mut self, receiver: &'v Value, field: &FieldRef, action: &str) -> Result<&'v ObjectRef, Fault> {
        match receiver {
            Value::Object(object) => Ok(object),
            Value::Null => Err(self.raise(
                NULL_POINTER_EXCEPTION,
                Some(format!("Cannot {action} field {} because the receiver is null", field.name)),
            )),
            other => Err(self.malformed(format!("field access on {other}"))),
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    /// Create an exception of `class` with the current stack trace.
    fn raise(&mut self, class: &str, message: Option<String>) -> Fault {
        let exception = self.allocate(class);
        exception.set_field(MESSAGE_FIELD, message.map_or(Value::Null, |message| Value::string(&message)));
        Fault::Throw(exception)
    }

    fn malformed(&self, reason: impl Into<String>) -> Fault {
        let (method, offset) = match self.frames.last() {
            Some(frame) => (
                format!("{}.{}", frame.class.name(), frame.class.method_at(frame.method).name),
                frame.current_offset(),
            ),
            None => (String::new(), 0),
        };
        Fault::Error(VmError::Malformed {
            method,
            offset,
            reason: reason.into(),
        })
    }
}

fn allocate_object(loader: &ClassLoader, next_id: &mut u32, frames: &[CallFrame], class: &str) -> ObjectRef {
    let id = *next_id;
    *next_id = next_id.wrapping_add(1);
    let throwable = loader.is_throwable(class);
    let object = Rc::new(Object::new(id, Arc::from(class), loader.instance_fields(class), throwable));
    if throwable {
        *object.stack_trace.borrow_mut() = capture_trace(frames);
    }
    object
}

/// The frames of `frames`, innermost first, followed by the entry frame.
fn capture_trace(frames: &[CallFrame]) -> Vec<StackFrame> {
    let mut trace: Vec<StackFrame> = frames
        .iter()
        .rev()
        .map(|frame| StackFrame {
            class: Arc::clone(&frame.class.file.name),
            method: Arc::clone(&frame.class.method_at(frame.method).name),
            source_file: frame.class.file.source_file.clone(),
            line: frame
                .class
                .code_at(frame.method)
                .and_then(|code| code.line_at(frame.current_offset())),
        })
        .collect();
    trace.push(StackFrame::entry());
    trace
}

fn no_such_method(owner: &str, name: &str, descriptor: &MethodDescriptor) -> VmError {
    VmError::NoSuchMethod {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    }
}

fn no_such_field(owner: &str, name: &str) -> VmError {
    VmError::NoSuchField {
        owner: owner.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/interpreter_tests.rs"]
mod interpreter_tests;
