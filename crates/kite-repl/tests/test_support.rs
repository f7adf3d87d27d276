//! Shared helpers for REPL tests.

use crate::{Environment, LineResult, ReplInterpreter, ReplIo, ReplOptions};
use kite_vm::{MemoryConsole, Value};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// An output stream tests can read back.
#[derive(Clone, Default)]
pub(crate) struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Channels reading `input` and writing to a buffer.
pub(crate) fn io_with_input(input: &str) -> (ReplIo, SharedOutput) {
    let output = SharedOutput::default();
    let io = ReplIo::new(io::Cursor::new(input.to_string().into_bytes()), output.clone());
    (io, output)
}

pub(crate) fn repl_with(options: ReplOptions) -> (ReplInterpreter, MemoryConsole) {
    let console = MemoryConsole::new();
    let environment = Environment::stdlib().expect("standard library environment loads");
    let repl = ReplInterpreter::with_environment(options, console.clone(), environment);
    (repl, console)
}

pub(crate) fn repl() -> (ReplInterpreter, MemoryConsole) {
    repl_with(ReplOptions::default())
}

pub(crate) fn eval(repl: &mut ReplInterpreter, line: &str) -> LineResult {
    repl.eval(line)
        .unwrap_or_else(|error| panic!("REPL failed on {line:?}: {error}"))
}

/// The value of `line`, which must succeed with a value.
pub(crate) fn value(repl: &mut ReplInterpreter, line: &str) -> Value {
    match eval(repl, line) {
        LineResult::Success { value, is_unit: false } => value,
        other => panic!("expected a value from {line:?}, got {other:?}"),
    }
}

pub(crate) fn compile_error(repl: &mut ReplInterpreter, line: &str) -> String {
    match eval(repl, line) {
        LineResult::CompileError(text) => text,
        other => panic!("expected a compile error from {line:?}, got {other:?}"),
    }
}

pub(crate) fn runtime_error(repl: &mut ReplInterpreter, line: &str) -> String {
    match eval(repl, line) {
        LineResult::RuntimeError(text) => text,
        other => panic!("expected a runtime error from {line:?}, got {other:?}"),
    }
}
