//! Input and output shared by the REPL driver and the running program.
//!
//! The driver and a user's `readLine()` read from the same input. The
//! program's console is a [`GatedConsole`] that only reads while a line is
//! executing, so a stray read outside evaluation cannot swallow the next
//! line the driver expects.

use kite_vm::Console;
use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use tracing::{trace, warn};

/// Set while a line's code runs.
#[derive(Clone, Debug, Default)]
pub struct ExecutingFlag(Rc<Cell<bool>>);

impl ExecutingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_executing(&self) -> bool {
        self.0.get()
    }

    /// Mark execution as running until the guard is dropped.
    pub fn enter(&self) -> ExecutingGuard {
        let previous = self.0.replace(true);
        ExecutingGuard {
            flag: Rc::clone(&self.0),
            previous,
        }
    }
}

#[must_use = "execution ends when the guard is dropped"]
pub struct ExecutingGuard {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// A console that refuses to read unless the program is executing.
pub struct GatedConsole<C> {
    inner: C,
    executing: ExecutingFlag,
}

impl<C: Console> GatedConsole<C> {
    pub fn new(inner: C, executing: ExecutingFlag) -> Self {
        GatedConsole { inner, executing }
    }
}

impl<C: Console> Console for GatedConsole<C> {
    fn write(&mut self, text: &str) {
        self.inner.write(text);
    }

    fn read_line(&mut self) -> Option<String> {
        if !self.executing.is_executing() {
            warn!("readLine outside of line execution");
            return None;
        }
        self.inner.read_line()
    }

    fn flush(&mut self) {
        self.inner.flush();
    }
}

/// Cloneable handles to one input and one output stream.
#[derive(Clone)]
pub struct ReplIo {
    input: Rc<RefCell<Box<dyn BufRead>>>,
    output: Rc<RefCell<Box<dyn Write>>>,
}

impl ReplIo {
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        ReplIo {
            input: Rc::new(RefCell::new(Box::new(input))),
            output: Rc::new(RefCell::new(Box::new(output))),
        }
    }

    pub fn stdio() -> Self {
        ReplIo::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    /// Next input line without its terminator; `Ok(None)` at end of input.
    pub fn next_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        trace!(line = %line, "input");
        Ok(Some(line))
    }

    pub fn print(&self, text: &str) -> io::Result<()> {
        self.output.borrow_mut().write_all(text.as_bytes())
    }

    pub fn println(&self, text: &str) -> io::Result<()> {
        let mut output = self.output.borrow_mut();
        output.write_all(text.as_bytes())?;
        output.write_all(b"\n")
    }

    pub fn flush_output(&self) -> io::Result<()> {
        self.output.borrow_mut().flush()
    }
}

impl Console for ReplIo {
    fn write(&mut self, text: &str) {
        if let Err(error) = self.print(text) {
            warn!(%error, "console write failed");
        }
    }

    fn read_line(&mut self) -> Option<String> {
        self.next_line().unwrap_or_else(|error| {
            warn!(%error, "console read failed");
            None
        })
    }

    fn flush(&mut self) {
        if let Err(error) = self.flush_output() {
            warn!(%error, "console flush failed");
        }
    }
}

#[cfg(test)]
#[path = "../tests/console_tests.rs"]
mod console_tests;
