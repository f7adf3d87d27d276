//! Input and output channels of running programs.
//!
//! `print`, `println` and `readLine` never touch the process streams
//! directly; the embedder passes a [`Console`] to the VM.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

pub trait Console {
    fn write(&mut self, text: &str);

    /// The next input line without its terminator, or `None` at end of
    /// input.
    fn read_line(&mut self) -> Option<String>;

    fn flush(&mut self) {}
}

/// The process's standard streams.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(trim_line_end(line)),
        }
    }

    fn flush(&mut self) {
        let _ = io::stdout().flush();
    }
}

pub(crate) fn trim_line_end(mut line: String) -> String {
    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
    line
}

/// In-memory channels. Clones share the same buffers, so a test can keep a
/// handle while the VM owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryConsole {
    inner: Rc<RefCell<MemoryBuffers>>,
}

#[derive(Debug, Default)]
struct MemoryBuffers {
    input: VecDeque<String>,
    output: String,
}

impl MemoryConsole {
    pub fn new() -> Self {
        MemoryConsole::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = MemoryConsole::new();
        console.inner.borrow_mut().input.extend(lines.into_iter().map(Into::into));
        console
    }

    pub fn push_input(&self, line: &str) {
        self.inner.borrow_mut().input.push_back(line.to_string());
    }

    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }

    /// Return everything written so far and clear the buffer.
    pub fn take_output(&self) -> String {
        std::mem::take(&mut self.inner.borrow_mut().output)
    }
}

impl Console for MemoryConsole {
    fn write(&mut self, text: &str) {
        self.inner.borrow_mut().output.push_str(text);
    }

    fn read_line(&mut self) -> Option<String> {
        self.inner.borrow_mut().input.pop_front()
    }
}
