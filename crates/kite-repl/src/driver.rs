//! The read-eval-print loop.

use crate::console::ReplIo;
use crate::error::ReplResult;
use crate::interpreter::{LineResult, ReplInterpreter};
use tracing::debug;

pub const DEFAULT_PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

/// A `:` command typed at the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Dump,
    Complete(String),
    Help,
    Unknown(String),
}

impl ReplCommand {
    /// `None` when `line` is not a command.
    pub fn parse(line: &str) -> Option<ReplCommand> {
        let command = line.trim_start().strip_prefix(':')?;
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim_start()),
            None => (command.trim_end(), ""),
        };
        Some(match name {
            "quit" | "q" => ReplCommand::Quit,
            "dump" => ReplCommand::Dump,
            "complete" => ReplCommand::Complete(argument.to_string()),
            "help" => ReplCommand::Help,
            _ => ReplCommand::Unknown(name.to_string()),
        })
    }
}

const HELP: &str = "\
:complete <text>  names that can follow <text>
:dump             disassemble the classes compiled so far
:quit             leave the REPL";

pub struct ReplDriver {
    interpreter: ReplInterpreter,
    io: ReplIo,
    prompt: String,
}

impl ReplDriver {
    /// `io` should be the handle the interpreter's console was made from,
    /// so the driver and the running program read the same input.
    pub fn new(interpreter: ReplInterpreter, io: ReplIo) -> Self {
        ReplDriver {
            interpreter,
            io,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn interpreter(&self) -> &ReplInterpreter {
        &self.interpreter
    }

    /// Read and evaluate lines until `:quit` or end of input.
    pub fn run(&mut self) -> ReplResult<()> {
        let interactive = !self.interpreter.options().embedded;
        loop {
            if interactive {
                let prompt = if self.interpreter.has_pending_input() {
                    CONTINUATION_PROMPT
                } else {
                    self.prompt.as_str()
                };
                self.io.print(prompt)?;
                self.io.flush_output()?;
            }
            let Some(line) = self.io.next_line()? else {
                break;
            };
            if !self.interpreter.has_pending_input() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(command) = ReplCommand::parse(&line) {
                    debug!(?command, "command");
                    if !self.command(command)? {
                        break;
                    }
                    continue;
                }
            }
            let result = self.interpreter.eval(&line)?;
            self.report(result)?;
        }
        self.io.flush_output()?;
        Ok(())
    }

    /// Run `command`; `false` ends the session.
    fn command(&mut self, command: ReplCommand) -> ReplResult<bool> {
        match command {
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Dump => {
                let mut listing = Vec::new();
                self.interpreter.dump_classes(&mut listing)?;
                self.io.print(&String::from_utf8_lossy(&listing))?;
            }
            ReplCommand::Complete(text) => {
                for name in self.interpreter.complete(&text)? {
                    self.io.println(&name)?;
                }
            }
            ReplCommand::Help => self.io.println(HELP)?,
            ReplCommand::Unknown(name) => self.io.println(&format!("unknown command :{name}, try :help"))?,
        }
        Ok(true)
    }

    fn report(&self, result: LineResult) -> ReplResult<()> {
        match result {
            LineResult::Success { value, is_unit } => {
                if !is_unit {
                    self.io.println(&value.to_string())?;
                }
            }
            LineResult::Incomplete => {}
            LineResult::CompileError(text) | LineResult::RuntimeError(text) => self.io.println(&text)?,
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/driver_tests.rs"]
mod driver_tests;
