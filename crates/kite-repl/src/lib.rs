//! Interactive evaluation of Kite script, one line at a time.
//!
//! Every submitted line is parsed, analyzed in the scope left behind by the
//! previous line, compiled to its own class and executed in the VM:
//!
//! ```text
//!   text ──► parse ──► analyze ──► codegen ──► define ──► construct
//!    ▲        │ incomplete          │ errors                 │ uncaught
//!    └────────┘ (buffered)          ▼                        ▼
//!                             compile error            runtime error
//! ```
//!
//! The class of line `n` takes the instances of all earlier lines as
//! constructor arguments, which is how later lines reach earlier
//! declarations. The resolve environment is built on a background thread
//! while the first line is typed.
//!
//! - `interpreter` - the [`ReplInterpreter`] state machine
//! - `driver` - the read-eval-print loop and `:` commands
//! - `environment` - classpath loading
//! - `init` - the background initialization handshake
//! - `console` - shared input/output and the "executing" gate
//! - `stack_trace` - hiding REPL frames from user exceptions

pub mod console;
pub mod driver;
pub mod environment;
pub mod error;
pub mod init;
pub mod interpreter;
pub mod stack_trace;

pub use console::{ExecutingFlag, GatedConsole, ReplIo};
pub use driver::{ReplCommand, ReplDriver};
pub use environment::Environment;
pub use error::{ClasspathError, ReplError, ReplResult};
pub use init::BackgroundInit;
pub use interpreter::{EarlierLine, LineResult, ReplInterpreter, ReplOptions};

#[cfg(test)]
#[path = "../tests/test_support.rs"]
pub(crate) mod test_support;
