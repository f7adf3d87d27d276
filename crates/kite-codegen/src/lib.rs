//! Code generation: analyzed scripts to class files.
//!
//! Every script becomes one class:
//! - a REPL line `LineN` is an instance class. Its constructor takes the
//!   instances of every earlier line, keeps them in `$lineK` fields, runs
//!   the line's statements and stores the value of a trailing expression
//!   in `$$result`. Properties are instance fields and functions are
//!   instance methods.
//! - a source file is a facade of static members whose top-level
//!   statements run in `<clinit>`. Public properties get static accessors.
//!
//! `try`/`finally` is compiled with subroutines: every exit from the
//! protected code calls the `finally` block with `jsr`, which returns with
//! `ret`. Loaders that want straight-line code inline these with
//! `ControlFlowGraph::inline_jsr`.

pub mod error;
mod generator;
pub mod types;

pub use error::{CodegenError, CodegenResult};

use kite_bytecode::{ClassFile, FieldRef};
use kite_resolve::ScriptAnalysis;
use kite_syntax::ParsedScript;
use kite_types::ClassId;

/// One analyzed script and what code generation needs around it.
pub struct ScriptUnit<'a> {
    pub script: &'a ParsedScript,
    /// The text `script` was parsed from, for line numbers.
    pub source: &'a str,
    pub analysis: &'a ScriptAnalysis,
    /// Classes of the earlier REPL lines, in line order. Empty for files.
    pub earlier_lines: &'a [ClassId],
}

#[derive(Debug)]
pub struct GeneratedScript {
    pub class: ClassFile,
    /// The field holding the line's value, when it has one.
    pub result: Option<FieldRef>,
}

pub use generator::generate_script;

#[cfg(test)]
#[path = "../tests/test_support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "../tests/codegen_tests.rs"]
mod codegen_tests;
