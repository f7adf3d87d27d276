//! Kite script front end.
//!
//! This crate provides the lexical and syntactic phases:
//! - `SyntaxKind` - Token kinds
//! - `ScannerState` - Tokenizer
//! - `NodeArena` / `NodeIndex` - Syntax tree storage
//! - `ParserState` - Recursive-descent parser with error recovery

pub mod token;
pub use token::SyntaxKind;

pub mod scanner;
pub use scanner::ScannerState;

pub mod ast;
pub use ast::{BinaryOp, Node, NodeArena, NodeIndex, NodeKind, NodeList, UnaryOp};

pub mod parser;
pub use parser::ParserState;

use kite_common::Diagnostic;

/// A parsed source unit.
#[derive(Debug)]
pub struct ParsedScript {
    pub file_name: String,
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub diagnostics: Vec<Diagnostic>,
    /// Errors exist and all of them sit at the end of the input.
    pub incomplete: bool,
}

impl ParsedScript {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Top-level statements in source order.
    pub fn statements(&self) -> &[NodeIndex] {
        match self.arena.kind(self.root) {
            NodeKind::SourceFile { statements, .. } => statements,
            _ => &[],
        }
    }

    pub fn imports(&self) -> &[NodeIndex] {
        match self.arena.kind(self.root) {
            NodeKind::SourceFile { imports, .. } => imports,
            _ => &[],
        }
    }
}

/// Parse `text` as a script file.
pub fn parse_script(file_name: &str, text: &str) -> ParsedScript {
    let mut parser = ParserState::new(file_name.to_string(), text.to_string());
    let root = parser.parse_source_file();
    let incomplete = parser.all_errors_at_end_of_input();
    let diagnostics = parser.take_diagnostics();
    ParsedScript {
        file_name: file_name.to_string(),
        arena: parser.into_arena(),
        root,
        diagnostics,
        incomplete,
    }
}
