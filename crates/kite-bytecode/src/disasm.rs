//! Human-readable class listings.

use crate::cfg::ControlFlowGraph;
use crate::class_file::{AccessFlags, ClassFile, Code, MethodInfo};
use crate::error::CfgError;
use std::fmt::Write as _;

/// How method bodies are listed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodeListing {
    /// One instruction per line, with the exception and line tables.
    #[default]
    Linear,
    /// The basic blocks of each method.
    Blocks,
    /// The basic blocks after subroutine inlining.
    InlinedBlocks,
}

pub fn disassemble_class(class: &ClassFile) -> String {
    // Linear listings cannot fail.
    disassemble_class_with(class, CodeListing::Linear).unwrap_or_default()
}

pub fn disassemble_class_with(class: &ClassFile, listing: CodeListing) -> Result<String, CfgError> {
    let mut out = String::new();
    let _ = write!(out, "{}class {}", flag_words(class.flags), class.name);
    if let Some(super_name) = &class.super_name {
        let _ = write!(out, " extends {super_name}");
    }
    out.push('\n');
    if let Some(source) = &class.source_file {
        let _ = writeln!(out, "  // source: {source}");
    }
    for field in &class.fields {
        let _ = writeln!(out, "  {}field {}: {}", flag_words(field.flags), field.name, field.ty);
    }
    for method in &class.methods {
        out.push('\n');
        disassemble_method(&mut out, method, listing)?;
    }
    Ok(out)
}

fn disassemble_method(out: &mut String, method: &MethodInfo, listing: CodeListing) -> Result<(), CfgError> {
    let _ = writeln!(out, "  {}method {}{}", flag_words(method.flags), method.name, method.descriptor);
    let Some(code) = &method.code else {
        let _ = writeln!(out, "    native");
        return Ok(());
    };
    let _ = writeln!(out, "    stack={} locals={}", code.max_stack, code.max_locals);
    match listing {
        CodeListing::Linear => list_linear(out, code),
        CodeListing::Blocks | CodeListing::InlinedBlocks => {
            let mut graph = ControlFlowGraph::build_blocks(code)?;
            if listing == CodeListing::InlinedBlocks {
                graph.inline_jsr()?;
            }
            for line in graph.dump().lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    Ok(())
}

fn list_linear(out: &mut String, code: &Code) {
    let mut lines = code.line_numbers.iter().peekable();
    for (offset, instruction) in code.instructions.iter().enumerate() {
        let offset = offset as u32;
        let line = lines.next_if(|entry| entry.offset == offset);
        match line {
            Some(entry) => {
                let text = instruction.to_string();
                let _ = writeln!(out, "    {offset:>4}: {text:<40} // line {}", entry.line);
            }
            None => {
                let _ = writeln!(out, "    {offset:>4}: {instruction}");
            }
        }
    }
    if !code.exception_table.is_empty() {
        let _ = writeln!(out, "    exceptions:");
        for entry in &code.exception_table {
            let _ = writeln!(
                out,
                "      {}..{} -> {} {}",
                entry.from,
                entry.to,
                entry.handler,
                entry.catch_type.as_deref().unwrap_or("any")
            );
        }
    }
}

fn flag_words(flags: AccessFlags) -> String {
    let mut words = String::new();
    for (name, flag) in [
        ("public ", AccessFlags::PUBLIC),
        ("private ", AccessFlags::PRIVATE),
        ("static ", AccessFlags::STATIC),
        ("final ", AccessFlags::FINAL),
        ("abstract ", AccessFlags::ABSTRACT),
        ("synthetic ", AccessFlags::SYNTHETIC),
        ("script ", AccessFlags::SCRIPT),
    ] {
        if flags.contains(flag) {
            words.push_str(name);
        }
    }
    words
}

#[cfg(test)]
#[path = "../tests/disasm_tests.rs"]
mod disasm_tests;
