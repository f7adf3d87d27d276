//! Hiding the REPL's own frames from user exceptions.

use kite_bytecode::CONSTRUCTOR_NAME;
use kite_vm::{StackFrame, Thrown};

/// The frames of `frames` (innermost first) that belong to user code.
///
/// Everything outside the outermost line constructor was put there by the
/// REPL to run the line, as is the VM's synthetic entry frame.
pub fn trim_stack_trace(frames: &[StackFrame], is_line_class: impl Fn(&str) -> bool) -> &[StackFrame] {
    let outermost_line = frames
        .iter()
        .rposition(|frame| &*frame.method == CONSTRUCTOR_NAME && is_line_class(&frame.class));
    match outermost_line {
        Some(index) => &frames[..=index],
        None => match frames.split_last() {
            Some((last, rest)) if last.is_entry() => rest,
            _ => frames,
        },
    }
}

/// `kite.X: message` followed by the user's frames.
pub fn render_exception(thrown: &Thrown, is_line_class: impl Fn(&str) -> bool) -> String {
    let frames = thrown.stack_trace();
    thrown.render(trim_stack_trace(&frames, is_line_class))
}

#[cfg(test)]
#[path = "../tests/stack_trace_tests.rs"]
mod stack_trace_tests;
