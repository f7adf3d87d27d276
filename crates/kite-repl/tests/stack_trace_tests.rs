use super::*;
use crate::interpreter::is_line_class;

fn frame(class: &str, method: &str, line: u32) -> StackFrame {
    StackFrame {
        class: class.into(),
        method: method.into(),
        source_file: Some(format!("{class}.kite")),
        line: Some(line),
    }
}

fn methods(frames: &[StackFrame]) -> Vec<String> {
    frames.iter().map(|frame| format!("{}.{}", frame.class, frame.method)).collect()
}

#[test]
fn test_frames_outside_the_outermost_line_constructor_are_dropped() {
    let frames = vec![
        frame("Line1", "boom", 2),
        frame("Line2", "<init>", 1),
        frame("kite/internal/Repl", "run", 10),
        StackFrame::entry(),
    ];
    assert_eq!(
        methods(trim_stack_trace(&frames, is_line_class)),
        vec!["Line1.boom", "Line2.<init>"]
    );
}

#[test]
fn test_nested_line_constructors_keep_the_outermost() {
    let frames = vec![
        frame("Line3", "<init>", 1),
        frame("Line1", "make", 4),
        frame("Line4", "<init>", 2),
        StackFrame::entry(),
    ];
    assert_eq!(
        methods(trim_stack_trace(&frames, is_line_class)),
        vec!["Line3.<init>", "Line1.make", "Line4.<init>"]
    );
}

#[test]
fn test_without_a_line_frame_only_the_entry_is_dropped() {
    let frames = vec![frame("CounterKt", "next", 3), StackFrame::entry()];
    assert_eq!(methods(trim_stack_trace(&frames, is_line_class)), vec!["CounterKt.next"]);

    let frames = vec![frame("CounterKt", "next", 3)];
    assert_eq!(methods(trim_stack_trace(&frames, is_line_class)), vec!["CounterKt.next"]);
    assert!(trim_stack_trace(&[], is_line_class).is_empty());
}
