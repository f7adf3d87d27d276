use super::*;
use crate::test_support::{compile_error, eval, repl, repl_with, runtime_error, value};
use kite_vm::MemoryConsole;

#[test]
fn test_declarations_are_visible_to_later_lines() {
    let (mut repl, _) = repl();
    match eval(&mut repl, "val x = 5") {
        LineResult::Success { value, is_unit } => {
            assert!(is_unit);
            assert!(matches!(value, Value::Unit));
        }
        other => panic!("unexpected {other:?}"),
    }
    match eval(&mut repl, "x + 1") {
        LineResult::Success { value, is_unit } => {
            assert!(!is_unit);
            assert!(matches!(value, Value::Int(6)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(repl.earlier_lines().len(), 2);
    assert_eq!(repl.earlier_lines()[0].class_name, "Line1");
}

#[test]
fn test_fresh_sessions_start_empty() {
    let (mut first, _) = repl();
    value(&mut first, "val x = 5\nx");
    let (mut second, _) = repl();
    assert!(second.earlier_lines().is_empty());
    assert!(matches!(value(&mut second, "val x = 5\nx"), Value::Int(5)));
    assert_eq!(second.earlier_lines()[0].number, 1);
}

#[test]
fn test_incomplete_lines_are_joined() {
    let (mut repl, _) = repl();
    assert!(matches!(eval(&mut repl, "if (true) {"), LineResult::Incomplete));
    assert!(repl.has_pending_input());
    assert_eq!(repl.next_line_number(), 1);

    assert!(matches!(value(&mut repl, "1 } else { 2 }"), Value::Int(1)));
    assert!(!repl.has_pending_input());
    assert_eq!(repl.next_line_number(), 2);
    let line = &repl.earlier_lines()[0];
    assert_eq!(line.text, "if (true) {\n1 } else { 2 }");
    assert_eq!(line.number, 1);
}

#[test]
fn test_embedded_mode_reports_incomplete_input() {
    let (mut repl, _) = repl_with(ReplOptions {
        embedded: true,
        ..ReplOptions::default()
    });
    let text = compile_error(&mut repl, "if (true) {");
    assert!(text.starts_with("Line1.kite:1:"), "{text}");
    assert!(!repl.has_pending_input());
    assert!(matches!(value(&mut repl, "3"), Value::Int(3)));
    assert_eq!(repl.earlier_lines()[0].number, 2);
}

#[test]
fn test_syntax_errors_clear_the_buffer() {
    let (mut repl, _) = repl();
    assert!(matches!(eval(&mut repl, "val y = (1 +"), LineResult::Incomplete));
    let text = compile_error(&mut repl, ") )");
    assert!(text.contains("error"), "{text}");
    assert!(!repl.has_pending_input());
    assert!(matches!(value(&mut repl, "2"), Value::Int(2)));
}

#[test]
fn test_failed_analysis_keeps_the_previous_scope() {
    let (mut repl, _) = repl();
    eval(&mut repl, "val a = 1");
    let text = compile_error(&mut repl, "val b = missing + a");
    assert!(text.starts_with("Line2.kite:1:9: error:"), "{text}");
    assert!(matches!(value(&mut repl, "a + 1"), Value::Int(2)));
    compile_error(&mut repl, "b");
    assert_eq!(repl.earlier_lines().len(), 2);
    assert_eq!(repl.earlier_lines()[1].number, 3);
}

#[test]
fn test_runtime_errors_are_reported_and_the_session_continues() {
    let (mut repl, _) = repl();
    let text = runtime_error(&mut repl, "1 / 0");
    assert!(text.starts_with("kite.ArithmeticException: / by zero"), "{text}");
    assert!(text.contains("at Line1.<init>(Line1.kite:1)"), "{text}");
    assert!(!text.contains("Entry"), "{text}");

    assert!(matches!(value(&mut repl, "2 * 3"), Value::Int(6)));
    assert_eq!(repl.earlier_lines().len(), 1);
    assert_eq!(repl.earlier_lines()[0].class_name, "Line2");
}

#[test]
fn test_runtime_error_traces_cross_lines() {
    let (mut repl, _) = repl();
    eval(&mut repl, "fun boom(): Int {\n  return error(\"boom\")\n}");
    let text = runtime_error(&mut repl, "boom() + 1");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "kite.IllegalStateException: boom");
    assert_eq!(lines[1].trim(), "at Line1.boom(Line1.kite:2)");
    assert_eq!(lines[2].trim(), "at Line2.<init>(Line2.kite:1)");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_runaway_lines_stop_with_a_runtime_error() {
    let (mut repl, _) = repl_with(ReplOptions {
        vm: kite_vm::VmOptions {
            instruction_limit: 10_000,
            ..kite_vm::VmOptions::default()
        },
        ..ReplOptions::default()
    });
    let text = runtime_error(&mut repl, "var i = 0\nwhile (true) { i = i + 1 }");
    assert!(text.contains("10000 instructions"), "{text}");
    assert!(matches!(value(&mut repl, "1"), Value::Int(1)));
}

#[test]
fn test_output_and_input_go_through_the_console() {
    let (mut repl, console) = repl();
    assert!(matches!(eval(&mut repl, "println(\"hello\")"), LineResult::Success { is_unit: true, .. }));
    assert_eq!(console.take_output(), "hello\n");

    console.push_input("Ada");
    eval(&mut repl, "val name = readLine()");
    assert_eq!(value(&mut repl, "name").to_string(), "Ada");
    assert!(!repl.executing().is_executing());
}

#[test]
fn test_completion_does_not_use_up_a_line() {
    let (mut repl, _) = repl();
    eval(&mut repl, "val counter = 1\nprivate val hidden = 2");
    let names = repl.complete("cou").expect("completion runs");
    assert_eq!(names, vec!["counter"]);
    assert!(repl.complete("hid").expect("completion runs").is_empty());
    assert_eq!(repl.complete("\"kite\".len").expect("completion runs"), vec!["length"]);
    assert!(repl.complete("1 + 2").expect("completion runs").is_empty());
    assert_eq!(repl.next_line_number(), 2);
}

#[test]
fn test_dump_lists_generated_classes() {
    let (mut repl, _) = repl();
    eval(&mut repl, "val x = 1");
    eval(&mut repl, "x + 1");
    let mut listing = Vec::new();
    repl.dump_classes(&mut listing).expect("dump writes");
    let listing = String::from_utf8(listing).expect("utf-8 listing");
    let first = listing.find("class Line1").expect("Line1 listed");
    let second = listing.find("class Line2").expect("Line2 listed");
    assert!(first < second);
}

#[test]
fn test_dump_skips_lines_that_threw() {
    let (mut repl, _) = repl();
    eval(&mut repl, "val x = 1");
    runtime_error(&mut repl, "x / 0");
    assert!(matches!(value(&mut repl, "x + 2"), Value::Int(3)));
    let mut listing = Vec::new();
    repl.dump_classes(&mut listing).expect("dump writes");
    let listing = String::from_utf8(listing).expect("utf-8 listing");
    assert!(listing.contains("class Line1"));
    assert!(!listing.contains("class Line2"));
    assert!(listing.contains("class Line3"));
}

#[test]
fn test_background_initialization_is_awaited() {
    let mut repl = ReplInterpreter::start(ReplOptions::default(), MemoryConsole::new()).expect("thread starts");
    assert!(matches!(value(&mut repl, "identity(7)"), Value::Int(7)));
    assert!(repl.is_initialized());
}

#[test]
fn test_initialization_failure_reaches_the_caller() {
    let options = ReplOptions {
        classpath: vec![PathBuf::from("/definitely/not/a/kite/classpath")],
        ..ReplOptions::default()
    };
    let mut repl = ReplInterpreter::start(options, MemoryConsole::new()).expect("thread starts");
    assert!(matches!(
        repl.eval("1"),
        Err(ReplError::Init(ClasspathError::Missing(_)))
    ));
    assert!(matches!(repl.eval("1"), Err(ReplError::Unavailable(_))));
}

#[test]
fn test_line_class_names() {
    assert!(is_line_class("Line1"));
    assert!(is_line_class("Line42"));
    assert!(!is_line_class("Line"));
    assert!(!is_line_class("LineKt"));
    assert!(!is_line_class("kite/Any"));
}

#[test]
fn test_diagnostics_render_with_positions() {
    let text = "val a = 1\nval b = c";
    let diagnostic = Diagnostic::error("Line3.kite".to_string(), 18, 1, "Unresolved reference: c".to_string(), 1);
    assert_eq!(
        render_diagnostics(text, &[diagnostic]),
        "Line3.kite:2:9: error: Unresolved reference: c"
    );
}
