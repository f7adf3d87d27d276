use super::*;
use crate::test_support::{SharedOutput, io_with_input};
use crate::{Environment, ReplOptions};

fn session(input: &str, options: ReplOptions) -> SharedOutput {
    let (io, output) = io_with_input(input);
    let environment = Environment::stdlib().expect("standard library environment loads");
    let interpreter = ReplInterpreter::with_environment(options, io.clone(), environment);
    ReplDriver::new(interpreter, io).run().expect("session runs");
    output
}

#[test]
fn test_command_parsing() {
    assert_eq!(ReplCommand::parse(":quit"), Some(ReplCommand::Quit));
    assert_eq!(ReplCommand::parse("  :q  "), Some(ReplCommand::Quit));
    assert_eq!(ReplCommand::parse(":dump"), Some(ReplCommand::Dump));
    assert_eq!(
        ReplCommand::parse(":complete  maxO"),
        Some(ReplCommand::Complete("maxO".to_string()))
    );
    assert_eq!(ReplCommand::parse(":complete"), Some(ReplCommand::Complete(String::new())));
    assert_eq!(ReplCommand::parse(":frobnicate"), Some(ReplCommand::Unknown("frobnicate".to_string())));
    assert_eq!(ReplCommand::parse("x + 1"), None);
}

#[test]
fn test_session_prints_values_and_stops_at_quit() {
    let output = session("val x = 2\nx * 21\n:quit\nx\n", ReplOptions::default());
    assert_eq!(output.contents(), ">>> >>> 42\n>>> ");
}

#[test]
fn test_continuation_prompt_while_input_is_incomplete() {
    let output = session("if (1 < 2) {\n\"yes\"\n} else { \"no\" }\n", ReplOptions::default());
    assert_eq!(output.contents(), ">>> ... ... yes\n>>> ");
}

#[test]
fn test_errors_are_printed_and_the_loop_continues() {
    let output = session("1 / 0\nnope\n3\n", ReplOptions::default());
    let text = output.contents();
    assert!(text.contains("kite.ArithmeticException: / by zero\n\tat Line1.<init>(Line1.kite:1)\n"), "{text}");
    assert!(text.contains("Line2.kite:1:1: error:"), "{text}");
    assert!(text.ends_with("3\n>>> "), "{text}");
}

#[test]
fn test_embedded_sessions_have_no_prompts() {
    let options = ReplOptions {
        embedded: true,
        ..ReplOptions::default()
    };
    let output = session("val greeting = \"hi\"\nprintln(greeting)\ngreeting\n", options);
    assert_eq!(output.contents(), "hi\nhi\n");
}

#[test]
fn test_user_read_line_shares_the_input() {
    let options = ReplOptions {
        embedded: true,
        ..ReplOptions::default()
    };
    let output = session("val name = readLine()\nAda\nname\n", options);
    assert_eq!(output.contents(), "Ada\n");
}

#[test]
fn test_completion_and_dump_commands() {
    let options = ReplOptions {
        embedded: true,
        ..ReplOptions::default()
    };
    let output = session(":complete prin\nval x = 1\n:dump\n:help\n:what\n", options);
    let text = output.contents();
    assert!(text.starts_with("print\nprintln\n"), "{text}");
    assert!(text.contains("class Line1"), "{text}");
    assert!(text.contains(":complete <text>"), "{text}");
    assert!(text.ends_with("unknown command :what, try :help\n"), "{text}");
}
