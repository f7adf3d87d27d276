use super::args::{Command, KiteArgs};
use clap::Parser;
use std::path::PathBuf;

fn parse(args: &[&str]) -> KiteArgs {
    KiteArgs::try_parse_from(std::iter::once("kite").chain(args.iter().copied()))
        .unwrap_or_else(|error| panic!("{args:?} should parse: {error}"))
}

#[test]
fn test_compile_flags() {
    let args = parse(&["compile", "a.kite", "b.kite", "-c", "lib", "--classpath", "more", "-d", "build", "--no-color"]);
    assert!(args.no_color);
    let Command::Compile(compile) = args.command else {
        panic!("expected compile");
    };
    assert_eq!(compile.sources, vec![PathBuf::from("a.kite"), PathBuf::from("b.kite")]);
    assert_eq!(compile.classpath.classpath, vec![PathBuf::from("lib"), PathBuf::from("more")]);
    assert_eq!(compile.out_dir, Some(PathBuf::from("build")));
    assert_eq!(compile.module_name, None);
}

#[test]
fn test_repl_flags() {
    let args = parse(&["repl", "--embedded", "--prompt", "kite> ", "--project", "app"]);
    assert_eq!(args.project, Some(PathBuf::from("app")));
    let Command::Repl(repl) = args.command else {
        panic!("expected repl");
    };
    assert!(repl.embedded);
    assert_eq!(repl.prompt.as_deref(), Some("kite> "));
    assert!(repl.classpath.classpath.is_empty());
}

#[test]
fn test_disasm_and_dump_metadata() {
    let Command::Disasm(disasm) = parse(&["disasm", "Main.kclass", "--inline-jsr"]).command else {
        panic!("expected disasm");
    };
    assert_eq!(disasm.class, PathBuf::from("Main.kclass"));
    assert!(disasm.inline_jsr);
    assert!(!disasm.cfg);

    let Command::DumpMetadata(dump) = parse(&["dump-metadata"]).command else {
        panic!("expected dump-metadata");
    };
    assert_eq!(dump.module, None);
}

#[test]
fn test_missing_subcommand_is_rejected() {
    assert!(KiteArgs::try_parse_from(["kite"]).is_err());
    assert!(KiteArgs::try_parse_from(["kite", "disasm"]).is_err());
}
