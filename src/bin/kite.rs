#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;

use kite::cli::args::{Command, KiteArgs, ReplArgs};
use kite::cli::config::{ProjectConfig, load_config};
use kite::cli::driver::{self, CompileOptions};
use kite::cli::reporter::Reporter;
use kite_repl::{ReplDriver, ReplInterpreter, ReplIo, ReplOptions};

const EXIT_SUCCESS: i32 = 0;
const EXIT_COMPILE_ERRORS: i32 = 1;

fn main() -> Result<()> {
    // Only installs a subscriber when KITE_LOG or RUST_LOG is set.
    kite::tracing_config::init_tracing();

    let args = KiteArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let config = load_config(&cwd, args.project.as_deref())?;

    match &args.command {
        Command::Repl(repl) => run_repl(repl, &config),
        Command::Compile(compile) => {
            let options = CompileOptions::merge(compile, &config)?;
            let result = driver::compile(&options)?;
            if !result.diagnostics.is_empty() {
                let color = !args.no_color && std::io::stderr().is_terminal();
                let mut reporter = Reporter::new(color);
                for (name, text) in &result.sources {
                    reporter.add_source(name.as_str(), text.as_str());
                }
                eprintln!("{}", reporter.render(&result.diagnostics));
            }
            let code = if result.has_errors() {
                EXIT_COMPILE_ERRORS
            } else {
                EXIT_SUCCESS
            };
            std::process::exit(code);
        }
        Command::Disasm(disasm) => {
            print!("{}", driver::disassemble(disasm)?);
            Ok(())
        }
        Command::DumpMetadata(dump) => {
            println!("{}", driver::dump_metadata(dump.module.as_deref())?);
            Ok(())
        }
    }
}

fn run_repl(args: &ReplArgs, config: &ProjectConfig) -> Result<()> {
    let classpath = if args.classpath.classpath.is_empty() {
        config.classpath.clone()
    } else {
        args.classpath.classpath.clone()
    };
    let options = ReplOptions {
        embedded: args.embedded || config.repl.embedded.unwrap_or(false),
        classpath,
        ..ReplOptions::default()
    };
    let io = ReplIo::stdio();
    let interpreter = ReplInterpreter::start(options, io.clone()).context("failed to start the REPL")?;
    let mut repl = ReplDriver::new(interpreter, io);
    if let Some(prompt) = args.prompt.as_ref().or(config.repl.prompt.as_ref()) {
        repl = repl.with_prompt(prompt.as_str());
    }
    repl.run()?;
    Ok(())
}
