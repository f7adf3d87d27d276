use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface of the `kite` binary.
#[derive(Parser, Debug)]
#[command(
    name = "kite",
    version,
    about = "Compiler, disassembler and REPL for Kite scripts"
)]
pub struct KiteArgs {
    /// Project file. Defaults to `kite.json` in the working directory when present.
    #[arg(long, global = true, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Disable colored diagnostics.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive session.
    Repl(ReplArgs),
    /// Compile source files to `.kclass` files and a `.kmeta` module.
    Compile(CompileArgs),
    /// Print a class file.
    Disasm(DisasmArgs),
    /// Print a metadata module as JSON. Without a file, prints the standard library.
    #[command(name = "dump-metadata")]
    DumpMetadata(DumpMetadataArgs),
}

#[derive(Args, Debug, Default)]
pub struct ClasspathArgs {
    /// Directories or files holding `.kclass` and `.kmeta` files. Repeatable.
    #[arg(long = "classpath", short = 'c', value_name = "PATH")]
    pub classpath: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplArgs {
    #[command(flatten)]
    pub classpath: ClasspathArgs,

    /// Read lines from stdin without prompts, evaluating each one as it arrives.
    #[arg(long)]
    pub embedded: bool,

    /// Prompt shown before each line.
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Source files. Defaults to the project file's `sources`.
    #[arg(value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    #[command(flatten)]
    pub classpath: ClasspathArgs,

    /// Output directory.
    #[arg(long, short = 'd', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Name of the emitted metadata module.
    #[arg(long, value_name = "NAME")]
    pub module_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct DisasmArgs {
    /// A `.kclass` file.
    #[arg(value_name = "FILE")]
    pub class: PathBuf,

    /// List basic blocks instead of instructions.
    #[arg(long)]
    pub cfg: bool,

    /// Inline `jsr` subroutines before listing blocks. Implies `--cfg`.
    #[arg(long)]
    pub inline_jsr: bool,
}

#[derive(Args, Debug)]
pub struct DumpMetadataArgs {
    /// A `.kmeta` file.
    #[arg(value_name = "FILE")]
    pub module: Option<PathBuf>,
}
