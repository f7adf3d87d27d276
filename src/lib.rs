//! The `kite` command-line front end.
//!
//! ```text
//! kite.json + flags ──▶ cli::config / cli::args
//!                            │
//!        compile ──▶ kite-syntax ─▶ kite-resolve ─▶ kite-codegen ─▶ .kclass + .kmeta
//!        disasm  ──▶ kite-bytecode listings (linear, blocks, inlined blocks)
//!        repl    ──▶ kite-repl on stdin/stdout
//! ```
//!
//! The compiler itself lives in the `crates/kite-*` members; this crate
//! merges configuration, drives them and renders diagnostics.

pub mod cli;

// Tracing subscriber setup (KITE_LOG / KITE_LOG_FORMAT)
pub mod tracing_config;

#[cfg(test)]
#[path = "tests/tracing_config_tests.rs"]
mod tracing_config_tests;
