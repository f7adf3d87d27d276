//! Common types and utilities for the kite compiler core.
//!
//! This crate provides foundational types used across all kite crates:
//! - Value interning with parent chaining (`Interner`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`, message templates)
//! - Source positions (`Span`, `LineMap`, `Position`)
//! - Lazy values and memoized functions with first-writer-wins semantics
//! - Compiler limits and thresholds

// Value interning for string/qualified-name tables
pub mod interner;
pub use interner::Interner;

// Diagnostics collected by every phase
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, diagnostic_codes, format_message};

// Span and line/column positions
pub mod position;
pub use position::{LineMap, Position, Span};

// Deferred and memoized computations
pub mod lazy;
pub use lazy::{LazyValue, MemoizedFunction};

// Centralized limits and thresholds
pub mod limits;

// Varint byte streams shared by the metadata and class-file codecs
pub mod bytes;
pub use bytes::{ByteReader, ByteWriter, DecodeError};
