//! Centralized limits and thresholds for the kite compiler core.
//!
//! These bound recursion and iteration in algorithms whose input comes from
//! user code or from class files that may be malformed.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for parsing and analysing expressions.
///
/// Deeply nested input such as `((((((1))))))` beyond this depth is
/// reported as a diagnostic instead of overflowing the stack.
pub const MAX_EXPR_DEPTH: u32 = 256;

/// Maximum depth of nested subtype checks before the checker gives up
/// and answers "not a subtype".
pub const MAX_SUBTYPE_DEPTH: u32 = 64;

/// Maximum VM call depth. Exceeding it raises a `StackOverflowError`
/// in the running program.
pub const MAX_CALL_DEPTH: usize = 1024;

// =============================================================================
// Operation Count Limits
// =============================================================================

/// Maximum number of duplicate-and-retry rounds in jsr inlining.
///
/// Each round splits at least one overlapping subroutine range, so a
/// well-formed method converges far below this; hitting it means the
/// input is malformed.
pub const MAX_JSR_INLINING_ROUNDS: usize = 1000;

/// Maximum number of candidates kept when reporting an inapplicable or
/// ambiguous call.
pub const MAX_REPORTED_CANDIDATES: usize = 5;

/// Maximum number of instructions the VM executes for one REPL line before
/// aborting with a runtime error.
pub const MAX_INSTRUCTIONS_PER_LINE: u64 = 50_000_000;
