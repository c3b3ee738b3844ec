//! Stack growth for the recursive parser, evaluator and printer.
//!
//! Deeply nested scripts recurse once per nesting level. Wrapping each recursive step in
//! [`ensure_sufficient_stack`] moves to a fresh heap-allocated stack segment before the
//! native stack runs out.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
