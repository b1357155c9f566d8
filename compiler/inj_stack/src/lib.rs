//! Stack safety for recursive resolution and synthesis.
//!
//! Two tools, used together:
//!
//! - [`ensure_sufficient_stack`] grows the native stack on demand so deep but
//!   finite recursion (long dependency chains, deeply nested types) cannot
//!   overflow.
//! - [`RecursionLimit`] bounds recursion that may not be finite at all, such as
//!   a resolution that keeps requesting ever larger types. Exceeding the limit
//!   is reported as a value that callers turn into a resolution failure.
//!
//! # Platform Support
//!
//! - **Native targets**: `stacker::maybe_grow` with a 100KB red zone, growing
//!   1MB at a time.
//! - **WASM targets**: passthrough.

/// Minimum stack space to keep available before recursing.
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Depth bound exceeded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("recursion limit of {limit} exceeded")]
pub struct LimitExceeded {
    pub limit: usize,
}

/// Explicit depth counter for recursion that has no structural bound.
///
/// Callers pair every successful [`enter`](Self::enter) with an
/// [`exit`](Self::exit); the counter is not tied to a guard value so it can
/// live inside the same `&mut self` that drives the recursion.
#[derive(Clone, Debug)]
pub struct RecursionLimit {
    limit: usize,
    depth: usize,
    peak: usize,
}

impl RecursionLimit {
    pub const fn new(limit: usize) -> Self {
        RecursionLimit {
            limit,
            depth: 0,
            peak: 0,
        }
    }

    /// Descend one level, failing without side effects when already at the limit.
    pub fn enter(&mut self) -> Result<(), LimitExceeded> {
        if self.depth >= self.limit {
            return Err(LimitExceeded { limit: self.limit });
        }
        self.depth += 1;
        self.peak = self.peak.max(self.depth);
        Ok(())
    }

    pub fn exit(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced RecursionLimit::exit");
        self.depth = self.depth.saturating_sub(1);
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Deepest level reached so far.
    pub const fn peak(&self) -> usize {
        self.peak
    }
}
