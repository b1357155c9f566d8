//! Inj IR - shared leaf types for the injection compiler.
//!
//! This crate holds the small, `Copy` vocabulary every other phase speaks:
//! - `Name` interned identifiers and the `StringInterner` behind them
//! - `Span` byte ranges and the `FileId` they belong to
//! - `SourcePosition`, the `(file, start, end)` key of the injection side table
//! - `LineIndex` for turning offsets into 1-based line/column pairs
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: strings become `Name(u32)` so equality is O(1)
//! - **Flatten Everything**: higher layers index arenas with `u32` newtypes

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-copied types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod interner;
mod name;
mod span;

pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use span::{FileId, LineIndex, SourcePosition, Span};

/// Convert an arena length into a `u32` index.
///
/// Arenas in this workspace are indexed by `u32` newtypes; a module large
/// enough to overflow that is a compiler bug, not a user error.
#[inline]
#[expect(
    clippy::cast_possible_truncation,
    reason = "arena sizes are bounded well below u32::MAX; checked in debug"
)]
pub fn to_u32(len: usize, what: &str) -> u32 {
    debug_assert!(
        u32::try_from(len).is_ok(),
        "{what} arena exceeded u32::MAX entries"
    );
    len as u32
}
