//! Source locations.
//!
//! `Span` is a byte range inside one file; `SourcePosition` adds the file and is
//! the key used to attach precomputed injection graphs to call sites.

use std::fmt;

/// Byte range in a source file, end exclusive.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(C)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Dummy span for generated code.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub const fn is_dummy(self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[inline]
    pub const fn contains(self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

crate::static_assert_size!(Span, 8);

/// Identity of a source file within one module.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct FileId(u32);

impl FileId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        FileId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// `(file, start offset, end offset)` of an expression.
///
/// Offsets are not unique: synthetic nodes produced by other lowering passes
/// reuse the offsets of the expression they replace, so a position alone never
/// proves that a node is the one a precomputed result was made for.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SourcePosition {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl SourcePosition {
    #[inline]
    pub const fn new(file: FileId, span: Span) -> Self {
        SourcePosition {
            file,
            start: span.start,
            end: span.end,
        }
    }

    #[inline]
    pub const fn span(self) -> Span {
        Span::new(self.start, self.end)
    }
}

impl fmt::Debug for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.file.0, self.start, self.end)
    }
}

crate::static_assert_size!(SourcePosition, 12);

/// Line start offsets of one file, for O(log L) offset to line/column lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of each line start; `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build from source text.
    pub fn from_source(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(crate::to_u32(i + 1, "line"));
            }
        }
        LineIndex { line_starts }
    }

    /// Build from already known line start offsets.
    ///
    /// Offsets are sorted and a leading `0` is inserted when missing.
    pub fn from_line_starts(mut line_starts: Vec<u32>) -> Self {
        line_starts.sort_unstable();
        line_starts.dedup();
        if line_starts.first() != Some(&0) {
            line_starts.insert(0, 0);
        }
        LineIndex { line_starts }
    }

    /// 1-based `(line, column)` of a byte offset. Columns count bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        (
            crate::to_u32(line_idx + 1, "line"),
            offset - line_start + 1,
        )
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
