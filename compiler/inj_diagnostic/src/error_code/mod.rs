//! Error codes for all injection diagnostics.

use std::fmt;

/// Error codes for all injection diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Resolution errors
/// - E2xxx: Persisted metadata errors
/// - E9xxx: Internal errors (bugs in the plugin, not in user code)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Resolution Errors (E1xxx)
    /// No visible candidate produces the requested type
    E1001,
    /// Several equally specific candidates at the same scope depth
    E1002,
    /// Eager cycle with no provider to defer it
    E1003,
    /// A generic candidate keeps requesting larger types
    E1004,
    /// Resolution nested deeper than the configured limit
    E1005,
    /// A suspend or composable candidate requested from a context that cannot call it
    E1006,
    /// A reified type parameter would receive a type parameter that is not reified
    E1007,

    // Metadata Errors (E2xxx)
    /// Persisted metadata could not be decoded
    E2001,
    /// Persisted metadata was written by an unsupported format version
    E2002,

    // Internal Errors (E9xxx)
    /// Synthesis invariant violated
    E9001,
    /// Declaration transformation invariant violated
    E9002,
}

impl ErrorCode {
    /// All error code variants, for exhaustive testing.
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        ErrorCode::E1004,
        ErrorCode::E1005,
        ErrorCode::E1006,
        ErrorCode::E1007,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// One-line explanation, used by `--explain`-style output.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "no injectable found for the requested type",
            ErrorCode::E1002 => "ambiguous injectables for the requested type",
            ErrorCode::E1003 => "circular dependency without a provider to break it",
            ErrorCode::E1004 => "divergent injectable",
            ErrorCode::E1005 => "injection resolution nested too deeply",
            ErrorCode::E1006 => "injectable cannot be called from this context",
            ErrorCode::E1007 => "reified type parameter receives a non-reified type argument",
            ErrorCode::E2001 => "corrupt injection metadata",
            ErrorCode::E2002 => "unsupported injection metadata version",
            ErrorCode::E9001 => "internal error during code synthesis",
            ErrorCode::E9002 => "internal error during declaration transformation",
        }
    }

    /// Check if this is a resolution error (E1xxx range).
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E1001
                | ErrorCode::E1002
                | ErrorCode::E1003
                | ErrorCode::E1004
                | ErrorCode::E1005
                | ErrorCode::E1006
                | ErrorCode::E1007
        )
    }

    /// Check if this is a metadata error (E2xxx range).
    pub fn is_metadata_error(&self) -> bool {
        matches!(self, ErrorCode::E2001 | ErrorCode::E2002)
    }

    /// Check if this is an internal error (E9xxx range).
    pub fn is_internal_error(&self) -> bool {
        matches!(self, ErrorCode::E9001 | ErrorCode::E9002)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
