//! Proof that an error was reported.

/// Zero-sized proof that at least one error diagnostic was emitted.
///
/// The only public constructor requires a non-zero error count, which the
/// [`DiagnosticQueue`](crate::DiagnosticQueue) supplies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// `Some` only when at least one error was counted.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then_some(ErrorGuaranteed(()))
    }

    /// Proof for an error the queue has just counted.
    pub(crate) fn reported() -> Self {
        ErrorGuaranteed(())
    }
}

impl std::fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("compilation failed with errors")
    }
}

impl std::error::Error for ErrorGuaranteed {}

#[cfg(test)]
mod tests;
