//! Diagnostic queue for collecting, deduplicating, and sorting diagnostics.
//!
//! Resolution runs once per call site, and the same broken dependency is often
//! reached from several call sites in a row; exact duplicates are dropped so a
//! single missing provider is reported once per site, not once per path.

use rustc_hash::FxHashSet;

use crate::{Diagnostic, ErrorGuaranteed, Severity};

/// Collected diagnostics for one compilation session.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    seen: FxHashSet<Diagnostic>,
    error_count: usize,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a diagnostic of any severity. Returns `false` for duplicates.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.clone()) {
            return false;
        }
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// Queue an error and obtain proof that it was reported.
    ///
    /// A diagnostic of lower severity is raised to an error first.
    pub fn emit_error(&mut self, mut diagnostic: Diagnostic) -> ErrorGuaranteed {
        diagnostic.severity = Severity::Error;
        self.push(diagnostic);
        ErrorGuaranteed::reported()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// `Some` once any error was queued.
    pub fn error_guaranteed(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Take every diagnostic, sorted by primary location, leaving the queue empty.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        self.seen.clear();
        self.error_count = 0;
        diagnostics.sort_by_key(Diagnostic::sort_key);
        diagnostics
    }
}
