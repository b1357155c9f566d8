//! Plain-text rendering of diagnostics.
//!
//! ```text
//! error[E1001]: no injectable found for `app.A`
//!   --> src/app.kt:4:13
//!    = note: required by provideB(a: app.A)
//! ```

use std::fmt::Write as _;

use inj_ir::FileId;

use crate::Diagnostic;

/// Source lookups the emitter needs; implemented by the session's file table.
pub trait SourceLookup {
    fn path(&self, file: FileId) -> &str;

    /// 1-based line and column of an offset.
    fn line_col(&self, file: FileId, offset: u32) -> (u32, u32);
}

/// Render one diagnostic to text.
pub fn render(diagnostic: &Diagnostic, sources: &dyn SourceLookup) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{}[{}]: {}",
        diagnostic.severity, diagnostic.code, diagnostic.message
    );
    for label in &diagnostic.labels {
        let (line, col) = sources.line_col(label.file, label.span.start);
        let marker = if label.is_primary { "-->" } else { ":::" };
        let _ = write!(
            out,
            "\n  {marker} {}:{line}:{col}",
            sources.path(label.file)
        );
        if !label.message.is_empty() {
            let _ = write!(out, " {}", label.message);
        }
    }
    for note in &diagnostic.notes {
        let _ = write!(out, "\n   = note: {note}");
    }
    for suggestion in &diagnostic.suggestions {
        let _ = write!(out, "\n   = help: {suggestion}");
    }
    out
}

/// Render a batch, separated by blank lines.
pub fn render_all(diagnostics: &[Diagnostic], sources: &dyn SourceLookup) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| render(diagnostic, sources))
        .collect::<Vec<_>>()
        .join("\n\n")
}
