//! One injection session over one module.
//!
//! The session owns the module and every table that lives as long as it:
//! classifiers, names, the transformed-declaration memo and the diagnostics.
//! Phases borrow from it explicitly; nothing is global.
//!
//! ```text
//! import classifier facts ──► analyze ──► transform ──► rewrite ──► write facts
//! ```
//!
//! Analysis runs on the module as the host produced it. Transformation then
//! swaps declarations for copies without moving any expression, so the call
//! sites recorded by analysis still point at the right nodes when the driver
//! rewrites them.

use inj_diagnostic::emitter::{self, SourceLookup};
use inj_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode, ErrorGuaranteed};
use inj_hir::{DeclId, Module};
use inj_ir::{FileId, StringInterner};
use inj_resolve::{analyze, AnalysisConfig, ResolveCtx};
use inj_types::ClassifierTable;
use rustc_hash::FxHashMap;

use crate::driver::Driver;
use crate::metadata;
use crate::transform::{TransformError, Transformer};
use crate::SessionConfig;

/// Counts of what one run did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Call sites whose injected parameters resolved.
    pub call_sites: usize,
    pub rewritten: usize,
    /// Declarations replaced by a copy with threaded type keys.
    pub transformed: usize,
    /// Declarations annotated with persisted facts.
    pub facts_written: usize,
}

pub struct Session {
    config: SessionConfig,
    interner: StringInterner,
    table: ClassifierTable,
    module: Module,
    /// Original declaration to its transformed copy.
    transformed: FxHashMap<DeclId, DeclId>,
    diagnostics: DiagnosticQueue,
}

impl Session {
    pub fn new(config: SessionConfig, module: Module, table: ClassifierTable, interner: StringInterner) -> Self {
        Session {
            config,
            interner,
            table,
            module,
            transformed: FxHashMap::default(),
            diagnostics: DiagnosticQueue::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn table(&self) -> &ClassifierTable {
        &self.table
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// The declaration calls to `decl` now target.
    pub fn target(&self, decl: DeclId) -> DeclId {
        self.transformed.get(&decl).copied().unwrap_or(decl)
    }

    /// Run every phase over the module.
    ///
    /// Failed call sites are reported and left untouched; the rest of the
    /// module is still rewritten, so one run reports every failure. Returns
    /// an error once any error diagnostic was emitted.
    #[tracing::instrument(level = "info", skip_all, fields(module = %self.interner.lookup(self.module.name)))]
    pub fn run(&mut self) -> Result<SessionStats, ErrorGuaranteed> {
        let mut stats = SessionStats::default();

        for diagnostic in metadata::import_classifier_facts(&self.module, &mut self.table, &self.interner) {
            self.diagnostics.push(diagnostic);
        }

        let analysis = {
            let ctx = ResolveCtx::new(&self.module, &self.table, &self.interner);
            analyze(
                &ctx,
                AnalysisConfig {
                    max_depth: self.config.max_resolution_depth,
                },
            )
        };
        stats.call_sites = analysis.call_sites.len();
        for diagnostic in analysis.diagnostics.iter().cloned() {
            self.diagnostics.push(diagnostic);
        }

        stats.transformed = self.transform_declarations();

        let outcome = Driver {
            module: &mut self.module,
            table: &self.table,
            interner: &self.interner,
            scopes: &analysis.scopes,
            call_sites: &analysis.call_sites,
            transformed: &self.transformed,
        }
        .run();
        stats.rewritten = outcome.rewritten;
        for diagnostic in outcome.diagnostics {
            self.diagnostics.push(diagnostic);
        }

        if self.config.emit_metadata {
            stats.facts_written =
                metadata::write_facts(&mut self.module, &self.table, &self.interner, &self.transformed);
        }

        tracing::info!(
            call_sites = stats.call_sites,
            rewritten = stats.rewritten,
            transformed = stats.transformed,
            errors = self.diagnostics.error_count(),
            "session finished"
        );
        match self.diagnostics.error_guaranteed() {
            Some(guarantee) => Err(guarantee),
            None => Ok(stats),
        }
    }

    fn transform_declarations(&mut self) -> usize {
        let pending = Transformer::pending(&self.module, &self.table);
        let mut errors = Vec::new();
        {
            let mut transformer =
                Transformer::new(&mut self.module, &self.table, &self.interner, &mut self.transformed);
            for decl in pending {
                if let Err(err) = transformer.transform_if_needed(decl) {
                    errors.push(err);
                }
            }
            transformer.retarget_overrides();
        }
        for err in errors {
            let diagnostic = self.transform_error(&err);
            self.diagnostics.push(diagnostic);
        }
        self.transformed.len()
    }

    fn transform_error(&self, err: &TransformError) -> Diagnostic {
        let d = self.module.decl(err.decl());
        Diagnostic::error(ErrorCode::E9002)
            .with_message(err.to_string())
            .with_label(d.file, d.span, "declared here")
    }

    /// Diagnostics rendered as plain text.
    pub fn render_diagnostics(&self) -> String {
        let diagnostics: Vec<Diagnostic> = self.diagnostics.iter().cloned().collect();
        emitter::render_all(&diagnostics, self)
    }

    /// Take the rewritten module and its tables back.
    pub fn into_parts(self) -> (Module, ClassifierTable, StringInterner) {
        (self.module, self.table, self.interner)
    }
}

impl SourceLookup for Session {
    fn path(&self, file: FileId) -> &str {
        self.module
            .file(file)
            .map_or("<unknown>", |file| self.interner.lookup(file.path))
    }

    fn line_col(&self, file: FileId, offset: u32) -> (u32, u32) {
        self.module
            .file(file)
            .map_or((0, 0), |file| file.lines.line_col(offset))
    }
}
