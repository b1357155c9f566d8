//! Call-site rewriting over a whole module.
//!
//! Every call whose source position has a resolved call site is handed to
//! the synthesizer, after checking that the expression found at that
//! position is the call the site was resolved for. Positions are not unique
//! identities: nodes produced by other lowering passes may carry a span that
//! an analyzed call also had.

use inj_diagnostic::{Diagnostic, ErrorCode};
use inj_hir::visitor::{self, Visitor};
use inj_hir::{DeclId, ExprId, ExprKind, Module};
use inj_ir::{FileId, SourcePosition, StringInterner};
use inj_resolve::{CallSite, ScopeArena};
use inj_synth::{SynthesisError, Synthesizer};
use inj_types::ClassifierTable;
use rustc_hash::FxHashMap;

/// What one driver run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverOutcome {
    pub rewritten: usize,
    /// Calls sharing a site's position that were not the site's call.
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Driver<'d> {
    pub module: &'d mut Module,
    pub table: &'d ClassifierTable,
    pub interner: &'d StringInterner,
    pub scopes: &'d ScopeArena,
    pub call_sites: &'d FxHashMap<SourcePosition, CallSite>,
    /// Original declaration to its transformed copy.
    pub transformed: &'d FxHashMap<DeclId, DeclId>,
}

impl Driver<'_> {
    #[tracing::instrument(level = "debug", skip_all, fields(call_sites = self.call_sites.len()))]
    pub fn run(self) -> DriverOutcome {
        let located = locate(self.module, self.call_sites);
        let mut outcome = DriverOutcome::default();
        let mut synthesizer = Synthesizer::new(self.module, self.table, self.interner, self.scopes, self.transformed);

        for call in located {
            if !call.matches {
                tracing::debug!(position = ?call.position, expr = ?call.expr, "position reused by another call; left untouched");
                outcome.skipped += 1;
                continue;
            }
            match synthesizer.rewrite_call(call.site, call.position.file, call.owner) {
                Ok(()) => outcome.rewritten += 1,
                Err(err) => outcome.diagnostics.push(internal_error(call.position, &err)),
            }
        }

        if outcome.rewritten < self.call_sites.len() {
            tracing::debug!(
                unreached = self.call_sites.len() - outcome.rewritten,
                "call sites not reached by the walk"
            );
        }
        outcome
    }
}

fn internal_error(position: SourcePosition, err: &SynthesisError) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9001)
        .with_message(err.to_string())
        .with_label(position.file, position.span(), "while rewriting this call")
        .with_note("this is a bug in the injection plugin; the call was left unchanged")
}

/// A call found at the position of a resolved call site.
struct Located<'s> {
    position: SourcePosition,
    site: &'s CallSite,
    expr: ExprId,
    /// Declaration whose body contains the call.
    owner: DeclId,
    /// Same expression and same callee as the site was resolved for.
    matches: bool,
}

/// Calls at site positions, in traversal order.
fn locate<'s>(module: &Module, call_sites: &'s FxHashMap<SourcePosition, CallSite>) -> Vec<Located<'s>> {
    struct Collector<'s> {
        call_sites: &'s FxHashMap<SourcePosition, CallSite>,
        file: FileId,
        owners: Vec<DeclId>,
        found: Vec<Located<'s>>,
    }

    impl Visitor for Collector<'_> {
        fn visit_decl(&mut self, module: &Module, decl: DeclId) {
            let d = module.decl(decl);
            if d.is_external() {
                return;
            }
            let callable = d.is_callable();
            if callable {
                self.owners.push(decl);
            }
            visitor::walk_decl(self, module, decl);
            if callable {
                self.owners.pop();
            }
        }

        fn visit_expr(&mut self, module: &Module, expr: ExprId) {
            if let ExprKind::Call(call) = module.exprs.kind(expr) {
                let position = SourcePosition::new(self.file, module.exprs.span(expr));
                if let (Some(site), Some(owner)) = (self.call_sites.get(&position), self.owners.last()) {
                    self.found.push(Located {
                        position,
                        site,
                        expr,
                        owner: *owner,
                        matches: site.call == expr && call.callee == site.callee,
                    });
                }
            }
            visitor::walk_expr(self, module, expr);
        }
    }

    let mut collector = Collector {
        call_sites,
        file: FileId::new(0),
        owners: Vec::new(),
        found: Vec::new(),
    };
    for file in &module.files {
        collector.file = file.id;
        for decl in &file.declarations {
            collector.visit_decl(module, *decl);
        }
    }
    collector.found
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
