//! Call-site analysis.
//!
//! Walks every body of the module with the scope chain of the current
//! lexical position, resolves each call that leaves injected parameters
//! empty, and records the outcome by source position. The resulting side
//! table is what the rewriter later consumes.

use inj_diagnostic::Diagnostic;
use inj_hir::visitor::{self, Visitor};
use inj_hir::{Call, DeclId, DeclKind, ExprId, ExprKind, Module};
use inj_ir::{FileId, SourcePosition};
use inj_types::{Substitution, TypeRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::callable::{CallableRef, ParameterKind};
use crate::graph::InjectionGraph;
use crate::injectable::{InjectableRequest, RequestSlot};
use crate::metadata::MetadataError;
use crate::report;
use crate::resolver::{Resolver, DEFAULT_MAX_DEPTH};
use crate::scope::{ScopeArena, ScopeFactory, ScopeId};
use crate::ResolveCtx;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Bound on the depth of one resolution chain.
    pub max_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A call whose injected parameters resolved.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub call: ExprId,
    pub callee: DeclId,
    /// The callee with the call's type arguments applied.
    pub callable: CallableRef,
    pub graph: InjectionGraph,
}

pub struct Analysis {
    pub scopes: ScopeArena,
    pub call_sites: FxHashMap<SourcePosition, CallSite>,
    /// Failed calls and unreadable metadata, in traversal order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Resolve every injecting call of the module.
#[tracing::instrument(level = "debug", skip_all, fields(files = ctx.module.files.len()))]
pub fn analyze(ctx: &ResolveCtx<'_>, config: AnalysisConfig) -> Analysis {
    let mut analyzer = Analyzer {
        ctx,
        config,
        arena: ScopeArena::new(),
        scope: ScopeId::new(0),
        file: FileId::new(0),
        call_sites: FxHashMap::default(),
        diagnostics: Vec::new(),
        reported: FxHashSet::default(),
    };
    let global = analyzer.factory(|factory| factory.global());
    for file in &ctx.module.files {
        if file.declarations.iter().all(|decl| ctx.module.decl(*decl).is_external()) {
            continue;
        }
        analyzer.file = file.id;
        analyzer.scope = analyzer.factory(|factory| factory.file(global, file.id));
        for decl in &file.declarations {
            analyzer.visit_decl(ctx.module, *decl);
        }
    }
    tracing::debug!(
        call_sites = analyzer.call_sites.len(),
        diagnostics = analyzer.diagnostics.len(),
        "analysis finished"
    );
    Analysis {
        scopes: analyzer.arena,
        call_sites: analyzer.call_sites,
        diagnostics: analyzer.diagnostics,
    }
}

struct Analyzer<'r, 'a> {
    ctx: &'r ResolveCtx<'a>,
    config: AnalysisConfig,
    arena: ScopeArena,
    /// Scope of the current lexical position.
    scope: ScopeId,
    file: FileId,
    call_sites: FxHashMap<SourcePosition, CallSite>,
    diagnostics: Vec<Diagnostic>,
    /// Declarations whose metadata error was already reported.
    reported: FxHashSet<DeclId>,
}

impl Analyzer<'_, '_> {
    fn factory<R>(&mut self, f: impl FnOnce(&mut ScopeFactory<'_, '_>) -> R) -> R {
        let mut factory = ScopeFactory::new(self.ctx, &mut self.arena);
        let result = f(&mut factory);
        let errors = factory.take_errors();
        for (decl, err) in errors {
            self.metadata_error(decl, &err);
        }
        result
    }

    fn metadata_error(&mut self, decl: DeclId, err: &MetadataError) {
        if self.reported.insert(decl) {
            self.diagnostics.push(report::metadata_error(self.ctx, decl, err));
        }
    }

    /// Run `f` with `scope` as the current scope.
    fn within(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.scope, scope);
        f(self);
        self.scope = saved;
    }

    fn visit_block(&mut self, module: &Module, statements: &[ExprId], result: Option<ExprId>) {
        let saved = self.scope;
        for statement in statements.iter().copied().chain(result) {
            self.visit_expr(module, statement);
            let declared = match module.exprs.kind(statement) {
                ExprKind::LocalDecl(decl) | ExprKind::Variable { decl, .. } => Some(*decl),
                _ => None,
            };
            if let Some(decl) = declared {
                let parent = self.scope;
                if let Some(block) = self.factory(|factory| factory.block(parent, decl)) {
                    self.scope = block;
                }
            }
        }
        self.scope = saved;
    }

    fn analyze_call(&mut self, expr: ExprId, call: &Call) {
        let callable = match self.ctx.callable_ref(call.callee) {
            Ok(Some(callable)) => callable,
            Ok(None) => return,
            Err(err) => {
                self.metadata_error(call.callee, &err);
                return;
            }
        };
        let substitution: Substitution = callable
            .type_parameters
            .iter()
            .copied()
            .zip(call.type_arguments.iter().cloned())
            .collect();
        let callable = callable.substitute(&substitution);

        let requests = self.requests(&callable, call);
        if requests.is_empty() {
            return;
        }

        let position = SourcePosition::new(self.file, self.ctx.module.exprs.span(expr));
        let mut resolver = Resolver::new(self.ctx, &mut self.arena, self.config.max_depth);
        match resolver.resolve_requests(self.scope, requests) {
            Ok(graph) => {
                tracing::debug!(
                    callee = %self.ctx.qualified_name(call.callee),
                    ?position,
                    values = graph.values().len(),
                    "resolved call site"
                );
                self.call_sites.insert(
                    position,
                    CallSite {
                        call: expr,
                        callee: call.callee,
                        callable,
                        graph,
                    },
                );
            }
            Err(failure) => {
                tracing::debug!(callee = %self.ctx.qualified_name(call.callee), ?position, "call site failed");
                let diagnostic = report::resolution_failure(
                    self.ctx,
                    position,
                    call.callee,
                    &failure.request,
                    &failure.failure,
                );
                self.diagnostics.push(diagnostic);
            }
        }
    }

    /// Requests for the injected parameters the call leaves empty, then one
    /// per threaded type key.
    fn requests(&self, callable: &CallableRef, call: &Call) -> Vec<InjectableRequest> {
        let module = self.ctx.module;
        let mut requests = Vec::new();
        for param in callable.dependencies() {
            let ParameterKind::Value { stable_index } = param.kind else {
                continue;
            };
            let supplied = module
                .decls
                .parameter_slot(call.callee, stable_index)
                .and_then(|slot| call.arguments.get(slot).copied().flatten())
                .is_some();
            if !supplied {
                requests.push(
                    InjectableRequest::new(param.ty.clone(), param.name, RequestSlot::Value(stable_index))
                        .with_default(param.has_default),
                );
            }
        }

        if callable.requires_type_key() {
            let table = self.ctx.table;
            let type_key = table.builtins().type_key;
            for (position, index) in callable.type_key_parameters.iter().enumerate() {
                let index = *index as usize;
                let Some(param) = callable.type_parameters.get(index) else {
                    continue;
                };
                let argument = callable
                    .type_arguments
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| TypeRef::simple(*param));
                let name = format!("{}Key", self.ctx.interner.lookup(table.get(*param).name));
                requests.push(InjectableRequest::new(
                    TypeRef::new(type_key, vec![argument]),
                    self.ctx.interner.intern(&name),
                    RequestSlot::ThreadedTypeKey(callable.type_key_slot(position)),
                ));
            }
        }
        requests
    }
}

impl Visitor for Analyzer<'_, '_> {
    fn visit_decl(&mut self, module: &Module, decl: DeclId) {
        let d = module.decl(decl);
        if d.is_external() {
            return;
        }
        match d.kind {
            DeclKind::Class { .. } => {
                let parent = self.scope;
                let scope = self.factory(|factory| factory.class(parent, decl));
                self.within(scope, |this| visitor::walk_decl(this, module, decl));
            }
            _ if d.is_callable() => {
                let parent = self.scope;
                let scope = self.factory(|factory| factory.function(parent, decl));
                self.within(scope, |this| visitor::walk_decl(this, module, decl));
            }
            _ => visitor::walk_decl(self, module, decl),
        }
    }

    fn visit_expr(&mut self, module: &Module, expr: ExprId) {
        inj_stack::ensure_sufficient_stack(|| match module.exprs.kind(expr) {
            ExprKind::Block { statements, result } => self.visit_block(module, statements, *result),
            ExprKind::Call(call) => {
                visitor::walk_expr(self, module, expr);
                self.analyze_call(expr, call);
            }
            _ => visitor::walk_expr(self, module, expr),
        });
    }
}
