//! Resolution Algorithm.
//!
//! Turns a request into a [`ResolutionResult`] by walking the scope chain
//! innermost first. The first scope with any matching candidate decides the
//! outcome; built-in injectables are only tried when no scope matched.
//!
//! One [`Resolver`] serves one call site. It memoizes results per
//! [`ResultKey`], so a value reached along several paths is resolved once and
//! its failures are reported once.
//!
//! # Cycles
//!
//! The resolver keeps the chain of values in progress. Re-entering a value
//! is legal only when a provider lies between the two occurrences: the inner
//! occurrence becomes [`Success::CircularDependency`] and the values between
//! them record the cycle in their `cycle_targets`. Such values see a state
//! that depends on the chain and are not memoized.
//!
//! # Call contexts
//!
//! Everything outside a provider is evaluated at the call site, so a
//! candidate is checked against the context of the scope the top-level
//! request came from. A provider's result runs later in the provider's own
//! context.

use std::cmp::Ordering;
use std::rc::Rc;

use inj_stack::RecursionLimit;
use inj_types::{ClassifierId, TypeRef};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::graph::InjectionGraph;
use crate::callable::CallContext;
use crate::injectable::{
    Injectable, InjectableKind, InjectableRequest, ListElement, RequestSlot,
};
use crate::result::{DependencyResult, Failure, ResolutionResult, ResultKey, Success, ValueResult};
use crate::scope::{ScopeArena, ScopeId};
use crate::ResolveCtx;

/// Default bound on the depth of the value chain.
pub const DEFAULT_MAX_DEPTH: usize = 256;

struct ChainEntry {
    key: ResultKey,
    injectable: Injectable,
}

/// The top-level request of a call site that could not be satisfied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestFailure {
    pub request: InjectableRequest,
    pub failure: Failure,
}

pub struct Resolver<'r, 'a> {
    ctx: &'r ResolveCtx<'a>,
    scopes: &'r mut ScopeArena,
    limit: RecursionLimit,
    chain: Vec<ChainEntry>,
    memo: FxHashMap<(ResultKey, CallContext), ResolutionResult>,
    /// Context the value being resolved will be evaluated in.
    call_context: CallContext,
}

impl<'r, 'a> Resolver<'r, 'a> {
    pub fn new(ctx: &'r ResolveCtx<'a>, scopes: &'r mut ScopeArena, max_depth: usize) -> Self {
        Resolver {
            ctx,
            scopes,
            limit: RecursionLimit::new(max_depth),
            chain: Vec::new(),
            memo: FxHashMap::default(),
            call_context: CallContext::Default,
        }
    }

    /// Resolve every request of one call site from `scope`.
    ///
    /// On failure the most informative failing request is returned; ties
    /// keep the first in request order.
    #[tracing::instrument(level = "debug", skip_all, fields(scope = ?scope, requests = requests.len()))]
    pub fn resolve_requests(
        &mut self,
        scope: ScopeId,
        requests: Vec<InjectableRequest>,
    ) -> Result<InjectionGraph, RequestFailure> {
        let mut results = Vec::with_capacity(requests.len());
        let mut worst: Option<RequestFailure> = None;
        for request in requests {
            match self.resolve(&request, scope) {
                ResolutionResult::Success(result) => results.push(DependencyResult { request, result }),
                ResolutionResult::Failure(failure) => {
                    let better = worst
                        .as_ref()
                        .map_or(true, |current| failure.ordering() < current.failure.ordering());
                    if better {
                        worst = Some(RequestFailure { request, failure });
                    }
                }
            }
        }
        match worst {
            Some(failure) => {
                tracing::debug!(slot = ?failure.request.slot, "call site failed to resolve");
                Err(failure)
            }
            None => Ok(InjectionGraph::new(scope, results)),
        }
    }

    /// Resolve one request as seen from `scope`.
    pub fn resolve(&mut self, request: &InjectableRequest, scope: ScopeId) -> ResolutionResult {
        if self.chain.is_empty() {
            self.call_context = self.scopes.get(scope).call_context;
        }
        inj_stack::ensure_sufficient_stack(|| self.resolve_inner(request, scope))
    }

    fn resolve_inner(&mut self, request: &InjectableRequest, scope: ScopeId) -> ResolutionResult {
        let result = match &request.element {
            Some(element) => self.resolve_injectable(&element.injectable, element.scope, scope),
            None => self.resolve_by_type(request, scope),
        };
        match result {
            ResolutionResult::Failure(Failure::NoCandidates { .. }) if request.has_default => {
                tracing::trace!(name = self.ctx.interner.lookup(request.name), "using default value");
                ResolutionResult::Success(Success::DefaultValue)
            }
            other => other,
        }
    }

    fn resolve_by_type(&mut self, request: &InjectableRequest, scope: ScopeId) -> ResolutionResult {
        let table = self.ctx.table;
        let scopes: SmallVec<[ScopeId; 8]> = self.scopes.all_scopes(scope).collect();
        for found in scopes {
            let injectables: Vec<Injectable> = self
                .scopes
                .get(found)
                .candidates
                .iter()
                .filter_map(|candidate| Injectable::match_candidate(candidate, &request.ty, table))
                .collect();
            if !injectables.is_empty() {
                tracing::trace!(
                    scope = %self.scopes.get(found).name,
                    candidates = injectables.len(),
                    "matched candidates"
                );
                return self.resolve_candidates(&request.ty, injectables, found, scope);
            }
        }
        match self.builtin(request, scope) {
            Some(injectable) => self.resolve_injectable(&injectable, scope, scope),
            None => ResolutionResult::Failure(Failure::NoCandidates {
                ty: request.ty.clone(),
            }),
        }
    }

    /// Pick among the candidates matched at one depth.
    ///
    /// Ranking is a partial order, so winners are the successes no other
    /// success beats rather than the head of a sorted list. The outcome does
    /// not depend on candidate order.
    fn resolve_candidates(
        &mut self,
        ty: &TypeRef,
        injectables: Vec<Injectable>,
        found: ScopeId,
        requesting: ScopeId,
    ) -> ResolutionResult {
        if let [single] = injectables.as_slice() {
            return self.resolve_injectable(single, found, requesting);
        }

        let mut successes: Vec<(Injectable, Success)> = Vec::new();
        let mut best_failure: Option<Failure> = None;
        for injectable in injectables {
            match self.resolve_injectable(&injectable, found, requesting) {
                ResolutionResult::Success(success) => successes.push((injectable, success)),
                ResolutionResult::Failure(failure) => {
                    if best_failure
                        .as_ref()
                        .map_or(true, |best| failure.ordering() < best.ordering())
                    {
                        best_failure = Some(failure);
                    }
                }
            }
        }

        if successes.is_empty() {
            return ResolutionResult::Failure(best_failure.unwrap_or_else(|| Failure::NoCandidates {
                ty: ty.clone(),
            }));
        }

        let winners: Vec<usize> = (0..successes.len())
            .filter(|&i| {
                !successes
                    .iter()
                    .any(|(other, _)| self.compare(other, &successes[i].0) == Ordering::Less)
            })
            .collect();

        match winners.as_slice() {
            [winner] => {
                let (_, success) = successes.swap_remove(*winner);
                ResolutionResult::Success(success)
            }
            _ => {
                let tied = if winners.is_empty() {
                    successes.into_iter().map(|(injectable, _)| injectable).collect()
                } else {
                    winners.iter().map(|&i| successes[i].0.clone()).collect()
                };
                tracing::debug!(ty = %self.ctx.renderer().render(ty), "ambiguous candidates");
                ResolutionResult::Failure(Failure::Ambiguous {
                    ty: ty.clone(),
                    candidates: tied,
                })
            }
        }
    }

    /// `Less` when `a` beats `b`: higher priority first, then the more
    /// specific declared type.
    fn compare(&self, a: &Injectable, b: &Injectable) -> Ordering {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| self.ctx.table.compare_specificity(a.original_ty(), b.original_ty()))
    }

    fn resolve_injectable(
        &mut self,
        injectable: &Injectable,
        found: ScopeId,
        requesting: ScopeId,
    ) -> ResolutionResult {
        let key_scope = if injectable.depends_on_requesting_scope() {
            requesting
        } else if injectable.dependencies.is_empty() {
            found
        } else {
            self.value_scope(found, requesting)
        };
        let key = ResultKey {
            injectable: injectable.key(),
            scope: key_scope,
        };

        let memo_key = (key.clone(), self.call_context);
        if let Some(result) = self.memo.get(&memo_key) {
            return result.clone();
        }
        if let Some(failure) = self.check_callable(injectable) {
            return ResolutionResult::Failure(failure);
        }

        // Type scopes nest afresh on every provider hop, so a re-entered
        // injectable is recognised by the lexical scope it resolves in.
        let lexical = self.scopes.lexical_scope(key.scope);
        if let Some(position) = self.chain.iter().position(|entry| {
            entry.key.injectable == key.injectable && self.scopes.lexical_scope(entry.key.scope) == lexical
        }) {
            if self.chain[position..].iter().any(|entry| entry.injectable.is_provider()) {
                let target = self.chain[position].key.clone();
                tracing::trace!(key = ?target, "cycle broken by provider");
                return ResolutionResult::Success(Success::CircularDependency {
                    key: target,
                    ty: injectable.ty.clone(),
                });
            }
            let mut chain: Vec<Injectable> = self.chain[position..]
                .iter()
                .map(|entry| entry.injectable.clone())
                .collect();
            chain.push(injectable.clone());
            return ResolutionResult::Failure(Failure::UnbrokenCircularDependency { chain });
        }

        if self.is_divergent(injectable) {
            return ResolutionResult::Failure(Failure::DivergentInjectable {
                injectable: Box::new(injectable.clone()),
            });
        }

        if let Err(exceeded) = self.limit.enter() {
            return ResolutionResult::Failure(Failure::DepthLimitExceeded {
                ty: injectable.ty.clone(),
                limit: exceeded.limit,
            });
        }
        self.chain.push(ChainEntry {
            key: key.clone(),
            injectable: injectable.clone(),
        });
        let result = self.resolve_dependencies(injectable, key.clone(), found, requesting);
        self.chain.pop();
        self.limit.exit();

        let memoize = match &result {
            ResolutionResult::Success(Success::Value(value)) => !value.is_in_between_circular_dependency(),
            ResolutionResult::Success(_) => true,
            ResolutionResult::Failure(failure) => !failure.is_chain_dependent(),
        };
        if memoize {
            self.memo.insert(memo_key, result.clone());
        }
        result
    }

    fn resolve_dependencies(
        &mut self,
        injectable: &Injectable,
        key: ResultKey,
        found: ScopeId,
        requesting: ScopeId,
    ) -> ResolutionResult {
        let mut dependencies = Vec::with_capacity(injectable.dependencies.len());
        for request in &injectable.dependencies {
            let scope = match request.slot {
                RequestSlot::DispatchReceiver
                | RequestSlot::ExtensionReceiver
                | RequestSlot::TypeKeyArgument(_)
                | RequestSlot::ThreadedTypeKey(_) => requesting,
                RequestSlot::ProviderResult => match injectable.kind {
                    InjectableKind::Provider { scope, .. } => scope,
                    _ => found,
                },
                RequestSlot::Value(_) => self.value_scope(found, requesting),
                RequestSlot::ListElement(_) => found,
            };
            let outer_context = self.call_context;
            if request.slot == RequestSlot::ProviderResult {
                self.call_context = self.scopes.get(scope).call_context;
            }
            let resolved = self.resolve(request, scope);
            self.call_context = outer_context;
            match resolved {
                ResolutionResult::Success(result) => dependencies.push(DependencyResult {
                    request: request.clone(),
                    result,
                }),
                ResolutionResult::Failure(failure) => {
                    if injectable.is_provider() && matches!(failure, Failure::NoCandidates { .. }) {
                        return ResolutionResult::Failure(Failure::NoCandidates {
                            ty: injectable.ty.clone(),
                        });
                    }
                    return ResolutionResult::Failure(Failure::DependencyFailure {
                        injectable: Box::new(injectable.clone()),
                        request: Box::new(request.clone()),
                        cause: Box::new(failure),
                    });
                }
            }
        }

        let mut cycle_targets: SmallVec<[ResultKey; 2]> = SmallVec::new();
        for dependency in &dependencies {
            let targets: &[ResultKey] = match &dependency.result {
                Success::Value(value) => value.cycle_targets(),
                Success::CircularDependency { key, .. } => std::slice::from_ref(key),
                Success::DefaultValue => &[],
            };
            for target in targets {
                if *target != key && !cycle_targets.contains(target) {
                    cycle_targets.push(target.clone());
                }
            }
        }

        ResolutionResult::Success(Success::Value(Rc::new(ValueResult {
            injectable: injectable.clone(),
            key,
            scope: found,
            dependencies,
            cycle_targets,
        })))
    }

    /// Scope that declared value parameters of a candidate resolve from.
    ///
    /// Lexically that is where the candidate was found. Inside a provider the
    /// provider's own type scope stays visible, so its parameters can satisfy
    /// anything the provider builds.
    fn value_scope(&self, found: ScopeId, requesting: ScopeId) -> ScopeId {
        if requesting != found
            && self.scopes.get(requesting).is_type_scope()
            && self.scopes.is_within(requesting, found)
        {
            requesting
        } else {
            found
        }
    }

    /// Checks a callable candidate must pass before its dependencies are
    /// resolved.
    fn check_callable(&self, injectable: &Injectable) -> Option<Failure> {
        let callable = injectable.callable_ref()?;
        if !self.call_context.can_call(callable.call_context) {
            tracing::trace!(actual = %self.call_context, needed = %callable.call_context, "call context mismatch");
            return Some(Failure::CallContextMismatch {
                actual: self.call_context,
                injectable: Box::new(injectable.clone()),
            });
        }
        let table = self.ctx.table;
        callable
            .type_parameters
            .iter()
            .zip(&callable.type_arguments)
            .find(|(parameter, argument)| {
                table.get(**parameter).reified && table.is_unreified_type_parameter(argument.classifier)
            })
            .map(|(parameter, argument)| Failure::ReifiedTypeArgumentMismatch {
                parameter: *parameter,
                argument: argument.clone(),
                injectable: Box::new(injectable.clone()),
            })
    }

    /// A generic callable re-entered with a strictly larger type built from
    /// the same classifiers would keep growing without bound.
    fn is_divergent(&self, injectable: &Injectable) -> bool {
        let Some(callable) = injectable.callable_ref() else {
            return false;
        };
        if callable.type_parameters.is_empty() {
            return false;
        }
        let size = callable.ty.size();
        let mut classifiers = callable.ty.classifiers();
        classifiers.sort_unstable();
        self.chain.iter().any(|entry| {
            let Some(previous) = entry.injectable.callable_ref() else {
                return false;
            };
            if previous.decl != callable.decl || previous.ty.size() >= size {
                return false;
            }
            let mut previous_classifiers = previous.ty.classifiers();
            previous_classifiers.sort_unstable();
            previous_classifiers == classifiers
        })
    }

    /// Built-in injectable for a request no scope could satisfy.
    fn builtin(&mut self, request: &InjectableRequest, scope: ScopeId) -> Option<Injectable> {
        let ty = &request.ty;
        if !ty.tags().is_empty() || ty.star {
            return None;
        }
        let builtins = self.ctx.table.builtins();

        if let Some(arity) = builtins.function_arity(ty.classifier) {
            if ty.arguments.len() != arity + 1 {
                return None;
            }
            let parameters = ty.arguments[..arity].to_vec();
            let result = ty.arguments[arity].clone();
            let provider_scope = self.scopes.type_scope(scope, ty, &parameters);
            let has_default = result.nullable;
            let instance = InjectableRequest::new(
                result,
                self.ctx.interner.intern("instance"),
                RequestSlot::ProviderResult,
            )
            .with_default(has_default);
            return Some(Injectable {
                kind: InjectableKind::Provider {
                    parameters,
                    scope: provider_scope,
                },
                ty: ty.clone(),
                dependencies: vec![instance],
            });
        }

        if ty.classifier == builtins.list && ty.arguments.len() == 1 {
            return self.list_injectable(ty, scope);
        }
        if ty.classifier == builtins.type_key && ty.arguments.len() == 1 {
            return self.type_key_injectable(ty);
        }
        if ty.classifier == builtins.source_key {
            return Some(Injectable {
                kind: InjectableKind::SourceKey,
                ty: ty.clone(),
                dependencies: Vec::new(),
            });
        }
        None
    }

    /// Every candidate of the element type, or of a collection of it, in
    /// every visible scope. Outer scopes come first, declaration order within
    /// one scope.
    fn list_injectable(&self, ty: &TypeRef, scope: ScopeId) -> Option<Injectable> {
        let table = self.ctx.table;
        let element = ty.arguments[0].clone();
        let collection = TypeRef::new(table.builtins().collection, vec![element.clone()]);

        let mut dependencies = Vec::new();
        for found in self.scopes.all_scopes_outermost_first(scope) {
            for candidate in &self.scopes.get(found).candidates {
                let (injectable, spread) = match Injectable::match_candidate(candidate, &element, table) {
                    Some(injectable) => (injectable, false),
                    None => match Injectable::match_candidate(candidate, &collection, table) {
                        Some(injectable) => (injectable, true),
                        None => continue,
                    },
                };
                let index = inj_ir::to_u32(dependencies.len(), "list element");
                let name = self.ctx.interner.intern(&format!("element{index}"));
                dependencies.push(InjectableRequest {
                    ty: injectable.ty.clone(),
                    name,
                    slot: RequestSlot::ListElement(index),
                    has_default: false,
                    element: Some(Box::new(ListElement {
                        injectable,
                        scope: found,
                        spread,
                    })),
                });
            }
        }

        if dependencies.is_empty() {
            return None;
        }
        tracing::trace!(elements = dependencies.len(), "aggregated list");
        Some(Injectable {
            kind: InjectableKind::List { element },
            ty: ty.clone(),
            dependencies,
        })
    }

    /// Key of a type whose type parameter holes are filled by threaded keys.
    ///
    /// A bare type parameter has no built-in key; only a threaded key
    /// parameter can provide it.
    fn type_key_injectable(&self, ty: &TypeRef) -> Option<Injectable> {
        let table = self.ctx.table;
        let key_type = ty.arguments[0].clone();
        if table.is_type_parameter(key_type.classifier) {
            return None;
        }
        let holes: Vec<ClassifierId> = key_type
            .classifiers()
            .into_iter()
            .filter(|classifier| table.is_type_parameter(*classifier))
            .collect();
        let dependencies = holes
            .into_iter()
            .map(|param| {
                let param_name = self.ctx.interner.lookup(table.get(param).name);
                InjectableRequest::new(
                    TypeRef::new(table.builtins().type_key, vec![TypeRef::simple(param)]),
                    self.ctx.interner.intern(&format!("{param_name}Key")),
                    RequestSlot::TypeKeyArgument(param),
                )
            })
            .collect();
        Some(Injectable {
            kind: InjectableKind::TypeKey { key_type },
            ty: ty.clone(),
            dependencies,
        })
    }
}
