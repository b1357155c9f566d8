//! Call-site rewriting.

use std::rc::Rc;

use inj_hir::{dump, Call, Decl, DeclFlags, DeclId, DeclKind, ExprId, ExprKind, Intrinsic, Module};
use inj_ir::{FileId, Name, Span, StringInterner};
use inj_resolve::{
    CallSite, CallableRef, DependencyResult, InjectableKind, RequestSlot, ResultKey, ScopeArena,
    ScopeId, Success, ValueResult, ValueSource,
};
use inj_types::{ClassifierTable, KeyFragment, TypeRef, TypeRenderer};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::ScopeContext;
use crate::sharing::{SharingPlan, CALL_SITE};
use crate::SynthesisError;

/// Writes resolved values into call sites of one module.
pub struct Synthesizer<'s> {
    module: &'s mut Module,
    table: &'s ClassifierTable,
    interner: &'s StringInterner,
    scopes: &'s ScopeArena,
    /// Original declaration to the copy that carries its threaded type keys.
    transformed: &'s FxHashMap<DeclId, DeclId>,
}

/// State of the call site being rewritten.
struct CallState<'g> {
    call: ExprId,
    plan: &'g SharingPlan,
    file: FileId,
    span: Span,
    /// Declaration enclosing the call site.
    owner: DeclId,
    contexts: Vec<ScopeContext>,
    /// Locals holding values used more than once, per frame.
    shared: FxHashMap<(ResultKey, u32), DeclId>,
    /// Values some provider refers back to.
    cycle_targets: FxHashSet<ResultKey>,
    /// Temporaries of the cycle targets currently being built.
    cycle_vars: FxHashMap<ResultKey, DeclId>,
    /// Lambda of each provider scope.
    providers: FxHashMap<ScopeId, DeclId>,
    next_local: u32,
    next_frame: u32,
}

impl CallState<'_> {
    fn current_owner(&self) -> DeclId {
        self.contexts.last().map_or(self.owner, |context| context.owner)
    }

    fn current_frame(&self) -> u32 {
        self.contexts.last().map_or(CALL_SITE, |context| context.frame)
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.next_local);
        self.next_local += 1;
        name
    }
}

impl<'s> Synthesizer<'s> {
    pub fn new(
        module: &'s mut Module,
        table: &'s ClassifierTable,
        interner: &'s StringInterner,
        scopes: &'s ScopeArena,
        transformed: &'s FxHashMap<DeclId, DeclId>,
    ) -> Self {
        Synthesizer {
            module,
            table,
            interner,
            scopes,
            transformed,
        }
    }

    /// Fill the empty slots of `site`'s call in place.
    ///
    /// `owner` is the declaration whose body contains the call. Locals
    /// needed at the call site turn the call into a block ending in it.
    #[tracing::instrument(level = "debug", skip_all, fields(call = ?site.call))]
    pub fn rewrite_call(&mut self, site: &CallSite, file: FileId, owner: DeclId) -> Result<(), SynthesisError> {
        let ExprKind::Call(original) = self.module.exprs.kind(site.call).clone() else {
            return Err(SynthesisError::NotACall {
                call: self.dump(site.call),
            });
        };

        let plan = SharingPlan::new(&site.graph.results);
        let mut state = CallState {
            call: site.call,
            plan: &plan,
            file,
            span: self.module.exprs.span(site.call),
            owner,
            contexts: vec![ScopeContext::new(CALL_SITE, owner)],
            shared: FxHashMap::default(),
            cycle_targets: FxHashSet::default(),
            cycle_vars: FxHashMap::default(),
            providers: FxHashMap::default(),
            next_local: 0,
            next_frame: CALL_SITE + 1,
        };
        collect_cycle_targets(&site.graph.results, &mut FxHashSet::default(), &mut state.cycle_targets);

        let callee = self.target(original.callee);
        let mut call = Call { callee, ..original };
        let slots = self.module.decl(callee).value_parameters.len();
        if call.arguments.len() < slots {
            call.arguments.resize(slots, None);
        }
        for dependency in &site.graph.results {
            let expr = self.dependency(&mut state, dependency)?;
            self.place(&state, &mut call, dependency.request.slot, expr)?;
        }

        let statements = state
            .contexts
            .pop()
            .map(|context| context.statements)
            .unwrap_or_default();
        self.module.exprs.replace(site.call, ExprKind::Call(call));
        if !statements.is_empty() {
            let call = self.module.exprs.duplicate(site.call);
            self.module.exprs.replace(
                site.call,
                ExprKind::Block {
                    statements,
                    result: Some(call),
                },
            );
        }
        tracing::debug!(shared = state.shared.len(), "rewrote call site");
        Ok(())
    }

    fn dependency(
        &mut self,
        state: &mut CallState<'_>,
        dependency: &DependencyResult,
    ) -> Result<Option<ExprId>, SynthesisError> {
        match &dependency.result {
            Success::Value(value) => self.value(state, value).map(Some),
            Success::CircularDependency { key, ty } => {
                let Some(var) = state.cycle_vars.get(key).copied() else {
                    return Err(self.unbound(state, "cycle temporary"));
                };
                let read = self.push(state, ExprKind::Get(var), ty.clone().with_nullable(true));
                Ok(Some(self.push(state, ExprKind::NonNull(read), ty.clone())))
            }
            Success::DefaultValue => Ok(None),
        }
    }

    fn value(&mut self, state: &mut CallState<'_>, value: &Rc<ValueResult>) -> Result<ExprId, SynthesisError> {
        inj_stack::ensure_sufficient_stack(|| self.value_inner(state, value))
    }

    fn value_inner(&mut self, state: &mut CallState<'_>, value: &ValueResult) -> Result<ExprId, SynthesisError> {
        let ty = value.injectable.ty.clone();
        let frame = state.current_frame();
        let slot = (value.key.clone(), frame);
        if let Some(var) = state.shared.get(&slot).copied() {
            return Ok(self.push(state, ExprKind::Get(var), ty));
        }

        let expr = if state.cycle_targets.contains(&value.key) {
            self.cycle_break(state, value)?
        } else {
            self.raw(state, value)?
        };

        if !state.plan.is_shared(value, frame) {
            return Ok(expr);
        }
        let owner = state.current_owner();
        let name = state.fresh("shared");
        tracing::trace!(%name, frame, usages = state.plan.uses(&value.key, frame), "binding shared value");
        let var = self.declare_variable(state, owner, &name, ty.clone(), false);
        let binding = self.push(
            state,
            ExprKind::Variable {
                decl: var,
                initializer: Some(expr),
            },
            self.unit_ty(),
        );
        if let Some(context) = state.contexts.last_mut() {
            context.statements.push(binding);
        }
        state.shared.insert(slot, var);
        Ok(self.push(state, ExprKind::Get(var), ty))
    }

    /// `{ var tmp = null; tmp = <value>; tmp!! }` where providers inside the
    /// value read `tmp!!`.
    fn cycle_break(&mut self, state: &mut CallState<'_>, value: &ValueResult) -> Result<ExprId, SynthesisError> {
        let ty = value.injectable.ty.clone();
        let nullable = ty.clone().with_nullable(true);
        let owner = state.current_owner();
        let name = state.fresh("cycle");
        tracing::trace!(%name, "breaking cycle through a temporary");
        let var = self.declare_variable(state, owner, &name, nullable.clone(), true);
        state.cycle_vars.insert(value.key.clone(), var);

        let raw = self.raw(state, value)?;
        let unit = self.unit_ty();
        let null = self.push(state, ExprKind::Null, nullable.clone());
        let declare = self.push(
            state,
            ExprKind::Variable {
                decl: var,
                initializer: Some(null),
            },
            unit.clone(),
        );
        let assign = self.push(state, ExprKind::Assign { variable: var, value: raw }, unit);
        let read = self.push(state, ExprKind::Get(var), nullable);
        let result = self.push(state, ExprKind::NonNull(read), ty.clone());
        Ok(self.push(
            state,
            ExprKind::Block {
                statements: vec![declare, assign],
                result: Some(result),
            },
            ty,
        ))
    }

    fn raw(&mut self, state: &mut CallState<'_>, value: &ValueResult) -> Result<ExprId, SynthesisError> {
        let ty = value.injectable.ty.clone();
        match &value.injectable.kind {
            InjectableKind::Callable(callable) => match callable.source {
                ValueSource::Read => Ok(self.push(state, ExprKind::Get(callable.decl), ty)),
                ValueSource::Object(classifier) => Ok(self.push(state, ExprKind::GetObject(classifier), ty)),
                ValueSource::Call => self.call(state, callable, value),
            },
            InjectableKind::ProviderParameter { scope, index } => {
                let param = state
                    .providers
                    .get(scope)
                    .and_then(|lambda| self.module.decl(*lambda).value_parameters.get(*index as usize))
                    .copied();
                match param {
                    Some(param) => Ok(self.push(state, ExprKind::Get(param), ty)),
                    None => Err(self.unbound(state, "provider parameter")),
                }
            }
            InjectableKind::TypeKeyParameter { function, index } => match self.type_key_parameter(*function, *index) {
                Some(param) => Ok(self.push(state, ExprKind::Get(param), ty)),
                None => Err(SynthesisError::MissingTypeKey {
                    function: self.module.qualified_name(*function, self.interner),
                    index: *index,
                    call: self.dump(state.call),
                }),
            },
            InjectableKind::Provider { parameters, scope } => self.provider(state, value, parameters, *scope),
            InjectableKind::List { .. } => self.list(state, value),
            InjectableKind::SourceKey => {
                let key = self.source_key(state);
                Ok(self.push(state, ExprKind::Str(key), ty))
            }
            InjectableKind::TypeKey { key_type } => self.type_key(state, value, key_type),
        }
    }

    fn call(
        &mut self,
        state: &mut CallState<'_>,
        callable: &CallableRef,
        value: &ValueResult,
    ) -> Result<ExprId, SynthesisError> {
        let callee = self.target(callable.decl);
        let slots = self.module.decl(callee).value_parameters.len();
        let mut call = Call::new(callee, vec![None; slots]);
        call.type_arguments.clone_from(&callable.type_arguments);
        if let Some(object) = callable.object_receiver {
            call.dispatch_receiver = Some(self.push(state, ExprKind::GetObject(object), TypeRef::simple(object)));
        }
        for dependency in &value.dependencies {
            let expr = self.dependency(state, dependency)?;
            self.place(state, &mut call, dependency.request.slot, expr)?;
        }
        Ok(self.push(state, ExprKind::Call(call), callable.ty.clone()))
    }

    fn place(
        &self,
        state: &CallState<'_>,
        call: &mut Call,
        slot: RequestSlot,
        expr: Option<ExprId>,
    ) -> Result<(), SynthesisError> {
        match slot {
            RequestSlot::DispatchReceiver => call.dispatch_receiver = expr,
            RequestSlot::ExtensionReceiver => call.extension_receiver = expr,
            RequestSlot::Value(stable_index) | RequestSlot::ThreadedTypeKey(stable_index) => {
                let Some(index) = self.module.decls.parameter_slot(call.callee, stable_index) else {
                    return Err(SynthesisError::MissingParameter {
                        callee: self.module.qualified_name(call.callee, self.interner),
                        stable_index,
                        call: self.dump(state.call),
                    });
                };
                if call.arguments.len() <= index {
                    call.arguments.resize(index + 1, None);
                }
                call.arguments[index] = expr;
            }
            RequestSlot::ProviderResult | RequestSlot::ListElement(_) | RequestSlot::TypeKeyArgument(_) => {
                return Err(self.unbound(state, "argument slot"));
            }
        }
        Ok(())
    }

    fn provider(
        &mut self,
        state: &mut CallState<'_>,
        value: &ValueResult,
        parameters: &[TypeRef],
        scope: ScopeId,
    ) -> Result<ExprId, SynthesisError> {
        let result_ty = value
            .injectable
            .ty
            .arguments
            .last()
            .cloned()
            .unwrap_or_else(|| self.table.any_type());
        let mut lambda = Decl::new(Name::EMPTY, DeclKind::Lambda, state.file, state.span, result_ty.clone());
        lambda.parent = Some(state.current_owner());
        let lambda = self.module.decls.push(lambda);
        for (index, ty) in parameters.iter().enumerate() {
            let stable_index = inj_ir::to_u32(index, "provider parameter");
            let name = self.interner.intern(&format!("p{index}"));
            let mut param = Decl::new(
                name,
                DeclKind::ValueParameter { stable_index },
                state.file,
                state.span,
                ty.clone(),
            );
            param.parent = Some(lambda);
            let param = self.module.decls.push(param);
            self.module.decls.get_mut(lambda).value_parameters.push(param);
        }
        state.providers.insert(scope, lambda);

        let frame = state.next_frame;
        state.next_frame += 1;
        tracing::trace!(frame, scope = %self.scopes.get(scope).name, "building provider lambda");
        state.contexts.push(ScopeContext::new(frame, lambda));
        let result = match value.dependencies.first() {
            Some(dependency) => self.dependency(state, dependency)?,
            None => None,
        };
        let statements = state
            .contexts
            .pop()
            .map(|context| context.statements)
            .unwrap_or_default();

        let result = match result {
            Some(result) => result,
            None => self.push(state, ExprKind::Null, result_ty.clone().with_nullable(true)),
        };
        let body = if statements.is_empty() {
            result
        } else {
            self.push(
                state,
                ExprKind::Block {
                    statements,
                    result: Some(result),
                },
                result_ty,
            )
        };
        self.module.decls.get_mut(lambda).body = Some(body);
        Ok(self.push(state, ExprKind::Lambda(lambda), value.injectable.ty.clone()))
    }

    fn list(&mut self, state: &mut CallState<'_>, value: &ValueResult) -> Result<ExprId, SynthesisError> {
        let ty = value.injectable.ty.clone();
        let mut elements = Vec::with_capacity(value.dependencies.len());
        for dependency in &value.dependencies {
            let Some(expr) = self.dependency(state, dependency)? else {
                return Err(self.unbound(state, "list element"));
            };
            let spread = dependency.request.element.as_ref().is_some_and(|element| element.spread);
            elements.push((expr, spread));
        }

        match elements.as_slice() {
            [(single, false)] => Ok(self.push(
                state,
                ExprKind::Intrinsic {
                    op: Intrinsic::ListOf,
                    arguments: vec![*single],
                },
                ty,
            )),
            [(single, true)] => Ok(self.push(
                state,
                ExprKind::Intrinsic {
                    op: Intrinsic::ToList,
                    arguments: vec![*single],
                },
                ty,
            )),
            _ => {
                let owner = state.current_owner();
                let name = state.fresh("list");
                let list = self.declare_variable(state, owner, &name, ty.clone(), false);
                let unit = self.unit_ty();
                let empty = self.push(
                    state,
                    ExprKind::Intrinsic {
                        op: Intrinsic::MutableListOf,
                        arguments: Vec::new(),
                    },
                    ty.clone(),
                );
                let mut statements = vec![self.push(
                    state,
                    ExprKind::Variable {
                        decl: list,
                        initializer: Some(empty),
                    },
                    unit.clone(),
                )];
                for (element, spread) in elements {
                    let receiver = self.push(state, ExprKind::Get(list), ty.clone());
                    let op = if spread { Intrinsic::ListAddAll } else { Intrinsic::ListAdd };
                    statements.push(self.push(
                        state,
                        ExprKind::Intrinsic {
                            op,
                            arguments: vec![receiver, element],
                        },
                        unit.clone(),
                    ));
                }
                let result = self.push(state, ExprKind::Get(list), ty.clone());
                Ok(self.push(
                    state,
                    ExprKind::Block {
                        statements,
                        result: Some(result),
                    },
                    ty,
                ))
            }
        }
    }

    /// Literal text of the key with each type parameter hole filled by the
    /// key threaded for it.
    fn type_key(
        &mut self,
        state: &mut CallState<'_>,
        value: &ValueResult,
        key_type: &TypeRef,
    ) -> Result<ExprId, SynthesisError> {
        let string = TypeRef::simple(self.table.builtins().string);
        let fragments = TypeRenderer::new(self.table, self.interner).key_fragments(key_type);
        let mut parts = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            match fragment {
                KeyFragment::Literal(text) => parts.push(self.push(state, ExprKind::Str(text), string.clone())),
                KeyFragment::TypeParameter(param) => {
                    let dependency = value
                        .dependencies
                        .iter()
                        .find(|dependency| dependency.request.slot == RequestSlot::TypeKeyArgument(param));
                    let expr = match dependency {
                        Some(dependency) => self.dependency(state, dependency)?,
                        None => None,
                    };
                    match expr {
                        Some(expr) => parts.push(expr),
                        None => return Err(self.unbound(state, "type parameter key")),
                    }
                }
            }
        }
        match parts.as_slice() {
            [single] => Ok(*single),
            _ => Ok(self.push(state, ExprKind::Concat(parts), value.injectable.ty.clone())),
        }
    }

    /// `file:owner:line:column` of the call site, columns 1-based.
    fn source_key(&self, state: &CallState<'_>) -> String {
        let file = self.module.file(state.file);
        let path = file.map(|file| self.interner.lookup(file.path)).unwrap_or_default();
        let (line, column) = file.map_or((0, 0), |file| file.lines.line_col(state.span.start));
        let owner = self.module.qualified_name(state.owner, self.interner);
        format!("{path}:{owner}:{line}:{column}")
    }

    /// Threaded type-key parameter `index` of `function`, looked up on its
    /// transformed copy.
    fn type_key_parameter(&self, function: DeclId, index: u32) -> Option<DeclId> {
        let decls = &self.module.decls;
        decls
            .get(self.target(function))
            .value_parameters
            .iter()
            .copied()
            .filter(|param| decls.get(*param).flags.contains(DeclFlags::SYNTHETIC))
            .nth(index as usize)
    }

    fn target(&self, decl: DeclId) -> DeclId {
        self.transformed.get(&decl).copied().unwrap_or(decl)
    }

    fn declare_variable(
        &mut self,
        state: &CallState<'_>,
        owner: DeclId,
        name: &str,
        ty: TypeRef,
        mutable: bool,
    ) -> DeclId {
        let mut decl = Decl::new(
            self.interner.intern(name),
            DeclKind::Variable { mutable },
            state.file,
            state.span,
            ty,
        );
        decl.parent = Some(owner);
        self.module.decls.push(decl)
    }

    fn push(&mut self, state: &CallState<'_>, kind: ExprKind, ty: TypeRef) -> ExprId {
        self.module.exprs.push(kind, state.span, ty)
    }

    fn unit_ty(&self) -> TypeRef {
        TypeRef::simple(self.table.builtins().unit)
    }

    fn unbound(&self, state: &CallState<'_>, what: &'static str) -> SynthesisError {
        SynthesisError::Unbound {
            what,
            call: self.dump(state.call),
        }
    }

    fn dump(&self, expr: ExprId) -> String {
        dump::expr_to_string(self.module, self.table, self.interner, expr)
    }
}

fn collect_cycle_targets(
    results: &[DependencyResult],
    visited: &mut FxHashSet<*const ValueResult>,
    targets: &mut FxHashSet<ResultKey>,
) {
    for dependency in results {
        match &dependency.result {
            Success::Value(value) => {
                if visited.insert(Rc::as_ptr(value)) {
                    inj_stack::ensure_sufficient_stack(|| {
                        collect_cycle_targets(&value.dependencies, visited, targets);
                    });
                }
            }
            Success::CircularDependency { key, .. } => {
                targets.insert(key.clone());
            }
            Success::DefaultValue => {}
        }
    }
}
