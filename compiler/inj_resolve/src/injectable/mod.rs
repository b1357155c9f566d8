//! Injectables and the requests they depend on.
//!
//! An [`Injectable`] is a candidate matched against one requested type, or a
//! built-in the engine synthesizes itself (providers, lists, type keys and
//! source keys). The kind set is closed: resolution, synthesis and
//! diagnostics all match on [`InjectableKind`] exhaustively.

use inj_hir::DeclId;
use inj_ir::Name;
use inj_types::{ClassifierId, ClassifierTable, TypeRef};

use crate::callable::{CallableRef, ParameterKind};
use crate::scope::{Candidate, ScopeId};

/// Where a resolved value goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestSlot {
    DispatchReceiver,
    ExtensionReceiver,
    /// Value parameter with this stable index.
    Value(u32),
    /// Body of a provider lambda.
    ProviderResult,
    ListElement(u32),
    /// Key of a type parameter inside a type key.
    TypeKeyArgument(ClassifierId),
    /// Trailing type-key parameter with this stable index.
    ThreadedTypeKey(u32),
}

/// A list element fixed to one matched candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListElement {
    pub injectable: Injectable,
    /// Scope the candidate was found in.
    pub scope: ScopeId,
    /// The candidate yields a collection whose items are spliced in.
    pub spread: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectableRequest {
    pub ty: TypeRef,
    /// Parameter name, for diagnostics.
    pub name: Name,
    pub slot: RequestSlot,
    /// The host supplies a default value when nothing resolves.
    pub has_default: bool,
    pub element: Option<Box<ListElement>>,
}

impl InjectableRequest {
    pub fn new(ty: TypeRef, name: Name, slot: RequestSlot) -> Self {
        InjectableRequest {
            ty,
            name,
            slot,
            has_default: false,
            element: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }
}

/// Identity of an injectable, independent of the type it was requested as.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InjectableKey {
    Decl {
        decl: DeclId,
        type_arguments: Vec<TypeRef>,
    },
    ProviderParameter {
        scope: ScopeId,
        index: u32,
    },
    TypeKeyParameter {
        function: DeclId,
        index: u32,
    },
    Provider(TypeRef),
    List(TypeRef),
    TypeKey(TypeRef),
    SourceKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InjectableKind {
    Callable(CallableRef),
    ProviderParameter {
        scope: ScopeId,
        index: u32,
    },
    TypeKeyParameter {
        function: DeclId,
        index: u32,
    },
    /// Function literal whose result resolves in the type scope `scope`.
    Provider {
        parameters: Vec<TypeRef>,
        scope: ScopeId,
    },
    List {
        element: TypeRef,
    },
    SourceKey,
    /// Key of `key_type`; dependencies fill its type parameter holes.
    TypeKey {
        key_type: TypeRef,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Injectable {
    pub kind: InjectableKind,
    /// The requested type this injectable satisfies.
    pub ty: TypeRef,
    pub dependencies: Vec<InjectableRequest>,
}

impl Injectable {
    /// Match a scope candidate against a requested type.
    ///
    /// Generic candidates get their type parameters inferred from the
    /// request; the returned injectable carries the substituted callable.
    pub fn match_candidate(
        candidate: &Candidate,
        requested: &TypeRef,
        table: &ClassifierTable,
    ) -> Option<Injectable> {
        match candidate {
            Candidate::Callable(callable) => {
                let callable = if callable.type_parameters.is_empty() {
                    if !table.is_subtype_of(&callable.ty, requested) {
                        return None;
                    }
                    callable.clone()
                } else {
                    let substitution =
                        table.infer_substitution(&callable.ty, &callable.type_parameters, requested)?;
                    callable.substitute(&substitution)
                };
                Some(Injectable::callable(callable, requested.clone(), table))
            }
            Candidate::ProviderParameter { scope, index, ty } => {
                table.is_subtype_of(ty, requested).then(|| Injectable {
                    kind: InjectableKind::ProviderParameter {
                        scope: *scope,
                        index: *index,
                    },
                    ty: requested.clone(),
                    dependencies: Vec::new(),
                })
            }
            Candidate::TypeKeyParameter {
                function,
                index,
                ty,
            } => table.is_subtype_of(ty, requested).then(|| Injectable {
                kind: InjectableKind::TypeKeyParameter {
                    function: *function,
                    index: *index,
                },
                ty: requested.clone(),
                dependencies: Vec::new(),
            }),
        }
    }

    fn callable(callable: CallableRef, ty: TypeRef, table: &ClassifierTable) -> Injectable {
        let mut dependencies: Vec<InjectableRequest> = callable
            .dependencies()
            .map(|param| {
                let slot = match param.kind {
                    ParameterKind::DispatchReceiver => RequestSlot::DispatchReceiver,
                    ParameterKind::ExtensionReceiver => RequestSlot::ExtensionReceiver,
                    ParameterKind::Value { stable_index } => RequestSlot::Value(stable_index),
                };
                InjectableRequest::new(param.ty.clone(), param.name, slot).with_default(param.has_default)
            })
            .collect();
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
            dependencies.push(InjectableRequest::new(
                TypeRef::new(table.builtins().type_key, vec![argument]),
                table.get(*param).name,
                RequestSlot::ThreadedTypeKey(callable.type_key_slot(position)),
            ));
        }
        Injectable {
            kind: InjectableKind::Callable(callable),
            ty,
            dependencies,
        }
    }

    pub fn key(&self) -> InjectableKey {
        match &self.kind {
            InjectableKind::Callable(callable) => InjectableKey::Decl {
                decl: callable.decl,
                type_arguments: callable.type_arguments.clone(),
            },
            InjectableKind::ProviderParameter { scope, index } => InjectableKey::ProviderParameter {
                scope: *scope,
                index: *index,
            },
            InjectableKind::TypeKeyParameter { function, index } => InjectableKey::TypeKeyParameter {
                function: *function,
                index: *index,
            },
            InjectableKind::Provider { .. } => InjectableKey::Provider(self.ty.clone()),
            InjectableKind::List { .. } => InjectableKey::List(self.ty.clone()),
            InjectableKind::TypeKey { key_type } => InjectableKey::TypeKey(key_type.clone()),
            InjectableKind::SourceKey => InjectableKey::SourceKey,
        }
    }

    pub fn callable_ref(&self) -> Option<&CallableRef> {
        match &self.kind {
            InjectableKind::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Type the value is computed as: the substituted callable type, or the
    /// requested type for everything else.
    pub fn value_ty(&self) -> &TypeRef {
        match &self.kind {
            InjectableKind::Callable(callable) => &callable.ty,
            _ => &self.ty,
        }
    }

    /// Declared type, for ranking candidates by specificity.
    pub fn original_ty(&self) -> &TypeRef {
        match &self.kind {
            InjectableKind::Callable(callable) => &callable.original_ty,
            _ => &self.ty,
        }
    }

    pub fn priority(&self) -> i32 {
        self.callable_ref().map_or(0, |callable| callable.priority)
    }

    pub fn is_provider(&self) -> bool {
        matches!(self.kind, InjectableKind::Provider { .. })
    }

    /// Declaration this injectable comes from, if any.
    pub fn decl(&self) -> Option<DeclId> {
        match &self.kind {
            InjectableKind::Callable(callable) => Some(callable.decl),
            InjectableKind::TypeKeyParameter { function, .. } => Some(*function),
            _ => None,
        }
    }

    /// Whether some dependency resolves from the requesting scope rather
    /// than from where the candidate was found.
    pub fn depends_on_requesting_scope(&self) -> bool {
        self.dependencies.iter().any(|request| {
            matches!(
                request.slot,
                RequestSlot::DispatchReceiver
                    | RequestSlot::ExtensionReceiver
                    | RequestSlot::TypeKeyArgument(_)
                    | RequestSlot::ThreadedTypeKey(_)
            )
        })
    }
}
