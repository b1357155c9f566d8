//! Declaration Model.
//!
//! Normalizes functions, constructors, property getters, objects and value
//! sources (parameters, receivers, local variables) into one [`CallableRef`]:
//! a type, the parameters it needs, and the injection facts that apply.

use std::fmt;

use inj_hir::{DeclFlags, DeclId, DeclKind};
use inj_ir::Name;
use inj_types::{ClassifierId, ClassifierKind, Substitution, TypeRef};
use serde::{Deserialize, Serialize};

use crate::metadata::MetadataError;
use crate::ResolveCtx;

/// How synthesis produces the value of a callable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// Call of a function, constructor or getter.
    Call,
    /// Singleton access of an object.
    Object(ClassifierId),
    /// Read of a parameter, receiver or local variable.
    Read,
}

/// Where a callable may run. A candidate can only be used from a context
/// that is allowed to call it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallContext {
    #[default]
    Default,
    Composable,
    Suspend,
}

impl CallContext {
    pub fn of(flags: DeclFlags) -> Self {
        if flags.contains(DeclFlags::SUSPEND) {
            CallContext::Suspend
        } else if flags.contains(DeclFlags::COMPOSABLE) {
            CallContext::Composable
        } else {
            CallContext::Default
        }
    }

    /// Ordinary callables run anywhere; the others only from their own kind.
    pub fn can_call(self, callee: CallContext) -> bool {
        callee == CallContext::Default || self == callee
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallContext::Default => "default",
            CallContext::Composable => "composable",
            CallContext::Suspend => "suspend",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    DispatchReceiver,
    ExtensionReceiver,
    Value { stable_index: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    pub decl: DeclId,
    pub name: Name,
    pub kind: ParameterKind,
    pub ty: TypeRef,
    /// Filled by injection when the caller supplies nothing.
    pub injected: bool,
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallableRef {
    pub decl: DeclId,
    pub source: ValueSource,
    /// Value type, with `type_arguments` applied.
    pub ty: TypeRef,
    /// Value type as declared.
    pub original_ty: TypeRef,
    pub type_parameters: Vec<ClassifierId>,
    /// One per type parameter once substituted; empty before.
    pub type_arguments: Vec<TypeRef>,
    /// Receivers first, then value parameters in declared order.
    pub parameters: Vec<ParameterRef>,
    /// Object whose member this is; the dispatch receiver is then implicit.
    pub object_receiver: Option<ClassifierId>,
    pub is_given: bool,
    pub priority: i32,
    /// Type parameter indices that receive a threaded type key.
    pub type_key_parameters: Vec<u32>,
    /// Value parameters declared in source; threaded type keys follow them.
    pub declared_parameter_count: u32,
    pub source_key_parameter: Option<u32>,
    pub call_context: CallContext,
}

impl CallableRef {
    /// Apply a type-parameter mapping to the value type and parameters.
    pub fn substitute(&self, substitution: &Substitution) -> CallableRef {
        let mut result = self.clone();
        result.ty = self.ty.substitute(substitution);
        for param in &mut result.parameters {
            param.ty = param.ty.substitute(substitution);
        }
        result.type_arguments = self
            .type_parameters
            .iter()
            .map(|param| {
                substitution
                    .get(param)
                    .cloned()
                    .unwrap_or_else(|| TypeRef::simple(*param))
            })
            .collect();
        result
    }

    /// Parameters a candidate needs resolved: receivers and injected values.
    pub fn dependencies(&self) -> impl Iterator<Item = &ParameterRef> {
        self.parameters.iter().filter(|param| param.injected)
    }

    pub fn has_receiver_dependency(&self) -> bool {
        self.dependencies().any(|param| {
            matches!(
                param.kind,
                ParameterKind::DispatchReceiver | ParameterKind::ExtensionReceiver
            )
        })
    }

    /// Stable index of the threaded type key for the `position`-th marked
    /// type parameter.
    pub fn type_key_slot(&self, position: usize) -> u32 {
        self.declared_parameter_count + inj_ir::to_u32(position, "type key parameter")
    }

    pub fn requires_type_key(&self) -> bool {
        !self.type_key_parameters.is_empty()
    }

    pub fn requires_source_key(&self) -> bool {
        self.source_key_parameter.is_some()
    }
}

impl ResolveCtx<'_> {
    /// Describe a declaration as a callable.
    ///
    /// Given classes become their primary constructor (or singleton access for
    /// objects) and given properties their getter. Returns `None` for
    /// declarations that produce no value, such as setters and lambdas.
    pub fn callable_ref(&self, decl: DeclId) -> Result<Option<CallableRef>, MetadataError> {
        let d = self.module.decl(decl);
        match d.kind {
            DeclKind::Class { classifier } => {
                if self.table.get(classifier).kind == ClassifierKind::Object {
                    return Ok(Some(self.value_source(decl, ValueSource::Object(classifier), d.is_given())));
                }
                let constructor = d.members.iter().copied().find(|member| {
                    matches!(self.module.decl(*member).kind, DeclKind::Constructor { .. })
                });
                match constructor {
                    Some(constructor) => self.callable_ref(constructor),
                    None => self.function_ref(decl).map(Some),
                }
            }
            DeclKind::Property { getter, .. } => match getter {
                Some(getter) => self.callable_ref(getter),
                None => Ok(None),
            },
            DeclKind::Function | DeclKind::Constructor { .. } | DeclKind::Getter { .. } => {
                self.function_ref(decl).map(Some)
            }
            DeclKind::ValueParameter { .. }
            | DeclKind::DispatchReceiver
            | DeclKind::ExtensionReceiver
            | DeclKind::Variable { .. } => Ok(Some(self.value_source(
                decl,
                ValueSource::Read,
                d.is_given() || d.is_inject(),
            ))),
            DeclKind::Setter { .. } | DeclKind::Lambda => Ok(None),
        }
    }

    fn value_source(&self, decl: DeclId, source: ValueSource, is_given: bool) -> CallableRef {
        let d = self.module.decl(decl);
        CallableRef {
            decl,
            source,
            ty: d.ty.clone(),
            original_ty: d.ty.clone(),
            type_parameters: Vec::new(),
            type_arguments: Vec::new(),
            parameters: Vec::new(),
            object_receiver: None,
            is_given,
            priority: d.priority,
            type_key_parameters: Vec::new(),
            declared_parameter_count: 0,
            source_key_parameter: None,
            call_context: CallContext::Default,
        }
    }

    fn function_ref(&self, decl: DeclId) -> Result<CallableRef, MetadataError> {
        let facts = self.facts(decl)?;
        let d = self.module.decl(decl);

        let (ty, type_parameters) = match d.kind {
            DeclKind::Constructor { class } => {
                let class = self.module.decl(class);
                let arguments = class.type_parameters.iter().copied().map(TypeRef::simple).collect();
                let ty = match class.kind {
                    DeclKind::Class { classifier } => self.table.type_of(classifier, arguments),
                    _ => class.ty.clone(),
                };
                (ty, class.type_parameters.clone())
            }
            DeclKind::Class { classifier } => {
                let arguments = d.type_parameters.iter().copied().map(TypeRef::simple).collect();
                (self.table.type_of(classifier, arguments), d.type_parameters.clone())
            }
            _ => (d.ty.clone(), d.type_parameters.clone()),
        };

        let object_receiver = self.object_owner(decl);
        let mut parameters = Vec::new();
        if let Some(receiver) = d.dispatch_receiver.filter(|_| object_receiver.is_none()) {
            parameters.push(self.receiver_ref(receiver, ParameterKind::DispatchReceiver));
        }
        if let Some(receiver) = d.extension_receiver {
            parameters.push(self.receiver_ref(receiver, ParameterKind::ExtensionReceiver));
        }
        let mut declared_parameter_count = 0;
        for param in &d.value_parameters {
            let p = self.module.decl(*param);
            let Some(stable_index) = p.stable_index() else {
                continue;
            };
            // Threaded type keys are requested from the type parameters instead.
            let synthetic = p.flags.contains(inj_hir::DeclFlags::SYNTHETIC);
            if !synthetic {
                declared_parameter_count += 1;
            }
            parameters.push(ParameterRef {
                decl: *param,
                name: p.name,
                kind: ParameterKind::Value { stable_index },
                ty: p.ty.clone(),
                injected: !synthetic && facts.is_injected(stable_index),
                has_default: facts.is_defaulted(stable_index),
            });
        }

        Ok(CallableRef {
            decl,
            source: ValueSource::Call,
            original_ty: ty.clone(),
            ty,
            type_parameters,
            type_arguments: Vec::new(),
            parameters,
            object_receiver,
            is_given: facts.given,
            priority: facts.priority,
            type_key_parameters: facts.type_key_parameters.clone(),
            declared_parameter_count,
            source_key_parameter: facts.source_key_parameter,
            call_context: facts.call_context,
        })
    }

    fn receiver_ref(&self, receiver: DeclId, kind: ParameterKind) -> ParameterRef {
        let r = self.module.decl(receiver);
        ParameterRef {
            decl: receiver,
            name: r.name,
            kind,
            ty: r.ty.clone(),
            injected: true,
            has_default: false,
        }
    }

    /// The object a member belongs to, looking through property accessors.
    fn object_owner(&self, decl: DeclId) -> Option<ClassifierId> {
        let mut parent = self.module.decl(decl).parent;
        if let Some(property) = parent.filter(|p| matches!(self.module.decl(*p).kind, DeclKind::Property { .. })) {
            parent = self.module.decl(property).parent;
        }
        match self.module.decl(parent?).kind {
            DeclKind::Class { classifier } if self.table.get(classifier).kind == ClassifierKind::Object => {
                Some(classifier)
            }
            _ => None,
        }
    }
}
