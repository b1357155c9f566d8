//! Injectable Scope Graph.
//!
//! Scopes live in a [`ScopeArena`] and point only at their parent. Lexical
//! scopes are built once by the analysis walk, innermost last, and their
//! candidate lists never change afterwards. Type scopes, the private frames
//! of provider lambdas, are created lazily during resolution and cached per
//! (owner scope, provider type).

mod factory;

use std::fmt;

use inj_hir::DeclId;
use inj_ir::FileId;
use inj_types::TypeRef;
use rustc_hash::FxHashMap;

use crate::{CallContext, CallableRef};

pub use factory::ScopeFactory;

/// Index of a scope in a [`ScopeArena`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ScopeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

/// A value source visible in a scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Candidate {
    Callable(CallableRef),
    /// Parameter `index` of the lambda synthesized for type scope `scope`.
    ProviderParameter {
        scope: ScopeId,
        index: u32,
        ty: TypeRef,
    },
    /// Type key threaded into `function` for its `index`-th marked type
    /// parameter.
    TypeKeyParameter {
        function: DeclId,
        index: u32,
        ty: TypeRef,
    },
}

impl Candidate {
    pub fn ty(&self) -> &TypeRef {
        match self {
            Candidate::Callable(callable) => &callable.ty,
            Candidate::ProviderParameter { ty, .. } | Candidate::TypeKeyParameter { ty, .. } => ty,
        }
    }

    pub fn decl(&self) -> Option<DeclId> {
        match self {
            Candidate::Callable(callable) => Some(callable.decl),
            Candidate::TypeKeyParameter { function, .. } => Some(*function),
            Candidate::ProviderParameter { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    File(FileId),
    Class(DeclId),
    Function(DeclId),
    /// Statements following a local given declaration.
    Block(DeclId),
    /// Private frame of a provider lambda.
    Type,
}

#[derive(Clone, Debug)]
pub struct InjectablesScope {
    pub kind: ScopeKind,
    /// Diagnostic name, such as `FUNCTION app.main`.
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Number of ancestors.
    pub nesting: u32,
    /// Nearest enclosing declaration, for source keys and hoisting.
    pub owner: Option<DeclId>,
    pub file: Option<FileId>,
    pub candidates: Vec<Candidate>,
    /// Context code evaluated in this scope runs in. Provider lambdas run
    /// later, outside any coroutine or composition.
    pub call_context: CallContext,
}

impl InjectablesScope {
    pub fn is_type_scope(&self) -> bool {
        self.kind == ScopeKind::Type
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<InjectablesScope>,
    type_scopes: FxHashMap<(ScopeId, TypeRef), ScopeId>,
    /// Provider type each type scope was created for.
    provided: FxHashMap<ScopeId, TypeRef>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope below `parent` with a frozen candidate list.
    pub fn push(
        &mut self,
        kind: ScopeKind,
        name: String,
        parent: Option<ScopeId>,
        candidates: Vec<Candidate>,
    ) -> ScopeId {
        let (nesting, owner, file, inherited) = match parent {
            Some(parent) => {
                let p = self.get(parent);
                (p.nesting + 1, p.owner, p.file, p.call_context)
            }
            None => (0, None, None, CallContext::Default),
        };
        let call_context = match kind {
            ScopeKind::Global | ScopeKind::Class(_) | ScopeKind::Type => CallContext::Default,
            ScopeKind::File(_) | ScopeKind::Function(_) | ScopeKind::Block(_) => inherited,
        };
        let (owner, file) = match kind {
            ScopeKind::File(file) => (owner, Some(file)),
            ScopeKind::Class(decl) | ScopeKind::Function(decl) => (Some(decl), file),
            ScopeKind::Global | ScopeKind::Block(_) | ScopeKind::Type => (owner, file),
        };
        let id = ScopeId::new(inj_ir::to_u32(self.scopes.len(), "scope"));
        self.scopes.push(InjectablesScope {
            kind,
            name,
            parent,
            nesting,
            owner,
            file,
            candidates,
            call_context,
        });
        id
    }

    /// Record the context of a function scope from its declaration.
    pub(crate) fn set_call_context(&mut self, id: ScopeId, call_context: CallContext) {
        self.scopes[id.index()].call_context = call_context;
    }

    #[inline]
    pub fn get(&self, id: ScopeId) -> &InjectablesScope {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// `id` and its ancestors, innermost first.
    pub fn all_scopes(&self, id: ScopeId) -> AllScopes<'_> {
        AllScopes {
            arena: self,
            next: Some(id),
        }
    }

    /// `id` and its ancestors, outermost first.
    pub fn all_scopes_outermost_first(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut scopes: Vec<ScopeId> = self.all_scopes(id).collect();
        scopes.reverse();
        scopes
    }

    /// Whether `ancestor` is `id` or one of its parents.
    pub fn is_within(&self, id: ScopeId, ancestor: ScopeId) -> bool {
        self.all_scopes(id).any(|scope| scope == ancestor)
    }

    /// The type scope for resolving a provider of `ty` requested in `owner`.
    ///
    /// Created on first use with the provider's parameters as candidates,
    /// then reused for every later request of the same type in `owner`.
    /// A request made from inside a frame already built for `ty` re-enters
    /// that frame instead of nesting another one.
    pub fn type_scope(&mut self, owner: ScopeId, ty: &TypeRef, parameters: &[TypeRef]) -> ScopeId {
        if let Some(existing) = self.type_scopes.get(&(owner, ty.clone())) {
            return *existing;
        }
        let reentered = self
            .all_scopes(owner)
            .find(|scope| self.provided.get(scope) == Some(ty));
        if let Some(existing) = reentered {
            tracing::trace!(?owner, scope = ?existing, "re-entered type scope");
            return existing;
        }
        let id = ScopeId::new(inj_ir::to_u32(self.scopes.len(), "scope"));
        let candidates = parameters
            .iter()
            .enumerate()
            .map(|(index, ty)| Candidate::ProviderParameter {
                scope: id,
                index: inj_ir::to_u32(index, "provider parameter"),
                ty: ty.clone(),
            })
            .collect();
        let name = format!("PROVIDER in {}", self.get(owner).name);
        let pushed = self.push(ScopeKind::Type, name, Some(owner), candidates);
        debug_assert_eq!(pushed, id);
        self.type_scopes.insert((owner, ty.clone()), id);
        self.provided.insert(id, ty.clone());
        tracing::trace!(?owner, scope = ?id, "created type scope");
        id
    }

    /// Nearest lexical (non-type) scope at or above `id`.
    pub fn lexical_scope(&self, id: ScopeId) -> ScopeId {
        self.all_scopes(id)
            .find(|scope| !self.get(*scope).is_type_scope())
            .unwrap_or(id)
    }

    /// Nearest type scope at or above `id`, if any.
    pub fn enclosing_type_scope(&self, id: ScopeId) -> Option<ScopeId> {
        self.all_scopes(id).find(|scope| self.get(*scope).is_type_scope())
    }
}

/// Iterator from a scope to the root.
pub struct AllScopes<'a> {
    arena: &'a ScopeArena,
    next: Option<ScopeId>,
}

impl Iterator for AllScopes<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.arena.get(current).parent;
        Some(current)
    }
}
