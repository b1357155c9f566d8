//! Expressions.

use inj_ir::Span;
use inj_types::{ClassifierId, TypeRef};

use crate::{DeclId, ExprId};

/// Call of a function, constructor or accessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub callee: DeclId,
    pub type_arguments: Vec<TypeRef>,
    pub dispatch_receiver: Option<ExprId>,
    pub extension_receiver: Option<ExprId>,
    /// One slot per current value parameter of the callee; `None` means the
    /// caller supplied nothing.
    pub arguments: Vec<Option<ExprId>>,
}

impl Call {
    pub fn new(callee: DeclId, arguments: Vec<Option<ExprId>>) -> Self {
        Call {
            callee,
            type_arguments: Vec::new(),
            dispatch_receiver: None,
            extension_receiver: None,
            arguments,
        }
    }
}

/// Collection operations synthesized for list injectables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `mutableListOf<E>()`
    MutableListOf,
    /// `list.add(element)`
    ListAdd,
    /// `list.addAll(elements)`
    ListAddAll,
    /// `listOf(element)`
    ListOf,
    /// `elements.toList()`
    ToList,
}

impl Intrinsic {
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::MutableListOf => "mutableListOf",
            Intrinsic::ListAdd => "add",
            Intrinsic::ListAddAll => "addAll",
            Intrinsic::ListOf => "listOf",
            Intrinsic::ToList => "toList",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Call(Call),
    /// Read of a parameter, receiver or variable.
    Get(DeclId),
    /// Singleton access.
    GetObject(ClassifierId),
    /// Function literal; the lambda declaration owns parameters and body.
    Lambda(DeclId),
    /// Invocation of a function value.
    Invoke {
        function: ExprId,
        arguments: Vec<ExprId>,
    },
    Block {
        statements: Vec<ExprId>,
        result: Option<ExprId>,
    },
    /// Local function or class declaration statement.
    LocalDecl(DeclId),
    Variable {
        decl: DeclId,
        initializer: Option<ExprId>,
    },
    Assign {
        variable: DeclId,
        value: ExprId,
    },
    /// `value!!`
    NonNull(ExprId),
    Null,
    Int(i64),
    Str(String),
    /// String concatenation of the parts, in order.
    Concat(Vec<ExprId>),
    Intrinsic {
        op: Intrinsic,
        arguments: Vec<ExprId>,
    },
    Return(ExprId),
    Unit,
}

impl ExprKind {
    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Call(call) => call
                .dispatch_receiver
                .iter()
                .chain(call.extension_receiver.iter())
                .copied()
                .chain(call.arguments.iter().flatten().copied())
                .collect(),
            ExprKind::Invoke {
                function,
                arguments,
            } => std::iter::once(*function).chain(arguments.iter().copied()).collect(),
            ExprKind::Block { statements, result } => {
                statements.iter().chain(result.iter()).copied().collect()
            }
            ExprKind::Variable { initializer, .. } => initializer.iter().copied().collect(),
            ExprKind::Assign { value, .. } | ExprKind::NonNull(value) | ExprKind::Return(value) => {
                vec![*value]
            }
            ExprKind::Concat(parts) => parts.clone(),
            ExprKind::Intrinsic { arguments, .. } => arguments.clone(),
            ExprKind::Get(_)
            | ExprKind::GetObject(_)
            | ExprKind::Lambda(_)
            | ExprKind::LocalDecl(_)
            | ExprKind::Null
            | ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Unit => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: TypeRef,
}

/// Arena of expressions.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ExprKind, span: Span, ty: TypeRef) -> ExprId {
        let id = ExprId::new(inj_ir::to_u32(self.exprs.len(), "expression"));
        self.exprs.push(Expr { kind, span, ty });
        id
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()].kind
    }

    #[inline]
    pub fn span(&self, id: ExprId) -> Span {
        self.exprs[id.index()].span
    }

    #[inline]
    pub fn ty(&self, id: ExprId) -> &TypeRef {
        &self.exprs[id.index()].ty
    }

    /// Replace the node at `id`, keeping its span and type.
    pub fn replace(&mut self, id: ExprId, kind: ExprKind) -> ExprKind {
        std::mem::replace(&mut self.exprs[id.index()].kind, kind)
    }

    /// Copy the node at `id` into a fresh slot.
    pub fn duplicate(&mut self, id: ExprId) -> ExprId {
        let expr = self.get(id).clone();
        self.push(expr.kind, expr.span, expr.ty)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ExprId> {
        (0..self.exprs.len()).map(|i| ExprId::new(inj_ir::to_u32(i, "expression")))
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

#[cfg(test)]
mod tests;
