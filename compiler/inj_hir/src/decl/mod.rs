//! Declarations.

use bitflags::bitflags;
use inj_ir::{FileId, Name, Span};
use inj_types::{ClassifierId, TypeRef};

use crate::{DeclId, ExprId};

bitflags! {
    /// Injection-relevant facts about a declaration.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DeclFlags: u16 {
        /// Eligible as an injectable candidate.
        const GIVEN = 1 << 0;
        /// Parameter filled by injection when the caller supplies nothing.
        const INJECT = 1 << 1;
        /// Compiled in an earlier compilation unit; the body is unavailable.
        const EXTERNAL = 1 << 2;
        /// Parameter with a default value.
        const HAS_DEFAULT = 1 << 3;
        const OVERRIDE = 1 << 4;
        /// Top-level declaration visible only inside its file.
        const PRIVATE = 1 << 5;
        /// Parameter appended by a transformation pass.
        const SYNTHETIC = 1 << 6;
        /// Function or lambda that runs inside a coroutine.
        const SUSPEND = 1 << 7;
        /// Function or lambda that runs inside a composition.
        const COMPOSABLE = 1 << 8;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Class { classifier: ClassifierId },
    Function,
    Constructor { class: DeclId },
    Property {
        getter: Option<DeclId>,
        setter: Option<DeclId>,
    },
    Getter { property: DeclId },
    Setter { property: DeclId },
    /// `stable_index` is the position the parameter was declared at.
    ValueParameter { stable_index: u32 },
    DispatchReceiver,
    ExtensionReceiver,
    Variable { mutable: bool },
    /// Anonymous function of a function literal.
    Lambda,
}

/// Annotation carrying a string value, such as persisted metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub name: Name,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub name: Name,
    pub kind: DeclKind,
    pub parent: Option<DeclId>,
    pub file: FileId,
    pub span: Span,
    pub flags: DeclFlags,
    pub type_parameters: Vec<ClassifierId>,
    pub value_parameters: Vec<DeclId>,
    pub dispatch_receiver: Option<DeclId>,
    pub extension_receiver: Option<DeclId>,
    /// Return type of a callable; value type of anything else.
    pub ty: TypeRef,
    /// Explicit priority marker; higher wins among candidates of one scope.
    pub priority: i32,
    pub annotations: Vec<Annotation>,
    /// Declarations this one overrides.
    pub overridden: Vec<DeclId>,
    /// Members of a class.
    pub members: Vec<DeclId>,
    pub body: Option<ExprId>,
}

impl Decl {
    pub fn new(name: Name, kind: DeclKind, file: FileId, span: Span, ty: TypeRef) -> Self {
        Decl {
            name,
            kind,
            parent: None,
            file,
            span,
            flags: DeclFlags::empty(),
            type_parameters: Vec::new(),
            value_parameters: Vec::new(),
            dispatch_receiver: None,
            extension_receiver: None,
            ty,
            priority: 0,
            annotations: Vec::new(),
            overridden: Vec::new(),
            members: Vec::new(),
            body: None,
        }
    }

    #[inline]
    pub fn is_given(&self) -> bool {
        self.flags.contains(DeclFlags::GIVEN)
    }

    #[inline]
    pub fn is_inject(&self) -> bool {
        self.flags.contains(DeclFlags::INJECT)
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.flags.contains(DeclFlags::EXTERNAL)
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.flags.contains(DeclFlags::HAS_DEFAULT)
    }

    /// Declared position of a value parameter.
    pub fn stable_index(&self) -> Option<u32> {
        match self.kind {
            DeclKind::ValueParameter { stable_index } => Some(stable_index),
            _ => None,
        }
    }

    /// Functions, constructors, accessors and lambdas.
    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Function
                | DeclKind::Constructor { .. }
                | DeclKind::Getter { .. }
                | DeclKind::Setter { .. }
                | DeclKind::Lambda
        )
    }

    pub fn annotation(&self, name: Name) -> Option<&str> {
        self.annotations
            .iter()
            .find(|annotation| annotation.name == name)
            .map(|annotation| annotation.value.as_str())
    }

    /// Replace or add an annotation.
    pub fn set_annotation(&mut self, name: Name, value: String) {
        match self.annotations.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.annotations.push(Annotation { name, value }),
        }
    }
}

/// Arena of declarations.
#[derive(Clone, Debug, Default)]
pub struct DeclArena {
    decls: Vec<Decl>,
}

impl DeclArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::new(inj_ir::to_u32(self.decls.len(), "declaration"));
        self.decls.push(decl);
        id
    }

    #[inline]
    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> {
        (0..self.decls.len()).map(|i| DeclId::new(inj_ir::to_u32(i, "declaration")))
    }

    /// Value parameter of `callable` declared at `stable_index`.
    ///
    /// Looks the slot up by identity, so parameters appended by later passes
    /// do not shift it.
    pub fn parameter_slot(&self, callable: DeclId, stable_index: u32) -> Option<usize> {
        self.get(callable)
            .value_parameters
            .iter()
            .position(|param| self.get(*param).stable_index() == Some(stable_index))
    }
}
