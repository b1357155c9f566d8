//! Construction of lexical scopes.
//!
//! Visibility is decided here and nowhere else: what a factory method puts
//! into a scope is exactly what resolution may see through it.

use inj_hir::{DeclFlags, DeclId, DeclKind};
use inj_ir::FileId;
use inj_types::TypeRef;

use super::{Candidate, ScopeArena, ScopeId, ScopeKind};
use crate::metadata::MetadataError;
use crate::{CallContext, ResolveCtx};

pub struct ScopeFactory<'r, 'a> {
    ctx: &'r ResolveCtx<'a>,
    arena: &'r mut ScopeArena,
    errors: Vec<(DeclId, MetadataError)>,
}

impl<'r, 'a> ScopeFactory<'r, 'a> {
    pub fn new(ctx: &'r ResolveCtx<'a>, arena: &'r mut ScopeArena) -> Self {
        ScopeFactory {
            ctx,
            arena,
            errors: Vec::new(),
        }
    }

    /// Declarations whose persisted facts could not be read.
    pub fn take_errors(&mut self) -> Vec<(DeclId, MetadataError)> {
        std::mem::take(&mut self.errors)
    }

    pub fn arena(&self) -> &ScopeArena {
        &*self.arena
    }

    fn given_candidate(&mut self, decl: DeclId) -> Option<Candidate> {
        match self.ctx.callable_ref(decl) {
            Ok(Some(callable)) if callable.is_given => Some(Candidate::Callable(callable)),
            Ok(_) => None,
            Err(err) => {
                self.errors.push((decl, err));
                None
            }
        }
    }

    /// External givens and every public top-level given of the module.
    pub fn global(&mut self) -> ScopeId {
        let module = self.ctx.module;
        let mut candidates = Vec::new();
        for decl in &module.external {
            candidates.extend(self.given_candidate(*decl));
        }
        for decl in module.top_level() {
            if !module.decl(decl).flags.contains(DeclFlags::PRIVATE) {
                candidates.extend(self.given_candidate(decl));
            }
        }
        self.arena
            .push(ScopeKind::Global, "GLOBAL".to_owned(), None, candidates)
    }

    /// Private top-level givens of one file.
    pub fn file(&mut self, parent: ScopeId, file: FileId) -> ScopeId {
        let module = self.ctx.module;
        let mut candidates = Vec::new();
        let mut name = String::from("FILE");
        if let Some(source) = module.file(file) {
            name = format!("FILE {}", self.ctx.interner.lookup(source.path));
            for decl in &source.declarations {
                if module.decl(*decl).flags.contains(DeclFlags::PRIVATE) {
                    candidates.extend(self.given_candidate(*decl));
                }
            }
        }
        self.arena
            .push(ScopeKind::File(file), name, Some(parent), candidates)
    }

    /// Given members of a class.
    pub fn class(&mut self, parent: ScopeId, class: DeclId) -> ScopeId {
        let module = self.ctx.module;
        let mut candidates = Vec::new();
        for member in &module.decl(class).members {
            if !matches!(module.decl(*member).kind, DeclKind::Constructor { .. }) {
                candidates.extend(self.given_candidate(*member));
            }
        }
        let name = format!("CLASS {}", self.ctx.qualified_name(class));
        self.arena
            .push(ScopeKind::Class(class), name, Some(parent), candidates)
    }

    /// Receivers, given or injected parameters, and threaded type keys of a
    /// function, constructor, accessor or lambda.
    pub fn function(&mut self, parent: ScopeId, callable: DeclId) -> ScopeId {
        let module = self.ctx.module;
        let d = module.decl(callable);
        let mut candidates = Vec::new();

        for receiver in d.dispatch_receiver.iter().chain(&d.extension_receiver) {
            candidates.extend(self.read_candidate(*receiver));
        }
        for param in &d.value_parameters {
            let flags = module.decl(*param).flags;
            if flags.intersects(DeclFlags::GIVEN | DeclFlags::INJECT)
                && !flags.contains(DeclFlags::SYNTHETIC)
            {
                candidates.extend(self.read_candidate(*param));
            }
        }
        match self.ctx.facts(callable) {
            Ok(facts) => {
                let type_parameters = match d.kind {
                    DeclKind::Constructor { class } => &module.decl(class).type_parameters,
                    _ => &d.type_parameters,
                };
                let type_key = self.ctx.table.builtins().type_key;
                for (position, index) in facts.type_key_parameters.iter().enumerate() {
                    let Some(param) = type_parameters.get(*index as usize) else {
                        continue;
                    };
                    candidates.push(Candidate::TypeKeyParameter {
                        function: callable,
                        index: inj_ir::to_u32(position, "type key parameter"),
                        ty: TypeRef::new(type_key, vec![TypeRef::simple(*param)]),
                    });
                }
            }
            Err(err) => self.errors.push((callable, err)),
        }

        let name = format!("FUNCTION {}", self.ctx.qualified_name(callable));
        let scope = self
            .arena
            .push(ScopeKind::Function(callable), name, Some(parent), candidates);
        self.arena.set_call_context(scope, CallContext::of(d.flags));
        scope
    }

    /// Scope for the statements after a local declaration, if it is given.
    pub fn block(&mut self, parent: ScopeId, decl: DeclId) -> Option<ScopeId> {
        if !self.ctx.module.decl(decl).is_given() {
            return None;
        }
        let candidate = self.given_candidate(decl)?;
        let name = format!("BLOCK {}", self.ctx.qualified_name(decl));
        Some(
            self.arena
                .push(ScopeKind::Block(decl), name, Some(parent), vec![candidate]),
        )
    }

    fn read_candidate(&mut self, decl: DeclId) -> Option<Candidate> {
        match self.ctx.callable_ref(decl) {
            Ok(Some(callable)) => Some(Candidate::Callable(callable)),
            Ok(None) => None,
            Err(err) => {
                self.errors.push((decl, err));
                None
            }
        }
    }
}
