//! Threading type keys into declarations.
//!
//! A callable with type parameters marked for type keys receives one
//! trailing `TypeKey<T>` parameter per marked parameter. The declaration is
//! not widened in place: a copy takes over its body, parameters and links,
//! and replaces the original wherever the original was listed. Call sites
//! are retargeted to the copy later, while the driver rewrites them.

use inj_hir::{Decl, DeclFlags, DeclId, DeclKind, ExprKind, Module};
use inj_ir::StringInterner;
use inj_resolve::CallableInfo;
use inj_types::{ClassifierTable, TypeRef};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("`{name}` overrides itself through its own transformation")]
    Recursive { decl: DeclId, name: String },
    #[error("`{name}` marks type parameter {index} for a type key, but has no such type parameter")]
    MissingTypeParameter { decl: DeclId, name: String, index: u32 },
}

impl TransformError {
    /// Declaration the error is reported at.
    pub fn decl(&self) -> DeclId {
        match self {
            TransformError::Recursive { decl, .. } | TransformError::MissingTypeParameter { decl, .. } => *decl,
        }
    }
}

/// Creates transformed copies, once per original declaration.
pub struct Transformer<'t> {
    module: &'t mut Module,
    table: &'t ClassifierTable,
    interner: &'t StringInterner,
    /// Original declaration to its copy; owned by the session.
    transformed: &'t mut FxHashMap<DeclId, DeclId>,
    in_progress: FxHashSet<DeclId>,
}

impl<'t> Transformer<'t> {
    pub fn new(
        module: &'t mut Module,
        table: &'t ClassifierTable,
        interner: &'t StringInterner,
        transformed: &'t mut FxHashMap<DeclId, DeclId>,
    ) -> Self {
        Transformer {
            module,
            table,
            interner,
            transformed,
            in_progress: FxHashSet::default(),
        }
    }

    /// Local callables whose type parameters are marked for type keys.
    pub fn pending(module: &Module, table: &ClassifierTable) -> Vec<DeclId> {
        module
            .decls
            .ids()
            .filter(|decl| !type_key_parameters(module, table, *decl).is_empty())
            .collect()
    }

    /// The declaration to call instead of `decl`: its transformed copy, or
    /// `decl` itself when it needs no type keys.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn transform_if_needed(&mut self, decl: DeclId) -> Result<DeclId, TransformError> {
        if let Some(copy) = self.transformed.get(&decl) {
            return Ok(*copy);
        }
        let marked = type_key_parameters(self.module, self.table, decl);
        if marked.is_empty() {
            return Ok(decl);
        }
        if !self.in_progress.insert(decl) {
            return Err(TransformError::Recursive {
                decl,
                name: self.module.qualified_name(decl, self.interner),
            });
        }
        let result = self.transform(decl, &marked);
        self.in_progress.remove(&decl);
        result
    }

    fn transform(&mut self, decl: DeclId, marked: &[u32]) -> Result<DeclId, TransformError> {
        let original = self.module.decl(decl).clone();
        let type_parameters = match original.kind {
            DeclKind::Constructor { class } => self.module.decl(class).type_parameters.clone(),
            _ => original.type_parameters.clone(),
        };
        let mut key_types = Vec::with_capacity(marked.len());
        for index in marked {
            let Some(param) = type_parameters.get(*index as usize) else {
                return Err(TransformError::MissingTypeParameter {
                    decl,
                    name: self.module.qualified_name(decl, self.interner),
                    index: *index,
                });
            };
            key_types.push(*param);
        }

        let overridden = original
            .overridden
            .iter()
            .map(|overridden| self.transform_if_needed(*overridden))
            .collect::<Result<Vec<_>, _>>()?;

        let declared = original
            .value_parameters
            .iter()
            .filter(|param| !self.module.decl(**param).flags.contains(DeclFlags::SYNTHETIC))
            .count();
        let mut copy = original.clone();
        copy.overridden = overridden;
        let copy_id = self.module.decls.push(copy);
        self.transformed.insert(decl, copy_id);
        self.module.decls.get_mut(decl).body = None;

        let type_key = self.table.builtins().type_key;
        for (position, param) in key_types.into_iter().enumerate() {
            let stable_index = inj_ir::to_u32(declared + position, "type key parameter");
            let name = format!("{}Key", self.interner.lookup(self.table.get(param).name));
            let mut key = Decl::new(
                self.interner.intern(&name),
                DeclKind::ValueParameter { stable_index },
                original.file,
                original.span,
                TypeRef::new(type_key, vec![TypeRef::simple(param)]),
            );
            key.parent = Some(copy_id);
            key.flags = DeclFlags::SYNTHETIC | DeclFlags::INJECT;
            let key = self.module.decls.push(key);
            self.module.decls.get_mut(copy_id).value_parameters.push(key);
        }

        self.reparent_children(decl, copy_id);
        self.replace_references(&original, decl, copy_id);
        tracing::debug!(
            decl = %self.module.qualified_name(decl, self.interner),
            ?copy_id,
            keys = marked.len(),
            "transformed declaration"
        );
        Ok(copy_id)
    }

    /// Parameters, receivers and locals of the original now belong to the copy.
    fn reparent_children(&mut self, original: DeclId, copy: DeclId) {
        let children: Vec<DeclId> = self
            .module
            .decls
            .ids()
            .filter(|id| *id != copy && self.module.decl(*id).parent == Some(original))
            .collect();
        for child in children {
            self.module.decls.get_mut(child).parent = Some(copy);
        }
    }

    /// Put the copy wherever the original was listed.
    fn replace_references(&mut self, original: &Decl, decl: DeclId, copy: DeclId) {
        let swap = |slot: &mut DeclId| {
            if *slot == decl {
                *slot = copy;
            }
        };

        if let DeclKind::Getter { property } | DeclKind::Setter { property } = original.kind {
            if let DeclKind::Property { getter, setter } = &mut self.module.decls.get_mut(property).kind {
                getter.iter_mut().chain(setter.iter_mut()).for_each(swap);
            }
        }
        if let Some(parent) = original.parent {
            self.module.decls.get_mut(parent).members.iter_mut().for_each(swap);
        }
        if let Some(file) = self.module.file_mut(original.file) {
            file.declarations.iter_mut().for_each(swap);
        }

        let local_decls: Vec<_> = self
            .module
            .exprs
            .ids()
            .filter(|expr| matches!(self.module.exprs.kind(*expr), ExprKind::LocalDecl(local) if *local == decl))
            .collect();
        for expr in local_decls {
            self.module.exprs.replace(expr, ExprKind::LocalDecl(copy));
        }
    }

    /// Point every overridden set at transformed copies.
    ///
    /// Copies already map their own sets; this covers declarations that were
    /// not transformed themselves but override one that was.
    pub fn retarget_overrides(&mut self) {
        if self.transformed.is_empty() {
            return;
        }
        let ids: Vec<DeclId> = self.module.decls.ids().collect();
        for id in ids {
            let decl = self.module.decls.get_mut(id);
            for overridden in &mut decl.overridden {
                if let Some(copy) = self.transformed.get(&*overridden) {
                    *overridden = *copy;
                }
            }
        }
    }
}

/// Indices of `decl`'s type parameters that receive threaded type keys.
///
/// Empty for external declarations, which were transformed when compiled,
/// and for declarations that are not called.
fn type_key_parameters(module: &Module, table: &ClassifierTable, decl: DeclId) -> Vec<u32> {
    let d = module.decl(decl);
    if d.is_external() || !d.is_callable() || matches!(d.kind, DeclKind::Lambda | DeclKind::Setter { .. }) {
        return Vec::new();
    }
    CallableInfo::from_decl(module, table, decl).type_key_parameters
}
