//! Shared read-only state of one resolution session.

use std::cell::RefCell;
use std::rc::Rc;

use inj_hir::{DeclId, Module};
use inj_ir::StringInterner;
use inj_types::{ClassifierTable, TypeRenderer};
use rustc_hash::FxHashMap;

use crate::metadata::{self, CallableInfo, MetadataError, METADATA_ANNOTATION};

/// Module, types and names, plus the per-module declaration facts cache.
pub struct ResolveCtx<'a> {
    pub module: &'a Module,
    pub table: &'a ClassifierTable,
    pub interner: &'a StringInterner,
    facts: RefCell<FxHashMap<DeclId, Rc<CallableInfo>>>,
}

impl<'a> ResolveCtx<'a> {
    pub fn new(module: &'a Module, table: &'a ClassifierTable, interner: &'a StringInterner) -> Self {
        ResolveCtx {
            module,
            table,
            interner,
            facts: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn renderer(&self) -> TypeRenderer<'a> {
        TypeRenderer::new(self.table, self.interner)
    }

    pub fn qualified_name(&self, decl: DeclId) -> String {
        self.module.qualified_name(decl, self.interner)
    }

    /// Injection facts of a declaration.
    ///
    /// Local declarations derive them from flags. External declarations read
    /// the persisted blob; one without a blob was compiled without injection
    /// support and has no facts.
    pub fn facts(&self, decl: DeclId) -> Result<Rc<CallableInfo>, MetadataError> {
        if let Some(cached) = self.facts.borrow().get(&decl) {
            return Ok(Rc::clone(cached));
        }
        let d = self.module.decl(decl);
        let info = if d.is_external() {
            let annotation = self.interner.intern(METADATA_ANNOTATION);
            match d.annotation(annotation) {
                Some(blob) => metadata::decode_callable(blob, &self.qualified_name(decl))?,
                None => CallableInfo::default(),
            }
        } else {
            CallableInfo::from_decl(self.module, self.table, decl)
        };
        let info = Rc::new(info);
        self.facts.borrow_mut().insert(decl, Rc::clone(&info));
        Ok(info)
    }
}
