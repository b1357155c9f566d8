//! Files and modules.

use inj_ir::{FileId, LineIndex, Name, StringInterner};

use crate::{Decl, DeclArena, DeclId, Expr, ExprArena, ExprId};

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: Name,
    /// Dotted package name; empty for the root package.
    pub package: Name,
    pub lines: LineIndex,
    /// Top-level declarations in source order.
    pub declarations: Vec<DeclId>,
}

/// One compilation unit: its files, declarations and expressions.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: Name,
    pub files: Vec<SourceFile>,
    pub decls: DeclArena,
    pub exprs: ExprArena,
    /// Declarations imported from earlier compilation units.
    pub external: Vec<DeclId>,
}

impl Module {
    pub fn new(name: Name) -> Self {
        Module {
            name,
            files: Vec::new(),
            decls: DeclArena::new(),
            exprs: ExprArena::new(),
            external: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: Name, package: Name, lines: LineIndex) -> FileId {
        let id = FileId::new(inj_ir::to_u32(self.files.len(), "file"));
        self.files.push(SourceFile {
            id,
            path,
            package,
            lines,
            declarations: Vec::new(),
        });
        id
    }

    /// The file, or `None` for declarations without one (external ones).
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    pub fn file_mut(&mut self, id: FileId) -> Option<&mut SourceFile> {
        self.files.get_mut(id.index())
    }

    #[inline]
    pub fn decl(&self, id: DeclId) -> &Decl {
        self.decls.get(id)
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        self.exprs.get(id)
    }

    /// Dotted path of a declaration: package, named ancestors, own name.
    ///
    /// Anonymous declarations (lambdas) are skipped.
    pub fn qualified_name(&self, decl: DeclId, interner: &StringInterner) -> String {
        let mut parts = Vec::new();
        let mut current = Some(decl);
        while let Some(id) = current {
            let d = self.decl(id);
            if !d.name.is_empty() {
                parts.push(interner.lookup(d.name));
            }
            current = d.parent;
        }
        let package = self
            .file(self.decl(decl).file)
            .map(|file| interner.lookup(file.package))
            .unwrap_or_default();
        if !package.is_empty() {
            parts.push(package);
        }
        parts.reverse();
        parts.join(".")
    }

    /// Nearest enclosing function, constructor, accessor or lambda.
    pub fn enclosing_callable(&self, decl: DeclId) -> Option<DeclId> {
        let mut current = self.decl(decl).parent;
        while let Some(id) = current {
            if self.decl(id).is_callable() {
                return Some(id);
            }
            current = self.decl(id).parent;
        }
        None
    }

    /// Top-level declarations of every file, in file then source order.
    pub fn top_level(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.files
            .iter()
            .flat_map(|file| file.declarations.iter().copied())
    }
}
