//! Programmatic construction of modules.
//!
//! The driver receives modules from the host compiler; tests and the `injc`
//! demo build them here. Every declaration and expression gets a distinct
//! one-byte span so call sites stay distinguishable.

use inj_ir::{FileId, LineIndex, Span, StringInterner};
use inj_types::{ClassifierId, ClassifierKind, ClassifierTable, Substitution, TypeRef, Variance};

use crate::{Call, Decl, DeclFlags, DeclId, DeclKind, ExprId, ExprKind, Intrinsic, Module};

pub struct ModuleBuilder<'a> {
    interner: &'a StringInterner,
    table: &'a mut ClassifierTable,
    module: Module,
    cursor: u32,
}

impl<'a> ModuleBuilder<'a> {
    pub fn new(name: &str, interner: &'a StringInterner, table: &'a mut ClassifierTable) -> Self {
        ModuleBuilder {
            interner,
            table,
            module: Module::new(interner.intern(name)),
            cursor: 0,
        }
    }

    pub fn interner(&self) -> &StringInterner {
        self.interner
    }

    pub fn table(&self) -> &ClassifierTable {
        &*self.table
    }

    pub fn table_mut(&mut self) -> &mut ClassifierTable {
        &mut *self.table
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn next_span(&mut self) -> Span {
        let start = self.cursor;
        self.cursor += 1;
        Span::new(start, start + 1)
    }

    /// Add a file; builder spans all fall on its first line.
    pub fn file(&mut self, path: &str, package: &str) -> FileId {
        let path = self.interner.intern(path);
        let package = self.interner.intern(package);
        self.module
            .add_file(path, package, LineIndex::from_line_starts(Vec::new()))
    }

    fn package_prefix(&self, file: FileId) -> String {
        self.module
            .file(file)
            .map(|f| self.interner.lookup(f.package))
            .filter(|package| !package.is_empty())
            .map(|package| format!("{package}."))
            .unwrap_or_default()
    }

    fn push_decl(&mut self, name: &str, kind: DeclKind, file: FileId, ty: TypeRef) -> DeclId {
        let span = self.next_span();
        let name = self.interner.intern(name);
        self.module.decls.push(Decl::new(name, kind, file, span, ty))
    }

    /// Attach `decl` to `parent`, or make it top-level when there is none.
    fn attach(&mut self, decl: DeclId, parent: Option<DeclId>) {
        match parent {
            Some(parent) => {
                self.module.decls.get_mut(decl).parent = Some(parent);
                if matches!(self.module.decl(parent).kind, DeclKind::Class { .. }) {
                    self.module.decls.get_mut(parent).members.push(decl);
                }
            }
            None => {
                let file = self.module.decl(decl).file;
                if let Some(file) = self.module.file_mut(file) {
                    file.declarations.push(decl);
                }
            }
        }
    }

    /// Declare a classifier and its class declaration.
    pub fn declare_class(
        &mut self,
        file: FileId,
        parent: Option<DeclId>,
        name: &str,
        kind: ClassifierKind,
    ) -> (DeclId, ClassifierId) {
        let fq = match parent {
            Some(parent) => format!("{}.{name}", self.module.qualified_name(parent, self.interner)),
            None => format!("{}{name}", self.package_prefix(file)),
        };
        let classifier = self.table.declare(self.interner, &fq, kind);
        let decl = self.push_decl(
            name,
            DeclKind::Class { classifier },
            file,
            TypeRef::simple(classifier),
        );
        self.attach(decl, parent);
        (decl, classifier)
    }

    pub fn class(&mut self, file: FileId, name: &str) -> ClassifierId {
        self.declare_class(file, None, name, ClassifierKind::Class).1
    }

    pub fn interface(&mut self, file: FileId, name: &str) -> ClassifierId {
        self.declare_class(file, None, name, ClassifierKind::Interface).1
    }

    /// A classifier used only to tag types; it has no declaration.
    pub fn tag(&mut self, fq_name: &str) -> ClassifierId {
        self.table.declare(self.interner, fq_name, ClassifierKind::Tag)
    }

    pub fn type_alias(&mut self, fq_name: &str, expanded: TypeRef) -> ClassifierId {
        let alias = self.table.declare(self.interner, fq_name, ClassifierKind::TypeAlias);
        self.table.set_alias_expansion(alias, expanded);
        alias
    }

    pub fn super_types(&mut self, classifier: ClassifierId, super_types: Vec<TypeRef>) {
        self.table.set_super_types(classifier, super_types);
    }

    /// Declaration of the class named by `classifier`.
    pub fn class_decl(&self, classifier: ClassifierId) -> Option<DeclId> {
        self.module.decls.ids().find(|id| {
            matches!(self.module.decl(*id).kind, DeclKind::Class { classifier: c } if c == classifier)
        })
    }

    pub fn ty(&self, classifier: ClassifierId) -> TypeRef {
        self.table.type_of(classifier, Vec::new())
    }

    pub fn generic_ty(&self, classifier: ClassifierId, arguments: Vec<TypeRef>) -> TypeRef {
        self.table.type_of(classifier, arguments)
    }

    pub fn list_of(&self, element: TypeRef) -> TypeRef {
        TypeRef::new(self.table.builtins().list, vec![element])
    }

    /// `(P1, .., Pn) -> R`; `None` above the largest supported arity.
    pub fn function_ty(&self, parameters: Vec<TypeRef>, result: TypeRef) -> Option<TypeRef> {
        let classifier = self.table.builtins().function(parameters.len())?;
        let mut arguments = parameters;
        arguments.push(result);
        Some(TypeRef::new(classifier, arguments))
    }

    pub fn unit_ty(&self) -> TypeRef {
        TypeRef::simple(self.table.builtins().unit)
    }

    /// Declare a function; class members get a dispatch receiver.
    pub fn function(
        &mut self,
        file: FileId,
        parent: Option<DeclId>,
        name: &str,
        ty: TypeRef,
    ) -> DeclId {
        let function = self.push_decl(name, DeclKind::Function, file, ty);
        self.attach(function, parent);
        if let Some(parent) = parent {
            if matches!(self.module.decl(parent).kind, DeclKind::Class { .. }) {
                let receiver_ty = self.module.decl(parent).ty.clone();
                let receiver = self.push_decl("<this>", DeclKind::DispatchReceiver, file, receiver_ty);
                self.module.decls.get_mut(receiver).parent = Some(function);
                self.module.decls.get_mut(function).dispatch_receiver = Some(receiver);
            }
        }
        function
    }

    /// Declare a function compiled in an earlier unit.
    pub fn external_function(&mut self, package: &str, name: &str, ty: TypeRef) -> DeclId {
        let file = self.external_file(package);
        let function = self.push_decl(name, DeclKind::Function, file, ty);
        self.module.decls.get_mut(function).flags |= DeclFlags::EXTERNAL;
        self.module.external.push(function);
        function
    }

    /// Declare a class compiled in an earlier unit.
    pub fn external_class(&mut self, package: &str, name: &str) -> (DeclId, ClassifierId) {
        let file = self.external_file(package);
        let fq = format!("{}{name}", self.package_prefix(file));
        let classifier = self.table.declare(self.interner, &fq, ClassifierKind::Class);
        let decl = self.push_decl(
            name,
            DeclKind::Class { classifier },
            file,
            TypeRef::simple(classifier),
        );
        self.module.decls.get_mut(decl).flags |= DeclFlags::EXTERNAL;
        self.module.external.push(decl);
        (decl, classifier)
    }

    fn external_file(&mut self, package: &str) -> FileId {
        let package = self.interner.intern(package);
        let path = self.interner.intern("<external>");
        if let Some(file) = self
            .module
            .files
            .iter()
            .find(|file| file.path == path && file.package == package)
        {
            return file.id;
        }
        self.module
            .add_file(path, package, LineIndex::from_line_starts(Vec::new()))
    }

    pub fn constructor(&mut self, class: DeclId) -> DeclId {
        let file = self.module.decl(class).file;
        let ty = self.module.decl(class).ty.clone();
        let constructor = self.push_decl("<init>", DeclKind::Constructor { class }, file, ty);
        self.attach(constructor, Some(class));
        constructor
    }

    /// Declare a read-only property and its getter.
    pub fn property(
        &mut self,
        file: FileId,
        parent: Option<DeclId>,
        name: &str,
        ty: TypeRef,
    ) -> (DeclId, DeclId) {
        let property = self.push_decl(
            name,
            DeclKind::Property {
                getter: None,
                setter: None,
            },
            file,
            ty.clone(),
        );
        self.attach(property, parent);
        let getter = self.push_decl(&format!("<get-{name}>"), DeclKind::Getter { property }, file, ty);
        self.module.decls.get_mut(getter).parent = Some(property);
        if let Some(class) = parent.filter(|p| matches!(self.module.decl(*p).kind, DeclKind::Class { .. })) {
            let receiver_ty = self.module.decl(class).ty.clone();
            let receiver = self.push_decl("<this>", DeclKind::DispatchReceiver, file, receiver_ty);
            self.module.decls.get_mut(receiver).parent = Some(getter);
            self.module.decls.get_mut(getter).dispatch_receiver = Some(receiver);
        }
        self.module.decls.get_mut(property).kind = DeclKind::Property {
            getter: Some(getter),
            setter: None,
        };
        (property, getter)
    }

    pub fn setter(&mut self, property: DeclId) -> DeclId {
        let file = self.module.decl(property).file;
        let name = format!("<set-{}>", self.interner.lookup(self.module.decl(property).name));
        let unit = self.unit_ty();
        let setter = self.push_decl(&name, DeclKind::Setter { property }, file, unit);
        self.module.decls.get_mut(setter).parent = Some(property);
        if let DeclKind::Property { setter: slot, .. } = &mut self.module.decls.get_mut(property).kind {
            *slot = Some(setter);
        }
        setter
    }

    /// Mark a declaration as an injectable candidate.
    pub fn given(&mut self, decl: DeclId) -> DeclId {
        self.flag(decl, DeclFlags::GIVEN)
    }

    pub fn flag(&mut self, decl: DeclId, flags: DeclFlags) -> DeclId {
        self.module.decls.get_mut(decl).flags |= flags;
        decl
    }

    pub fn priority(&mut self, decl: DeclId, priority: i32) -> DeclId {
        self.module.decls.get_mut(decl).priority = priority;
        decl
    }

    pub fn param(&mut self, callable: DeclId, name: &str, ty: TypeRef) -> DeclId {
        let stable_index =
            inj_ir::to_u32(self.module.decl(callable).value_parameters.len(), "parameter");
        let file = self.module.decl(callable).file;
        let param = self.push_decl(name, DeclKind::ValueParameter { stable_index }, file, ty);
        self.module.decls.get_mut(param).parent = Some(callable);
        self.module.decls.get_mut(callable).value_parameters.push(param);
        param
    }

    /// Parameter filled by injection when the caller omits it.
    pub fn inject_param(&mut self, callable: DeclId, name: &str, ty: TypeRef) -> DeclId {
        let param = self.param(callable, name, ty);
        self.flag(param, DeclFlags::INJECT)
    }

    /// Parameter that is itself a candidate inside the callable's body.
    pub fn given_param(&mut self, callable: DeclId, name: &str, ty: TypeRef) -> DeclId {
        let param = self.param(callable, name, ty);
        self.flag(param, DeclFlags::GIVEN | DeclFlags::INJECT)
    }

    pub fn extension_receiver(&mut self, callable: DeclId, ty: TypeRef) -> DeclId {
        let file = self.module.decl(callable).file;
        let receiver = self.push_decl("<this>", DeclKind::ExtensionReceiver, file, ty);
        self.module.decls.get_mut(receiver).parent = Some(callable);
        self.module.decls.get_mut(callable).extension_receiver = Some(receiver);
        receiver
    }

    /// Declare a type parameter on a function or class declaration.
    pub fn type_parameter(&mut self, owner: DeclId, name: &str, bound: Option<TypeRef>) -> ClassifierId {
        let owner_fq = self.module.qualified_name(owner, self.interner);
        let param = self
            .table
            .declare_type_parameter(self.interner, &owner_fq, name, Variance::Invariant);
        if let Some(bound) = bound {
            self.table.set_super_types(param, vec![bound]);
        }
        if let DeclKind::Class { classifier } = self.module.decl(owner).kind {
            let mut params = self.table.get(classifier).type_parameters.clone();
            params.push(param);
            self.table.set_type_parameters(classifier, params);
        }
        self.module.decls.get_mut(owner).type_parameters.push(param);
        param
    }

    /// Anonymous function owned by `parent`.
    pub fn lambda(&mut self, parent: DeclId, parameters: &[(&str, TypeRef)], ty: TypeRef) -> DeclId {
        let file = self.module.decl(parent).file;
        let lambda = self.push_decl("", DeclKind::Lambda, file, ty);
        self.module.decls.get_mut(lambda).parent = Some(parent);
        for (name, ty) in parameters {
            self.param(lambda, name, ty.clone());
        }
        lambda
    }

    pub fn variable(&mut self, parent: DeclId, name: &str, ty: TypeRef, mutable: bool) -> DeclId {
        let file = self.module.decl(parent).file;
        let variable = self.push_decl(name, DeclKind::Variable { mutable }, file, ty);
        self.module.decls.get_mut(variable).parent = Some(parent);
        variable
    }

    /// Local function declared inside `parent`'s body.
    pub fn local_function(&mut self, parent: DeclId, name: &str, ty: TypeRef) -> DeclId {
        let file = self.module.decl(parent).file;
        let function = self.push_decl(name, DeclKind::Function, file, ty);
        self.module.decls.get_mut(function).parent = Some(parent);
        function
    }

    pub fn set_body(&mut self, decl: DeclId, body: ExprId) {
        self.module.decls.get_mut(decl).body = Some(body);
    }

    fn push_expr(&mut self, kind: ExprKind, ty: TypeRef) -> ExprId {
        let span = self.next_span();
        self.module.exprs.push(kind, span, ty)
    }

    /// Call with one slot per parameter; `None` leaves the slot empty.
    pub fn call(&mut self, callee: DeclId, arguments: Vec<Option<ExprId>>) -> ExprId {
        self.call_with(Call::new(callee, arguments))
    }

    /// Call with every slot empty.
    pub fn call_bare(&mut self, callee: DeclId) -> ExprId {
        let slots = self.module.decl(callee).value_parameters.len();
        self.call(callee, vec![None; slots])
    }

    /// Call with explicit type arguments and receivers; the result type is
    /// the callee's return type with the type arguments substituted.
    pub fn call_with(&mut self, call: Call) -> ExprId {
        let callee = self.module.decl(call.callee);
        let substitution: Substitution = callee
            .type_parameters
            .iter()
            .copied()
            .zip(call.type_arguments.iter().cloned())
            .collect();
        let ty = callee.ty.substitute(&substitution);
        self.push_expr(ExprKind::Call(call), ty)
    }

    pub fn get(&mut self, decl: DeclId) -> ExprId {
        let ty = self.module.decl(decl).ty.clone();
        self.push_expr(ExprKind::Get(decl), ty)
    }

    pub fn get_object(&mut self, classifier: ClassifierId) -> ExprId {
        let ty = TypeRef::simple(classifier);
        self.push_expr(ExprKind::GetObject(classifier), ty)
    }

    pub fn block(&mut self, statements: Vec<ExprId>, result: Option<ExprId>) -> ExprId {
        let ty = match result {
            Some(result) => self.module.exprs.ty(result).clone(),
            None => self.unit_ty(),
        };
        self.push_expr(ExprKind::Block { statements, result }, ty)
    }

    pub fn local_decl(&mut self, decl: DeclId) -> ExprId {
        let unit = self.unit_ty();
        self.push_expr(ExprKind::LocalDecl(decl), unit)
    }

    pub fn lambda_expr(&mut self, lambda: DeclId) -> ExprId {
        let d = self.module.decl(lambda);
        let params = d
            .value_parameters
            .iter()
            .map(|p| self.module.decl(*p).ty.clone())
            .collect();
        let ty = self
            .function_ty(params, d.ty.clone())
            .unwrap_or_else(|| self.table.any_type());
        self.push_expr(ExprKind::Lambda(lambda), ty)
    }

    pub fn invoke(&mut self, function: ExprId, arguments: Vec<ExprId>, ty: TypeRef) -> ExprId {
        self.push_expr(ExprKind::Invoke { function, arguments }, ty)
    }

    pub fn variable_stmt(&mut self, decl: DeclId, initializer: Option<ExprId>) -> ExprId {
        let unit = self.unit_ty();
        self.push_expr(ExprKind::Variable { decl, initializer }, unit)
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        let ty = TypeRef::simple(self.table.builtins().int);
        self.push_expr(ExprKind::Int(value), ty)
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        let ty = TypeRef::simple(self.table.builtins().string);
        self.push_expr(ExprKind::Str(value.to_owned()), ty)
    }

    pub fn intrinsic(&mut self, op: Intrinsic, arguments: Vec<ExprId>, ty: TypeRef) -> ExprId {
        self.push_expr(ExprKind::Intrinsic { op, arguments }, ty)
    }

    pub fn ret(&mut self, value: ExprId) -> ExprId {
        let ty = self.module.exprs.ty(value).clone();
        self.push_expr(ExprKind::Return(value), ty)
    }
}
