use super::*;
use crate::ModuleBuilder;
use inj_ir::StringInterner;
use inj_types::ClassifierTable;
use pretty_assertions::assert_eq;

#[test]
fn collects_calls_inside_lambdas_and_local_functions() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let unit = b.unit_ty();
    let target = b.function(file, None, "target", unit.clone());
    let main = b.function(file, None, "main", unit.clone());

    let local = b.local_function(main, "local", unit.clone());
    let in_local = b.call_bare(target);
    b.set_body(local, in_local);
    let local_stmt = b.local_decl(local);

    let lambda = b.lambda(main, &[], unit);
    let in_lambda = b.call_bare(target);
    b.set_body(lambda, in_lambda);
    let lambda_expr = b.lambda_expr(lambda);

    let direct = b.call_bare(target);
    let body = b.block(vec![local_stmt, lambda_expr], Some(direct));
    b.set_body(main, body);
    let module = b.finish();

    assert_eq!(collect_calls(&module), vec![in_local, in_lambda, direct]);
}

#[test]
fn visits_class_members() {
    struct Names(Vec<DeclId>);

    impl Visitor for Names {
        fn visit_decl(&mut self, module: &Module, decl: DeclId) {
            self.0.push(decl);
            walk_decl(self, module, decl);
        }
    }

    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let (class, classifier) = b.declare_class(file, None, "Repo", inj_types::ClassifierKind::Class);
    let ty = b.ty(classifier);
    let (property, getter) = b.property(file, Some(class), "size", ty.clone());
    let method = b.function(file, Some(class), "get", ty);
    let module = b.finish();

    let mut names = Names(Vec::new());
    names.visit_module(&module);
    assert_eq!(names.0, vec![class, property, getter, method]);
}
