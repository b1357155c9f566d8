use super::*;
use inj_hir::{dump, ModuleBuilder};
use inj_resolve::{analyze, AnalysisConfig, ResolveCtx};
use pretty_assertions::assert_eq;

fn drive(
    module: &mut Module,
    table: &ClassifierTable,
    interner: &StringInterner,
    transformed: &FxHashMap<DeclId, DeclId>,
) -> DriverOutcome {
    let analysis = {
        let ctx = ResolveCtx::new(module, table, interner);
        analyze(&ctx, AnalysisConfig::default())
    };
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics);
    Driver {
        module,
        table,
        interner,
        scopes: &analysis.scopes,
        call_sites: &analysis.call_sites,
        transformed,
    }
    .run()
}

#[test]
fn rewrites_resolved_calls_in_place() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let bb = b.class(file, "B");
    let (a_ty, b_ty) = (b.ty(a), b.ty(bb));
    let unit = b.unit_ty();
    let provide_a = b.function(file, None, "provideA", a_ty.clone());
    b.given(provide_a);
    let provide_b = b.function(file, None, "provideB", b_ty.clone());
    b.given(provide_b);
    b.param(provide_b, "a", a_ty);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "b", b_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let mut module = b.finish();

    let outcome = drive(&mut module, &table, &interner, &FxHashMap::default());
    assert_eq!(
        outcome,
        DriverOutcome {
            rewritten: 1,
            skipped: 0,
            diagnostics: Vec::new(),
        }
    );
    assert_eq!(
        dump::expr_to_string(&module, &table, &interner, call),
        "consume(provideB(provideA()))"
    );
}

#[test]
fn hoisted_locals_belong_to_the_enclosing_lambda() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let leaf = b.class(file, "Leaf");
    let shared = b.class(file, "Shared");
    let root = b.class(file, "Root");
    let (leaf_ty, shared_ty, root_ty) = (b.ty(leaf), b.ty(shared), b.ty(root));
    let unit = b.unit_ty();
    let provide_leaf = b.function(file, None, "provideLeaf", leaf_ty.clone());
    b.given(provide_leaf);
    let provide_shared = b.function(file, None, "provideShared", shared_ty.clone());
    b.given(provide_shared);
    b.param(provide_shared, "leaf", leaf_ty);
    let provide_root = b.function(file, None, "provideRoot", root_ty.clone());
    b.given(provide_root);
    b.param(provide_root, "first", shared_ty.clone());
    b.param(provide_root, "second", shared_ty);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "root", root_ty);

    let main = b.function(file, None, "main", unit.clone());
    let lambda = b.lambda(main, &[], unit);
    let call = b.call_bare(consume);
    b.set_body(lambda, call);
    let lambda_expr = b.lambda_expr(lambda);
    b.set_body(main, lambda_expr);
    let mut module = b.finish();

    let outcome = drive(&mut module, &table, &interner, &FxHashMap::default());
    assert_eq!(outcome.rewritten, 1);
    assert_eq!(
        dump::expr_to_string(&module, &table, &interner, call),
        "{ val shared0 = provideShared(provideLeaf()); consume(provideRoot(shared0, shared0)) }"
    );
    let ExprKind::Block { statements, .. } = module.exprs.kind(call) else {
        panic!("expected a block");
    };
    let ExprKind::Variable { decl, .. } = module.exprs.kind(statements[0]) else {
        panic!("expected a variable");
    };
    assert_eq!(module.decl(*decl).parent, Some(lambda));
}

#[test]
fn calls_reusing_a_site_position_are_left_untouched() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let a_ty = b.ty(a);
    let unit = b.unit_ty();
    let provide_a = b.function(file, None, "provideA", a_ty.clone());
    b.given(provide_a);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty);
    let log = b.function(file, None, "log", unit.clone());
    let main = b.function(file, None, "main", unit.clone());
    let call = b.call_bare(consume);
    let mut module = b.finish();

    // Another pass produced a node at the analyzed call's position.
    let span = module.exprs.span(call);
    let impostor = module
        .exprs
        .push(ExprKind::Call(inj_hir::Call::new(log, Vec::new())), span, unit.clone());
    let body = module.exprs.push(
        ExprKind::Block {
            statements: vec![impostor],
            result: Some(call),
        },
        inj_ir::Span::new(900, 901),
        unit,
    );
    module.decls.get_mut(main).body = Some(body);

    let analysis = {
        let ctx = ResolveCtx::new(&module, &table, &interner);
        analyze(&ctx, AnalysisConfig::default())
    };
    // Only the real call resolves; the impostor injects nothing.
    let position = SourcePosition::new(file, span);
    assert_eq!(analysis.call_sites[&position].call, call);

    let transformed = FxHashMap::default();
    let outcome = Driver {
        module: &mut module,
        table: &table,
        interner: &interner,
        scopes: &analysis.scopes,
        call_sites: &analysis.call_sites,
        transformed: &transformed,
    }
    .run();
    assert_eq!(outcome.rewritten, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(dump::expr_to_string(&module, &table, &interner, impostor), "log()");
    assert_eq!(dump::expr_to_string(&module, &table, &interner, call), "consume(provideA())");
}

#[test]
fn synthesis_errors_become_internal_diagnostics() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let a_ty = b.ty(a);
    let unit = b.unit_ty();
    let provide_a = b.function(file, None, "provideA", a_ty.clone());
    b.given(provide_a);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty);
    // A copy that lost the injected parameter.
    let broken = b.function(file, None, "broken", unit.clone());
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let mut module = b.finish();

    let mut transformed = FxHashMap::default();
    transformed.insert(consume, broken);
    let outcome = drive(&mut module, &table, &interner, &transformed);

    assert_eq!(outcome.rewritten, 0);
    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.code, ErrorCode::E9001);
    assert_eq!(diagnostic.primary_label().unwrap().span, module.exprs.span(call));
    assert_eq!(dump::expr_to_string(&module, &table, &interner, call), "consume()");
}
