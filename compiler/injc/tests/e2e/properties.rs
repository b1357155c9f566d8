//! Whole-pipeline properties: determinism, shadowing, ambiguity in any
//! order, cycles broken by providers, deferred providers, sharing and list
//! ordering.

use inj_diagnostic::ErrorCode;
use inj_hir::{dump, DeclId, ExprId, Module, ModuleBuilder};
use inj_ir::StringInterner;
use inj_types::ClassifierTable;
use pretty_assertions::assert_eq;

use crate::common::{compile, compile_err, list, made, Evaluator, Value};

/// `consume(a: A)` called from `main`, with `provideA` and `provideA2` both
/// given at top level in the order `first_declared` says.
fn two_top_level_candidates(first_declared: bool) -> (Module, ClassifierTable, StringInterner) {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let a_ty = b.ty(a);
    let unit = b.unit_ty();
    let names = if first_declared {
        ["provideA", "provideA2"]
    } else {
        ["provideA2", "provideA"]
    };
    for name in names {
        let provider = b.function(file, None, name, a_ty.clone());
        b.given(provider);
    }
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();
    (module, table, interner)
}

#[test]
fn ambiguity_does_not_depend_on_declaration_order() {
    for first_declared in [true, false] {
        let (module, table, interner) = two_top_level_candidates(first_declared);
        let (_, codes) = compile_err(module, table, interner);
        assert_eq!(codes, vec![ErrorCode::E1002], "first_declared = {first_declared}");
    }
}

/// A diamond: `provideService` and `consume` both need `Shared`.
fn diamond() -> (Module, ClassifierTable, StringInterner, DeclId, ExprId) {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let leaf = b.class(file, "Leaf");
    let shared = b.class(file, "Shared");
    let service = b.class(file, "Service");
    let (leaf_ty, shared_ty, service_ty) = (b.ty(leaf), b.ty(shared), b.ty(service));
    let unit = b.unit_ty();
    let provide_leaf = b.function(file, None, "provideLeaf", leaf_ty.clone());
    b.given(provide_leaf);
    let provide_shared = b.function(file, None, "provideShared", shared_ty.clone());
    b.given(provide_shared);
    b.param(provide_shared, "leaf", leaf_ty);
    let provide_service = b.function(file, None, "provideService", service_ty.clone());
    b.given(provide_service);
    b.param(provide_service, "first", shared_ty.clone());
    b.param(provide_service, "second", shared_ty.clone());
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "service", service_ty);
    b.inject_param(consume, "shared", shared_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();
    (module, table, interner, main, call)
}

#[test]
fn identical_modules_rewrite_identically() {
    let render = || {
        let (module, table, interner, _, call) = diamond();
        let session = compile(module, table, interner);
        dump::expr_to_string(session.module(), session.table(), session.interner(), call)
    };
    let first = render();
    assert_eq!(first, render());
    assert_eq!(
        first,
        "{ val shared0 = provideShared(provideLeaf()); consume(provideService(shared0, shared0), shared0) }"
    );
}

#[test]
fn shared_values_are_computed_once_per_call() {
    let (module, table, interner, main, _) = diamond();
    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let result = eval.run(main);

    let shared = made("provideShared", vec![made("provideLeaf", Vec::new())]);
    assert_eq!(
        result,
        made(
            "consume",
            vec![made("provideService", vec![shared.clone(), shared.clone()]), shared]
        )
    );
    assert_eq!(eval.calls("provideShared"), 1);
    assert_eq!(eval.calls("provideLeaf"), 1);
}

#[test]
fn local_given_shadows_top_level_given() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let a_ty = b.ty(a);
    let unit = b.unit_ty();
    let global_a = b.function(file, None, "globalA", a_ty.clone());
    b.given(global_a);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty.clone());
    let main = b.function(file, None, "main", unit);
    let local_a = b.local_function(main, "localA", a_ty);
    b.given(local_a);
    let declare = b.local_decl(local_a);
    let call = b.call_bare(consume);
    let body = b.block(vec![declare], Some(call));
    b.set_body(main, body);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    assert_eq!(eval.run(main), made("consume", vec![made("localA", Vec::new())]));
    assert_eq!(eval.calls("globalA"), 0);
}

#[test]
fn provider_defers_its_values_until_invoked() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let c = b.class(file, "C");
    let d = b.class(file, "D");
    let (c_ty, d_ty) = (b.ty(c), b.ty(d));
    let unit = b.unit_ty();
    let lazy_c = b.function_ty(Vec::new(), c_ty.clone()).unwrap();
    let provide_d = b.function(file, None, "provideD", d_ty.clone());
    b.given(provide_d);
    let provide_c = b.function(file, None, "provideC", c_ty);
    b.given(provide_c);
    b.param(provide_c, "d1", d_ty.clone());
    b.param(provide_c, "d2", d_ty);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "lazy", lazy_c);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let Value::Made { args, .. } = eval.run(main) else {
        panic!("expected consume to be called");
    };
    assert!(matches!(args[0], Value::Function(_)));
    assert_eq!(eval.calls("provideD"), 0);
    assert_eq!(eval.calls("provideC"), 0);

    let d_value = made("provideD", Vec::new());
    let c_value = made("provideC", vec![d_value.clone(), d_value]);
    assert_eq!(eval.invoke(&args[0], Vec::new()), c_value);
    assert_eq!(eval.calls("provideD"), 1);
    assert_eq!(eval.calls("provideC"), 1);
    assert_eq!(eval.invoke(&args[0], Vec::new()), c_value);
    assert_eq!(eval.calls("provideD"), 2);
    assert_eq!(eval.calls("provideC"), 2);
}

#[test]
fn provider_parameter_breaks_a_cycle() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let bb = b.class(file, "B");
    let (a_ty, b_ty) = (b.ty(a), b.ty(bb));
    let unit = b.unit_ty();
    let lazy_a = b.function_ty(Vec::new(), a_ty.clone()).unwrap();
    let provide_a = b.function(file, None, "provideA", a_ty.clone());
    b.given(provide_a);
    b.param(provide_a, "b", b_ty.clone());
    let provide_b = b.function(file, None, "provideB", b_ty);
    b.given(provide_b);
    b.param(provide_b, "a", lazy_a);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let Value::Made { args, .. } = eval.run(main) else {
        panic!("expected consume to be called");
    };
    let a_value = args[0].clone();
    let Value::Made { by, args: a_args } = &a_value else {
        panic!("expected provideA's value, found {a_value:?}");
    };
    assert_eq!(by, "provideA");
    let Value::Made { args: b_args, .. } = &a_args[0] else {
        panic!("expected provideB's value");
    };
    assert!(matches!(b_args[0], Value::Function(_)));

    // The provider handed to `provideB` yields the very value it helped build.
    assert_eq!(eval.invoke(&b_args[0], Vec::new()), a_value);
    assert_eq!(eval.calls("provideA"), 1);
}

#[test]
fn eager_cycle_is_reported() {
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
    b.param(provide_a, "b", b_ty.clone());
    let provide_b = b.function(file, None, "provideB", b_ty);
    b.given(provide_b);
    b.param(provide_b, "a", a_ty.clone());
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "a", a_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();

    let (session, codes) = compile_err(module, table, interner);
    assert_eq!(codes, vec![ErrorCode::E1003]);
    assert_eq!(
        dump::expr_to_string(session.module(), session.table(), session.interner(), call),
        "consume()"
    );
}

#[test]
fn list_elements_come_outermost_first() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let plugin = b.class(file, "Plugin");
    let plugin_ty = b.ty(plugin);
    let plugins_ty = b.list_of(plugin_ty.clone());
    let unit = b.unit_ty();
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "plugins", plugins_ty);
    let global_plugin = b.function(file, None, "globalPlugin", plugin_ty.clone());
    b.given(global_plugin);

    let main = b.function(file, None, "main", unit.clone());
    let main_plugin = b.local_function(main, "mainPlugin", plugin_ty.clone());
    b.given(main_plugin);
    let lambda = b.lambda(main, &[], unit);
    let lambda_plugin = b.local_function(lambda, "lambdaPlugin", plugin_ty);
    b.given(lambda_plugin);

    let call = b.call_bare(consume);
    let declare_lambda_plugin = b.local_decl(lambda_plugin);
    let lambda_body = b.block(vec![declare_lambda_plugin], Some(call));
    b.set_body(lambda, lambda_body);
    let declare_main_plugin = b.local_decl(main_plugin);
    let lambda_expr = b.lambda_expr(lambda);
    let main_body = b.block(vec![declare_main_plugin], Some(lambda_expr));
    b.set_body(main, main_body);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let function = eval.run(main);
    assert_eq!(
        eval.invoke(&function, Vec::new()),
        made(
            "consume",
            vec![list(vec![
                made("globalPlugin", Vec::new()),
                made("mainPlugin", Vec::new()),
                made("lambdaPlugin", Vec::new()),
            ])]
        )
    );
}
