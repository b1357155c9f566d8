use inj_diagnostic::ErrorCode;
use inj_hir::{dump, ModuleBuilder};
use inj_ir::StringInterner;
use inj_types::ClassifierTable;
use pretty_assertions::assert_eq;

use crate::common::{compile, compile_err, made, Evaluator};

#[test]
fn provider_chain_becomes_nested_calls() {
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
    let module = b.finish();

    let session = compile(module, table, interner);
    assert_eq!(
        dump::expr_to_string(session.module(), session.table(), session.interner(), call),
        "consume(provideB(provideA()))"
    );

    let mut eval = Evaluator::new(&session);
    let result = eval.run(main);
    assert_eq!(
        result,
        made("consume", vec![made("provideB", vec![made("provideA", Vec::new())])])
    );
    assert_eq!(eval.calls("provideA"), 1);
    assert_eq!(eval.calls("provideB"), 1);
}

#[test]
fn outer_local_given_is_found_from_an_inner_lambda() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let bb = b.class(file, "B");
    let (a_ty, b_ty) = (b.ty(a), b.ty(bb));
    let unit = b.unit_ty();
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "b", b_ty.clone());

    let main = b.function(file, None, "main", unit.clone());
    let provide_a = b.local_function(main, "provideA", a_ty.clone());
    b.given(provide_a);
    let lambda = b.lambda(main, &[], unit);
    let provide_b = b.local_function(lambda, "provideB", b_ty);
    b.given(provide_b);
    b.param(provide_b, "a", a_ty);

    let call = b.call_bare(consume);
    let declare_b = b.local_decl(provide_b);
    let lambda_body = b.block(vec![declare_b], Some(call));
    b.set_body(lambda, lambda_body);
    let declare_a = b.local_decl(provide_a);
    let lambda_expr = b.lambda_expr(lambda);
    let main_body = b.block(vec![declare_a], Some(lambda_expr));
    b.set_body(main, main_body);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let function = eval.run(main);
    let result = eval.invoke(&function, Vec::new());
    assert_eq!(
        result,
        made("consume", vec![made("provideB", vec![made("provideA", Vec::new())])])
    );
}

#[test]
fn equally_specific_candidates_are_ambiguous() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let x = b.class(file, "X");
    let x_ty = b.ty(x);
    let unit = b.unit_ty();
    let provide_x = b.function(file, None, "provideX", x_ty.clone());
    b.given(provide_x);
    let provide_x2 = b.function(file, None, "provideX2", x_ty.clone());
    b.given(provide_x2);
    let consume = b.function(file, None, "consume", unit.clone());
    b.inject_param(consume, "x", x_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(consume);
    b.set_body(main, call);
    let module = b.finish();

    let (session, codes) = compile_err(module, table, interner);
    assert_eq!(codes, vec![ErrorCode::E1002]);
    let rendered = session.render_diagnostics();
    assert!(rendered.contains("candidate `app.provideX`"), "{rendered}");
    assert!(rendered.contains("candidate `app.provideX2`"), "{rendered}");
    assert_eq!(
        dump::expr_to_string(session.module(), session.table(), session.interner(), call),
        "consume()"
    );
}

#[test]
fn demo_graph_shares_values_and_collects_lists() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("demo", &interner, &mut table);
    let file = b.file("App.kt", "demo");
    let config = b.class(file, "Config");
    let database = b.class(file, "Database");
    let service = b.class(file, "Service");
    let plugin = b.class(file, "Plugin");
    let (config_ty, database_ty, service_ty, plugin_ty) =
        (b.ty(config), b.ty(database), b.ty(service), b.ty(plugin));
    let plugins_ty = b.list_of(plugin_ty.clone());
    let unit = b.unit_ty();

    let provide_config = b.function(file, None, "provideConfig", config_ty.clone());
    b.given(provide_config);
    let provide_database = b.function(file, None, "provideDatabase", database_ty.clone());
    b.given(provide_database);
    b.param(provide_database, "config", config_ty);
    let provide_service = b.function(file, None, "provideService", service_ty.clone());
    b.given(provide_service);
    b.param(provide_service, "database", database_ty.clone());
    let logging = b.function(file, None, "loggingPlugin", plugin_ty.clone());
    b.given(logging);
    let metrics = b.function(file, None, "metricsPlugin", plugin_ty);
    b.given(metrics);
    let run = b.function(file, None, "run", unit.clone());
    b.inject_param(run, "service", service_ty);
    b.inject_param(run, "database", database_ty);
    b.inject_param(run, "plugins", plugins_ty);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(run);
    b.set_body(main, call);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    let result = eval.run(main);

    let database_value = made("provideDatabase", vec![made("provideConfig", Vec::new())]);
    assert_eq!(
        result,
        made(
            "run",
            vec![
                made("provideService", vec![database_value.clone()]),
                database_value,
                crate::common::list(vec![
                    made("loggingPlugin", Vec::new()),
                    made("metricsPlugin", Vec::new()),
                ]),
            ]
        )
    );
    assert_eq!(eval.calls("provideDatabase"), 1);
    assert_eq!(eval.calls("provideConfig"), 1);
}
