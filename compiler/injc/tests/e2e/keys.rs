use inj_hir::{Call, ModuleBuilder};
use inj_ir::StringInterner;
use inj_types::{ClassifierTable, TypeRef};
use pretty_assertions::assert_eq;

use crate::common::{compile, made, Evaluator, Value};

#[test]
fn type_keys_reach_the_innermost_callee() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let foo = b.class(file, "Foo");
    let foo_ty = b.ty(foo);
    let unit = b.unit_ty();

    let inner = b.function(file, None, "inner", unit.clone());
    let u = b.type_parameter(inner, "U", None);
    b.table_mut().mark_for_type_key(u);

    let keyed = b.function(file, None, "keyed", unit.clone());
    let t = b.type_parameter(keyed, "T", None);
    b.table_mut().mark_for_type_key(t);
    let mut nested = Call::new(inner, Vec::new());
    nested.type_arguments = vec![TypeRef::simple(t)];
    let nested = b.call_with(nested);
    b.set_body(keyed, nested);

    let listed = b.function(file, None, "listed", unit.clone());
    let v = b.type_parameter(listed, "V", None);
    b.table_mut().mark_for_type_key(v);
    let mut through_list = Call::new(keyed, Vec::new());
    through_list.type_arguments = vec![b.list_of(TypeRef::simple(v))];
    let through_list = b.call_with(through_list);
    b.set_body(listed, through_list);

    let direct_main = b.function(file, None, "directMain", unit.clone());
    let mut direct = Call::new(keyed, Vec::new());
    direct.type_arguments = vec![foo_ty.clone()];
    let direct = b.call_with(direct);
    b.set_body(direct_main, direct);

    let listed_main = b.function(file, None, "listedMain", unit);
    let mut via_list = Call::new(listed, Vec::new());
    via_list.type_arguments = vec![foo_ty];
    let via_list = b.call_with(via_list);
    b.set_body(listed_main, via_list);
    let module = b.finish();

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    assert_eq!(
        eval.run(direct_main),
        made("inner", vec![Value::Str("app.Foo".to_owned())])
    );
    assert_eq!(
        eval.run(listed_main),
        made("inner", vec![Value::Str("kotlin.collections.List<app.Foo>".to_owned())])
    );
    assert_eq!(eval.calls("inner"), 2);
}

#[test]
fn source_key_names_file_function_and_position() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let source_key = TypeRef::simple(b.table().builtins().source_key);
    let unit = b.unit_ty();
    let trace = b.function(file, None, "trace", unit.clone());
    b.inject_param(trace, "key", source_key);
    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(trace);
    b.set_body(main, call);
    let module = b.finish();
    let column = module.exprs.span(call).start + 1;

    let session = compile(module, table, interner);
    let mut eval = Evaluator::new(&session);
    assert_eq!(
        eval.run(main),
        made("trace", vec![Value::Str(format!("Main.kt:app.main:1:{column}"))])
    );
}
