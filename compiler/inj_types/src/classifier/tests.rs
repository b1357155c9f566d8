use super::*;
use pretty_assertions::assert_eq;

fn setup() -> (StringInterner, ClassifierTable) {
    let interner = StringInterner::new();
    let table = ClassifierTable::new(&interner);
    (interner, table)
}

#[test]
fn builtins_are_registered_by_name() {
    let (interner, table) = setup();
    let list = interner.intern("kotlin.collections.List");
    assert_eq!(table.lookup(list), Some(table.builtins().list));
    assert_eq!(table.get(table.builtins().list).type_parameters.len(), 1);
    assert_eq!(table.builtins().function_arity(table.builtins().function(2).unwrap_or(ClassifierId::INVALID)), Some(2));
    assert_eq!(table.builtins().function(9), None);
}

#[test]
fn function_types_have_contravariant_parameters() {
    let (_interner, table) = setup();
    let Some(f1) = table.builtins().function(1) else {
        panic!("Function1 missing");
    };
    let params = &table.get(f1).type_parameters;
    assert_eq!(table.get(params[0]).variance, Variance::In);
    assert_eq!(table.get(params[1]).variance, Variance::Out);
}

#[test]
fn declare_is_idempotent() {
    let (interner, mut table) = setup();
    let a = table.declare(&interner, "app.Foo", ClassifierKind::Class);
    let b = table.declare(&interner, "app.Foo", ClassifierKind::Class);
    assert_eq!(a, b);
    assert_eq!(interner.lookup(table.get(a).name), "Foo");
}

#[test]
fn list_super_type_is_collection_of_same_element() {
    let (interner, mut table) = setup();
    let foo = table.declare(&interner, "app.Foo", ClassifierKind::Class);
    let builtins = table.builtins().clone();
    let list_of_foo = TypeRef::new(builtins.list, vec![TypeRef::simple(foo)]);
    assert_eq!(
        table.super_types_of(&list_of_foo),
        vec![TypeRef::new(builtins.collection, vec![TypeRef::simple(foo)])]
    );
}

#[test]
fn alias_expands_and_keeps_abbreviation() {
    let (interner, mut table) = setup();
    let foo = table.declare(&interner, "app.Foo", ClassifierKind::Class);
    let alias = table.declare_generic(&interner, "app.Foos", ClassifierKind::TypeAlias, &[("T", Variance::Invariant)]);
    let param = table.get(alias).type_parameters[0];
    let list = table.builtins().list;
    table.set_alias_expansion(alias, TypeRef::new(list, vec![TypeRef::simple(param)]));

    let written = TypeRef::new(alias, vec![TypeRef::simple(foo)]).with_nullable(true);
    let expanded = table.expand(&written);
    assert_eq!(
        expanded,
        TypeRef::new(list, vec![TypeRef::simple(foo)]).with_nullable(true)
    );
    assert_eq!(expanded.abbreviation().map(|a| a.classifier), Some(alias));
}

#[test]
fn self_referencing_alias_stops_at_repeat() {
    let (interner, mut table) = setup();
    let alias = table.declare(&interner, "app.Loop", ClassifierKind::TypeAlias);
    let list = table.builtins().list;
    table.set_alias_expansion(alias, TypeRef::new(list, vec![TypeRef::simple(alias)]));

    let expanded = table.expand(&TypeRef::simple(alias));
    assert_eq!(expanded, TypeRef::new(list, vec![TypeRef::simple(alias)]));
}

#[test]
fn unbounded_parameter_is_bounded_by_nullable_any() {
    let (interner, mut table) = setup();
    let param = table.declare_type_parameter(&interner, "app.f", "T", Variance::Invariant);
    assert_eq!(table.upper_bound(param), table.any_type());
    assert!(table.is_type_parameter(param));
    assert_eq!(interner.lookup(table.get(param).name), "T");
}

#[test]
fn reified_type_parameters_are_told_apart() {
    let (interner, mut table) = setup();
    let plain = table.declare_type_parameter(&interner, "app.f", "T", Variance::Invariant);
    let reified = table.declare_type_parameter(&interner, "app.g", "R", Variance::Invariant);
    table.mark_reified(reified);
    assert!(table.is_unreified_type_parameter(plain));
    assert!(!table.is_unreified_type_parameter(reified));
    assert!(!table.is_unreified_type_parameter(table.builtins().int));
}
