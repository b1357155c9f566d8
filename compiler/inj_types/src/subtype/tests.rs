use super::*;
use inj_ir::StringInterner;
use pretty_assertions::assert_eq;

struct Fixture {
    interner: StringInterner,
    table: ClassifierTable,
    animal: ClassifierId,
    dog: ClassifierId,
    cat: ClassifierId,
    qualified: ClassifierId,
    boxed: ClassifierId,
    invariant: ClassifierId,
}

impl Fixture {
    fn new() -> Self {
        let interner = StringInterner::new();
        let mut table = ClassifierTable::new(&interner);
        let animal = table.declare(&interner, "app.Animal", ClassifierKind::Interface);
        let dog = table.declare(&interner, "app.Dog", ClassifierKind::Class);
        let cat = table.declare(&interner, "app.Cat", ClassifierKind::Class);
        table.set_super_types(dog, vec![TypeRef::simple(animal)]);
        table.set_super_types(cat, vec![TypeRef::simple(animal)]);
        let qualified = table.declare(&interner, "app.Qualified", ClassifierKind::Tag);
        let boxed = table.declare_generic(&interner, "app.Box", ClassifierKind::Class, &[("T", Variance::Out)]);
        let invariant =
            table.declare_generic(&interner, "app.Inv", ClassifierKind::Class, &[("T", Variance::Invariant)]);
        Fixture {
            interner,
            table,
            animal,
            dog,
            cat,
            qualified,
            boxed,
            invariant,
        }
    }

    fn t(&self, classifier: ClassifierId) -> TypeRef {
        TypeRef::simple(classifier)
    }

    fn of(&self, classifier: ClassifierId, arg: ClassifierId) -> TypeRef {
        TypeRef::new(classifier, vec![TypeRef::simple(arg)])
    }
}

#[test]
fn class_is_subtype_of_its_super_type() {
    let f = Fixture::new();
    assert!(f.table.is_subtype_of(&f.t(f.dog), &f.t(f.animal)));
    assert!(!f.table.is_subtype_of(&f.t(f.animal), &f.t(f.dog)));
    assert!(!f.table.is_subtype_of(&f.t(f.dog), &f.t(f.cat)));
}

#[test]
fn nullable_is_not_subtype_of_non_null() {
    let f = Fixture::new();
    let nullable_dog = f.t(f.dog).with_nullable(true);
    assert!(!f.table.is_subtype_of(&nullable_dog, &f.t(f.animal)));
    assert!(f.table.is_subtype_of(&f.t(f.dog), &f.t(f.animal).with_nullable(true)));
}

#[test]
fn tags_are_part_of_identity() {
    let f = Fixture::new();
    let tagged = f.t(f.dog).with_tags([f.t(f.qualified)]);
    assert!(!f.table.is_subtype_of(&tagged, &f.t(f.dog)));
    assert!(!f.table.is_subtype_of(&f.t(f.dog), &tagged));
    assert!(f.table.is_subtype_of(&tagged, &f.t(f.animal).with_tags([f.t(f.qualified)])));
}

#[test]
fn everything_conforms_to_nullable_any() {
    let f = Fixture::new();
    let tagged = f.t(f.dog).with_tags([f.t(f.qualified)]);
    assert!(f.table.is_subtype_of(&tagged, &f.table.any_type()));
}

#[test]
fn covariant_arguments_follow_subtyping() {
    let f = Fixture::new();
    assert!(f.table.is_subtype_of(&f.of(f.boxed, f.dog), &f.of(f.boxed, f.animal)));
    assert!(!f.table.is_subtype_of(&f.of(f.boxed, f.animal), &f.of(f.boxed, f.dog)));
}

#[test]
fn invariant_arguments_require_equality() {
    let f = Fixture::new();
    assert!(!f.table.is_subtype_of(&f.of(f.invariant, f.dog), &f.of(f.invariant, f.animal)));
    assert!(f.table.is_subtype_of(&f.of(f.invariant, f.dog), &f.of(f.invariant, f.dog)));
}

#[test]
fn use_site_projection_overrides_declaration_variance() {
    let f = Fixture::new();
    let out_animal = TypeRef::new(
        f.invariant,
        vec![f.t(f.animal).with_projection(Variance::Out)],
    );
    assert!(f.table.is_subtype_of(&f.of(f.invariant, f.dog), &out_animal));
}

#[test]
fn star_projection_accepts_any_argument() {
    let f = Fixture::new();
    let any = f.table.builtins().any;
    let star_box = TypeRef::new(f.invariant, vec![TypeRef::star_projection(any)]);
    assert!(f.table.is_subtype_of(&f.of(f.invariant, f.cat), &star_box));
}

#[test]
fn list_is_subtype_of_collection() {
    let f = Fixture::new();
    let builtins = f.table.builtins().clone();
    assert!(f.table.is_subtype_of(&f.of(builtins.list, f.dog), &f.of(builtins.collection, f.animal)));
}

#[test]
fn recursive_bounds_terminate() {
    // T : Comparable<T>, asking whether T <: Comparable<Dog>
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let comparable =
        table.declare_generic(&interner, "app.Comparable", ClassifierKind::Interface, &[("T", Variance::In)]);
    let dog = table.declare(&interner, "app.Dog", ClassifierKind::Class);
    let param = table.declare_type_parameter(&interner, "app.f", "T", Variance::Invariant);
    table.set_super_types(param, vec![TypeRef::new(comparable, vec![TypeRef::simple(param)])]);

    let requested = TypeRef::new(comparable, vec![TypeRef::simple(dog)]);
    assert!(!table.is_subtype_of(&TypeRef::simple(param), &requested));
    assert!(table.is_subtype_of(
        &TypeRef::simple(param),
        &TypeRef::new(comparable, vec![TypeRef::simple(param)])
    ));
}

#[test]
fn infers_parameter_from_requested_type() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let dog = table.declare(&interner, "app.Dog", ClassifierKind::Class);
    let boxed = table.declare_generic(&interner, "app.Box", ClassifierKind::Class, &[("T", Variance::Out)]);
    let param = table.declare_type_parameter(&interner, "app.provideBox", "T", Variance::Invariant);

    let candidate = TypeRef::new(boxed, vec![TypeRef::simple(param)]);
    let requested = TypeRef::new(boxed, vec![TypeRef::simple(dog)]);
    let subst = table.infer_substitution(&candidate, &[param], &requested);
    assert_eq!(subst.and_then(|s| s.get(&param).cloned()), Some(TypeRef::simple(dog)));
}

#[test]
fn inference_walks_super_types() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let dog = table.declare(&interner, "app.Dog", ClassifierKind::Class);
    let param = table.declare_type_parameter(&interner, "app.provideList", "T", Variance::Invariant);
    let builtins = table.builtins().clone();

    let candidate = TypeRef::new(builtins.list, vec![TypeRef::simple(param)]);
    let requested = TypeRef::new(builtins.collection, vec![TypeRef::simple(dog)]);
    let subst = table.infer_substitution(&candidate, &[param], &requested);
    assert_eq!(subst.and_then(|s| s.get(&param).cloned()), Some(TypeRef::simple(dog)));
}

#[test]
fn inference_respects_bounds() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let animal = table.declare(&interner, "app.Animal", ClassifierKind::Interface);
    let rock = table.declare(&interner, "app.Rock", ClassifierKind::Class);
    let boxed = table.declare_generic(&interner, "app.Box", ClassifierKind::Class, &[("T", Variance::Out)]);
    let param = table.declare_type_parameter(&interner, "app.provideBox", "T", Variance::Invariant);
    table.set_super_types(param, vec![TypeRef::simple(animal)]);

    let candidate = TypeRef::new(boxed, vec![TypeRef::simple(param)]);
    let requested = TypeRef::new(boxed, vec![TypeRef::simple(rock)]);
    assert!(table.infer_substitution(&candidate, &[param], &requested).is_none());
}

#[test]
fn inconsistent_bindings_fail() {
    let mut f = Fixture::new();
    let pair = f.table.declare_generic(
        &f.interner,
        "app.Pair",
        ClassifierKind::Class,
        &[("A", Variance::Invariant), ("B", Variance::Invariant)],
    );
    let param = f.table.declare_type_parameter(&f.interner, "app.same", "T", Variance::Invariant);
    let candidate = TypeRef::new(pair, vec![TypeRef::simple(param), TypeRef::simple(param)]);
    let requested = TypeRef::new(pair, vec![f.t(f.dog), f.t(f.cat)]);
    assert!(f.table.infer_substitution(&candidate, &[param], &requested).is_none());
}

#[test]
fn subtype_is_more_specific() {
    let f = Fixture::new();
    assert_eq!(f.table.compare_specificity(&f.t(f.dog), &f.t(f.animal)), Ordering::Less);
    assert_eq!(f.table.compare_specificity(&f.t(f.animal), &f.t(f.dog)), Ordering::Greater);
}

#[test]
fn unrelated_types_tie() {
    let f = Fixture::new();
    assert_eq!(f.table.compare_specificity(&f.t(f.dog), &f.t(f.cat)), Ordering::Equal);
    assert_eq!(f.table.compare_specificity(&f.t(f.dog), &f.t(f.dog)), Ordering::Equal);
}

#[test]
fn concrete_beats_type_parameter() {
    let mut f = Fixture::new();
    let param = f.table.declare_type_parameter(&f.interner, "app.any", "T", Variance::Invariant);
    assert_eq!(
        f.table.compare_specificity(&f.of(f.boxed, f.dog), &TypeRef::new(f.boxed, vec![TypeRef::simple(param)])),
        Ordering::Less
    );
}

#[test]
fn variance_only_difference_is_a_tie() {
    // Two type parameters that differ only in declaration-site variance.
    let mut f = Fixture::new();
    let out_param = f.table.declare_type_parameter(&f.interner, "app.a", "T", Variance::Out);
    let in_param = f.table.declare_type_parameter(&f.interner, "app.b", "T", Variance::In);
    assert_eq!(
        f.table.compare_specificity(&TypeRef::simple(out_param), &TypeRef::simple(in_param)),
        Ordering::Equal
    );
}
