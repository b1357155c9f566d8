use super::*;
use inj_hir::ModuleBuilder;
use inj_ir::StringInterner;
use pretty_assertions::assert_eq;

#[test]
fn decode_restores_every_fact() {
    let info = CallableInfo {
        given: true,
        injected_parameters: vec![0, 2],
        defaulted_parameters: vec![2],
        type_key_parameters: vec![1],
        source_key_parameter: Some(2),
        priority: -3,
        call_context: CallContext::Suspend,
        ..CallableInfo::default()
    };
    let text = encode_callable(&info);
    assert_eq!(decode_callable(&text, "app.provide"), Ok(info));
}

#[test]
fn corrupt_blob_is_an_error() {
    let err = decode_callable("{\"version\": 1, \"given\": ", "app.provide").unwrap_err();
    assert_eq!(err.code(), ErrorCode::E2001);
    assert!(err.to_string().contains("app.provide"));
}

#[test]
fn blob_without_call_context_runs_anywhere() {
    let text = "{\"version\": 1, \"given\": true, \"injected_parameters\": [], \
                \"defaulted_parameters\": [], \"type_key_parameters\": [], \
                \"source_key_parameter\": null, \"priority\": 0}";
    let info = decode_callable(text, "app.provide").unwrap();
    assert_eq!(info.call_context, CallContext::Default);
    assert!(info.given);
}

#[test]
fn missing_field_is_corrupt() {
    let err = decode_callable("{\"version\": 1}", "app.provide").unwrap_err();
    assert!(matches!(err, MetadataError::Corrupt { .. }));
}

#[test]
fn other_version_is_rejected_before_payload() {
    let err = decode_callable("{\"version\": 7, \"shape\": \"unknown\"}", "app.provide").unwrap_err();
    assert_eq!(
        err,
        MetadataError::UnsupportedVersion {
            declaration: "app.provide".to_owned(),
            found: 7,
            expected: FORMAT_VERSION,
        }
    );
    assert_eq!(err.code(), ErrorCode::E2002);
}

#[test]
fn classifier_info_round_trips() {
    let info = ClassifierInfo::new(true, vec![0]);
    assert_eq!(decode_classifier(&encode_classifier(&info), "app.Tag"), Ok(info));
}

#[test]
fn facts_of_a_given_function() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let a = b.class(file, "A");
    let a_ty = b.ty(a);
    let source_key = b.ty(b.table().builtins().source_key);
    let f = b.function(file, None, "provide", a_ty.clone());
    b.given(f);
    b.priority(f, 2);
    b.param(f, "a", a_ty);
    let key = b.param(f, "key", source_key);
    b.flag(key, DeclFlags::HAS_DEFAULT);
    let t = b.type_parameter(f, "T", None);
    b.table_mut().mark_for_type_key(t);
    let module = b.finish();

    let info = CallableInfo::from_decl(&module, &table, f);
    assert_eq!(
        info,
        CallableInfo {
            given: true,
            injected_parameters: vec![0, 1],
            defaulted_parameters: vec![1],
            type_key_parameters: vec![0],
            source_key_parameter: Some(1),
            priority: 2,
            ..CallableInfo::default()
        }
    );
}

#[test]
fn plain_function_injects_only_marked_parameters() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let unit = b.unit_ty();
    let f = b.function(file, None, "run", unit.clone());
    b.param(f, "plain", unit.clone());
    b.inject_param(f, "injected", unit);
    let module = b.finish();

    let info = CallableInfo::from_decl(&module, &table, f);
    assert!(!info.given);
    assert_eq!(info.injected_parameters, vec![1]);
}

#[test]
fn call_context_comes_from_the_declaration_or_its_property() {
    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let mut b = ModuleBuilder::new("app", &interner, &mut table);
    let file = b.file("Main.kt", "app");
    let unit = b.unit_ty();
    let load = b.function(file, None, "load", unit.clone());
    b.flag(load, DeclFlags::SUSPEND);
    let render = b.function(file, None, "render", unit);
    b.flag(render, DeclFlags::COMPOSABLE);
    let module = b.finish();

    assert_eq!(CallableInfo::from_decl(&module, &table, load).call_context, CallContext::Suspend);
    assert_eq!(CallableInfo::from_decl(&module, &table, render).call_context, CallContext::Composable);
}
