//! Persisted facts at the module boundary.
//!
//! Classifier facts of external classes are applied to the classifier table
//! before analysis, since the table is what resolution consults. Callable
//! facts of external declarations are read lazily by the resolver. After
//! rewriting, facts of this module's non-local declarations are written back
//! for later compilation units.

use inj_diagnostic::Diagnostic;
use inj_hir::{DeclId, DeclKind, Module};
use inj_ir::StringInterner;
use inj_resolve::metadata::{self, METADATA_ANNOTATION};
use inj_resolve::{CallableInfo, ClassifierInfo, MetadataError};
use inj_types::{ClassifierKind, ClassifierTable};
use rustc_hash::FxHashMap;

/// Apply the persisted facts of external classes to `table`.
///
/// Returns one diagnostic per unreadable blob.
#[tracing::instrument(level = "debug", skip_all, fields(external = module.external.len()))]
pub fn import_classifier_facts(
    module: &Module,
    table: &mut ClassifierTable,
    interner: &StringInterner,
) -> Vec<Diagnostic> {
    let annotation = interner.intern(METADATA_ANNOTATION);
    let mut diagnostics = Vec::new();
    for decl in &module.external {
        let d = module.decl(*decl);
        let DeclKind::Class { classifier } = d.kind else {
            continue;
        };
        let Some(blob) = d.annotation(annotation) else {
            continue;
        };
        let name = module.qualified_name(*decl, interner);
        let info = match metadata::decode_classifier(blob, &name) {
            Ok(info) => info,
            Err(err) => {
                diagnostics.push(unreadable(module, *decl, &err));
                continue;
            }
        };

        let type_parameters = table.get(classifier).type_parameters.clone();
        for index in &info.type_key_parameters {
            match type_parameters.get(*index as usize) {
                Some(param) => table.mark_for_type_key(*param),
                None => {
                    let err = MetadataError::Corrupt {
                        declaration: name.clone(),
                        message: format!("type parameter {index} does not exist"),
                    };
                    diagnostics.push(unreadable(module, *decl, &err));
                }
            }
        }
        if info.tag {
            table.set_kind(classifier, ClassifierKind::Tag);
        }
        tracing::trace!(class = %name, ?info, "imported classifier facts");
    }
    diagnostics
}

fn unreadable(module: &Module, decl: DeclId, err: &MetadataError) -> Diagnostic {
    let d = module.decl(decl);
    Diagnostic::error(err.code())
        .with_message(err.to_string())
        .with_label(d.file, d.span, "declared here")
        .with_note("the declaring module must be recompiled with a compatible injection plugin")
}

/// Write facts onto every local declaration visible outside its body.
///
/// Originals replaced by a transformed copy are skipped; the copy carries
/// the facts. Returns the number of annotated declarations.
#[tracing::instrument(level = "debug", skip_all)]
pub fn write_facts(
    module: &mut Module,
    table: &ClassifierTable,
    interner: &StringInterner,
    transformed: &FxHashMap<DeclId, DeclId>,
) -> usize {
    let annotation = interner.intern(METADATA_ANNOTATION);
    let blobs: Vec<(DeclId, String)> = module
        .decls
        .ids()
        .filter(|decl| !transformed.contains_key(decl))
        .filter_map(|decl| facts_blob(module, table, decl).map(|blob| (decl, blob)))
        .collect();
    let written = blobs.len();
    for (decl, blob) in blobs {
        module.decls.get_mut(decl).set_annotation(annotation, blob);
    }
    tracing::debug!(written, "wrote declaration facts");
    written
}

fn facts_blob(module: &Module, table: &ClassifierTable, decl: DeclId) -> Option<String> {
    let d = module.decl(decl);
    if d.is_external() || module.enclosing_callable(decl).is_some() {
        return None;
    }
    match d.kind {
        DeclKind::Class { classifier } => {
            let data = table.get(classifier);
            let type_key_parameters = data
                .type_parameters
                .iter()
                .enumerate()
                .filter(|(_, param)| table.get(**param).for_type_key)
                .map(|(index, _)| inj_ir::to_u32(index, "type parameter"))
                .collect();
            let info = ClassifierInfo::new(data.kind == ClassifierKind::Tag, type_key_parameters);
            Some(metadata::encode_classifier(&info))
        }
        DeclKind::Function | DeclKind::Constructor { .. } | DeclKind::Getter { .. } => {
            let info = CallableInfo::from_decl(module, table, decl);
            Some(metadata::encode_callable(&info))
        }
        _ => None,
    }
}
