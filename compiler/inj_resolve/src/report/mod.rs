//! Failure diagnostics.
//!
//! A failure is reported at the call site with the code of its root cause.
//! Each enclosing request becomes a `required by` note, nearest first, so a
//! deeply nested failure shows the whole path that led to it.

use inj_diagnostic::{Diagnostic, ErrorCode};
use inj_hir::DeclId;
use inj_ir::SourcePosition;

use crate::injectable::{Injectable, InjectableKind, InjectableRequest, RequestSlot};
use crate::metadata::MetadataError;
use crate::result::Failure;
use crate::ResolveCtx;

/// Diagnostic for a call site whose request could not be satisfied.
pub fn resolution_failure(
    ctx: &ResolveCtx<'_>,
    position: SourcePosition,
    callee: DeclId,
    request: &InjectableRequest,
    failure: &Failure,
) -> Diagnostic {
    let renderer = ctx.renderer();
    let root = failure.root_cause();
    let (code, message) = match root {
        Failure::NoCandidates { ty } => (
            ErrorCode::E1001,
            format!("no injectable found for `{}`", renderer.render(ty)),
        ),
        Failure::Ambiguous { ty, .. } => (
            ErrorCode::E1002,
            format!("ambiguous injectables for `{}`", renderer.render(ty)),
        ),
        Failure::UnbrokenCircularDependency { chain } => {
            let ty = chain.first().map_or_else(String::new, |head| renderer.render(&head.ty));
            (
                ErrorCode::E1003,
                format!("circular dependency for `{ty}` with no provider to break it"),
            )
        }
        Failure::CallContextMismatch { actual, injectable } => (
            ErrorCode::E1006,
            format!(
                "`{}` cannot be called from a {actual} context",
                describe(ctx, injectable)
            ),
        ),
        Failure::ReifiedTypeArgumentMismatch {
            parameter,
            argument,
            injectable,
        } => (
            ErrorCode::E1007,
            format!(
                "type parameter `{}` of `{}` is reified but receives `{}`, which is not",
                ctx.interner.lookup(ctx.table.get(*parameter).name),
                describe(ctx, injectable),
                renderer.render(argument)
            ),
        ),
        Failure::DivergentInjectable { injectable } => (
            ErrorCode::E1004,
            format!("divergent injectable `{}`", describe(ctx, injectable)),
        ),
        Failure::DepthLimitExceeded { ty, limit } => (
            ErrorCode::E1005,
            format!(
                "injection of `{}` nested deeper than {limit} levels",
                renderer.render(ty)
            ),
        ),
        Failure::DependencyFailure { .. } => (ErrorCode::E1001, String::from("injection failed")),
    };

    let mut diagnostic = Diagnostic::error(code).with_message(message).with_label(
        position.file,
        position.span(),
        format!(
            "for parameter `{}` of `{}`",
            slot_name(ctx, request),
            ctx.qualified_name(callee)
        ),
    );

    for (injectable, dependency) in failure.request_chain().into_iter().rev() {
        diagnostic = diagnostic.with_note(format!(
            "required by {} for `{}`",
            describe(ctx, injectable),
            slot_name(ctx, dependency)
        ));
    }

    match root {
        Failure::NoCandidates { ty } => {
            diagnostic = diagnostic.with_suggestion(format!(
                "declare a given of type `{}` visible from this call",
                renderer.render(ty)
            ));
        }
        Failure::Ambiguous { candidates, .. } => {
            for candidate in candidates {
                diagnostic = with_decl_label(ctx, diagnostic, candidate, "candidate");
            }
            diagnostic = diagnostic
                .with_suggestion("give one candidate a higher priority or remove the others");
        }
        Failure::UnbrokenCircularDependency { chain } => {
            let path: Vec<String> = chain.iter().map(|injectable| describe(ctx, injectable)).collect();
            diagnostic = diagnostic.with_note(format!("cycle: {}", path.join(" -> ")));
            for injectable in chain {
                diagnostic = with_decl_label(ctx, diagnostic, injectable, "part of the cycle");
            }
            diagnostic = diagnostic.with_suggestion(
                "request a provider `() -> T` for one dependency on the cycle to defer its creation",
            );
        }
        Failure::CallContextMismatch { injectable, .. } => {
            let needed = injectable
                .callable_ref()
                .map_or_else(String::new, |callable| callable.call_context.to_string());
            diagnostic = with_decl_label(ctx, diagnostic, injectable, &format!("{needed} candidate"));
            diagnostic = diagnostic.with_suggestion(format!("make the call from a {needed} function"));
        }
        Failure::ReifiedTypeArgumentMismatch { parameter, injectable, .. } => {
            diagnostic = with_decl_label(ctx, diagnostic, injectable, "declared here");
            diagnostic = diagnostic.with_suggestion(format!(
                "mark the type argument passed for `{}` as reified",
                ctx.interner.lookup(ctx.table.get(*parameter).name)
            ));
        }
        Failure::DivergentInjectable { injectable } => {
            diagnostic = with_decl_label(ctx, diagnostic, injectable, "re-entered with a larger type");
        }
        Failure::DepthLimitExceeded { .. } => {
            diagnostic = diagnostic
                .with_suggestion("raise the limit with `--max-depth` or `INJ_MAX_DEPTH`");
        }
        Failure::DependencyFailure { .. } => {}
    }
    diagnostic
}

/// Diagnostic for persisted metadata that cannot be trusted.
pub fn metadata_error(ctx: &ResolveCtx<'_>, decl: DeclId, err: &MetadataError) -> Diagnostic {
    let d = ctx.module.decl(decl);
    Diagnostic::error(err.code())
        .with_message(err.to_string())
        .with_label(d.file, d.span, "referenced here")
        .with_note("the declaring module must be recompiled with a compatible injection plugin")
}

fn with_decl_label(
    ctx: &ResolveCtx<'_>,
    diagnostic: Diagnostic,
    injectable: &Injectable,
    message: &str,
) -> Diagnostic {
    match injectable.decl() {
        Some(decl) => {
            let d = ctx.module.decl(decl);
            diagnostic.with_secondary_label(
                d.file,
                d.span,
                format!("{message} `{}`", describe(ctx, injectable)),
            )
        }
        None => diagnostic,
    }
}

fn slot_name(ctx: &ResolveCtx<'_>, request: &InjectableRequest) -> String {
    let name = ctx.interner.lookup(request.name);
    match request.slot {
        RequestSlot::DispatchReceiver | RequestSlot::ExtensionReceiver => String::from("this"),
        _ => format!("{name}: {}", ctx.renderer().render(&request.ty)),
    }
}

/// Short human-readable form of an injectable, e.g. `app.provideB(a: app.A)`.
pub fn describe(ctx: &ResolveCtx<'_>, injectable: &Injectable) -> String {
    let renderer = ctx.renderer();
    match &injectable.kind {
        InjectableKind::Callable(callable) => {
            let params: Vec<String> = injectable
                .dependencies
                .iter()
                .filter(|request| matches!(request.slot, RequestSlot::Value(_)))
                .map(|request| slot_name(ctx, request))
                .collect();
            let name = ctx.qualified_name(callable.decl);
            if params.is_empty() {
                name
            } else {
                format!("{name}({})", params.join(", "))
            }
        }
        InjectableKind::ProviderParameter { index, .. } => {
            format!("provider parameter {index} of type {}", renderer.render(&injectable.ty))
        }
        InjectableKind::TypeKeyParameter { function, .. } => {
            format!("type key parameter of {}", ctx.qualified_name(*function))
        }
        InjectableKind::Provider { .. } => format!("provider {}", renderer.render(&injectable.ty)),
        InjectableKind::List { .. } => format!("list {}", renderer.render(&injectable.ty)),
        InjectableKind::TypeKey { key_type } => format!("type key of {}", renderer.render(key_type)),
        InjectableKind::SourceKey => String::from("source key"),
    }
}
