//! Read-only traversal of declarations and bodies.
//!
//! Default methods call the `walk_*` functions, which visit children in
//! evaluation order. Override a `visit_*` method to act on a node and call
//! the matching `walk_*` to keep descending.

use crate::{DeclId, DeclKind, ExprId, ExprKind, Module};

pub trait Visitor {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_decl(&mut self, module: &Module, decl: DeclId) {
        walk_decl(self, module, decl);
    }

    fn visit_expr(&mut self, module: &Module, expr: ExprId) {
        walk_expr(self, module, expr);
    }
}

pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) {
    for decl in module.top_level() {
        visitor.visit_decl(module, decl);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, decl: DeclId) {
    let d = module.decl(decl);
    if let DeclKind::Property { getter, setter } = d.kind {
        for accessor in getter.into_iter().chain(setter) {
            visitor.visit_decl(module, accessor);
        }
    }
    for member in &d.members {
        visitor.visit_decl(module, *member);
    }
    if let Some(body) = d.body {
        visitor.visit_expr(module, body);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, expr: ExprId) {
    inj_stack::ensure_sufficient_stack(|| match module.exprs.kind(expr) {
        ExprKind::Lambda(decl) | ExprKind::LocalDecl(decl) => visitor.visit_decl(module, *decl),
        kind => {
            for child in kind.children() {
                visitor.visit_expr(module, child);
            }
        }
    });
}

/// Every call expression in the module, in traversal order.
pub fn collect_calls(module: &Module) -> Vec<ExprId> {
    struct Calls(Vec<ExprId>);

    impl Visitor for Calls {
        fn visit_expr(&mut self, module: &Module, expr: ExprId) {
            if matches!(module.exprs.kind(expr), ExprKind::Call(_)) {
                self.0.push(expr);
            }
            walk_expr(self, module, expr);
        }
    }

    let mut calls = Calls(Vec::new());
    calls.visit_module(module);
    calls.0
}

#[cfg(test)]
mod tests;
