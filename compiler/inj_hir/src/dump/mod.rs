//! Deterministic source-like rendering of expressions.
//!
//! Used by diagnostics for internal errors and by tests to compare rewritten
//! call sites against expected shapes such as `provideB(provideA())`.

use std::fmt::Write;

use inj_ir::StringInterner;
use inj_types::ClassifierTable;

use crate::{DeclId, DeclKind, ExprId, ExprKind, Intrinsic, Module};

pub struct Printer<'a> {
    module: &'a Module,
    table: &'a ClassifierTable,
    interner: &'a StringInterner,
}

impl<'a> Printer<'a> {
    pub fn new(module: &'a Module, table: &'a ClassifierTable, interner: &'a StringInterner) -> Self {
        Printer {
            module,
            table,
            interner,
        }
    }

    pub fn expr(&self, expr: ExprId) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }

    fn name(&self, decl: DeclId) -> &'static str {
        let d = self.module.decl(decl);
        match d.kind {
            DeclKind::DispatchReceiver | DeclKind::ExtensionReceiver => "this",
            DeclKind::Constructor { class } => self.interner.lookup(self.module.decl(class).name),
            _ => self.interner.lookup(d.name),
        }
    }

    fn write_list(&self, out: &mut String, exprs: &[ExprId]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_expr(out, *expr);
        }
    }

    fn write_expr(&self, out: &mut String, expr: ExprId) {
        inj_stack::ensure_sufficient_stack(|| self.write_expr_inner(out, expr));
    }

    fn write_expr_inner(&self, out: &mut String, expr: ExprId) {
        match self.module.exprs.kind(expr) {
            ExprKind::Call(call) => {
                if let Some(receiver) = call.dispatch_receiver.or(call.extension_receiver) {
                    self.write_expr(out, receiver);
                    out.push('.');
                }
                out.push_str(self.name(call.callee));
                let arguments: Vec<ExprId> = call.arguments.iter().flatten().copied().collect();
                out.push('(');
                self.write_list(out, &arguments);
                out.push(')');
            }
            ExprKind::Get(decl) => out.push_str(self.name(*decl)),
            ExprKind::GetObject(classifier) => {
                out.push_str(self.interner.lookup(self.table.get(*classifier).name));
            }
            ExprKind::Lambda(decl) => {
                let lambda = self.module.decl(*decl);
                out.push_str("{ ");
                if !lambda.value_parameters.is_empty() {
                    for (i, param) in lambda.value_parameters.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(self.name(*param));
                    }
                    out.push_str(" -> ");
                }
                if let Some(body) = lambda.body {
                    self.write_expr(out, body);
                }
                out.push_str(" }");
            }
            ExprKind::Invoke {
                function,
                arguments,
            } => {
                self.write_expr(out, *function);
                out.push('(');
                self.write_list(out, arguments);
                out.push(')');
            }
            ExprKind::Block { statements, result } => {
                out.push_str("{ ");
                for statement in statements {
                    self.write_expr(out, *statement);
                    out.push_str("; ");
                }
                if let Some(result) = result {
                    self.write_expr(out, *result);
                    out.push(' ');
                }
                out.push('}');
            }
            ExprKind::LocalDecl(decl) => {
                let _ = write!(out, "fun {}()", self.name(*decl));
                if let Some(body) = self.module.decl(*decl).body {
                    out.push_str(" = ");
                    self.write_expr(out, body);
                }
            }
            ExprKind::Variable { decl, initializer } => {
                let keyword = match self.module.decl(*decl).kind {
                    DeclKind::Variable { mutable: true } => "var",
                    _ => "val",
                };
                let _ = write!(out, "{keyword} {}", self.name(*decl));
                if let Some(initializer) = initializer {
                    out.push_str(" = ");
                    self.write_expr(out, *initializer);
                }
            }
            ExprKind::Assign { variable, value } => {
                let _ = write!(out, "{} = ", self.name(*variable));
                self.write_expr(out, *value);
            }
            ExprKind::NonNull(value) => {
                self.write_expr(out, *value);
                out.push_str("!!");
            }
            ExprKind::Null => out.push_str("null"),
            ExprKind::Int(value) => {
                let _ = write!(out, "{value}");
            }
            ExprKind::Str(value) => {
                let _ = write!(out, "{value:?}");
            }
            ExprKind::Concat(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" + ");
                    }
                    self.write_expr(out, *part);
                }
            }
            ExprKind::Intrinsic { op, arguments } => match (op, arguments.split_first()) {
                (Intrinsic::ListAdd | Intrinsic::ListAddAll | Intrinsic::ToList, Some((receiver, rest))) => {
                    self.write_expr(out, *receiver);
                    let _ = write!(out, ".{}(", op.name());
                    self.write_list(out, rest);
                    out.push(')');
                }
                _ => {
                    let _ = write!(out, "{}(", op.name());
                    self.write_list(out, arguments);
                    out.push(')');
                }
            },
            ExprKind::Return(value) => {
                out.push_str("return ");
                self.write_expr(out, *value);
            }
            ExprKind::Unit => out.push_str("Unit"),
        }
    }
}

/// Render one expression.
pub fn expr_to_string(
    module: &Module,
    table: &ClassifierTable,
    interner: &StringInterner,
    expr: ExprId,
) -> String {
    Printer::new(module, table, interner).expr(expr)
}
