//! Evaluation contexts of one call site.

use inj_hir::{DeclId, ExprId};

/// Statements evaluated before a result: the call site itself, or the body
/// of one provider lambda.
pub(crate) struct ScopeContext {
    /// Evaluation frame, numbered in the order lambdas are built.
    pub frame: u32,
    /// Declaration owning the locals bound here.
    pub owner: DeclId,
    pub statements: Vec<ExprId>,
}

impl ScopeContext {
    pub fn new(frame: u32, owner: DeclId) -> Self {
        ScopeContext {
            frame,
            owner,
            statements: Vec::new(),
        }
    }
}
