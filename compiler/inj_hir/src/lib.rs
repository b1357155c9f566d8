//! Host compiler model.
//!
//! The injection engine rewrites a compiler's lowered IR. This crate is the
//! shape of that IR as the engine sees it: an arena of typed declarations and
//! an arena of expressions, grouped into files of one module.
//!
//! # Design
//!
//! - **Flat arenas**: declarations and expressions are addressed by `DeclId`
//!   and `ExprId`; children are ids, never boxes.
//! - **In-place rewriting**: a rewrite replaces the kind of an existing
//!   `ExprId`, so every parent keeps pointing at the right node.
//! - **Stable parameter identity**: a value parameter remembers the position it
//!   was declared at; later passes may append parameters without disturbing
//!   the positions earlier analyses recorded.

mod builder;
mod decl;
pub mod dump;
mod expr;
mod ids;
mod module;
pub mod visitor;

pub use builder::ModuleBuilder;
pub use decl::{Annotation, Decl, DeclArena, DeclFlags, DeclKind};
pub use expr::{Call, Expr, ExprArena, ExprKind, Intrinsic};
pub use ids::{DeclId, ExprId};
pub use module::{Module, SourceFile};
