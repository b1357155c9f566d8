//! Injectable resolution.
//!
//! Answers, for every call with unfilled injected parameters, which values
//! fill them. The pipeline:
//!
//! 1. [`analysis`] walks the module and builds the lexical scope chain
//!    ([`scope`]) at every call site.
//! 2. [`resolver`] resolves each request against that chain and returns an
//!    [`InjectionGraph`] or a [`Failure`].
//! 3. [`report`] turns failures into diagnostics.
//!
//! Synthesis later reads the resulting side table of call sites; nothing in
//! this crate mutates the module.
//!
//! # Design
//!
//! Results are trees of `Rc<ValueResult>`: a value reached along several
//! paths is one shared node, which is what lets synthesis count usages and
//! evaluate shared values once.

pub mod analysis;
pub mod callable;
mod context;
pub mod graph;
pub mod injectable;
pub mod metadata;
pub mod report;
pub mod resolver;
pub mod result;
pub mod scope;

pub use analysis::{analyze, Analysis, AnalysisConfig, CallSite};
pub use callable::{CallContext, CallableRef, ParameterKind, ParameterRef, ValueSource};
pub use context::ResolveCtx;
pub use graph::InjectionGraph;
pub use injectable::{
    Injectable, InjectableKey, InjectableKind, InjectableRequest, ListElement, RequestSlot,
};
pub use metadata::{CallableInfo, ClassifierInfo, MetadataError};
pub use resolver::{RequestFailure, Resolver, DEFAULT_MAX_DEPTH};
pub use result::{DependencyResult, Failure, ResolutionResult, ResultKey, Success, ValueResult};
pub use scope::{Candidate, InjectablesScope, ScopeArena, ScopeFactory, ScopeId, ScopeKind};
