//! Resolution results.
//!
//! Failures are values: they carry the request and candidate at every level
//! so the root cause and the path to it survive up to the call site.

use std::rc::Rc;

use inj_types::{ClassifierId, TypeRef};
use smallvec::SmallVec;

use crate::callable::CallContext;
use crate::injectable::{Injectable, InjectableKey, InjectableRequest};
use crate::scope::ScopeId;

/// Memo and usage key: an injectable resolved in one scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub injectable: InjectableKey,
    pub scope: ScopeId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionResult {
    Success(Success),
    Failure(Failure),
}

impl ResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Success {
    /// A chosen injectable with all dependencies resolved.
    Value(Rc<ValueResult>),
    /// Reference back to an enclosing value still being resolved; legal only
    /// behind a provider.
    CircularDependency { key: ResultKey, ty: TypeRef },
    /// Nothing resolved and the host's default value applies.
    DefaultValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyResult {
    pub request: InjectableRequest,
    pub result: Success,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueResult {
    pub injectable: Injectable,
    pub key: ResultKey,
    /// Scope the candidate was found in.
    pub scope: ScopeId,
    /// One entry per dependency request, in request order.
    pub dependencies: Vec<DependencyResult>,
    /// Cycle breaks below this value that point above it.
    pub(crate) cycle_targets: SmallVec<[ResultKey; 2]>,
}

impl ValueResult {
    /// Whether the subtree refers back to a value that encloses this one.
    pub fn is_in_between_circular_dependency(&self) -> bool {
        !self.cycle_targets.is_empty()
    }

    pub fn cycle_targets(&self) -> &[ResultKey] {
        &self.cycle_targets
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    NoCandidates {
        ty: TypeRef,
    },
    /// Equally ranked candidates, in declaration order.
    Ambiguous {
        ty: TypeRef,
        candidates: Vec<Injectable>,
    },
    DependencyFailure {
        injectable: Box<Injectable>,
        request: Box<InjectableRequest>,
        cause: Box<Failure>,
    },
    /// Eager cycle; `chain` runs from the repeated injectable back to it.
    UnbrokenCircularDependency {
        chain: Vec<Injectable>,
    },
    /// A candidate that cannot be called from the context requesting it.
    CallContextMismatch {
        actual: CallContext,
        injectable: Box<Injectable>,
    },
    /// A reified type parameter of the candidate would receive a type
    /// parameter that is not reified.
    ReifiedTypeArgumentMismatch {
        parameter: ClassifierId,
        argument: TypeRef,
        injectable: Box<Injectable>,
    },
    /// A generic candidate re-entered itself with a larger type.
    DivergentInjectable {
        injectable: Box<Injectable>,
    },
    DepthLimitExceeded {
        ty: TypeRef,
        limit: usize,
    },
}

impl Failure {
    /// Rank among failures of one depth; lower is more informative.
    pub fn ordering(&self) -> u8 {
        match self {
            Failure::Ambiguous { .. } => 0,
            Failure::DependencyFailure { .. }
            | Failure::CallContextMismatch { .. }
            | Failure::ReifiedTypeArgumentMismatch { .. }
            | Failure::UnbrokenCircularDependency { .. }
            | Failure::DivergentInjectable { .. }
            | Failure::DepthLimitExceeded { .. } => 1,
            Failure::NoCandidates { .. } => 2,
        }
    }

    /// The failure at the end of the dependency chain.
    pub fn root_cause(&self) -> &Failure {
        let mut current = self;
        while let Failure::DependencyFailure { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// Depends on which values were in progress, so must not be memoized.
    pub fn is_chain_dependent(&self) -> bool {
        matches!(
            self.root_cause(),
            Failure::UnbrokenCircularDependency { .. }
                | Failure::DivergentInjectable { .. }
                | Failure::DepthLimitExceeded { .. }
        )
    }

    /// `(injectable, request)` pairs from the outermost failing candidate
    /// down to the root cause.
    pub fn request_chain(&self) -> Vec<(&Injectable, &InjectableRequest)> {
        let mut chain = Vec::new();
        let mut current = self;
        while let Failure::DependencyFailure {
            injectable,
            request,
            cause,
        } = current
        {
            chain.push((injectable.as_ref(), request.as_ref()));
            current = cause;
        }
        chain
    }
}
