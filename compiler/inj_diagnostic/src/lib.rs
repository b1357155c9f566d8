//! Diagnostic system for injection errors.
//!
//! Every diagnostic carries:
//! - an error code for searchability
//! - a message saying what could not be injected
//! - a primary label at the call site
//! - secondary labels at the candidate declarations involved
//! - notes walking the chain of requests that led to the failure
//!
//! # Error Guarantees
//!
//! `ErrorGuaranteed` is type-level proof that at least one error was emitted.
//! It can only be obtained from a [`DiagnosticQueue`], so a phase returning
//! `Err(ErrorGuaranteed)` cannot fail silently.

mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::DiagnosticQueue;
