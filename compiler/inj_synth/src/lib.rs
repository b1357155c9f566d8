//! Code synthesis.
//!
//! Turns the injection graph of a resolved call site into host expressions
//! and writes them into the call's empty slots. Synthesis runs after every
//! declaration that needs threaded type keys has been transformed, so it
//! only reads the map from original declarations to their copies.
//!
//! The shapes produced:
//!
//! | Injectable | Expression |
//! |------------|------------|
//! | function, constructor, getter | call with its own dependencies filled |
//! | parameter, receiver, variable | read |
//! | object | singleton access |
//! | provider | lambda whose body resolves in the provider's scope |
//! | list | `listOf(x)`, or a mutable list built with `add`/`addAll` |
//! | type key | string concatenation of literals and threaded keys |
//! | source key | `"file:owner:line:column"` literal |
//!
//! A call or constructor used more than once within one frame, the call
//! site or the body of one provider lambda, is bound to a local of that
//! frame the first time it is built and read afterwards. A value referenced back through a
//! provider is built into a nullable temporary that the provider reads.

mod context;
mod error;
mod sharing;
mod synthesizer;

pub use error::SynthesisError;
pub use synthesizer::Synthesizer;
