use thiserror::Error;

/// An injection graph that does not fit the module it is written into.
///
/// Resolution only produces graphs synthesis can express, so any of these
/// is an internal error. Each carries the call site as it looked before the
/// rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("expected a call, found `{call}`")]
    NotACall { call: String },
    #[error("`{callee}` has no parameter declared at position {stable_index} while rewriting `{call}`")]
    MissingParameter {
        callee: String,
        stable_index: u32,
        call: String,
    },
    #[error("`{function}` has no threaded type key {index} while rewriting `{call}`")]
    MissingTypeKey {
        function: String,
        index: u32,
        call: String,
    },
    #[error("{what} is not bound while rewriting `{call}`")]
    Unbound { what: &'static str, call: String },
}
