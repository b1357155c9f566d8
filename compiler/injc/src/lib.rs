//! Compile-time dependency injection over a host compiler's IR.
//!
//! A [`Session`] owns one module and drives it through every phase:
//!
//! 1. Persisted classifier facts of external classes are applied.
//! 2. `inj_resolve` analyzes every call that leaves injected parameters
//!    empty and records the resolved call sites by source position.
//! 3. [`transform`] gives callables with type-key parameters a copy that
//!    takes one trailing `TypeKey<T>` parameter per marked type parameter.
//! 4. [`driver`] hands each recorded call site to `inj_synth`, which fills
//!    the empty slots in place.
//! 5. [`metadata`] writes the facts later compilation units need.
//!
//! Failed call sites are reported and never rewritten.

pub mod config;
pub mod driver;
pub mod metadata;
pub mod session;
pub mod tracing_setup;
pub mod transform;

pub use config::{ConfigError, SessionConfig};
pub use driver::{Driver, DriverOutcome};
pub use session::{Session, SessionStats};
pub use tracing_setup::init_tracing;
pub use transform::{TransformError, Transformer};
