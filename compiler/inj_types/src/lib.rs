//! Type Reference Model.
//!
//! A structural, host-independent view of types used for matching requests
//! against candidates:
//!
//! - [`ClassifierTable`] owns every class, interface, object, type parameter,
//!   alias and tag known to the session, plus the built-in classifiers the
//!   injection engine gives meaning to (`List`, `Function0..3`, `TypeKey`, ...).
//! - [`TypeRef`] is an immutable value: classifier, arguments, nullability,
//!   tags and the alias it was written as.
//! - Subtyping, inference and specificity live in [`subtype`]; rendering and
//!   the type-key codec in [`render`] and [`type_key`].
//!
//! # Design
//!
//! Aliases are expanded when a `TypeRef` is built through
//! [`ClassifierTable::expand`], so equality on expanded types is plain
//! structural equality. The alias a type was written as survives in
//! [`TypeRef::abbreviation`] for diagnostics only; equality and hashing ignore it.

mod classifier;
pub mod render;
pub mod subtype;
mod type_key;
mod type_ref;

pub use classifier::{Builtins, ClassifierData, ClassifierId, ClassifierKind, ClassifierTable};
pub use render::{KeyFragment, TypeRenderer};
pub use type_key::{parse_type_key, TypeKeyError};
pub use type_ref::{Substitution, TypeRef, Variance};
