//! String interner.
//!
//! Interned strings are leaked for the lifetime of the process; a compilation
//! session interns a bounded vocabulary (declaration names, qualified paths,
//! rendered keys) so this never grows without bound.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

#[derive(Default)]
struct InternerInner {
    map: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// String interner mapping strings to compact [`Name`] handles.
pub struct StringInterner {
    inner: RwLock<InternerInner>,
}

impl StringInterner {
    /// Create an interner with the empty string pre-interned as [`Name::EMPTY`].
    pub fn new() -> Self {
        let mut inner = InternerInner::default();
        inner.map.insert("", Name::EMPTY);
        inner.strings.push("");
        StringInterner {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a string, returning its handle.
    pub fn intern(&self, text: &str) -> Name {
        if let Some(name) = self.inner.read().map.get(text) {
            return *name;
        }
        let mut inner = self.inner.write();
        // Another writer may have won the race between the two locks.
        if let Some(name) = inner.map.get(text) {
            return *name;
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let name = Name::from_raw(crate::to_u32(inner.strings.len(), "string"));
        inner.strings.push(leaked);
        inner.map.insert(leaked, name);
        name
    }

    /// Look up an already-interned string without interning it.
    pub fn get(&self, text: &str) -> Option<Name> {
        self.inner.read().map.get(text).copied()
    }

    /// Resolve a handle back to its string.
    ///
    /// Handles from another interner resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or_default()
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheaply clonable handle to a session-wide interner.
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
