//! Rendering types for diagnostics and for type keys.
//!
//! Both forms share one writer. Diagnostics show a type the way the user wrote
//! it, alias included. Type keys always show the expanded form, so equal types
//! get equal keys regardless of how they were spelled.

use inj_ir::StringInterner;

use crate::{ClassifierId, ClassifierKind, ClassifierTable, TypeRef};

/// Nesting depth past which rendering elides with `...`.
const MAX_RENDER_DEPTH: usize = 15;

/// A piece of a type key: literal text, or a type parameter whose key is only
/// known where the enclosing function is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyFragment {
    Literal(String),
    TypeParameter(ClassifierId),
}

/// Renders [`TypeRef`]s against a classifier table.
#[derive(Copy, Clone)]
pub struct TypeRenderer<'a> {
    table: &'a ClassifierTable,
    interner: &'a StringInterner,
}

impl<'a> TypeRenderer<'a> {
    pub fn new(table: &'a ClassifierTable, interner: &'a StringInterner) -> Self {
        TypeRenderer { table, interner }
    }

    /// Human-readable form, e.g. `@app.Qualified app.Foos<app.Bar>?`.
    pub fn render(&self, ty: &TypeRef) -> String {
        let mut writer = Writer::new(*self, true, false);
        writer.ty(ty, 0);
        writer.into_string()
    }

    /// Type key of a concrete type. Type parameters render as their names.
    pub fn type_key(&self, ty: &TypeRef) -> String {
        let mut writer = Writer::new(*self, false, false);
        writer.ty(ty, 0);
        writer.into_string()
    }

    /// Type key split at every type parameter occurrence.
    ///
    /// Adjacent literal text is merged, so a concrete type yields exactly one
    /// `Literal`.
    pub fn key_fragments(&self, ty: &TypeRef) -> Vec<KeyFragment> {
        let mut writer = Writer::new(*self, false, true);
        writer.ty(ty, 0);
        writer.fragments
    }
}

struct Writer<'a> {
    renderer: TypeRenderer<'a>,
    use_abbreviations: bool,
    parameter_holes: bool,
    fragments: Vec<KeyFragment>,
}

impl<'a> Writer<'a> {
    fn new(renderer: TypeRenderer<'a>, use_abbreviations: bool, parameter_holes: bool) -> Self {
        Writer {
            renderer,
            use_abbreviations,
            parameter_holes,
            fragments: Vec::new(),
        }
    }

    fn literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(KeyFragment::Literal(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(KeyFragment::Literal(text.to_owned()));
        }
    }

    fn ty(&mut self, ty: &TypeRef, depth: usize) {
        if depth > MAX_RENDER_DEPTH {
            self.literal("...");
            return;
        }
        if self.use_abbreviations {
            if let Some(abbreviation) = ty.abbreviation() {
                self.ty(abbreviation, depth);
                return;
            }
        }

        for tag in ty.tags() {
            self.literal("@");
            self.ty(tag, depth + 1);
            self.literal(" ");
        }
        self.literal(ty.projection.prefix());
        if ty.star {
            self.literal("*");
            return;
        }

        let data = self.renderer.table.get(ty.classifier);
        if data.kind == ClassifierKind::TypeParameter {
            if self.parameter_holes {
                self.fragments.push(KeyFragment::TypeParameter(ty.classifier));
            } else {
                self.literal(self.renderer.interner.lookup(data.name));
            }
        } else {
            self.literal(self.renderer.interner.lookup(data.fq_name));
        }

        if !ty.arguments.is_empty() {
            self.literal("<");
            for (i, argument) in ty.arguments.iter().enumerate() {
                if i > 0 {
                    self.literal(", ");
                }
                self.ty(argument, depth + 1);
            }
            self.literal(">");
        }
        if ty.nullable {
            self.literal("?");
        }
    }

    fn into_string(self) -> String {
        self.fragments
            .into_iter()
            .map(|fragment| match fragment {
                KeyFragment::Literal(text) => text,
                KeyFragment::TypeParameter(_) => String::new(),
            })
            .collect()
    }
}
