//! Decoding type keys back into types.
//!
//! The grammar is exactly what [`TypeRenderer::type_key`](crate::TypeRenderer::type_key)
//! writes:
//!
//! ```text
//! type  := ('@' named ' ')* ('in ' | 'out ')? ('*' | named '?'?)
//! named := path ('<' type (', ' type)* '>')?
//! path  := [A-Za-z0-9_$.]+
//! ```

use inj_ir::StringInterner;

use crate::{ClassifierKind, ClassifierTable, TypeRef, Variance};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeKeyError {
    #[error("unexpected end of type key")]
    UnexpectedEnd,
    #[error("unexpected `{found}` at offset {offset} in type key")]
    UnexpectedChar { offset: usize, found: char },
    #[error("unknown classifier `{0}` in type key")]
    UnknownClassifier(String),
    #[error("type parameter `{0}` cannot appear in a concrete type key")]
    TypeParameter(String),
    #[error("`{name}` expects {expected} type arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Parse a type key produced for a concrete type.
pub fn parse_type_key(
    key: &str,
    table: &ClassifierTable,
    interner: &StringInterner,
) -> Result<TypeRef, TypeKeyError> {
    let mut parser = Parser {
        key,
        pos: 0,
        table,
        interner,
    };
    let ty = parser.ty()?;
    match parser.peek() {
        None => Ok(table.expand(&ty)),
        Some(found) => Err(TypeKeyError::UnexpectedChar {
            offset: parser.pos,
            found,
        }),
    }
}

struct Parser<'a> {
    key: &'a str,
    pos: usize,
    table: &'a ClassifierTable,
    interner: &'a StringInterner,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.key[self.pos..].chars().next()
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.key[self.pos..].starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), TypeKeyError> {
        if self.eat(text) {
            return Ok(());
        }
        match self.peek() {
            None => Err(TypeKeyError::UnexpectedEnd),
            Some(found) => Err(TypeKeyError::UnexpectedChar {
                offset: self.pos,
                found,
            }),
        }
    }

    fn ty(&mut self) -> Result<TypeRef, TypeKeyError> {
        inj_stack::ensure_sufficient_stack(|| {
            let mut tags = Vec::new();
            while self.eat("@") {
                tags.push(self.named()?);
                self.expect(" ")?;
            }
            let projection = if self.eat("in ") {
                Variance::In
            } else if self.eat("out ") {
                Variance::Out
            } else {
                Variance::Invariant
            };
            if self.eat("*") {
                return Ok(TypeRef::star_projection(self.table.builtins().any)
                    .with_projection(projection));
            }
            let mut ty = self.named()?;
            if self.eat("?") {
                ty = ty.with_nullable(true);
            }
            Ok(ty.with_projection(projection).with_tags(tags))
        })
    }

    fn named(&mut self) -> Result<TypeRef, TypeKeyError> {
        let start = self.pos;
        let len = self.key[start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'))
            .unwrap_or(self.key.len() - start);
        if len == 0 {
            return match self.peek() {
                None => Err(TypeKeyError::UnexpectedEnd),
                Some(found) => Err(TypeKeyError::UnexpectedChar {
                    offset: start,
                    found,
                }),
            };
        }
        self.pos += len;
        let path = &self.key[start..start + len];

        let classifier = self
            .interner
            .get(path)
            .and_then(|name| self.table.lookup(name))
            .ok_or_else(|| TypeKeyError::UnknownClassifier(path.to_owned()))?;
        let data = self.table.get(classifier);
        if data.kind == ClassifierKind::TypeParameter {
            return Err(TypeKeyError::TypeParameter(path.to_owned()));
        }

        let mut arguments = Vec::new();
        if self.eat("<") {
            loop {
                arguments.push(self.ty()?);
                if self.eat(">") {
                    break;
                }
                self.expect(", ")?;
            }
        }
        let expected = data.type_parameters.len();
        if arguments.len() != expected {
            return Err(TypeKeyError::ArityMismatch {
                name: path.to_owned(),
                expected,
                found: arguments.len(),
            });
        }
        Ok(TypeRef::new(classifier, arguments))
    }
}
