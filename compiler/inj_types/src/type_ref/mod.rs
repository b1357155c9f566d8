//! Structural type references.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ClassifierId;

/// Declaration-site or use-site variance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Out,
    In,
}

impl Variance {
    /// Prefix used when rendering a projected argument.
    pub fn prefix(self) -> &'static str {
        match self {
            Variance::Invariant => "",
            Variance::Out => "out ",
            Variance::In => "in ",
        }
    }
}

/// Type parameter to type argument mapping.
pub type Substitution = FxHashMap<ClassifierId, TypeRef>;

/// Borrowed comparison key shared by `Eq`, `Ord` and `Hash`.
type ComparisonKey<'a> = (ClassifierId, &'a [TypeRef], bool, &'a [TypeRef], Variance, bool);

/// Immutable structural type.
///
/// Tags are kept sorted and deduplicated so that `@A @B Foo` and `@B @A Foo`
/// are the same requestable type. Equality, ordering and hashing ignore the
/// alias abbreviation.
#[derive(Clone)]
pub struct TypeRef {
    pub classifier: ClassifierId,
    pub arguments: Vec<TypeRef>,
    pub nullable: bool,
    /// Use-site projection when this type is an argument.
    pub projection: Variance,
    /// `*` projection; the classifier is then `Any`.
    pub star: bool,
    tags: Vec<TypeRef>,
    abbreviation: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn new(classifier: ClassifierId, arguments: Vec<TypeRef>) -> Self {
        TypeRef {
            classifier,
            arguments,
            nullable: false,
            projection: Variance::Invariant,
            star: false,
            tags: Vec::new(),
            abbreviation: None,
        }
    }

    /// A bare classifier without arguments.
    pub fn simple(classifier: ClassifierId) -> Self {
        Self::new(classifier, Vec::new())
    }

    /// `*` projection over `any`.
    pub fn star_projection(any: ClassifierId) -> Self {
        TypeRef {
            nullable: true,
            star: true,
            ..Self::simple(any)
        }
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Variance) -> Self {
        self.projection = projection;
        self
    }

    /// Add tags, keeping the tag list normalized.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TypeRef>) -> Self {
        self.tags.extend(tags);
        self.tags.sort();
        self.tags.dedup();
        self
    }

    #[must_use]
    pub fn without_tags(mut self) -> Self {
        self.tags.clear();
        self
    }

    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: Option<TypeRef>) -> Self {
        self.abbreviation = abbreviation.map(Box::new);
        self
    }

    pub fn tags(&self) -> &[TypeRef] {
        &self.tags
    }

    /// The alias this type was written as, if any.
    pub fn abbreviation(&self) -> Option<&TypeRef> {
        self.abbreviation.as_deref()
    }

    /// Number of nodes, counting arguments and tags.
    pub fn size(&self) -> usize {
        1 + self.arguments.iter().map(TypeRef::size).sum::<usize>()
            + self.tags.iter().map(TypeRef::size).sum::<usize>()
    }

    /// Every classifier that occurs anywhere in the type, in first-seen order.
    pub fn classifiers(&self) -> Vec<ClassifierId> {
        let mut out = Vec::new();
        self.collect_classifiers(&mut out);
        out
    }

    fn collect_classifiers(&self, out: &mut Vec<ClassifierId>) {
        if !self.star && !out.contains(&self.classifier) {
            out.push(self.classifier);
        }
        for tag in &self.tags {
            tag.collect_classifiers(out);
        }
        for argument in &self.arguments {
            argument.collect_classifiers(out);
        }
    }

    pub fn contains_classifier(&self, classifier: ClassifierId) -> bool {
        (!self.star && self.classifier == classifier)
            || self.arguments.iter().any(|a| a.contains_classifier(classifier))
            || self.tags.iter().any(|t| t.contains_classifier(classifier))
    }

    /// Apply a type parameter mapping everywhere in the type.
    ///
    /// Replacements are themselves substituted, so chained mappings resolve
    /// fully; a replacement that mentions the parameter it replaces is not
    /// re-entered.
    pub fn substitute(&self, map: &Substitution) -> TypeRef {
        if map.is_empty() {
            return self.clone();
        }
        let mut visiting = SmallVec::<[ClassifierId; 4]>::new();
        self.substitute_inner(map, &mut visiting)
    }

    fn substitute_inner(
        &self,
        map: &Substitution,
        visiting: &mut SmallVec<[ClassifierId; 4]>,
    ) -> TypeRef {
        inj_stack::ensure_sufficient_stack(|| {
            let mut tags = Vec::with_capacity(self.tags.len());
            for tag in &self.tags {
                tags.push(tag.substitute_inner(map, visiting));
            }

            if !self.star {
                if let Some(replacement) = map.get(&self.classifier) {
                    if !visiting.contains(&self.classifier) {
                        visiting.push(self.classifier);
                        let mut result = replacement.substitute_inner(map, visiting);
                        visiting.pop();
                        result.nullable |= self.nullable;
                        result.projection = self.projection;
                        return result.with_tags(tags);
                    }
                }
            }

            let mut arguments = Vec::with_capacity(self.arguments.len());
            for argument in &self.arguments {
                arguments.push(argument.substitute_inner(map, visiting));
            }
            let abbreviation = self
                .abbreviation
                .as_ref()
                .map(|abbreviation| Box::new(abbreviation.substitute_inner(map, visiting)));
            TypeRef {
                classifier: self.classifier,
                arguments,
                nullable: self.nullable,
                projection: self.projection,
                star: self.star,
                tags: Vec::new(),
                abbreviation,
            }
            .with_tags(tags)
        })
    }

    fn key(&self) -> ComparisonKey<'_> {
        (
            self.classifier,
            &self.arguments,
            self.nullable,
            &self.tags,
            self.projection,
            self.star,
        )
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.tags {
            write!(f, "@{tag:?} ")?;
        }
        f.write_str(self.projection.prefix())?;
        if self.star {
            return f.write_str("*");
        }
        write!(f, "#{}", self.classifier.raw())?;
        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument:?}")?;
            }
            f.write_str(">")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
