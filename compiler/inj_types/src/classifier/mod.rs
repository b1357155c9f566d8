//! Classifier table: every nominal type the session knows about.

use std::fmt;

use inj_ir::{Name, StringInterner};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{Substitution, TypeRef, Variance};

/// Index into the [`ClassifierTable`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ClassifierId(u32);

impl ClassifierId {
    pub const INVALID: ClassifierId = ClassifierId(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        ClassifierId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for ClassifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ClassifierId({})", self.0)
        } else {
            write!(f, "ClassifierId::INVALID")
        }
    }
}

inj_ir::static_assert_size!(ClassifierId, 4);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    Class,
    Interface,
    /// Singleton; its value is accessed, never constructed.
    Object,
    TypeParameter,
    TypeAlias,
    /// Qualifier annotation applied to types.
    Tag,
}

#[derive(Clone, Debug)]
pub struct ClassifierData {
    pub fq_name: Name,
    /// Unqualified name; type parameters render with this.
    pub name: Name,
    pub kind: ClassifierKind,
    pub type_parameters: Vec<ClassifierId>,
    /// Direct supertypes, or upper bounds for a type parameter.
    pub super_types: Vec<TypeRef>,
    /// Declaration-site variance of a type parameter.
    pub variance: Variance,
    /// Right-hand side of a type alias.
    pub expanded: Option<TypeRef>,
    /// Type parameter whose call sites must supply a `TypeKey`.
    pub for_type_key: bool,
    /// Type parameter whose argument must be known at runtime.
    pub reified: bool,
}

/// Classifiers the injection engine gives special meaning to.
#[derive(Clone, Debug)]
pub struct Builtins {
    pub any: ClassifierId,
    pub unit: ClassifierId,
    pub int: ClassifierId,
    pub string: ClassifierId,
    pub collection: ClassifierId,
    pub list: ClassifierId,
    pub source_key: ClassifierId,
    pub type_key: ClassifierId,
    functions: [ClassifierId; Builtins::MAX_FUNCTION_ARITY + 1],
}

impl Builtins {
    /// Largest provider arity with a built-in function type.
    pub const MAX_FUNCTION_ARITY: usize = 3;

    pub fn function(&self, arity: usize) -> Option<ClassifierId> {
        self.functions.get(arity).copied()
    }

    /// Arity of a built-in function type classifier.
    pub fn function_arity(&self, classifier: ClassifierId) -> Option<usize> {
        self.functions.iter().position(|f| *f == classifier)
    }
}

/// Arena of classifiers, addressed by [`ClassifierId`] and by qualified name.
#[derive(Clone, Debug)]
pub struct ClassifierTable {
    classifiers: Vec<ClassifierData>,
    by_name: FxHashMap<Name, ClassifierId>,
    builtins: Builtins,
}

impl ClassifierTable {
    pub fn new(interner: &StringInterner) -> Self {
        let mut table = ClassifierTable {
            classifiers: Vec::new(),
            by_name: FxHashMap::default(),
            builtins: Builtins {
                any: ClassifierId::INVALID,
                unit: ClassifierId::INVALID,
                int: ClassifierId::INVALID,
                string: ClassifierId::INVALID,
                collection: ClassifierId::INVALID,
                list: ClassifierId::INVALID,
                source_key: ClassifierId::INVALID,
                type_key: ClassifierId::INVALID,
                functions: [ClassifierId::INVALID; Builtins::MAX_FUNCTION_ARITY + 1],
            },
        };

        let any = table.declare(interner, "kotlin.Any", ClassifierKind::Class);
        let unit = table.declare(interner, "kotlin.Unit", ClassifierKind::Object);
        let int = table.declare(interner, "kotlin.Int", ClassifierKind::Class);
        let string = table.declare(interner, "kotlin.String", ClassifierKind::Class);

        let collection = table.declare_generic(
            interner,
            "kotlin.collections.Collection",
            ClassifierKind::Interface,
            &[("E", Variance::Out)],
        );
        let list = table.declare_generic(
            interner,
            "kotlin.collections.List",
            ClassifierKind::Interface,
            &[("E", Variance::Out)],
        );
        let list_element = TypeRef::simple(table.get(list).type_parameters[0]);
        table.set_super_types(list, vec![TypeRef::new(collection, vec![list_element])]);

        let source_key = table.declare(interner, "inj.SourceKey", ClassifierKind::Class);
        let type_key = table.declare_generic(
            interner,
            "inj.TypeKey",
            ClassifierKind::Class,
            &[("T", Variance::Out)],
        );

        let mut functions = [ClassifierId::INVALID; Builtins::MAX_FUNCTION_ARITY + 1];
        for (arity, slot) in functions.iter_mut().enumerate() {
            let names: Vec<String> = (1..=arity).map(|i| format!("P{i}")).collect();
            let mut params: Vec<(&str, Variance)> =
                names.iter().map(|n| (n.as_str(), Variance::In)).collect();
            params.push(("R", Variance::Out));
            *slot = table.declare_generic(
                interner,
                &format!("kotlin.Function{arity}"),
                ClassifierKind::Interface,
                &params,
            );
        }

        table.builtins = Builtins {
            any,
            unit,
            int,
            string,
            collection,
            list,
            source_key,
            type_key,
            functions,
        };
        table
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Declare a classifier by qualified name, or return the existing one.
    pub fn declare(
        &mut self,
        interner: &StringInterner,
        fq_name: &str,
        kind: ClassifierKind,
    ) -> ClassifierId {
        let fq = interner.intern(fq_name);
        if let Some(existing) = self.by_name.get(&fq) {
            return *existing;
        }
        let short = fq_name.rsplit('.').next().unwrap_or(fq_name);
        let id = ClassifierId::new(inj_ir::to_u32(self.classifiers.len(), "classifier"));
        self.classifiers.push(ClassifierData {
            fq_name: fq,
            name: interner.intern(short),
            kind,
            type_parameters: Vec::new(),
            super_types: Vec::new(),
            variance: Variance::Invariant,
            expanded: None,
            for_type_key: false,
            reified: false,
        });
        self.by_name.insert(fq, id);
        id
    }

    /// Declare a type parameter owned by `owner_fq_name`.
    pub fn declare_type_parameter(
        &mut self,
        interner: &StringInterner,
        owner_fq_name: &str,
        name: &str,
        variance: Variance,
    ) -> ClassifierId {
        let id = self.declare(
            interner,
            &format!("{owner_fq_name}.{name}"),
            ClassifierKind::TypeParameter,
        );
        self.classifiers[id.index()].variance = variance;
        id
    }

    /// Declare a classifier together with its type parameters.
    pub fn declare_generic(
        &mut self,
        interner: &StringInterner,
        fq_name: &str,
        kind: ClassifierKind,
        params: &[(&str, Variance)],
    ) -> ClassifierId {
        let id = self.declare(interner, fq_name, kind);
        let type_parameters = params
            .iter()
            .map(|(name, variance)| self.declare_type_parameter(interner, fq_name, name, *variance))
            .collect();
        self.set_type_parameters(id, type_parameters);
        id
    }

    pub fn set_type_parameters(&mut self, id: ClassifierId, params: Vec<ClassifierId>) {
        self.classifiers[id.index()].type_parameters = params;
    }

    pub fn set_super_types(&mut self, id: ClassifierId, super_types: Vec<TypeRef>) {
        self.classifiers[id.index()].super_types = super_types;
    }

    pub fn set_alias_expansion(&mut self, id: ClassifierId, expanded: TypeRef) {
        self.classifiers[id.index()].expanded = Some(expanded);
    }

    /// Reclassify a declared classifier, as persisted facts may require.
    pub fn set_kind(&mut self, id: ClassifierId, kind: ClassifierKind) {
        self.classifiers[id.index()].kind = kind;
    }

    pub fn mark_for_type_key(&mut self, id: ClassifierId) {
        self.classifiers[id.index()].for_type_key = true;
    }

    pub fn mark_reified(&mut self, id: ClassifierId) {
        self.classifiers[id.index()].reified = true;
    }

    /// A type parameter used as a type argument where its value is needed
    /// at runtime.
    pub fn is_unreified_type_parameter(&self, id: ClassifierId) -> bool {
        self.is_type_parameter(id) && !self.get(id).reified
    }

    #[inline]
    pub fn get(&self, id: ClassifierId) -> &ClassifierData {
        &self.classifiers[id.index()]
    }

    pub fn lookup(&self, fq_name: Name) -> Option<ClassifierId> {
        self.by_name.get(&fq_name).copied()
    }

    pub fn is_type_parameter(&self, id: ClassifierId) -> bool {
        self.get(id).kind == ClassifierKind::TypeParameter
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Build a type with aliases expanded.
    pub fn type_of(&self, classifier: ClassifierId, arguments: Vec<TypeRef>) -> TypeRef {
        self.expand(&TypeRef::new(classifier, arguments))
    }

    /// `Any`, the implicit bound of unbounded type parameters.
    pub fn any_type(&self) -> TypeRef {
        TypeRef::simple(self.builtins.any).with_nullable(true)
    }

    /// Expand type aliases everywhere in `ty`.
    ///
    /// The result remembers the outermost alias it was written as. An alias
    /// that reaches itself again is left unexpanded at the repeat.
    pub fn expand(&self, ty: &TypeRef) -> TypeRef {
        let mut path = SmallVec::<[ClassifierId; 4]>::new();
        self.expand_inner(ty, &mut path)
    }

    fn expand_inner(&self, ty: &TypeRef, path: &mut SmallVec<[ClassifierId; 4]>) -> TypeRef {
        inj_stack::ensure_sufficient_stack(|| {
            let mut rebuilt = ty.clone().without_tags();
            rebuilt.arguments = ty
                .arguments
                .iter()
                .map(|argument| self.expand_inner(argument, path))
                .collect();
            let tags: Vec<TypeRef> = ty.tags().iter().map(|tag| self.expand_inner(tag, path)).collect();
            let rebuilt = rebuilt.with_tags(tags);

            if ty.star {
                return rebuilt;
            }
            let data = self.get(ty.classifier);
            let Some(expanded) = &data.expanded else {
                return rebuilt;
            };
            if data.kind != ClassifierKind::TypeAlias || path.contains(&ty.classifier) {
                return rebuilt;
            }

            let subst: Substitution = data
                .type_parameters
                .iter()
                .copied()
                .zip(rebuilt.arguments.iter().cloned())
                .collect();
            path.push(ty.classifier);
            let mut result = self.expand_inner(&expanded.substitute(&subst), path);
            path.pop();

            result.nullable |= rebuilt.nullable;
            result.projection = rebuilt.projection;
            let abbreviation = rebuilt.clone().with_abbreviation(None);
            result
                .with_tags(rebuilt.tags().iter().cloned())
                .with_abbreviation(Some(abbreviation))
        })
    }

    /// Direct supertypes of `ty` with its arguments substituted in.
    ///
    /// Nullability and tags of `ty` are not carried over.
    pub fn super_types_of(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let data = self.get(ty.classifier);
        if data.kind == ClassifierKind::TypeParameter {
            return data.super_types.clone();
        }
        let subst: Substitution = data
            .type_parameters
            .iter()
            .copied()
            .zip(ty.arguments.iter().cloned())
            .collect();
        data.super_types
            .iter()
            .map(|super_type| super_type.substitute(&subst))
            .collect()
    }

    /// Upper bound of a type parameter; `Any?` when unbounded.
    pub fn upper_bound(&self, param: ClassifierId) -> TypeRef {
        self.get(param)
            .super_types
            .first()
            .cloned()
            .unwrap_or_else(|| self.any_type())
    }
}

#[cfg(test)]
mod tests;
