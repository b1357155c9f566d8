//! Subtyping, candidate type inference and specificity.
//!
//! All three walk supertypes and type parameter bounds, which may refer back to
//! the type being examined (`T : Comparable<T>`). Each walk keeps the pairs of
//! classifiers already on its path and answers "no" on a repeat instead of
//! recursing forever.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::{ClassifierId, ClassifierKind, ClassifierTable, Substitution, TypeRef, Variance};

type Visited = FxHashSet<(ClassifierId, ClassifierId)>;

impl ClassifierTable {
    /// `sub <: sup`.
    ///
    /// Tags are part of identity: both sides must carry the same tags. A
    /// nullable type is never a subtype of a non-null one.
    pub fn is_subtype_of(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        let mut visited = Visited::default();
        self.subtype(sub, sup, &mut visited)
    }

    /// Subtype in both directions.
    pub fn is_equivalent(&self, a: &TypeRef, b: &TypeRef) -> bool {
        a == b || (self.is_subtype_of(a, b) && self.is_subtype_of(b, a))
    }

    fn subtype(&self, sub: &TypeRef, sup: &TypeRef, visited: &mut Visited) -> bool {
        inj_stack::ensure_sufficient_stack(|| {
            if sup.star {
                return true;
            }
            if sub.star {
                return false;
            }
            if sub.nullable && !sup.nullable {
                return false;
            }
            if self.is_top(sup) {
                return true;
            }
            if sub.tags() != sup.tags() {
                return false;
            }
            if sub.classifier == sup.classifier {
                return self.arguments_conform(sub.classifier, &sub.arguments, &sup.arguments, visited);
            }

            let pair = (sub.classifier, sup.classifier);
            if !visited.insert(pair) {
                return false;
            }
            let result = self.super_types_of(sub).into_iter().any(|super_type| {
                let carried = super_type
                    .with_nullable(sub.nullable)
                    .without_tags()
                    .with_tags(sub.tags().iter().cloned());
                self.subtype(&carried, sup, visited)
            });
            visited.remove(&pair);
            result
        })
    }

    /// Untagged `Any`, which every type of matching nullability conforms to.
    fn is_top(&self, ty: &TypeRef) -> bool {
        ty.classifier == self.builtins().any && ty.arguments.is_empty() && ty.tags().is_empty()
    }

    fn arguments_conform(
        &self,
        classifier: ClassifierId,
        sub_args: &[TypeRef],
        sup_args: &[TypeRef],
        visited: &mut Visited,
    ) -> bool {
        if sub_args.len() != sup_args.len() {
            return false;
        }
        let params = &self.get(classifier).type_parameters;
        sub_args.iter().zip(sup_args).enumerate().all(|(i, (a, b))| {
            if b.star {
                return true;
            }
            let variance = if b.projection == Variance::Invariant {
                params
                    .get(i)
                    .map_or(Variance::Invariant, |param| self.get(*param).variance)
            } else {
                b.projection
            };
            let a = a.clone().with_projection(Variance::Invariant);
            let b = b.clone().with_projection(Variance::Invariant);
            match variance {
                Variance::Invariant => {
                    a == b || (self.subtype(&a, &b, visited) && self.subtype(&b, &a, visited))
                }
                Variance::Out => self.subtype(&a, &b, visited),
                Variance::In => self.subtype(&b, &a, visited),
            }
        })
    }

    /// Infer `params` so that `candidate` instantiated with them is a subtype of
    /// `requested`.
    ///
    /// Parameters that do not occur in `candidate` are bound to their upper
    /// bound. Returns `None` when no instantiation fits or a binding violates
    /// its bound.
    pub fn infer_substitution(
        &self,
        candidate: &TypeRef,
        params: &[ClassifierId],
        requested: &TypeRef,
    ) -> Option<Substitution> {
        let mut subst = Substitution::default();
        if !params.is_empty() {
            let mut visited = Visited::default();
            if !self.unify(candidate, requested, params, &mut subst, &mut visited) {
                return None;
            }
            for param in params {
                if !subst.contains_key(param) {
                    let bound = self.upper_bound(*param);
                    subst.insert(*param, bound);
                }
            }
            for param in params {
                let bound = self.upper_bound(*param).substitute(&subst);
                let binding = subst.get(param)?;
                if !self.is_subtype_of(binding, &bound) {
                    return None;
                }
            }
        }
        let instantiated = candidate.substitute(&subst);
        self.is_subtype_of(&instantiated, requested)
            .then_some(subst)
    }

    fn unify(
        &self,
        candidate: &TypeRef,
        requested: &TypeRef,
        params: &[ClassifierId],
        subst: &mut Substitution,
        visited: &mut Visited,
    ) -> bool {
        inj_stack::ensure_sufficient_stack(|| {
            if requested.star {
                return true;
            }
            if !candidate.star && params.contains(&candidate.classifier) {
                return self.bind(candidate, requested, subst);
            }
            if candidate.nullable && !requested.nullable {
                return false;
            }
            if self.is_top(requested) {
                return true;
            }
            if candidate.tags() != requested.tags() {
                return false;
            }
            if candidate.classifier == requested.classifier {
                return candidate.arguments.len() == requested.arguments.len()
                    && candidate
                        .arguments
                        .iter()
                        .zip(&requested.arguments)
                        .all(|(c, r)| self.unify(c, r, params, subst, visited));
            }

            let pair = (candidate.classifier, requested.classifier);
            if !visited.insert(pair) {
                return false;
            }
            let mut found = false;
            for super_type in self.super_types_of(candidate) {
                let carried = super_type
                    .with_nullable(candidate.nullable)
                    .with_tags(candidate.tags().iter().cloned());
                let mut attempt = subst.clone();
                if self.unify(&carried, requested, params, &mut attempt, visited) {
                    *subst = attempt;
                    found = true;
                    break;
                }
            }
            visited.remove(&pair);
            found
        })
    }

    /// Bind a candidate type parameter use against the requested type.
    fn bind(&self, use_site: &TypeRef, requested: &TypeRef, subst: &mut Substitution) -> bool {
        if use_site.nullable && !requested.nullable {
            return false;
        }
        // Tags written on the parameter use must be present on the request;
        // the binding carries the remaining ones.
        if !use_site.tags().iter().all(|tag| requested.tags().contains(tag)) {
            return false;
        }
        let remaining: Vec<TypeRef> = requested
            .tags()
            .iter()
            .filter(|tag| !use_site.tags().contains(tag))
            .cloned()
            .collect();
        let binding = requested
            .clone()
            .with_projection(Variance::Invariant)
            .with_nullable(requested.nullable && !use_site.nullable)
            .without_tags()
            .with_tags(remaining);
        match subst.get(&use_site.classifier) {
            Some(existing) => self.is_equivalent(existing, &binding),
            None => {
                subst.insert(use_site.classifier, binding);
                true
            }
        }
    }

    /// Compare two declared candidate types by specificity.
    ///
    /// `Less` means `a` is strictly more specific. `Equal` means neither is:
    /// the types are unrelated, equivalent, or differ only in ways no rule
    /// ranks (declaration-site variance included), and the caller must treat
    /// the pair as tied.
    pub fn compare_specificity(&self, a: &TypeRef, b: &TypeRef) -> Ordering {
        inj_stack::ensure_sufficient_stack(|| {
            match (a.star, b.star) {
                (false, true) => return Ordering::Less,
                (true, false) => return Ordering::Greater,
                (true, true) => return Ordering::Equal,
                (false, false) => {}
            }

            let a_generic = self.get(a.classifier).kind == ClassifierKind::TypeParameter;
            let b_generic = self.get(b.classifier).kind == ClassifierKind::TypeParameter;
            match (a_generic, b_generic) {
                (false, true) => return Ordering::Less,
                (true, false) => return Ordering::Greater,
                _ => {}
            }

            let a_sub_b = self.is_subtype_of(a, b);
            let b_sub_a = self.is_subtype_of(b, a);
            match (a_sub_b, b_sub_a) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }

            if a.classifier != b.classifier || a.arguments.len() != b.arguments.len() {
                return Ordering::Equal;
            }
            let mut more = false;
            let mut less = false;
            for (x, y) in a.arguments.iter().zip(&b.arguments) {
                match self.compare_specificity(x, y) {
                    Ordering::Less => more = true,
                    Ordering::Greater => less = true,
                    Ordering::Equal => {}
                }
            }
            match (more, less) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            }
        })
    }
}

#[cfg(test)]
mod tests;
