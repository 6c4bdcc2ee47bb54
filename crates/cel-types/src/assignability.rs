//! Unification of types under a substitution mapping
//!
//! All entry points that take a `&TypeMapping` work on a copy and only hand
//! the copy back on success, so a failed attempt leaves the caller's mapping
//! untouched.

use crate::kind::Kind;
use crate::mapping::TypeMapping;
use crate::ty::Type;

/// Check whether `t1` and `t2` unify, returning the extended mapping on success
pub fn is_assignable(m: &TypeMapping, t1: &Type, t2: &Type) -> Option<TypeMapping> {
    let mut copy = m.clone();
    if internal_is_assignable(&mut copy, t1, t2) {
        Some(copy)
    } else {
        None
    }
}

/// Pairwise [`is_assignable`] over two equally long lists
pub fn is_assignable_list(m: &TypeMapping, l1: &[Type], l2: &[Type]) -> Option<TypeMapping> {
    let mut copy = m.clone();
    if internal_is_assignable_list(&mut copy, l1, l2) {
        Some(copy)
    } else {
        None
    }
}

fn internal_is_assignable_list(m: &mut TypeMapping, l1: &[Type], l2: &[Type]) -> bool {
    if l1.len() != l2.len() {
        return false;
    }
    l1.iter()
        .zip(l2)
        .all(|(t1, t2)| internal_is_assignable(m, t1, t2))
}

/// Outcome of trying to bind a type parameter
struct Substitution {
    valid: bool,
    has_sub: bool,
}

/// Try to make `t1` the substitution for the type parameter `t2`
fn is_valid_type_substitution(m: &mut TypeMapping, t1: &Type, t2: &Type) -> Substitution {
    if t1.is_exact_type(t2) {
        return Substitution { valid: true, has_sub: true };
    }
    if let Some(t2_sub) = m.find(t2).cloned() {
        // Avoid recording a type as its own substitution
        if t1.is_exact_type(&t2_sub) {
            return Substitution { valid: true, has_sub: true };
        }
        if internal_is_assignable(m, t1, &t2_sub) {
            let t2_new = most_general(t1, &t2_sub);
            if not_referenced_in(m, t2, &t2_new) {
                m.add(t2, t2_new);
            }
            return Substitution { valid: true, has_sub: true };
        }
        return Substitution { valid: false, has_sub: true };
    }
    if not_referenced_in(m, t2, t1) {
        m.add(t2, t1.clone());
        return Substitution { valid: true, has_sub: true };
    }
    Substitution { valid: false, has_sub: false }
}

/// Unify `t1` with `t2`, extending `m` in place
pub fn internal_is_assignable(m: &mut TypeMapping, t1: &Type, t2: &Type) -> bool {
    if t1.is_exact_type(t2) {
        return true;
    }

    // Type parameters bind in either direction
    if t2.kind() == Kind::TypeParam {
        let sub = is_valid_type_substitution(m, t1, t2);
        if sub.valid {
            return true;
        }
        if sub.has_sub {
            return false;
        }
    }
    if t1.kind() == Kind::TypeParam {
        return is_valid_type_substitution(m, t2, t1).valid;
    }

    // Wildcards
    if is_wildcard(t1) || is_wildcard(t2) {
        return true;
    }

    // Legacy nullability
    if t1.kind() == Kind::Null {
        return is_assignable_null(t2);
    }
    if t2.kind() == Kind::Null {
        return is_assignable_null(t1);
    }

    match t1.kind() {
        Kind::Bool
        | Kind::Bytes
        | Kind::Double
        | Kind::Int
        | Kind::String
        | Kind::Uint
        | Kind::Duration
        | Kind::Timestamp
        | Kind::Struct => t2.is_assignable_type(t1),
        Kind::Type => t2.kind() == Kind::Type,
        Kind::List | Kind::Map | Kind::Opaque => {
            t1.kind() == t2.kind()
                && t1.type_name() == t2.type_name()
                && internal_is_assignable_list(m, t1.parameters(), t2.parameters())
        }
        _ => false,
    }
}

fn is_wildcard(t: &Type) -> bool {
    matches!(t.kind(), Kind::Dyn | Kind::Error | Kind::Any)
}

fn is_assignable_null(t: &Type) -> bool {
    match t.kind() {
        Kind::Opaque
        | Kind::Struct
        | Kind::Any
        | Kind::Duration
        | Kind::Timestamp
        | Kind::Null => true,
        _ => t.accepts_null(),
    }
}

/// Occurs check: `t` does not appear within `within`, following substitutions
pub fn not_referenced_in(m: &TypeMapping, t: &Type, within: &Type) -> bool {
    if t.is_exact_type(within) {
        return false;
    }
    match within.kind() {
        Kind::TypeParam => match m.find(within) {
            Some(sub) => not_referenced_in(m, t, sub),
            None => true,
        },
        Kind::Opaque | Kind::List | Kind::Map | Kind::Type => within
            .parameters()
            .iter()
            .all(|p| not_referenced_in(m, t, p)),
        _ => true,
    }
}

/// Resolve `t` through the mapping, rebuilding parameterized types
///
/// Type parameters that remain unbound become `dyn` when `type_param_to_dyn` is set.
pub fn substitute(m: &TypeMapping, t: &Type, type_param_to_dyn: bool) -> Type {
    if let Some(sub) = m.find(t) {
        return substitute(m, sub, type_param_to_dyn);
    }
    match t.kind() {
        Kind::TypeParam if type_param_to_dyn => Type::dyn_type(),
        kind if kind.is_parameterized() && !t.parameters().is_empty() => t
            .with_parameters(
                t.parameters()
                    .iter()
                    .map(|p| substitute(m, p, type_param_to_dyn))
                    .collect(),
            ),
        _ => t.clone(),
    }
}

/// Whether `t1` is equal to or less specific than `t2`
pub fn is_equal_or_less_specific(t1: &Type, t2: &Type) -> bool {
    if t1.is_dyn() {
        return true;
    }
    if t2.is_dyn() {
        return false;
    }
    if t1.kind() != t2.kind() {
        return false;
    }
    match t1.kind() {
        Kind::Opaque | Kind::List | Kind::Map => {
            t1.type_name() == t2.type_name()
                && t1.parameters().len() == t2.parameters().len()
                && t1
                    .parameters()
                    .iter()
                    .zip(t2.parameters())
                    .all(|(p1, p2)| is_equal_or_less_specific(p1, p2))
        }
        Kind::Type => true,
        _ => t1.is_exact_type(t2),
    }
}

/// The more general of two mutually assignable types; ties favor `t1`
pub fn most_general(t1: &Type, t2: &Type) -> Type {
    if is_equal_or_less_specific(t1, t2) {
        t1.clone()
    } else {
        t2.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str) -> Type {
        Type::type_param(name)
    }

    #[test]
    fn test_primitives() {
        let m = TypeMapping::new();
        assert!(is_assignable(&m, &Type::int(), &Type::int()).is_some());
        assert!(is_assignable(&m, &Type::int(), &Type::uint()).is_none());
        assert!(is_assignable(&m, &Type::dyn_type(), &Type::string()).is_some());
        assert!(is_assignable(&m, &Type::string(), &Type::error()).is_some());
    }

    #[test]
    fn test_binds_type_param() {
        let m = TypeMapping::new();
        let a = param("A");
        let out = is_assignable(&m, &Type::list(Type::int()), &Type::list(a.clone())).unwrap();
        assert_eq!(out.find(&a), Some(&Type::int()));
        assert!(m.is_empty());
    }

    #[test]
    fn test_bound_param_must_agree() {
        let a = param("A");
        let mut m = TypeMapping::new();
        m.add(&a, Type::int());
        assert!(is_assignable(&m, &Type::string(), &a).is_none());
        assert!(is_assignable(&m, &Type::int(), &a).is_some());
    }

    #[test]
    fn test_bound_param_widens_to_more_general() {
        let a = param("A");
        let mut m = TypeMapping::new();
        m.add(&a, Type::int());
        let out = is_assignable(&m, &Type::dyn_type(), &a).unwrap();
        assert_eq!(out.find(&a), Some(&Type::dyn_type()));
    }

    #[test]
    fn test_occurs_check() {
        let a = param("A");
        let m = TypeMapping::new();
        assert!(is_assignable(&m, &Type::list(a.clone()), &a).is_none());
        assert!(is_assignable(&m, &a, &Type::map(Type::string(), a.clone())).is_none());

        // Through an existing substitution chain: B -> list(A)
        let b = param("B");
        let mut m = TypeMapping::new();
        m.add(&b, Type::list(a.clone()));
        assert!(!not_referenced_in(&m, &a, &b));
        assert!(is_assignable(&m, &b, &a).is_none());
    }

    #[test]
    fn test_null_assignability() {
        let m = TypeMapping::new();
        assert!(is_assignable(&m, &Type::null(), &Type::object("acme.Order")).is_some());
        assert!(is_assignable(&m, &Type::timestamp(), &Type::null()).is_some());
        assert!(is_assignable(&m, &Type::null(), &Type::nullable(Type::int())).is_some());
        assert!(is_assignable(&m, &Type::null(), &Type::int()).is_none());
    }

    #[test]
    fn test_wrapper_accepts_primitive() {
        let m = TypeMapping::new();
        assert!(is_assignable(&m, &Type::int(), &Type::nullable(Type::int())).is_some());
        assert!(is_assignable(&m, &Type::uint(), &Type::nullable(Type::int())).is_none());
    }

    #[test]
    fn test_type_kind() {
        let m = TypeMapping::new();
        assert!(is_assignable(&m, &Type::type_of(Type::int()), &Type::type_of(Type::string())).is_some());
        assert!(is_assignable(&m, &Type::type_of(Type::int()), &Type::int()).is_none());
    }

    #[test]
    fn test_list_arity() {
        let m = TypeMapping::new();
        assert!(is_assignable_list(&m, &[Type::int()], &[Type::int(), Type::int()]).is_none());
        assert!(is_assignable_list(&m, &[Type::int(), Type::bool()], &[Type::int(), Type::bool()]).is_some());
    }

    #[test]
    fn test_substitute() {
        let a = param("A");
        let b = param("B");
        let mut m = TypeMapping::new();
        m.add(&a, b.clone());
        m.add(&b, Type::string());

        let t = Type::map(a.clone(), Type::list(param("C")));
        assert_eq!(
            substitute(&m, &t, false),
            Type::map(Type::string(), Type::list(param("C")))
        );
        assert_eq!(
            substitute(&m, &t, true),
            Type::map(Type::string(), Type::list(Type::dyn_type()))
        );
    }

    #[test]
    fn test_most_general() {
        let dyn_list = Type::list(Type::dyn_type());
        let int_list = Type::list(Type::int());
        assert_eq!(most_general(&int_list, &dyn_list), dyn_list);
        assert_eq!(most_general(&dyn_list, &int_list), dyn_list);
        assert_eq!(most_general(&Type::int(), &Type::int()), Type::int());
        assert!(is_equal_or_less_specific(
            &Type::optional(Type::dyn_type()),
            &Type::optional(Type::int())
        ));
        assert!(!is_equal_or_less_specific(
            &Type::optional(Type::int()),
            &Type::optional(Type::dyn_type())
        ));
    }
}
