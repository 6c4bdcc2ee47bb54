//! Substitution mapping from type parameters to types

use rustc_hash::FxHashMap;

use crate::ty::Type;

/// Association from a type parameter to the type substituted for it
///
/// Keyed by the canonical string form of the parameter. Cloning produces an
/// independent copy, which is how a failed unification attempt is discarded.
#[derive(Debug, Clone, Default)]
pub struct TypeMapping {
    substitutions: FxHashMap<String, Type>,
}

impl TypeMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `to` as the substitution for `from`
    pub fn add(&mut self, from: &Type, to: Type) {
        self.substitutions.insert(from.key(), to);
    }

    /// Current substitution for `from`
    pub fn find(&self, from: &Type) -> Option<&Type> {
        self.substitutions.get(&from.key())
    }

    /// Number of recorded substitutions
    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    /// Whether nothing has been substituted
    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_are_independent() {
        let a = Type::type_param("A");
        let mut m = TypeMapping::new();
        m.add(&a, Type::int());

        let mut copy = m.clone();
        copy.add(&a, Type::string());
        copy.add(&Type::type_param("B"), Type::bool());

        assert_eq!(m.find(&a), Some(&Type::int()));
        assert_eq!(m.len(), 1);
        assert_eq!(copy.find(&a), Some(&Type::string()));
        assert_eq!(copy.len(), 2);
    }
}
