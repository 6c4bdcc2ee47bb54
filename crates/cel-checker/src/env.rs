//! Checking environment
//!
//! An [`Env`] bundles the container, the type provider, the declaration
//! scopes and the checker options. Entering or leaving a scope yields a new
//! `Env` sharing everything but the innermost scope, so the caller decides
//! which view is current and an outer view is never modified by inner
//! declarations. Adding declarations to a cloned `Env` leaves the value it
//! was cloned from untouched.

use std::fmt;
use std::sync::Arc;

use cel_types::Type;
use serde::{Deserialize, Serialize};

use crate::ast::Constant;
use crate::container::Container;
use crate::decls::{FunctionDecl, VariableDecl};
use crate::error::DeclError;
use crate::macros;
use crate::overloads;
use crate::provider::TypeProvider;
use crate::scopes::Scopes;
use crate::stdlib;

/// Options controlling checker behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Report mixed element types in list and map literals instead of widening to `dyn`
    pub homogeneous_aggregate_literals: bool,
    /// Enable comparisons across `int`, `uint` and `double`
    pub cross_type_numeric_comparisons: bool,
    /// Overload ids hidden from resolution
    pub disabled_overloads: Vec<String>,
}

/// Declarations and lookup services for one check
#[derive(Clone)]
pub struct Env {
    container: Container,
    provider: Arc<dyn TypeProvider>,
    declarations: Scopes,
    options: CheckerOptions,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("container", &self.container)
            .field("scope_depth", &self.declarations.depth())
            .field("options", &self.options)
            .finish()
    }
}

impl Env {
    /// Environment with no declarations at all
    pub fn new(container: Container, provider: Arc<dyn TypeProvider>, options: CheckerOptions) -> Self {
        Env {
            container,
            provider,
            declarations: Scopes::new(),
            options,
        }
    }

    /// Environment preloaded with the standard library
    pub fn standard(
        container: Container,
        provider: Arc<dyn TypeProvider>,
        options: CheckerOptions,
    ) -> Result<Self, DeclError> {
        let mut env = Env::new(container, provider, options);
        env.add_idents(stdlib::standard_idents())?;
        env.add_functions(stdlib::standard_functions()?)?;
        Ok(env)
    }

    /// Active container
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Type provider
    pub fn provider(&self) -> &dyn TypeProvider {
        self.provider.as_ref()
    }

    /// Checker options
    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    /// Declare identifiers in the current scope
    ///
    /// Redeclaring a name with an equivalent type is accepted; any other
    /// redeclaration in the same scope is an error.
    pub fn add_idents(&mut self, decls: impl IntoIterator<Item = VariableDecl>) -> Result<(), DeclError> {
        self.declarations.detach();
        for decl in decls {
            let decl = decl.sanitized();
            if let Some(existing) = self.declarations.find_ident_in_scope(decl.name()) {
                if existing.is_equivalent(&decl) {
                    continue;
                }
                return Err(DeclError::OverlappingIdentifier {
                    name: decl.name().to_string(),
                });
            }
            self.declarations.add_ident(decl);
        }
        Ok(())
    }

    /// Declare functions, merging with earlier declarations of the same name
    pub fn add_functions(&mut self, decls: impl IntoIterator<Item = FunctionDecl>) -> Result<(), DeclError> {
        self.declarations.detach();
        for decl in decls {
            let merged = match self.declarations.find_function(decl.name()) {
                Some(existing) => existing.merge(&decl)?,
                None => decl,
            };
            for o in merged.overload_decls() {
                let arg_count = if o.is_member_function() {
                    o.arg_types().len().saturating_sub(1)
                } else {
                    o.arg_types().len()
                };
                if macros::find_macro(merged.name(), arg_count, o.is_member_function()).is_some() {
                    return Err(DeclError::OverlappingMacro {
                        name: merged.name().to_string(),
                        arg_count,
                    });
                }
            }
            self.declarations.set_function(merged);
        }
        Ok(())
    }

    /// Resolve an identifier through the container, the scopes and the provider
    ///
    /// Provider hits are cached in the outermost scope.
    pub fn lookup_ident(&self, name: &str) -> Option<VariableDecl> {
        for candidate in self.container.resolve_candidate_names(name) {
            if let Some(decl) = self.declarations.find_ident(&candidate) {
                return Some(decl);
            }

            let found = if let Some(t) = self.provider.find_struct_type(&candidate) {
                Some(VariableDecl::new(candidate.as_str(), Type::type_of(t)))
            } else if let Some(t) = self.provider.find_ident(&candidate) {
                Some(VariableDecl::new(candidate.as_str(), t))
            } else {
                self.provider
                    .enum_value(&candidate)
                    .map(|v| VariableDecl::constant(candidate.as_str(), Type::int(), Constant::Int(v)))
            };
            if let Some(decl) = found {
                self.declarations.add_global_ident(decl.clone());
                return Some(decl);
            }
        }
        None
    }

    /// Resolve a function name through the container; disabled declarations are skipped
    pub fn lookup_function(&self, name: &str) -> Option<Arc<FunctionDecl>> {
        self.container
            .resolve_candidate_names(name)
            .iter()
            .filter_map(|candidate| self.declarations.find_function(candidate))
            .find(|decl| !decl.is_declaration_disabled())
    }

    /// Whether an overload is filtered out by the options
    pub fn is_overload_disabled(&self, overload_id: &str) -> bool {
        if self.options.disabled_overloads.iter().any(|id| id == overload_id) {
            return true;
        }
        !self.options.cross_type_numeric_comparisons
            && overloads::is_cross_type_numeric_comparison(overload_id)
    }

    /// New environment with an empty innermost scope
    pub fn enter_scope(&self) -> Env {
        Env {
            declarations: self.declarations.push(),
            ..self.clone()
        }
    }

    /// Environment without the innermost scope; the outermost scope is kept
    pub fn exit_scope(&self) -> Env {
        match self.declarations.pop() {
            Some(declarations) => Env {
                declarations,
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Bind a local in the innermost scope, shadowing outer declarations
    pub fn declare_local(&self, decl: VariableDecl) {
        self.declarations.add_ident(decl);
    }

    /// Number of nested scopes
    pub fn scope_depth(&self) -> usize {
        self.declarations.depth()
    }

    /// Visible identifiers, sorted by name
    pub fn idents(&self) -> Vec<VariableDecl> {
        self.declarations.idents()
    }

    /// Visible functions, sorted by name
    pub fn functions(&self) -> Vec<Arc<FunctionDecl>> {
        self.declarations.functions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decls::OverloadDecl;
    use crate::provider::TypeRegistry;
    use cel_types::Kind;

    fn registry() -> Arc<TypeRegistry> {
        let mut reg = TypeRegistry::new();
        reg.register_struct("acme.v1.Order", [("id", Type::string())]);
        reg.register_enum("acme.v1.Status", [("ACTIVE", 1), ("CLOSED", 2)]);
        Arc::new(reg)
    }

    fn env(container: &str) -> Env {
        Env::standard(
            Container::new(container).unwrap(),
            registry(),
            CheckerOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_standard_env() {
        let env = env("");
        assert!(env.lookup_function("_+_").is_some());
        assert_eq!(env.lookup_ident("int").unwrap().ty(), &Type::type_of(Type::int()));
        assert_eq!(env.idents().len(), 13);
        assert!(env.functions().iter().any(|f| f.name() == "size"));
    }

    #[test]
    fn test_lookup_through_container() {
        let mut env = env("acme.v1");
        env.add_idents([VariableDecl::new("acme.x", Type::int())]).unwrap();
        let x = env.lookup_ident("x").unwrap();
        assert_eq!(x.name(), "acme.x");
    }

    #[test]
    fn test_provider_hits_are_cached() {
        let env = env("acme.v1");
        let order = env.lookup_ident("Order").unwrap();
        assert_eq!(order.name(), "acme.v1.Order");
        assert_eq!(order.ty().kind(), Kind::Type);
        assert_eq!(order.ty().parameters()[0].type_name(), "acme.v1.Order");

        // Visible from an inner scope without asking the provider again
        let inner = env.enter_scope();
        assert!(inner.declarations.find_ident("acme.v1.Order").is_some());

        let closed = env.lookup_ident("Status.CLOSED").unwrap();
        assert_eq!(closed.ty(), &Type::int());
        assert_eq!(closed.value(), Some(&Constant::Int(2)));

        assert!(env.lookup_ident("Status.MISSING").is_none());
    }

    #[test]
    fn test_overlapping_identifier() {
        let mut env = env("");
        env.add_idents([VariableDecl::new("x", Type::int())]).unwrap();
        env.add_idents([VariableDecl::new("x", Type::int())]).unwrap();
        let err = env.add_idents([VariableDecl::new("x", Type::string())]).unwrap_err();
        assert_eq!(err, DeclError::OverlappingIdentifier { name: "x".to_string() });
    }

    #[test]
    fn test_macro_shaped_function_rejected() {
        let mut env = env("");
        let has = FunctionDecl::with_overloads(
            "has",
            [OverloadDecl::global("has_dyn", vec![Type::dyn_type()], Type::bool())],
        )
        .unwrap();
        let err = env.add_functions([has]).unwrap_err();
        assert!(matches!(err, DeclError::OverlappingMacro { arg_count: 1, .. }));

        // Same name with a different arity is fine
        let has2 = FunctionDecl::with_overloads(
            "has",
            [OverloadDecl::global("has_two", vec![Type::dyn_type(), Type::string()], Type::bool())],
        )
        .unwrap();
        env.add_functions([has2]).unwrap();
    }

    #[test]
    fn test_functions_merge() {
        let mut env = env("");
        let size = FunctionDecl::with_overloads(
            "size",
            [OverloadDecl::member("acme_size", vec![Type::object("acme.v1.Order")], Type::int())],
        )
        .unwrap();
        env.add_functions([size]).unwrap();
        let decl = env.lookup_function("size").unwrap();
        assert!(decl.overload("acme_size").is_some());
        assert!(decl.overload("size_string").is_some());
    }

    #[test]
    fn test_disabled_declaration_hidden() {
        let mut env = env("");
        let mut f = FunctionDecl::with_overloads(
            "legacy",
            [OverloadDecl::global("legacy_int", vec![Type::int()], Type::int())],
        )
        .unwrap();
        f.set_declaration_disabled(true);
        env.add_functions([f]).unwrap();
        assert!(env.lookup_function("legacy").is_none());
    }

    #[test]
    fn test_overload_filters() {
        let env = env("");
        assert!(env.is_overload_disabled("less_int64_double"));
        assert!(!env.is_overload_disabled("less_int64"));

        let options = CheckerOptions {
            cross_type_numeric_comparisons: true,
            disabled_overloads: vec!["add_string".to_string()],
            ..Default::default()
        };
        let env = Env::standard(Container::default(), registry(), options).unwrap();
        assert!(!env.is_overload_disabled("less_int64_double"));
        assert!(env.is_overload_disabled("add_string"));
    }

    #[test]
    fn test_cloned_env_declarations_stay_private() {
        let base = env("");
        let mut derived = base.clone();
        derived.add_idents([VariableDecl::new("secret", Type::int())]).unwrap();
        let legacy = FunctionDecl::with_overloads(
            "legacy",
            [OverloadDecl::global("legacy_int", vec![Type::int()], Type::int())],
        )
        .unwrap();
        derived.add_functions([legacy]).unwrap();

        assert_eq!(derived.lookup_ident("secret").unwrap().ty(), &Type::int());
        assert!(derived.lookup_function("legacy").is_some());
        assert!(base.lookup_ident("secret").is_none());
        assert!(base.lookup_function("legacy").is_none());

        // An independent clone may declare the same name with another type
        let mut other = base.clone();
        other.add_idents([VariableDecl::new("secret", Type::string())]).unwrap();
        assert_eq!(other.lookup_ident("secret").unwrap().ty(), &Type::string());
        assert_eq!(derived.lookup_ident("secret").unwrap().ty(), &Type::int());
    }

    #[test]
    fn test_scopes_do_not_leak() {
        let outer = env("");
        let inner = outer.enter_scope();
        inner.declare_local(VariableDecl::new("x", Type::int()));
        assert!(inner.lookup_ident("x").is_some());

        let back = inner.exit_scope();
        assert_eq!(back.scope_depth(), 1);
        assert!(back.lookup_ident("x").is_none());
        assert!(outer.lookup_ident("x").is_none());
        assert_eq!(back.exit_scope().scope_depth(), 1);
    }
}
