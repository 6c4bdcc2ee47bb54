//! Variable and function declarations
//!
//! Declarations are assembled once (standard library plus user config) and
//! handed to the [`Env`](crate::env::Env). A [`FunctionDecl`] keeps its
//! overloads in insertion order and rejects overloads whose signatures
//! overlap.

use std::fmt;
use std::sync::Arc;

use cel_types::{Kind, TraitMask, Type};
use rustc_hash::FxHashMap;

use crate::ast::Constant;
use crate::error::DeclError;

// ============================================================================
// Variables
// ============================================================================

/// A named, typed identifier with an optional constant value
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    name: String,
    ty: Type,
    value: Option<Constant>,
}

impl VariableDecl {
    /// Variable `name` of type `ty`
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        VariableDecl {
            name: name.into(),
            ty,
            value: None,
        }
    }

    /// Constant `name` of type `ty` with a known value
    pub fn constant(name: impl Into<String>, ty: Type, value: Constant) -> Self {
        VariableDecl {
            name: name.into(),
            ty,
            value: Some(value),
        }
    }

    /// Identifier naming the type `t`, typed `type(t)`
    pub fn type_variable(t: Type) -> Self {
        VariableDecl::new(t.type_name().to_string(), Type::type_of(t))
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Constant value, if any
    pub fn value(&self) -> Option<&Constant> {
        self.value.as_ref()
    }

    /// Same name and equivalent type
    pub fn is_equivalent(&self, other: &VariableDecl) -> bool {
        self.name == other.name && self.ty.is_equivalent_type(&other.ty)
    }

    /// Copy with well-known message types replaced by their checked form
    pub fn sanitized(&self) -> Self {
        VariableDecl {
            name: self.name.clone(),
            ty: self.ty.sanitize(),
            value: self.value.clone(),
        }
    }
}

// ============================================================================
// Overloads
// ============================================================================

/// Unary implementation
pub type UnaryOp = Arc<dyn Fn(&Constant) -> Option<Constant> + Send + Sync>;
/// Binary implementation
pub type BinaryOp = Arc<dyn Fn(&Constant, &Constant) -> Option<Constant> + Send + Sync>;
/// Variadic implementation
pub type FunctionOp = Arc<dyn Fn(&[Constant]) -> Option<Constant> + Send + Sync>;

/// Runtime implementation attached to an overload; `None` results mean no such overload
#[derive(Clone)]
pub enum OverloadImpl {
    /// One argument
    Unary(UnaryOp),
    /// Two arguments
    Binary(BinaryOp),
    /// Any number of arguments
    Function(FunctionOp),
}

impl OverloadImpl {
    /// Invoke with a slice of arguments, checking arity for unary and binary forms
    pub fn call(&self, args: &[Constant]) -> Option<Constant> {
        match (self, args) {
            (OverloadImpl::Unary(op), [a]) => op(a),
            (OverloadImpl::Binary(op), [a, b]) => op(a, b),
            (OverloadImpl::Function(op), args) => op(args),
            _ => None,
        }
    }

    fn same_as(&self, other: &OverloadImpl) -> bool {
        match (self, other) {
            (OverloadImpl::Unary(a), OverloadImpl::Unary(b)) => Arc::ptr_eq(a, b),
            (OverloadImpl::Binary(a), OverloadImpl::Binary(b)) => Arc::ptr_eq(a, b),
            (OverloadImpl::Function(a), OverloadImpl::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for OverloadImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverloadImpl::Unary(_) => write!(f, "Unary(..)"),
            OverloadImpl::Binary(_) => write!(f, "Binary(..)"),
            OverloadImpl::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// One concrete signature of a function
#[derive(Debug, Clone)]
pub struct OverloadDecl {
    id: String,
    arg_types: Vec<Type>,
    result_type: Type,
    is_member: bool,
    non_strict: bool,
    operand_traits: TraitMask,
    implementation: Option<OverloadImpl>,
}

impl OverloadDecl {
    /// Global overload `f(args) -> result`
    pub fn global(id: impl Into<String>, arg_types: Vec<Type>, result_type: Type) -> Self {
        OverloadDecl {
            id: id.into(),
            arg_types,
            result_type,
            is_member: false,
            non_strict: false,
            operand_traits: TraitMask::NONE,
            implementation: None,
        }
    }

    /// Member overload `args[0].f(args[1..]) -> result`
    pub fn member(id: impl Into<String>, arg_types: Vec<Type>, result_type: Type) -> Self {
        OverloadDecl {
            is_member: true,
            ..Self::global(id, arg_types, result_type)
        }
    }

    /// Accept error and unknown arguments
    pub fn non_strict(mut self) -> Self {
        self.non_strict = true;
        self
    }

    /// Require operand traits
    pub fn with_operand_traits(mut self, traits: TraitMask) -> Self {
        self.operand_traits = traits;
        self
    }

    /// Attach an implementation
    pub fn with_impl(mut self, implementation: OverloadImpl) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// Overload id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Formal arguments, receiver first for member overloads
    pub fn arg_types(&self) -> &[Type] {
        &self.arg_types
    }

    /// Result type
    pub fn result_type(&self) -> &Type {
        &self.result_type
    }

    /// Whether called with receiver syntax
    pub fn is_member_function(&self) -> bool {
        self.is_member
    }

    /// Whether error/unknown arguments are accepted
    pub fn is_non_strict(&self) -> bool {
        self.non_strict
    }

    /// Required operand traits
    pub fn operand_traits(&self) -> TraitMask {
        self.operand_traits
    }

    /// Attached implementation
    pub fn implementation(&self) -> Option<&OverloadImpl> {
        self.implementation.as_ref()
    }

    /// Whether an implementation is attached
    pub fn has_binding(&self) -> bool {
        self.implementation.is_some()
    }

    /// Names of the type parameters in the signature, in first-seen order
    pub fn type_params(&self) -> Vec<String> {
        let mut names = Vec::new();
        for t in self.arg_types.iter().chain(std::iter::once(&self.result_type)) {
            collect_type_params(t, &mut names);
        }
        names
    }

    /// Same id, call style, arity and equivalent types
    pub fn signature_equals(&self, other: &OverloadDecl) -> bool {
        self.id == other.id
            && self.is_member == other.is_member
            && self.arg_types.len() == other.arg_types.len()
            && self
                .arg_types
                .iter()
                .zip(&other.arg_types)
                .all(|(a, b)| a.is_equivalent_type(b))
            && self.result_type.is_equivalent_type(&other.result_type)
    }

    /// Same call style and arity, with every argument assignable in some direction
    pub fn signature_overlaps(&self, other: &OverloadDecl) -> bool {
        self.is_member == other.is_member
            && self.arg_types.len() == other.arg_types.len()
            && self
                .arg_types
                .iter()
                .zip(&other.arg_types)
                .all(|(a, b)| a.is_assignable_type(b) || b.is_assignable_type(a))
    }

    /// Whether the runtime arguments fit the formal argument types
    pub fn matches_runtime_signature(&self, args: &[Constant]) -> bool {
        args.len() == self.arg_types.len()
            && self
                .arg_types
                .iter()
                .zip(args)
                .all(|(formal, arg)| formal.is_assignable_type(&arg.cel_type()))
    }

    fn guarded_impl(&self, disable_type_guards: bool) -> Option<OverloadImpl> {
        let implementation = self.implementation.clone()?;
        if disable_type_guards || self.arg_types.iter().all(Type::is_dyn) {
            return Some(implementation);
        }
        let guard = self.clone();
        Some(OverloadImpl::Function(Arc::new(move |args: &[Constant]| {
            if guard.matches_runtime_signature(args) {
                implementation.call(args)
            } else {
                None
            }
        })))
    }
}

fn collect_type_params(t: &Type, names: &mut Vec<String>) {
    if t.kind() == Kind::TypeParam {
        if !names.iter().any(|n| n == t.type_name()) {
            names.push(t.type_name().to_string());
        }
        return;
    }
    for p in t.parameters() {
        collect_type_params(p, names);
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Whether a function declaration participates in checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationState {
    /// Not set; merging keeps the other side's state
    #[default]
    Unspecified,
    /// Hidden from lookup
    Disabled,
    /// Visible
    Enabled,
}

/// A runtime entry point produced by [`FunctionDecl::bindings`]
#[derive(Debug, Clone)]
pub struct Binding {
    /// Overload id or function name
    pub name: String,
    /// Implementation
    pub implementation: OverloadImpl,
    /// Whether error/unknown arguments are accepted
    pub non_strict: bool,
}

/// A named function and its overloads
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    name: String,
    overloads: FxHashMap<String, OverloadDecl>,
    overload_ordinals: Vec<String>,
    singleton: Option<OverloadImpl>,
    disable_type_guards: bool,
    state: DeclarationState,
}

impl FunctionDecl {
    /// Function with no overloads
    pub fn new(name: impl Into<String>) -> Self {
        FunctionDecl {
            name: name.into(),
            overloads: FxHashMap::default(),
            overload_ordinals: Vec::new(),
            singleton: None,
            disable_type_guards: false,
            state: DeclarationState::Unspecified,
        }
    }

    /// Function with the given overloads, in order
    pub fn with_overloads(
        name: impl Into<String>,
        overloads: impl IntoIterator<Item = OverloadDecl>,
    ) -> Result<Self, DeclError> {
        let mut decl = FunctionDecl::new(name);
        for o in overloads {
            decl.add_overload(o)?;
        }
        Ok(decl)
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overloads in declaration order
    pub fn overload_decls(&self) -> impl Iterator<Item = &OverloadDecl> {
        self.overload_ordinals
            .iter()
            .filter_map(move |id| self.overloads.get(id))
    }

    /// Overload by id
    pub fn overload(&self, id: &str) -> Option<&OverloadDecl> {
        self.overloads.get(id)
    }

    /// Singleton implementation shared by every overload
    pub fn singleton(&self) -> Option<&OverloadImpl> {
        self.singleton.as_ref()
    }

    /// Set the singleton implementation
    pub fn set_singleton(&mut self, implementation: OverloadImpl) {
        self.singleton = Some(implementation);
    }

    /// Skip argument type guards in generated bindings
    pub fn set_disable_type_guards(&mut self, disable: bool) {
        self.disable_type_guards = disable;
    }

    /// Enable or disable the whole declaration
    pub fn set_declaration_disabled(&mut self, disabled: bool) {
        self.state = if disabled {
            DeclarationState::Disabled
        } else {
            DeclarationState::Enabled
        };
    }

    /// Whether the declaration is disabled
    pub fn is_declaration_disabled(&self) -> bool {
        self.state == DeclarationState::Disabled
    }

    /// Current state
    pub fn state(&self) -> DeclarationState {
        self.state
    }

    /// Add an overload, rejecting overlapping signatures
    ///
    /// Re-adding an overload with an identical signature is accepted; the new
    /// declaration replaces the old one only when it carries an implementation.
    pub fn add_overload(&mut self, overload: OverloadDecl) -> Result<(), DeclError> {
        for id in &self.overload_ordinals {
            let Some(existing) = self.overloads.get(id) else {
                continue;
            };
            if id != overload.id() && existing.signature_overlaps(&overload) {
                return Err(DeclError::OverloadCollision {
                    function: self.name.clone(),
                    overload: overload.id().to_string(),
                    existing: id.clone(),
                });
            }
            if id == overload.id() {
                if existing.signature_equals(&overload)
                    && existing.is_non_strict() == overload.is_non_strict()
                {
                    if overload.has_binding() {
                        self.overloads.insert(id.clone(), overload);
                    }
                    return Ok(());
                }
                return Err(DeclError::OverloadRedefinition {
                    function: self.name.clone(),
                    overload: id.clone(),
                });
            }
        }
        self.overload_ordinals.push(overload.id().to_string());
        self.overloads.insert(overload.id().to_string(), overload);
        Ok(())
    }

    /// Combine with another declaration of the same function
    ///
    /// Overloads keep their order: this declaration's first, then the other's.
    pub fn merge(&self, other: &FunctionDecl) -> Result<FunctionDecl, DeclError> {
        if self.name != other.name {
            return Err(DeclError::UnrelatedMerge {
                function: self.name.clone(),
                other: other.name.clone(),
            });
        }
        let mut merged = FunctionDecl {
            name: self.name.clone(),
            overloads: self.overloads.clone(),
            overload_ordinals: self.overload_ordinals.clone(),
            singleton: self.singleton.clone(),
            disable_type_guards: self.disable_type_guards && other.disable_type_guards,
            state: self.state,
        };
        for o in other.overload_decls() {
            merged.add_overload(o.clone())?;
        }
        if let Some(singleton) = &other.singleton {
            if let Some(existing) = &merged.singleton {
                if !existing.same_as(singleton) {
                    return Err(DeclError::SingletonConflict {
                        function: self.name.clone(),
                    });
                }
            }
            merged.singleton = Some(singleton.clone());
        }
        if other.state != DeclarationState::Unspecified {
            merged.state = other.state;
        }
        Ok(merged)
    }

    /// Runtime entry points for this function
    ///
    /// A singleton yields one entry under the function name. A single bound
    /// overload yields its id plus the function name as an alias. Several bound
    /// overloads yield one entry each plus a dispatcher under the function name
    /// that picks the first overload whose signature fits the arguments.
    pub fn bindings(&self) -> Result<Vec<Binding>, DeclError> {
        let mut bindings = Vec::new();
        let mut non_strict = false;
        for o in self.overload_decls() {
            if let Some(implementation) = o.guarded_impl(self.disable_type_guards) {
                bindings.push(Binding {
                    name: o.id().to_string(),
                    implementation,
                    non_strict: o.is_non_strict(),
                });
            }
            non_strict = non_strict || o.is_non_strict();
        }

        if let Some(singleton) = &self.singleton {
            if !bindings.is_empty() {
                return Err(DeclError::SingletonConflict {
                    function: self.name.clone(),
                });
            }
            bindings.push(Binding {
                name: self.name.clone(),
                implementation: singleton.clone(),
                non_strict,
            });
        }

        match bindings.len() {
            0 => Ok(bindings),
            1 => {
                if bindings[0].name != self.name {
                    let alias = Binding {
                        name: self.name.clone(),
                        ..bindings[0].clone()
                    };
                    bindings.push(alias);
                }
                Ok(bindings)
            }
            _ => {
                let candidates: Vec<OverloadDecl> = self
                    .overload_decls()
                    .filter(|o| o.has_binding())
                    .cloned()
                    .collect();
                let dispatch = move |args: &[Constant]| {
                    candidates
                        .iter()
                        .filter(|o| o.matches_runtime_signature(args))
                        .find_map(|o| o.implementation().and_then(|imp| imp.call(args)))
                };
                bindings.push(Binding {
                    name: self.name.clone(),
                    implementation: OverloadImpl::Function(Arc::new(dispatch)),
                    non_strict,
                });
                Ok(bindings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negate_int() -> OverloadImpl {
        OverloadImpl::Unary(Arc::new(|v| match v {
            Constant::Int(i) => Some(Constant::Int(-i)),
            _ => None,
        }))
    }

    fn negate_double() -> OverloadImpl {
        OverloadImpl::Unary(Arc::new(|v| match v {
            Constant::Double(d) => Some(Constant::Double(-d)),
            _ => None,
        }))
    }

    #[test]
    fn test_type_params() {
        let o = OverloadDecl::global(
            "index_map",
            vec![Type::map(Type::type_param("K"), Type::type_param("V")), Type::type_param("K")],
            Type::type_param("V"),
        );
        assert_eq!(o.type_params(), vec!["K", "V"]);
    }

    #[test]
    fn test_collision_rejected() {
        let mut f = FunctionDecl::new("f");
        f.add_overload(OverloadDecl::global("f_int", vec![Type::int()], Type::int()))
            .unwrap();
        let err = f
            .add_overload(OverloadDecl::global("f_dyn", vec![Type::dyn_type()], Type::int()))
            .unwrap_err();
        assert!(matches!(err, DeclError::OverloadCollision { .. }));

        // Different arity does not overlap
        f.add_overload(OverloadDecl::global("f_int_int", vec![Type::int(), Type::int()], Type::int()))
            .unwrap();
        // Member style does not overlap with global style
        f.add_overload(OverloadDecl::member("int_f", vec![Type::int()], Type::int()))
            .unwrap();
        assert_eq!(f.overload_decls().count(), 3);
    }

    #[test]
    fn test_redeclaration_and_late_binding() {
        let mut f = FunctionDecl::new("-_");
        f.add_overload(OverloadDecl::global("negate_int64", vec![Type::int()], Type::int()))
            .unwrap();
        f.add_overload(
            OverloadDecl::global("negate_int64", vec![Type::int()], Type::int()).with_impl(negate_int()),
        )
        .unwrap();
        assert!(f.overload("negate_int64").unwrap().has_binding());

        let err = f
            .add_overload(OverloadDecl::global("negate_int64", vec![Type::int()], Type::double()))
            .unwrap_err();
        assert!(matches!(err, DeclError::OverloadRedefinition { .. }));
    }

    #[test]
    fn test_merge_preserves_order_and_state() {
        let base = FunctionDecl::with_overloads(
            "size",
            vec![OverloadDecl::global("size_string", vec![Type::string()], Type::int())],
        )
        .unwrap();
        let mut extra = FunctionDecl::with_overloads(
            "size",
            vec![OverloadDecl::global("size_bytes", vec![Type::bytes()], Type::int())],
        )
        .unwrap();
        extra.set_declaration_disabled(true);

        let merged = base.merge(&extra).unwrap();
        let ids: Vec<&str> = merged.overload_decls().map(|o| o.id()).collect();
        assert_eq!(ids, vec!["size_string", "size_bytes"]);
        assert!(merged.is_declaration_disabled());

        assert!(base.merge(&FunctionDecl::new("other")).is_err());
    }

    #[test]
    fn test_merge_singleton_conflict() {
        let mut a = FunctionDecl::new("f");
        a.set_singleton(negate_int());
        let mut b = FunctionDecl::new("f");
        b.set_singleton(negate_int());
        assert!(matches!(a.merge(&b), Err(DeclError::SingletonConflict { .. })));
        assert!(a.merge(&a.clone()).is_ok());
    }

    #[test]
    fn test_bindings_single_overload_aliases_name() {
        let f = FunctionDecl::with_overloads(
            "-_",
            vec![OverloadDecl::global("negate_int64", vec![Type::int()], Type::int()).with_impl(negate_int())],
        )
        .unwrap();
        let bindings = f.bindings().unwrap();
        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["negate_int64", "-_"]);
        assert_eq!(bindings[1].implementation.call(&[Constant::Int(2)]), Some(Constant::Int(-2)));
        // Type guard rejects a mismatched argument
        assert_eq!(bindings[0].implementation.call(&[Constant::Double(2.0)]), None);
    }

    #[test]
    fn test_bindings_dispatch() {
        let f = FunctionDecl::with_overloads(
            "-_",
            vec![
                OverloadDecl::global("negate_int64", vec![Type::int()], Type::int()).with_impl(negate_int()),
                OverloadDecl::global("negate_double", vec![Type::double()], Type::double())
                    .with_impl(negate_double()),
            ],
        )
        .unwrap();
        let bindings = f.bindings().unwrap();
        assert_eq!(bindings.len(), 3);
        let dispatch = &bindings[2];
        assert_eq!(dispatch.name, "-_");
        assert_eq!(dispatch.implementation.call(&[Constant::Double(1.5)]), Some(Constant::Double(-1.5)));
        assert_eq!(dispatch.implementation.call(&[Constant::Int(4)]), Some(Constant::Int(-4)));
        assert_eq!(dispatch.implementation.call(&[Constant::Bool(true)]), None);
    }

    #[test]
    fn test_variable_equivalence() {
        let a = VariableDecl::new("x", Type::list(Type::type_param("A")));
        let b = VariableDecl::new("x", Type::list(Type::type_param("B")));
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&VariableDecl::new("x", Type::list(Type::int()))));
        let t = VariableDecl::type_variable(Type::object("acme.Order"));
        assert_eq!(t.name(), "acme.Order");
        assert_eq!(t.ty().kind(), Kind::Type);
    }
}
