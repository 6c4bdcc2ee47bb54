//! Type checker
//!
//! The checker walks an expression tree once, assigning every node a type
//! and resolving identifiers and calls against the [`Env`]. Problems are
//! recorded and the walk continues with `error` or `dyn` standing in for the
//! offending node, so one pass surfaces every independent diagnostic.
//!
//! Type parameters are unified through a single substitution mapping owned by
//! the checker. Once the walk is done every recorded type is resolved through
//! that mapping, with still-unbound parameters defaulting to `dyn`.

use cel_types::{
    is_assignable, is_assignable_list, is_well_known, most_general, substitute, Kind, Type,
    TypeMapping,
};
use rustc_hash::FxHashMap;

use crate::ast::{Comprehension, Constant, Expr, ExprId, ExprKind, ReferenceInfo};
use crate::decls::{FunctionDecl, OverloadDecl, VariableDecl};
use crate::env::Env;
use crate::error::{CheckError, CheckErrors};
use crate::overloads::{LOGICAL_AND, LOGICAL_OR, OPT_SELECT, SELECT_OPTIONAL_FIELD_OVERLOAD};
use crate::source::SourceInfo;

/// Outcome of checking one expression
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// The expression with identifiers and calls rewritten to resolved names
    pub expr: Expr,
    /// Type of every checked node
    pub types: FxHashMap<ExprId, Type>,
    /// Resolved identifier or overloads of every identifier, select and call node
    pub references: FxHashMap<ExprId, ReferenceInfo>,
    /// Diagnostics in report order
    pub errors: CheckErrors,
}

impl CheckResult {
    /// Type of the root node
    pub fn result_type(&self) -> Option<&Type> {
        self.types.get(&self.expr.id)
    }

    /// Type of any node
    pub fn type_of(&self, id: ExprId) -> Option<&Type> {
        self.types.get(&id)
    }

    /// Reference recorded for a node
    pub fn reference(&self, id: ExprId) -> Option<&ReferenceInfo> {
        self.references.get(&id)
    }

    /// Whether any diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The checked result, or the diagnostics if there were any
    pub fn into_result(self) -> Result<CheckResult, CheckErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}

/// Check `expr` against `env`
pub fn check(env: &Env, source: &SourceInfo, expr: Expr) -> CheckResult {
    Checker::new(env, source).check(expr)
}

/// Single-use checker bound to one environment and one source
pub struct Checker<'a> {
    env: Env,
    source: &'a SourceInfo,

    /// Substitutions for type parameters, grown as unification succeeds
    mappings: TypeMapping,
    free_type_var_counter: usize,

    types: FxHashMap<ExprId, Type>,
    references: FxHashMap<ExprId, ReferenceInfo>,
    errors: CheckErrors,
}

impl<'a> Checker<'a> {
    /// Create a checker
    pub fn new(env: &Env, source: &'a SourceInfo) -> Self {
        Checker {
            env: env.clone(),
            source,
            mappings: TypeMapping::new(),
            free_type_var_counter: 0,
            types: FxHashMap::default(),
            references: FxHashMap::default(),
            errors: CheckErrors::new(source.description.clone()),
        }
    }

    /// Check the expression and resolve every recorded type
    pub fn check(mut self, mut expr: Expr) -> CheckResult {
        self.check_expr(&mut expr);

        let mappings = &self.mappings;
        for t in self.types.values_mut() {
            *t = substitute(mappings, t, true);
        }

        CheckResult {
            expr,
            types: self.types,
            references: self.references,
            errors: self.errors,
        }
    }

    fn check_expr(&mut self, e: &mut Expr) {
        match e.kind {
            ExprKind::NotSet => {
                self.report(CheckError::Internal {
                    message: "unrecognized expression kind".to_string(),
                    id: e.id,
                });
                self.set_type(e, Type::error());
            }
            ExprKind::Const(_) => self.check_const(e),
            ExprKind::Ident { .. } => self.check_ident(e),
            ExprKind::Select { .. } => self.check_select(e),
            ExprKind::Call { .. } => self.check_call(e),
            ExprKind::List { .. } => self.check_list(e),
            ExprKind::Map { .. } => self.check_map(e),
            ExprKind::Struct { .. } => self.check_struct(e),
            ExprKind::Comprehension(_) => self.check_comprehension(e),
        }
    }

    fn check_const(&mut self, e: &mut Expr) {
        if let ExprKind::Const(c) = &e.kind {
            let t = c.cel_type();
            self.set_type(e, t);
        }
    }

    fn check_ident(&mut self, e: &mut Expr) {
        let ExprKind::Ident { name } = &e.kind else {
            return;
        };
        let name = name.clone();
        match self.env.lookup_ident(&name) {
            Some(decl) => self.resolve_ident(e, &decl),
            None => {
                self.set_type(e, Type::error());
                self.report_undeclared(name, e.id);
            }
        }
    }

    /// Type `e` as the declared identifier and rewrite it to the resolved name
    fn resolve_ident(&mut self, e: &mut Expr, decl: &VariableDecl) {
        self.set_type(e, decl.ty().clone());
        self.set_reference(e, ReferenceInfo::ident(decl.name(), decl.value().cloned()));
        e.kind = ExprKind::Ident {
            name: decl.name().to_string(),
        };
    }

    // ========================================================================
    // Field selection
    // ========================================================================

    fn check_select(&mut self, e: &mut Expr) {
        // `a.b.c` may name a qualified identifier rather than a field path
        if let Some(qualified) = e.qualified_name() {
            if let Some(decl) = self.env.lookup_ident(&qualified) {
                self.resolve_ident(e, &decl);
                return;
            }
        }

        let id = e.id;
        let ExprKind::Select {
            operand,
            field,
            test_only,
            optional,
        } = &mut e.kind
        else {
            return;
        };
        let (field, test_only, optional) = (field.clone(), *test_only, *optional);

        let mut result = self.check_select_field(id, operand, &field, optional);
        if test_only {
            result = Type::bool();
        }
        let result = substitute(&self.mappings, &result, false);
        self.set_type(e, result);
        if optional {
            self.set_reference(e, ReferenceInfo::function(SELECT_OPTIONAL_FIELD_OVERLOAD));
        }
    }

    fn check_select_field(&mut self, id: ExprId, operand: &mut Expr, field: &str, optional: bool) -> Type {
        self.check_expr(operand);
        let operand_type = substitute(&self.mappings, &self.get_type(operand.id), false);
        let operand_optional = operand_type.is_optional();
        let target = operand_type
            .optional_inner()
            .cloned()
            .unwrap_or_else(|| operand_type.clone());

        let result = match target.kind() {
            Kind::Map => target.parameter(1).cloned().unwrap_or_else(Type::dyn_type),
            Kind::Struct => self
                .lookup_field_type(id, target.type_name(), field)
                .unwrap_or_else(Type::error),
            Kind::TypeParam => {
                // Pin the parameter to dyn so later uses cannot narrow it
                self.is_assignable(&Type::dyn_type(), &target);
                Type::dyn_type()
            }
            _ => {
                if !target.is_dyn_or_error() {
                    self.report(CheckError::FieldSelectionUnsupported {
                        ty: target.to_string(),
                        id,
                    });
                }
                Type::dyn_type()
            }
        };

        if operand_optional || optional {
            Type::optional(result)
        } else {
            result
        }
    }

    fn lookup_field_type(&mut self, id: ExprId, struct_name: &str, field: &str) -> Option<Type> {
        if self.env.provider().find_struct_type(struct_name).is_none() {
            self.report(CheckError::UnexpectedFailedResolution {
                name: struct_name.to_string(),
                id,
            });
            return None;
        }
        match self.env.provider().find_struct_field_type(struct_name, field) {
            Some(ft) => Some(ft.ty),
            None => {
                self.report(CheckError::UndefinedField {
                    field: field.to_string(),
                    id,
                });
                None
            }
        }
    }

    /// `_?._(operand, "field")`
    fn check_opt_select(&mut self, e: &mut Expr) {
        let id = e.id;
        let ExprKind::Call { args, .. } = &mut e.kind else {
            return;
        };
        let arg_count = args.len();

        let outcome = match args.as_mut_slice() {
            [operand, field] => match &field.kind {
                ExprKind::Const(Constant::String(name)) => {
                    let name = name.clone();
                    Ok(self.check_select_field(id, operand, &name, true))
                }
                _ => Err(CheckError::NotAnOptionalFieldSelection {
                    field: field.describe(),
                    id: field.id,
                }),
            },
            _ => Err(CheckError::Internal {
                message: format!("{} expects 2 arguments, got {}", OPT_SELECT, arg_count),
                id,
            }),
        };

        match outcome {
            Ok(result) => {
                let result = substitute(&self.mappings, &result, false);
                self.set_type(e, result);
                self.set_reference(e, ReferenceInfo::function(SELECT_OPTIONAL_FIELD_OVERLOAD));
            }
            Err(err) => {
                self.report(err);
                self.set_type(e, Type::error());
            }
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn check_call(&mut self, e: &mut Expr) {
        if matches!(&e.kind, ExprKind::Call { function, .. } if function == OPT_SELECT) {
            self.check_opt_select(e);
            return;
        }

        let id = e.id;
        let ExprKind::Call {
            function,
            target,
            args,
        } = &mut e.kind
        else {
            return;
        };

        for arg in args.iter_mut() {
            self.check_expr(arg);
        }
        let arg_ids: Vec<ExprId> = args.iter().map(|a| a.id).collect();

        // Given `a.b.c()`, either `a.b.c` is a global function or `c` is called on `a.b`
        let namespaced = target
            .as_deref()
            .and_then(Expr::qualified_name)
            .and_then(|prefix| self.env.lookup_function(&format!("{}.{}", prefix, function)));

        let resolved = if let Some(decl) = namespaced {
            *function = decl.name().to_string();
            *target = None;
            Some((decl, None))
        } else if let Some(receiver) = target.as_deref_mut() {
            self.check_expr(receiver);
            let receiver_id = receiver.id;
            self.env
                .lookup_function(function.as_str())
                .map(|decl| (decl, Some(receiver_id)))
        } else {
            let decl = self.env.lookup_function(function.as_str());
            if let Some(decl) = &decl {
                *function = decl.name().to_string();
            }
            decl.map(|decl| (decl, None))
        };
        let function_name = function.clone();

        match resolved {
            Some((decl, target_id)) => {
                match self.resolve_overload(id, &decl, target_id, &arg_ids) {
                    Some((result, reference)) => {
                        self.set_type(e, result);
                        self.set_reference(e, reference);
                    }
                    None => self.set_type(e, Type::error()),
                }
            }
            None => {
                self.set_type(e, Type::error());
                self.report_undeclared(function_name, id);
            }
        }
    }

    fn resolve_overload(
        &mut self,
        id: ExprId,
        decl: &FunctionDecl,
        target: Option<ExprId>,
        args: &[ExprId],
    ) -> Option<(Type, ReferenceInfo)> {
        let arg_ids: Vec<ExprId> = target.into_iter().chain(args.iter().copied()).collect();
        let mut arg_types: Vec<Type> = arg_ids.iter().map(|arg| self.get_type(*arg)).collect();

        let mut result_type: Option<Type> = None;
        let mut reference: Option<ReferenceInfo> = None;

        for overload in decl.overload_decls() {
            if self.env.is_overload_disabled(overload.id()) {
                continue;
            }
            if target.is_some() != overload.is_member_function() {
                continue;
            }

            // The parser may collapse a chain of `&&` or `||` into one variadic call
            if decl.name() == LOGICAL_AND || decl.name() == LOGICAL_OR {
                let mut failed = false;
                for (arg, arg_type) in arg_ids.iter().zip(&arg_types) {
                    if !self.is_assignable(arg_type, &Type::bool()) {
                        self.report(CheckError::TypeMismatch {
                            expected: Type::bool().to_string(),
                            actual: arg_type.to_string(),
                            id: *arg,
                        });
                        failed = true;
                    }
                }
                if failed {
                    return None;
                }
                return Some((Type::bool(), ReferenceInfo::function(overload.id())));
            }

            let (formals, result) = self.instantiate(overload);
            if !self.is_assignable_list(&arg_types, &formals) {
                continue;
            }
            reference
                .get_or_insert_with(ReferenceInfo::default)
                .add_overload(overload.id());

            let overload_result = substitute(&self.mappings, &result, false);
            result_type = match result_type {
                None => Some(overload_result),
                Some(current) if !current.is_dyn() && !overload_result.is_exact_type(&current) => {
                    Some(Type::dyn_type())
                }
                current => current,
            };
        }

        if let (Some(result), Some(reference)) = (result_type, reference) {
            return Some((result, reference));
        }

        for t in arg_types.iter_mut() {
            *t = substitute(&self.mappings, t, true);
        }
        self.report(CheckError::NoMatchingOverload {
            function: decl.name().to_string(),
            signature: format_signature(&arg_types, target.is_some()),
            id,
        });
        None
    }

    /// Formal argument and result types with fresh type variables for the overload's parameters
    fn instantiate(&mut self, overload: &OverloadDecl) -> (Vec<Type>, Type) {
        let params = overload.type_params();
        if params.is_empty() {
            return (overload.arg_types().to_vec(), overload.result_type().clone());
        }
        let mut fresh = TypeMapping::new();
        for param in params {
            let var = self.new_type_var();
            fresh.add(&Type::type_param(param), var);
        }
        let formals = overload
            .arg_types()
            .iter()
            .map(|t| substitute(&fresh, t, false))
            .collect();
        (formals, substitute(&fresh, overload.result_type(), false))
    }

    // ========================================================================
    // Aggregate literals
    // ========================================================================

    fn check_list(&mut self, e: &mut Expr) {
        let ExprKind::List {
            elements,
            optional_indices,
        } = &mut e.kind
        else {
            return;
        };

        let mut elem_type: Option<Type> = None;
        for (i, elem) in elements.iter_mut().enumerate() {
            self.check_expr(elem);
            let mut t = self.get_type(elem.id);
            if optional_indices.contains(&i) {
                t = self.unwrap_optional_entry(elem.id, t);
            }
            elem_type = Some(self.join_types(elem.id, elem_type, t));
        }

        let elem_type = match elem_type {
            Some(t) => t,
            None => self.new_type_var(),
        };
        self.set_type(e, Type::list(elem_type));
    }

    fn check_map(&mut self, e: &mut Expr) {
        let ExprKind::Map { entries } = &mut e.kind else {
            return;
        };

        let mut key_type: Option<Type> = None;
        let mut value_type: Option<Type> = None;
        for entry in entries.iter_mut() {
            self.check_expr(&mut entry.key);
            let k = self.get_type(entry.key.id);
            key_type = Some(self.join_types(entry.key.id, key_type, k));

            self.check_expr(&mut entry.value);
            let mut v = self.get_type(entry.value.id);
            if entry.optional {
                v = self.unwrap_optional_entry(entry.value.id, v);
            }
            value_type = Some(self.join_types(entry.value.id, value_type, v));
        }

        let (key_type, value_type) = match (key_type, value_type) {
            (Some(k), Some(v)) => (k, v),
            _ => (self.new_type_var(), self.new_type_var()),
        };
        self.set_type(e, Type::map(key_type, value_type));
    }

    fn check_struct(&mut self, e: &mut Expr) {
        let id = e.id;
        let ExprKind::Struct {
            message_name,
            fields,
        } = &mut e.kind
        else {
            return;
        };

        let Some(decl) = self.env.lookup_ident(message_name) else {
            let name = message_name.clone();
            self.set_type(e, Type::error());
            self.report_undeclared(name, id);
            return;
        };

        let ident_name = decl.name().to_string();
        let mut type_name = ident_name.clone();
        let mut result = Type::error();
        match decl.ty().kind() {
            Kind::Error => {}
            Kind::Type => match decl.ty().parameter(0) {
                // Well-known types may be constructed by their message name
                Some(target) if is_well_known(&type_name) => result = target.clone(),
                Some(target) if target.kind() == Kind::Struct => {
                    type_name = target.declared_type_name();
                    result = target.clone();
                }
                Some(target) => self.report(CheckError::NotAMessageType {
                    name: target.declared_type_name(),
                    id,
                }),
                None => self.report(CheckError::NotAType {
                    name: ident_name.clone(),
                    id,
                }),
            },
            _ => self.report(CheckError::NotAType {
                name: ident_name.clone(),
                id,
            }),
        }
        *message_name = type_name.clone();

        let resolved = result.kind() != Kind::Error;
        for f in fields.iter_mut() {
            self.check_expr(&mut f.value);
            let field_type = if resolved {
                self.lookup_field_type(f.id, &type_name, &f.field)
                    .unwrap_or_else(Type::error)
            } else {
                Type::error()
            };
            let mut value_type = self.get_type(f.value.id);
            if f.optional {
                value_type = self.unwrap_optional_entry(f.value.id, value_type);
            }
            if !self.is_assignable(&field_type, &value_type) {
                self.report(CheckError::FieldTypeMismatch {
                    field: f.field.clone(),
                    expected: field_type.to_string(),
                    actual: value_type.to_string(),
                    id: f.id,
                });
            }
        }

        self.set_type(e, result);
        self.set_reference(e, ReferenceInfo::ident(ident_name, None));
    }

    /// Element type of an optional entry; anything else must be `dyn`
    fn unwrap_optional_entry(&mut self, id: ExprId, t: Type) -> Type {
        let t = substitute(&self.mappings, &t, false);
        if let Some(inner) = t.optional_inner() {
            return inner.clone();
        }
        if !t.is_dyn() {
            self.report(CheckError::TypeMismatch {
                expected: Type::optional(t.clone()).to_string(),
                actual: t.to_string(),
                id,
            });
        }
        t
    }

    /// Running element type of an aggregate literal
    fn join_types(&mut self, id: ExprId, previous: Option<Type>, current: Type) -> Type {
        let Some(previous) = previous else {
            return current;
        };
        if self.is_assignable(&previous, &current) {
            return most_general(&previous, &current);
        }
        if !self.env.options().homogeneous_aggregate_literals {
            return Type::dyn_type();
        }
        self.report(CheckError::TypeMismatch {
            expected: previous.to_string(),
            actual: current.to_string(),
            id,
        });
        Type::error()
    }

    // ========================================================================
    // Comprehensions
    // ========================================================================

    fn check_comprehension(&mut self, e: &mut Expr) {
        let ExprKind::Comprehension(comp) = &mut e.kind else {
            return;
        };
        let comp: &mut Comprehension = comp;

        self.check_expr(&mut comp.iter_range);
        self.check_expr(&mut comp.accu_init);
        let range_id = comp.iter_range.id;
        let range_type = substitute(&self.mappings, &self.get_type(range_id), false);
        let accu_type = self.get_type(comp.accu_init.id);
        let two_vars = comp.iter_var2.is_some();

        let result_type = self.with_scope(|c| {
            c.env
                .declare_local(VariableDecl::new(comp.accu_var.as_str(), accu_type.clone()));
            let (var_type, var2_type) = c.iteration_types(range_id, &range_type, two_vars);

            c.with_scope(|c| {
                c.env
                    .declare_local(VariableDecl::new(comp.iter_var.as_str(), var_type));
                if let Some(var2) = &comp.iter_var2 {
                    c.env.declare_local(VariableDecl::new(var2.as_str(), var2_type));
                }
                c.check_expr(&mut comp.loop_condition);
                c.assert_type(&comp.loop_condition, &Type::bool());
                c.check_expr(&mut comp.loop_step);
                c.assert_type(&comp.loop_step, &accu_type);
            });

            // The result sees the accumulator but not the iteration variables
            c.check_expr(&mut comp.result);
            c.get_type(comp.result.id)
        });

        let result_type = substitute(&self.mappings, &result_type, false);
        self.set_type(e, result_type);
    }

    /// Types of the first and second iteration variables for a range type
    fn iteration_types(&mut self, range_id: ExprId, range_type: &Type, two_vars: bool) -> (Type, Type) {
        match range_type.kind() {
            Kind::List => {
                let elem = range_type.parameter(0).cloned().unwrap_or_else(Type::dyn_type);
                if two_vars {
                    (Type::int(), elem)
                } else {
                    (elem, Type::dyn_type())
                }
            }
            Kind::Map => (
                range_type.parameter(0).cloned().unwrap_or_else(Type::dyn_type),
                range_type.parameter(1).cloned().unwrap_or_else(Type::dyn_type),
            ),
            Kind::Dyn | Kind::Error | Kind::TypeParam => {
                self.is_assignable(&Type::dyn_type(), range_type);
                (Type::dyn_type(), Type::dyn_type())
            }
            _ => {
                self.report(CheckError::NotAComprehensionRange {
                    ty: range_type.to_string(),
                    id: range_id,
                });
                (Type::error(), Type::error())
            }
        }
    }

    /// Run `f` in a fresh innermost scope; the outer environment is restored afterwards
    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = self.env.clone();
        self.env = outer.enter_scope();
        let result = f(self);
        self.env = outer;
        result
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn assert_type(&mut self, e: &Expr, expected: &Type) {
        let actual = self.get_type(e.id);
        if !self.is_assignable(expected, &actual) {
            self.report(CheckError::TypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                id: e.id,
            });
        }
    }

    fn is_assignable(&mut self, t1: &Type, t2: &Type) -> bool {
        match is_assignable(&self.mappings, t1, t2) {
            Some(mappings) => {
                self.mappings = mappings;
                true
            }
            None => false,
        }
    }

    fn is_assignable_list(&mut self, l1: &[Type], l2: &[Type]) -> bool {
        match is_assignable_list(&self.mappings, l1, l2) {
            Some(mappings) => {
                self.mappings = mappings;
                true
            }
            None => false,
        }
    }

    fn new_type_var(&mut self) -> Type {
        let var = Type::type_param(format!("_var{}", self.free_type_var_counter));
        self.free_type_var_counter += 1;
        var
    }

    fn get_type(&self, id: ExprId) -> Type {
        self.types.get(&id).cloned().unwrap_or_else(Type::error)
    }

    /// Record the type of a node; a different earlier type is reported and replaced
    fn set_type(&mut self, e: &Expr, t: Type) {
        let conflict = self
            .types
            .get(&e.id)
            .filter(|old| !old.is_exact_type(&t))
            .map(|old| CheckError::IncompatibleType {
                expr: e.describe(),
                old: old.to_string(),
                new: t.to_string(),
                id: e.id,
            });
        if let Some(err) = conflict {
            self.report(err);
        }
        self.types.insert(e.id, t);
    }

    /// Record the reference of a node; a different earlier reference is reported and replaced
    fn set_reference(&mut self, e: &Expr, reference: ReferenceInfo) {
        let conflict = self
            .references
            .get(&e.id)
            .filter(|old| **old != reference)
            .map(|old| CheckError::ReferenceRedefinition {
                expr: e.describe(),
                old: describe_reference(old),
                new: describe_reference(&reference),
                id: e.id,
            });
        if let Some(err) = conflict {
            self.report(err);
        }
        self.references.insert(e.id, reference);
    }

    fn report_undeclared(&mut self, name: String, id: ExprId) {
        let container = self.env.container().name().to_string();
        self.report(CheckError::UndeclaredReference {
            name,
            container,
            id,
        });
    }

    fn report(&mut self, error: CheckError) {
        self.errors.report(error, self.source);
    }
}

/// `(a, b)` for global calls, `a.(b)` for member calls
fn format_signature(arg_types: &[Type], is_member: bool) -> String {
    let (prefix, args) = match arg_types.split_first() {
        Some((target, rest)) if is_member => (format!("{}.", target), rest),
        _ => (String::new(), arg_types),
    };
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("{}({})", prefix, args.join(", "))
}

fn describe_reference(reference: &ReferenceInfo) -> String {
    if reference.name.is_empty() {
        format!("[{}]", reference.overload_ids.join(", "))
    } else {
        reference.name.clone()
    }
}
