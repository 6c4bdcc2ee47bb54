//! End-to-end checking scenarios
//!
//! Each test builds an environment, hands the checker a tree as the parser
//! would produce it, and inspects the resulting type map, references and
//! diagnostics.

use std::sync::Arc;

use cel_checker::{
    check, CheckResult, CheckerOptions, Comprehension, Constant, Container, Env, Expr, ExprId,
    ExprKind, FunctionDecl, OverloadDecl, SourceInfo, StructField, TypeRegistry, VariableDecl,
};
use cel_types::Type;

fn registry() -> Arc<TypeRegistry> {
    let mut reg = TypeRegistry::new();
    reg.register_struct(
        "google.example.Account",
        [("id", Type::string()), ("balance", Type::int()), ("tags", Type::list(Type::string()))],
    );
    reg.register_enum("google.example.Account.Kind", [("PERSONAL", 0), ("BUSINESS", 1)]);
    Arc::new(reg)
}

fn standard_env(options: CheckerOptions) -> Env {
    Env::standard(Container::new("google.example").unwrap(), registry(), options).unwrap()
}

fn run(env: &Env, expr: Expr) -> CheckResult {
    check(env, &SourceInfo::new("<input>", ""), expr)
}

fn int(id: ExprId, v: i64) -> Expr {
    Expr::constant(id, Constant::Int(v))
}

fn string(id: ExprId, v: &str) -> Expr {
    Expr::constant(id, Constant::String(v.to_string()))
}

fn messages(result: &CheckResult) -> Vec<String> {
    result.errors.iter().map(ToString::to_string).collect()
}

/// `range.all(x, x > 0)` as expanded by the parser; `x` in the predicate has id 14
fn all_positive(range: Expr) -> Expr {
    let predicate = Expr::call(16, "_>_", vec![Expr::ident(14, "x"), int(15, 0)]);
    Expr::comprehension(
        20,
        Comprehension {
            iter_range: range,
            iter_var: "x".to_string(),
            iter_var2: None,
            accu_var: "__result__".to_string(),
            accu_init: Expr::constant(10, Constant::Bool(true)),
            loop_condition: Expr::call(
                12,
                "@not_strictly_false",
                vec![Expr::ident(11, "__result__")],
            ),
            loop_step: Expr::call(17, "_&&_", vec![Expr::ident(13, "__result__"), predicate]),
            result: Expr::ident(18, "__result__"),
        },
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_int_addition() {
    let add = FunctionDecl::with_overloads(
        "_+_",
        [OverloadDecl::global("add_int64", vec![Type::int(), Type::int()], Type::int())],
    )
    .unwrap();
    let mut env = Env::new(Container::default(), registry(), CheckerOptions::default());
    env.add_functions([add]).unwrap();

    let r = run(&env, Expr::call(3, "_+_", vec![int(1, 1), int(2, 1)]));
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.result_type(), Some(&Type::int()));
    assert_eq!(r.reference(3).unwrap().overload_ids, vec!["add_int64"]);
}

#[test]
fn test_undeclared_identifier() {
    let env = Env::new(Container::default(), registry(), CheckerOptions::default());
    let r = run(&env, Expr::ident(1, "x"));
    assert_eq!(r.result_type(), Some(&Type::error()));
    assert_eq!(messages(&r), vec!["undeclared reference to 'x' (in container '')"]);
}

#[test]
fn test_mixed_list_literal() {
    let list = || Expr::list(3, vec![int(1, 1), string(2, "a")]);

    let r = run(&standard_env(CheckerOptions::default()), list());
    assert!(!r.has_errors());
    assert_eq!(r.result_type(), Some(&Type::list(Type::dyn_type())));

    let strict = CheckerOptions {
        homogeneous_aggregate_literals: true,
        ..Default::default()
    };
    let r = run(&standard_env(strict), list());
    assert_eq!(messages(&r), vec!["expected type 'int' but found 'string'"]);
    assert_eq!(r.result_type(), Some(&Type::list(Type::error())));
}

#[test]
fn test_select_on_map_and_struct() {
    let mut env = standard_env(CheckerOptions::default());
    env.add_idents([VariableDecl::new("m", Type::map(Type::string(), Type::int()))])
        .unwrap();
    let r = run(&env, Expr::select(2, Expr::ident(1, "m"), "field"));
    assert!(!r.has_errors());
    assert_eq!(r.result_type(), Some(&Type::int()));

    let mut env = standard_env(CheckerOptions::default());
    env.add_idents([VariableDecl::new("m", Type::object("google.example.Account"))])
        .unwrap();
    let r = run(&env, Expr::select(2, Expr::ident(1, "m"), "field"));
    assert_eq!(r.result_type(), Some(&Type::error()));
    assert_eq!(messages(&r), vec!["undefined field 'field'"]);
}

#[test]
fn test_all_macro_scoping() {
    let mut env = standard_env(CheckerOptions::default());
    // `list` names the standard type identifier, so the range gets another name
    env.add_idents([VariableDecl::new("values", Type::list(Type::int()))])
        .unwrap();

    let r = run(&env, all_positive(Expr::ident(1, "values")));
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.result_type(), Some(&Type::bool()));
    assert_eq!(r.type_of(14), Some(&Type::int()));
    assert_eq!(r.reference(14).unwrap().name, "x");

    // Iteration and accumulator variables never reach the outer environment
    assert!(env.lookup_ident("x").is_none());
    assert!(env.lookup_ident("__result__").is_none());
    let r = run(&env, Expr::ident(1, "x"));
    assert!(r.has_errors());
}

#[test]
fn test_struct_literal_names() {
    let env = standard_env(CheckerOptions::default());

    let r = run(&env, Expr::structure(1, "Missing", vec![]));
    assert_eq!(r.result_type(), Some(&Type::error()));
    assert_eq!(
        messages(&r),
        vec!["undeclared reference to 'Missing' (in container 'google.example')"]
    );

    let r = run(&env, Expr::structure(1, "int", vec![]));
    assert_eq!(messages(&r), vec!["'int' is not a message type"]);

    let fields = vec![
        StructField {
            id: 2,
            field: "id".to_string(),
            value: string(3, "acct-1"),
            optional: false,
        },
        StructField {
            id: 4,
            field: "balance".to_string(),
            value: string(5, "lots"),
            optional: false,
        },
    ];
    let r = run(&env, Expr::structure(1, "Account", fields));
    assert_eq!(r.result_type(), Some(&Type::object("google.example.Account")));
    assert_eq!(
        messages(&r),
        vec!["expected type of field 'balance' is 'int' but provided type is 'string'"]
    );
    match &r.expr.kind {
        ExprKind::Struct { message_name, .. } => assert_eq!(message_name, "google.example.Account"),
        other => panic!("expected struct literal, got {:?}", other),
    }
}

// ============================================================================
// Overload isolation
// ============================================================================

#[test]
fn test_type_params_isolated_between_call_sites() {
    let mut env = standard_env(CheckerOptions::default());
    let first = FunctionDecl::with_overloads(
        "first",
        [OverloadDecl::global(
            "first_list",
            vec![Type::list(Type::type_param("A"))],
            Type::type_param("A"),
        )],
    )
    .unwrap();
    env.add_functions([first]).unwrap();

    // first([1]) == 1 && first(["a"]) == "a"
    let lhs = Expr::call(
        5,
        "_==_",
        vec![Expr::call(3, "first", vec![Expr::list(2, vec![int(1, 1)])]), int(4, 1)],
    );
    let rhs = Expr::call(
        10,
        "_==_",
        vec![
            Expr::call(8, "first", vec![Expr::list(7, vec![string(6, "a")])]),
            string(9, "a"),
        ],
    );
    let r = run(&env, Expr::call(11, "_&&_", vec![lhs, rhs]));
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.type_of(3), Some(&Type::int()));
    assert_eq!(r.type_of(8), Some(&Type::string()));
    assert_eq!(r.result_type(), Some(&Type::bool()));
}

#[test]
fn test_unbound_type_params_default_to_dyn() {
    let r = run(&standard_env(CheckerOptions::default()), Expr::list(1, vec![]));
    assert_eq!(r.result_type(), Some(&Type::list(Type::dyn_type())));

    let r = run(&standard_env(CheckerOptions::default()), Expr::map(1, vec![]));
    assert_eq!(
        r.result_type(),
        Some(&Type::map(Type::dyn_type(), Type::dyn_type()))
    );
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_enum_constant_through_select_chain() {
    let env = standard_env(CheckerOptions::default());
    // Account.Kind.BUSINESS
    let e = Expr::select(
        3,
        Expr::select(2, Expr::ident(1, "Account"), "Kind"),
        "BUSINESS",
    );
    let r = run(&env, e);
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.result_type(), Some(&Type::int()));
    let reference = r.reference(3).unwrap();
    assert_eq!(reference.name, "google.example.Account.Kind.BUSINESS");
    assert_eq!(reference.value, Some(Constant::Int(1)));
    assert_eq!(
        r.expr.kind,
        ExprKind::Ident {
            name: "google.example.Account.Kind.BUSINESS".to_string()
        }
    );
}

#[test]
fn test_alias_and_abbreviation() {
    let mut container = Container::new("app").unwrap();
    container.add_alias("acct", "google.example.Account").unwrap();
    container
        .add_abbreviations(["google.example.Account.Kind"])
        .unwrap();
    let env = Env::standard(container, registry(), CheckerOptions::default()).unwrap();

    let r = run(&env, Expr::structure(1, "acct", vec![]));
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.result_type(), Some(&Type::object("google.example.Account")));

    let r = run(&env, Expr::select(2, Expr::ident(1, "Kind"), "PERSONAL"));
    assert!(!r.has_errors(), "{}", r.errors);
    assert_eq!(r.reference(2).unwrap().value, Some(Constant::Int(0)));
}

#[test]
fn test_check_tree_from_json() {
    let json = r#"{
        "id": 3,
        "call": {"function": "_+_", "args": [
            {"id": 1, "const": {"int": 2}},
            {"id": 2, "const": {"double": 1.5}}
        ]}
    }"#;
    let expr: Expr = serde_json::from_str(json).unwrap();
    let r = run(&standard_env(CheckerOptions::default()), expr);
    assert_eq!(
        messages(&r),
        vec!["found no matching overload for '_+_' applied to '(int, double)'"]
    );
    assert!(r.into_result().is_err());
}
