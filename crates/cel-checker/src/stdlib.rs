//! Standard library declarations

use cel_types::{Trait, TraitMask, Type};

use crate::decls::{FunctionDecl, OverloadDecl, VariableDecl};
use crate::error::DeclError;
use crate::overloads::*;

/// Identifiers naming the built-in types, e.g. `int` of type `type(int)`
pub fn standard_idents() -> Vec<VariableDecl> {
    [
        ("bool", Type::bool()),
        ("bytes", Type::bytes()),
        ("double", Type::double()),
        ("duration", Type::duration()),
        ("dyn", Type::dyn_type()),
        ("int", Type::int()),
        ("list", Type::list(Type::dyn_type())),
        ("map", Type::map(Type::dyn_type(), Type::dyn_type())),
        ("null_type", Type::null()),
        ("string", Type::string()),
        ("timestamp", Type::timestamp()),
        ("type", Type::type_type()),
        ("uint", Type::uint()),
    ]
    .into_iter()
    .map(|(name, t)| VariableDecl::new(name, Type::type_of(t)))
    .collect()
}

fn global(id: &str, args: Vec<Type>, result: Type) -> OverloadDecl {
    OverloadDecl::global(id, args, result)
}

fn member(id: &str, args: Vec<Type>, result: Type) -> OverloadDecl {
    OverloadDecl::member(id, args, result)
}

fn param(name: &str) -> Type {
    Type::type_param(name)
}

/// Every standard function declaration
pub fn standard_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let a = param("A");
    let b = param("B");
    let k = param("K");
    let v = param("V");
    let list_a = Type::list(a.clone());
    let map_kv = Type::map(k.clone(), v.clone());
    let (bool_t, int, uint, double) = (Type::bool(), Type::int(), Type::uint(), Type::double());
    let (string, bytes) = (Type::string(), Type::bytes());
    let (ts, dur) = (Type::timestamp(), Type::duration());

    let mut fns = vec![
        FunctionDecl::with_overloads(
            CONDITIONAL,
            [global(CONDITIONAL_OVERLOAD, vec![bool_t.clone(), a.clone(), a.clone()], a.clone()).non_strict()],
        )?,
        FunctionDecl::with_overloads(
            LOGICAL_AND,
            [global(LOGICAL_AND_OVERLOAD, vec![bool_t.clone(), bool_t.clone()], bool_t.clone()).non_strict()],
        )?,
        FunctionDecl::with_overloads(
            LOGICAL_OR,
            [global(LOGICAL_OR_OVERLOAD, vec![bool_t.clone(), bool_t.clone()], bool_t.clone()).non_strict()],
        )?,
        FunctionDecl::with_overloads(
            LOGICAL_NOT,
            [global(LOGICAL_NOT_OVERLOAD, vec![bool_t.clone()], bool_t.clone())
                .with_operand_traits(TraitMask::of(&[Trait::Negater]))],
        )?,
        FunctionDecl::with_overloads(
            NOT_STRICTLY_FALSE,
            [global(NOT_STRICTLY_FALSE_OVERLOAD, vec![bool_t.clone()], bool_t.clone()).non_strict()],
        )?,
        FunctionDecl::with_overloads(
            EQUALS,
            [global(EQUALS_OVERLOAD, vec![a.clone(), a.clone()], bool_t.clone())],
        )?,
        FunctionDecl::with_overloads(
            NOT_EQUALS,
            [global(NOT_EQUALS_OVERLOAD, vec![a.clone(), a.clone()], bool_t.clone())],
        )?,
        FunctionDecl::with_overloads(
            ADD,
            [
                global("add_bytes", vec![bytes.clone(), bytes.clone()], bytes.clone()),
                global("add_double", vec![double.clone(), double.clone()], double.clone()),
                global("add_duration_duration", vec![dur.clone(), dur.clone()], dur.clone()),
                global("add_duration_timestamp", vec![dur.clone(), ts.clone()], ts.clone()),
                global("add_timestamp_duration", vec![ts.clone(), dur.clone()], ts.clone()),
                global("add_int64", vec![int.clone(), int.clone()], int.clone()),
                global("add_list", vec![list_a.clone(), list_a.clone()], list_a.clone()),
                global("add_string", vec![string.clone(), string.clone()], string.clone()),
                global("add_uint64", vec![uint.clone(), uint.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            SUBTRACT,
            [
                global("subtract_double", vec![double.clone(), double.clone()], double.clone()),
                global("subtract_duration_duration", vec![dur.clone(), dur.clone()], dur.clone()),
                global("subtract_int64", vec![int.clone(), int.clone()], int.clone()),
                global("subtract_timestamp_duration", vec![ts.clone(), dur.clone()], ts.clone()),
                global("subtract_timestamp_timestamp", vec![ts.clone(), ts.clone()], dur.clone()),
                global("subtract_uint64", vec![uint.clone(), uint.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            MULTIPLY,
            [
                global("multiply_double", vec![double.clone(), double.clone()], double.clone()),
                global("multiply_int64", vec![int.clone(), int.clone()], int.clone()),
                global("multiply_uint64", vec![uint.clone(), uint.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            DIVIDE,
            [
                global("divide_double", vec![double.clone(), double.clone()], double.clone()),
                global("divide_int64", vec![int.clone(), int.clone()], int.clone()),
                global("divide_uint64", vec![uint.clone(), uint.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            MODULO,
            [
                global("modulo_int64", vec![int.clone(), int.clone()], int.clone()),
                global("modulo_uint64", vec![uint.clone(), uint.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            NEGATE,
            [
                global("negate_double", vec![double.clone()], double.clone()),
                global("negate_int64", vec![int.clone()], int.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            INDEX,
            [
                global("index_list", vec![list_a.clone(), int.clone()], a.clone()),
                global("index_map", vec![map_kv.clone(), k.clone()], v.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            IN,
            [
                global("in_list", vec![a.clone(), list_a.clone()], bool_t.clone()),
                global("in_map", vec![a.clone(), Type::map(a.clone(), b.clone())], bool_t.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "size",
            [
                global("size_bytes", vec![bytes.clone()], int.clone()),
                member("bytes_size", vec![bytes.clone()], int.clone()),
                global("size_list", vec![list_a.clone()], int.clone()),
                member("list_size", vec![list_a.clone()], int.clone()),
                global("size_map", vec![map_kv.clone()], int.clone()),
                member("map_size", vec![map_kv.clone()], int.clone()),
                global("size_string", vec![string.clone()], int.clone()),
                member("string_size", vec![string.clone()], int.clone()),
            ],
        )?,
    ];

    fns.extend(relational_functions()?);
    fns.extend(conversion_functions()?);
    fns.extend(string_functions()?);
    fns.extend(time_functions()?);
    fns.extend(optional_functions()?);
    Ok(fns)
}

fn relational_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let same_type = [
        ("bool", Type::bool()),
        ("int64", Type::int()),
        ("uint64", Type::uint()),
        ("double", Type::double()),
        ("string", Type::string()),
        ("bytes", Type::bytes()),
        ("timestamp", Type::timestamp()),
        ("duration", Type::duration()),
    ];
    let numeric = [("int64", Type::int()), ("uint64", Type::uint()), ("double", Type::double())];

    [(LESS, "less"), (LESS_EQUALS, "less_equals"), (GREATER, "greater"), (GREATER_EQUALS, "greater_equals")]
        .into_iter()
        .map(|(op, prefix)| {
            let mut overloads: Vec<OverloadDecl> = same_type
                .iter()
                .map(|(suffix, t)| {
                    global(&format!("{}_{}", prefix, suffix), vec![t.clone(), t.clone()], Type::bool())
                        .with_operand_traits(TraitMask::of(&[Trait::Comparer]))
                })
                .collect();
            for (lhs_name, lhs) in &numeric {
                for (rhs_name, rhs) in &numeric {
                    if lhs_name != rhs_name {
                        overloads.push(global(
                            &format!("{}_{}_{}", prefix, lhs_name, rhs_name),
                            vec![lhs.clone(), rhs.clone()],
                            Type::bool(),
                        ));
                    }
                }
            }
            FunctionDecl::with_overloads(op, overloads)
        })
        .collect()
}

fn conversion_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let a = param("A");
    let (bool_t, int, uint, double) = (Type::bool(), Type::int(), Type::uint(), Type::double());
    let (string, bytes) = (Type::string(), Type::bytes());
    let (ts, dur) = (Type::timestamp(), Type::duration());

    Ok(vec![
        FunctionDecl::with_overloads(
            "int",
            [
                global("int64_to_int64", vec![int.clone()], int.clone()),
                global("uint64_to_int64", vec![uint.clone()], int.clone()),
                global("double_to_int64", vec![double.clone()], int.clone()),
                global("string_to_int64", vec![string.clone()], int.clone()),
                global("timestamp_to_int64", vec![ts.clone()], int.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "uint",
            [
                global("uint64_to_uint64", vec![uint.clone()], uint.clone()),
                global("int64_to_uint64", vec![int.clone()], uint.clone()),
                global("double_to_uint64", vec![double.clone()], uint.clone()),
                global("string_to_uint64", vec![string.clone()], uint.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "double",
            [
                global("double_to_double", vec![double.clone()], double.clone()),
                global("int64_to_double", vec![int.clone()], double.clone()),
                global("uint64_to_double", vec![uint.clone()], double.clone()),
                global("string_to_double", vec![string.clone()], double.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "string",
            [
                global("string_to_string", vec![string.clone()], string.clone()),
                global("bool_to_string", vec![bool_t.clone()], string.clone()),
                global("int64_to_string", vec![int.clone()], string.clone()),
                global("uint64_to_string", vec![uint.clone()], string.clone()),
                global("double_to_string", vec![double.clone()], string.clone()),
                global("bytes_to_string", vec![bytes.clone()], string.clone()),
                global("timestamp_to_string", vec![ts.clone()], string.clone()),
                global("duration_to_string", vec![dur.clone()], string.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "bytes",
            [
                global("bytes_to_bytes", vec![bytes.clone()], bytes.clone()),
                global("string_to_bytes", vec![string.clone()], bytes.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "bool",
            [
                global("bool_to_bool", vec![bool_t.clone()], bool_t.clone()),
                global("string_to_bool", vec![string.clone()], bool_t.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "duration",
            [
                global("duration_to_duration", vec![dur.clone()], dur.clone()),
                global("string_to_duration", vec![string.clone()], dur.clone()),
            ],
        )?,
        FunctionDecl::with_overloads(
            "timestamp",
            [
                global("timestamp_to_timestamp", vec![ts.clone()], ts.clone()),
                global("string_to_timestamp", vec![string.clone()], ts.clone()),
                global("int64_to_timestamp", vec![int.clone()], ts.clone()),
            ],
        )?,
        FunctionDecl::with_overloads("dyn", [global("to_dyn", vec![a.clone()], Type::dyn_type())])?,
        FunctionDecl::with_overloads("type", [global("type", vec![a.clone()], Type::type_of(a.clone()))])?,
    ])
}

fn string_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let (string, bool_t) = (Type::string(), Type::bool());
    let two_strings = || vec![Type::string(), Type::string()];

    Ok(vec![
        FunctionDecl::with_overloads("contains", [member("contains_string", two_strings(), bool_t.clone())])?,
        FunctionDecl::with_overloads("startsWith", [member("starts_with_string", two_strings(), bool_t.clone())])?,
        FunctionDecl::with_overloads("endsWith", [member("ends_with_string", two_strings(), bool_t.clone())])?,
        FunctionDecl::with_overloads(
            "matches",
            [
                global("matches", vec![string.clone(), string.clone()], bool_t.clone()),
                member("matches_string", two_strings(), bool_t),
            ],
        )?,
    ])
}

fn time_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let accessors = [
        ("getFullYear", "timestamp_to_year", false),
        ("getMonth", "timestamp_to_month", false),
        ("getDayOfYear", "timestamp_to_day_of_year", false),
        ("getDayOfMonth", "timestamp_to_day_of_month", false),
        ("getDayOfWeek", "timestamp_to_day_of_week", false),
        ("getHours", "timestamp_to_hours", true),
        ("getMinutes", "timestamp_to_minutes", true),
        ("getSeconds", "timestamp_to_seconds", true),
        ("getMilliseconds", "timestamp_to_milliseconds", true),
    ];
    accessors
        .into_iter()
        .map(|(name, id, on_duration)| {
            let mut overloads = vec![
                member(id, vec![Type::timestamp()], Type::int()),
                member(
                    &format!("{}_with_tz", id),
                    vec![Type::timestamp(), Type::string()],
                    Type::int(),
                ),
            ];
            if on_duration {
                let duration_id = id.replacen("timestamp", "duration", 1);
                overloads.push(member(&duration_id, vec![Type::duration()], Type::int()));
            }
            FunctionDecl::with_overloads(name, overloads)
        })
        .collect()
}

fn optional_functions() -> Result<Vec<FunctionDecl>, DeclError> {
    let v = param("V");
    let k = param("K");
    let opt_v = Type::optional(v.clone());

    Ok(vec![
        FunctionDecl::with_overloads("optional.of", [global(OPTIONAL_OF_OVERLOAD, vec![v.clone()], opt_v.clone())])?,
        FunctionDecl::with_overloads("optional.none", [global(OPTIONAL_NONE_OVERLOAD, vec![], opt_v.clone())])?,
        FunctionDecl::with_overloads(
            "hasValue",
            [member(OPTIONAL_HAS_VALUE_OVERLOAD, vec![opt_v.clone()], Type::bool())],
        )?,
        FunctionDecl::with_overloads("value", [member(OPTIONAL_VALUE_OVERLOAD, vec![opt_v.clone()], v.clone())])?,
        FunctionDecl::with_overloads(
            OPT_INDEX,
            [
                global(LIST_OPTINDEX_OVERLOAD, vec![Type::list(v.clone()), Type::int()], opt_v.clone()),
                global(MAP_OPTINDEX_OVERLOAD, vec![Type::map(k.clone(), v), k], opt_v),
            ],
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_functions_build() {
        let fns = standard_functions().unwrap();
        let add = fns.iter().find(|f| f.name() == ADD).unwrap();
        assert_eq!(add.overload_decls().count(), 9);
        let less = fns.iter().find(|f| f.name() == LESS).unwrap();
        assert_eq!(less.overload_decls().count(), 14);
        assert!(less.overload("less_int64_double").is_some());
    }

    #[test]
    fn test_cross_type_ids_match_table() {
        let fns = standard_functions().unwrap();
        let declared: Vec<String> = fns
            .iter()
            .flat_map(|f| f.overload_decls().map(|o| o.id().to_string()))
            .filter(|id| is_cross_type_numeric_comparison(id))
            .collect();
        assert_eq!(declared.len(), CROSS_TYPE_NUMERIC_COMPARISONS.len());
    }

    #[test]
    fn test_standard_idents() {
        let idents = standard_idents();
        let int = idents.iter().find(|d| d.name() == "int").unwrap();
        assert_eq!(int.ty(), &Type::type_of(Type::int()));
    }
}
