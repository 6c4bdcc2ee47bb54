//! Operator function names and standard overload ids

// ============================================================================
// Operators
// ============================================================================

/// `c ? a : b`
pub const CONDITIONAL: &str = "_?_:_";
/// `a && b`
pub const LOGICAL_AND: &str = "_&&_";
/// `a || b`
pub const LOGICAL_OR: &str = "_||_";
/// `!a`
pub const LOGICAL_NOT: &str = "!_";
/// Comprehension loop guard
pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";
/// `a == b`
pub const EQUALS: &str = "_==_";
/// `a != b`
pub const NOT_EQUALS: &str = "_!=_";
/// `a < b`
pub const LESS: &str = "_<_";
/// `a <= b`
pub const LESS_EQUALS: &str = "_<=_";
/// `a > b`
pub const GREATER: &str = "_>_";
/// `a >= b`
pub const GREATER_EQUALS: &str = "_>=_";
/// `a + b`
pub const ADD: &str = "_+_";
/// `a - b`
pub const SUBTRACT: &str = "_-_";
/// `a * b`
pub const MULTIPLY: &str = "_*_";
/// `a / b`
pub const DIVIDE: &str = "_/_";
/// `a % b`
pub const MODULO: &str = "_%_";
/// `-a`
pub const NEGATE: &str = "-_";
/// `a[b]`
pub const INDEX: &str = "_[_]";
/// `a[?b]`
pub const OPT_INDEX: &str = "_[?_]";
/// `a.?b`
pub const OPT_SELECT: &str = "_?._";
/// `a in b`
pub const IN: &str = "@in";

// ============================================================================
// Overload ids
// ============================================================================

/// Ternary conditional
pub const CONDITIONAL_OVERLOAD: &str = "conditional";
/// Boolean and
pub const LOGICAL_AND_OVERLOAD: &str = "logical_and";
/// Boolean or
pub const LOGICAL_OR_OVERLOAD: &str = "logical_or";
/// Boolean not
pub const LOGICAL_NOT_OVERLOAD: &str = "logical_not";
/// Loop guard
pub const NOT_STRICTLY_FALSE_OVERLOAD: &str = "not_strictly_false";
/// Equality
pub const EQUALS_OVERLOAD: &str = "equals";
/// Inequality
pub const NOT_EQUALS_OVERLOAD: &str = "not_equals";
/// Optional field selection
pub const SELECT_OPTIONAL_FIELD_OVERLOAD: &str = "select_optional_field";
/// `optional.of`
pub const OPTIONAL_OF_OVERLOAD: &str = "optional_of";
/// `optional.none`
pub const OPTIONAL_NONE_OVERLOAD: &str = "optional_none";
/// `opt.hasValue()`
pub const OPTIONAL_HAS_VALUE_OVERLOAD: &str = "optional_hasValue";
/// `opt.value()`
pub const OPTIONAL_VALUE_OVERLOAD: &str = "optional_value";
/// `list[?i]`
pub const LIST_OPTINDEX_OVERLOAD: &str = "list_optindex_optional_int";
/// `map[?k]`
pub const MAP_OPTINDEX_OVERLOAD: &str = "map_optindex_optional_value";

/// Comparisons across numeric types, only enabled on request
pub const CROSS_TYPE_NUMERIC_COMPARISONS: &[&str] = &[
    "less_double_int64",
    "less_double_uint64",
    "less_int64_double",
    "less_int64_uint64",
    "less_uint64_double",
    "less_uint64_int64",
    "less_equals_double_int64",
    "less_equals_double_uint64",
    "less_equals_int64_double",
    "less_equals_int64_uint64",
    "less_equals_uint64_double",
    "less_equals_uint64_int64",
    "greater_double_int64",
    "greater_double_uint64",
    "greater_int64_double",
    "greater_int64_uint64",
    "greater_uint64_double",
    "greater_uint64_int64",
    "greater_equals_double_int64",
    "greater_equals_double_uint64",
    "greater_equals_int64_double",
    "greater_equals_int64_uint64",
    "greater_equals_uint64_double",
    "greater_equals_uint64_int64",
];

/// Whether the overload compares two different numeric types
pub fn is_cross_type_numeric_comparison(id: &str) -> bool {
    CROSS_TYPE_NUMERIC_COMPARISONS.contains(&id)
}
