//! Checked expression tree
//!
//! The parser hands the checker a tree of [`Expr`] nodes, each with a stable
//! id. The checker may rewrite a node's contents (e.g. collapsing `a.b.c` into
//! the identifier `a.b.c`) but never its id.

use cel_types::Type;
use serde::{Deserialize, Serialize};

/// Externally assigned node id
pub type ExprId = i64;

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// Unsigned 64-bit integer
    Uint(u64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Byte string
    Bytes(Vec<u8>),
    /// Duration literal (deprecated constant form)
    Duration {
        /// Whole seconds
        seconds: i64,
        /// Nanosecond adjustment
        nanos: i32,
    },
    /// Timestamp literal (deprecated constant form)
    Timestamp {
        /// Seconds since the Unix epoch
        seconds: i64,
        /// Nanosecond adjustment
        nanos: i32,
    },
}

impl Constant {
    /// Static type of the literal
    pub fn cel_type(&self) -> Type {
        match self {
            Constant::Null => Type::null(),
            Constant::Bool(_) => Type::bool(),
            Constant::Int(_) => Type::int(),
            Constant::Uint(_) => Type::uint(),
            Constant::Double(_) => Type::double(),
            Constant::String(_) => Type::string(),
            Constant::Bytes(_) => Type::bytes(),
            Constant::Duration { .. } => Type::duration(),
            Constant::Timestamp { .. } => Type::timestamp(),
        }
    }
}

/// One `key: value` entry of a map literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Entry id
    pub id: ExprId,
    /// Key expression
    pub key: Expr,
    /// Value expression
    pub value: Expr,
    /// `?key: value` entries take an optional value
    #[serde(default)]
    pub optional: bool,
}

/// One `field: value` initializer of a struct literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Entry id
    pub id: ExprId,
    /// Field name
    pub field: String,
    /// Value expression
    pub value: Expr,
    /// `?field: value` initializers take an optional value
    #[serde(default)]
    pub optional: bool,
}

/// Fold over a range, as produced by macro expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    /// Range being iterated
    pub iter_range: Expr,
    /// First iteration variable (index or key in the two-variable form)
    pub iter_var: String,
    /// Second iteration variable (element or value), if any
    #[serde(default)]
    pub iter_var2: Option<String>,
    /// Accumulator name
    pub accu_var: String,
    /// Accumulator initial value
    pub accu_init: Expr,
    /// Condition evaluated before each step
    pub loop_condition: Expr,
    /// Next accumulator value
    pub loop_step: Expr,
    /// Result computed from the final accumulator
    pub result: Expr,
}

/// Expression node variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Kind not set by the producer
    #[serde(skip)]
    NotSet,
    /// Literal
    Const(Constant),
    /// Identifier, possibly dotted after rewriting
    Ident {
        /// Name
        name: String,
    },
    /// Field selection `operand.field`
    Select {
        /// Operand
        operand: Box<Expr>,
        /// Field name
        field: String,
        /// Presence test produced by `has()`
        #[serde(default)]
        test_only: bool,
        /// Optional selection `operand.?field`
        #[serde(default)]
        optional: bool,
    },
    /// Function call, global or with a receiver
    Call {
        /// Function name
        function: String,
        /// Receiver for member calls
        #[serde(default)]
        target: Option<Box<Expr>>,
        /// Arguments
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// List literal
    List {
        /// Elements
        #[serde(default)]
        elements: Vec<Expr>,
        /// Indices of `?elem` entries
        #[serde(default)]
        optional_indices: Vec<usize>,
    },
    /// Map literal
    Map {
        /// Entries
        #[serde(default)]
        entries: Vec<MapEntry>,
    },
    /// Message construction `Name{field: value}`
    Struct {
        /// Message type name as written
        message_name: String,
        /// Field initializers
        #[serde(default)]
        fields: Vec<StructField>,
    },
    /// Fold
    Comprehension(Box<Comprehension>),
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Node id
    pub id: ExprId,
    /// Node contents
    #[serde(flatten)]
    pub kind: ExprKind,
}

impl Expr {
    /// Build a node
    pub fn new(id: ExprId, kind: ExprKind) -> Self {
        Expr { id, kind }
    }

    /// Literal node
    pub fn constant(id: ExprId, value: Constant) -> Self {
        Self::new(id, ExprKind::Const(value))
    }

    /// Identifier node
    pub fn ident(id: ExprId, name: impl Into<String>) -> Self {
        Self::new(id, ExprKind::Ident { name: name.into() })
    }

    /// Field selection node
    pub fn select(id: ExprId, operand: Expr, field: impl Into<String>) -> Self {
        Self::new(
            id,
            ExprKind::Select {
                operand: Box::new(operand),
                field: field.into(),
                test_only: false,
                optional: false,
            },
        )
    }

    /// Presence test node, as expanded from `has(operand.field)`
    pub fn presence_test(id: ExprId, operand: Expr, field: impl Into<String>) -> Self {
        Self::new(
            id,
            ExprKind::Select {
                operand: Box::new(operand),
                field: field.into(),
                test_only: true,
                optional: false,
            },
        )
    }

    /// Global call node
    pub fn call(id: ExprId, function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(
            id,
            ExprKind::Call {
                function: function.into(),
                target: None,
                args,
            },
        )
    }

    /// Member call node
    pub fn member_call(id: ExprId, function: impl Into<String>, target: Expr, args: Vec<Expr>) -> Self {
        Self::new(
            id,
            ExprKind::Call {
                function: function.into(),
                target: Some(Box::new(target)),
                args,
            },
        )
    }

    /// List literal node
    pub fn list(id: ExprId, elements: Vec<Expr>) -> Self {
        Self::new(
            id,
            ExprKind::List {
                elements,
                optional_indices: Vec::new(),
            },
        )
    }

    /// Map literal node
    pub fn map(id: ExprId, entries: Vec<MapEntry>) -> Self {
        Self::new(id, ExprKind::Map { entries })
    }

    /// Struct literal node
    pub fn structure(id: ExprId, message_name: impl Into<String>, fields: Vec<StructField>) -> Self {
        Self::new(
            id,
            ExprKind::Struct {
                message_name: message_name.into(),
                fields,
            },
        )
    }

    /// Comprehension node
    pub fn comprehension(id: ExprId, comprehension: Comprehension) -> Self {
        Self::new(id, ExprKind::Comprehension(Box::new(comprehension)))
    }

    /// Short label for diagnostics
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::NotSet => "<unset>".to_string(),
            ExprKind::Const(c) => format!("{:?}", c),
            ExprKind::Ident { name } => name.clone(),
            ExprKind::Select { field, .. } => format!("_.{}", field),
            ExprKind::Call { function, .. } => format!("{}(..)", function),
            ExprKind::List { .. } => "[..]".to_string(),
            ExprKind::Map { .. } => "{..}".to_string(),
            ExprKind::Struct { message_name, .. } => format!("{}{{..}}", message_name),
            ExprKind::Comprehension(_) => "<comprehension>".to_string(),
        }
    }

    /// Dotted name for a chain of selects ending in an identifier, e.g. `a.b.c`
    pub fn qualified_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident { name } => Some(name.clone()),
            ExprKind::Select {
                operand,
                field,
                test_only: false,
                optional: false,
            } => operand.qualified_name().map(|prefix| format!("{}.{}", prefix, field)),
            _ => None,
        }
    }
}

/// Resolved identity of an identifier or call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceInfo {
    /// Fully qualified identifier name, empty for calls
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Matching overload ids, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overload_ids: Vec<String>,
    /// Constant value for enum identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Constant>,
}

impl ReferenceInfo {
    /// Reference to a named identifier
    pub fn ident(name: impl Into<String>, value: Option<Constant>) -> Self {
        ReferenceInfo {
            name: name.into(),
            overload_ids: Vec::new(),
            value,
        }
    }

    /// Reference to a single overload
    pub fn function(overload_id: impl Into<String>) -> Self {
        ReferenceInfo {
            name: String::new(),
            overload_ids: vec![overload_id.into()],
            value: None,
        }
    }

    /// Append an overload id unless already present
    pub fn add_overload(&mut self, overload_id: &str) {
        if !self.overload_ids.iter().any(|id| id == overload_id) {
            self.overload_ids.push(overload_id.to_string());
        }
    }
}
