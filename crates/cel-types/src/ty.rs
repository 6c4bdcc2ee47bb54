//! Core type definitions for the CEL type algebra

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::kind::{Kind, Trait, TraitMask};
use crate::wellknown;

/// Predicate deciding whether `from` may be assigned to `target`
pub type AssignablePredicate = Arc<dyn Fn(&Type, &Type) -> bool + Send + Sync>;

/// How a type decides assignability from another type
#[derive(Clone)]
pub enum Assignability {
    /// Kind, name and parameters must agree
    Structural,
    /// Like `Structural`, but `null` is accepted as well (wrapper types)
    Nullable,
    /// Caller-supplied predicate, called as `predicate(target, from)`
    Custom(AssignablePredicate),
}

impl fmt::Debug for Assignability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignability::Structural => write!(f, "Structural"),
            Assignability::Nullable => write!(f, "Nullable"),
            Assignability::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

struct TypeData {
    kind: Kind,
    parameters: Vec<Type>,
    name: String,
    traits: TraitMask,
    assignability: Assignability,
}

/// An immutable CEL type
///
/// Cloning is cheap; the payload is shared. Equality is *exact* equality:
/// kinds, names and parameters agree recursively. The assignability override
/// is not part of equality, so `wrapper(int)` equals `int`.
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

/// Name of the opaque optional type
pub const OPTIONAL_TYPE_NAME: &str = "optional_type";

macro_rules! static_type {
    ($name:ident, $kind:expr, $type_name:expr, [$($t:ident),*]) => {
        static $name: Lazy<Type> =
            Lazy::new(|| Type::with_traits($kind, $type_name, TraitMask::of(&[$(Trait::$t),*])));
    };
}

static_type!(ANY, Kind::Any, "google.protobuf.Any", [FieldTester, Indexer]);
static_type!(BOOL, Kind::Bool, "bool", [Comparer, Negater]);
static_type!(BYTES, Kind::Bytes, "bytes", [Adder, Comparer, Sizer]);
static_type!(
    DOUBLE,
    Kind::Double,
    "double",
    [Adder, Comparer, Divider, Multiplier, Negater, Subtractor]
);
static_type!(
    DURATION,
    Kind::Duration,
    "google.protobuf.Duration",
    [Adder, Comparer, Negater, Receiver, Subtractor]
);
static_type!(DYN, Kind::Dyn, "dyn", []);
static_type!(ERROR, Kind::Error, "error", []);
static_type!(
    INT,
    Kind::Int,
    "int",
    [Adder, Comparer, Divider, Modder, Multiplier, Negater, Subtractor]
);
static_type!(NULL, Kind::Null, "null_type", []);
static_type!(
    STRING,
    Kind::String,
    "string",
    [Adder, Comparer, Matcher, Receiver, Sizer]
);
static_type!(
    TIMESTAMP,
    Kind::Timestamp,
    "google.protobuf.Timestamp",
    [Adder, Comparer, Receiver, Subtractor]
);
static_type!(TYPE, Kind::Type, "type", []);
static_type!(
    UINT,
    Kind::Uint,
    "uint",
    [Adder, Comparer, Divider, Modder, Multiplier, Subtractor]
);
static_type!(UNKNOWN, Kind::Unknown, "unknown", []);

impl Type {
    fn build(
        kind: Kind,
        name: impl Into<String>,
        parameters: Vec<Type>,
        traits: TraitMask,
        assignability: Assignability,
    ) -> Self {
        Type(Arc::new(TypeData {
            kind,
            parameters,
            name: name.into(),
            traits,
            assignability,
        }))
    }

    fn with_traits(kind: Kind, name: &str, traits: TraitMask) -> Self {
        Self::build(kind, name, Vec::new(), traits, Assignability::Structural)
    }

    /// `google.protobuf.Any`
    pub fn any() -> Self {
        ANY.clone()
    }

    /// `bool`
    pub fn bool() -> Self {
        BOOL.clone()
    }

    /// `bytes`
    pub fn bytes() -> Self {
        BYTES.clone()
    }

    /// `double`
    pub fn double() -> Self {
        DOUBLE.clone()
    }

    /// `google.protobuf.Duration`
    pub fn duration() -> Self {
        DURATION.clone()
    }

    /// `dyn`
    pub fn dyn_type() -> Self {
        DYN.clone()
    }

    /// `error`
    pub fn error() -> Self {
        ERROR.clone()
    }

    /// `int`
    pub fn int() -> Self {
        INT.clone()
    }

    /// `null_type`
    pub fn null() -> Self {
        NULL.clone()
    }

    /// `string`
    pub fn string() -> Self {
        STRING.clone()
    }

    /// `google.protobuf.Timestamp`
    pub fn timestamp() -> Self {
        TIMESTAMP.clone()
    }

    /// `type` with no parameter
    pub fn type_type() -> Self {
        TYPE.clone()
    }

    /// `uint`
    pub fn uint() -> Self {
        UINT.clone()
    }

    /// `unknown`
    pub fn unknown() -> Self {
        UNKNOWN.clone()
    }

    /// `list(elem)`
    pub fn list(elem: Type) -> Self {
        Self::build(
            Kind::List,
            "list",
            vec![elem],
            TraitMask::of(&[
                Trait::Adder,
                Trait::Container,
                Trait::Indexer,
                Trait::Iterable,
                Trait::Sizer,
            ]),
            Assignability::Structural,
        )
    }

    /// `map(key, value)`
    pub fn map(key: Type, value: Type) -> Self {
        Self::build(
            Kind::Map,
            "map",
            vec![key, value],
            TraitMask::of(&[Trait::Container, Trait::Indexer, Trait::Iterable, Trait::Sizer]),
            Assignability::Structural,
        )
    }

    /// Named opaque type with parameters
    pub fn opaque(name: impl Into<String>, parameters: Vec<Type>) -> Self {
        Self::build(
            Kind::Opaque,
            name,
            parameters,
            TraitMask::NONE,
            Assignability::Structural,
        )
    }

    /// `optional_type(inner)`
    pub fn optional(inner: Type) -> Self {
        Self::opaque(OPTIONAL_TYPE_NAME, vec![inner])
    }

    /// The type of the type `t`, written `type(t)`
    pub fn type_of(t: Type) -> Self {
        Self::build(
            Kind::Type,
            "type",
            vec![t],
            TraitMask::NONE,
            Assignability::Structural,
        )
    }

    /// Free type parameter named `name`
    pub fn type_param(name: impl Into<String>) -> Self {
        Self::build(
            Kind::TypeParam,
            name,
            Vec::new(),
            TraitMask::NONE,
            Assignability::Structural,
        )
    }

    /// Message type named `name`
    ///
    /// Well-known protobuf names resolve to their checked equivalent, e.g.
    /// `google.protobuf.Int64Value` becomes `wrapper(int)`.
    pub fn object(name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(checked) = wellknown::checked_well_known(&name) {
            return checked;
        }
        Self::build(
            Kind::Struct,
            name,
            Vec::new(),
            TraitMask::of(&[Trait::FieldTester, Trait::Indexer]),
            Assignability::Structural,
        )
    }

    /// Same kind, name, parameters and traits as `wrapped`, but also accepts `null`
    pub fn nullable(wrapped: Type) -> Self {
        Self::build(
            wrapped.kind(),
            wrapped.type_name(),
            wrapped.parameters().to_vec(),
            wrapped.traits(),
            Assignability::Nullable,
        )
    }

    /// Copy of this type whose assignability is decided by `predicate`
    pub fn with_predicate(&self, predicate: AssignablePredicate) -> Self {
        Self::build(
            self.kind(),
            self.type_name(),
            self.parameters().to_vec(),
            self.traits(),
            Assignability::Custom(predicate),
        )
    }

    /// Copy of this type with its parameters replaced
    pub fn with_parameters(&self, parameters: Vec<Type>) -> Self {
        Self::build(
            self.kind(),
            self.type_name(),
            parameters,
            self.traits(),
            self.0.assignability.clone(),
        )
    }

    /// The type's kind
    pub fn kind(&self) -> Kind {
        self.0.kind
    }

    /// Generic parameters
    pub fn parameters(&self) -> &[Type] {
        &self.0.parameters
    }

    /// Parameter at `index`, if any
    pub fn parameter(&self, index: usize) -> Option<&Type> {
        self.0.parameters.get(index)
    }

    /// Runtime type name (`int`, `list`, a message name, a type parameter name)
    pub fn type_name(&self) -> &str {
        &self.0.name
    }

    /// Declared capabilities
    pub fn traits(&self) -> TraitMask {
        self.0.traits
    }

    /// Whether the type declares `t`
    pub fn has_trait(&self, t: Trait) -> bool {
        self.0.traits.contains(t)
    }

    /// How assignability is decided
    pub fn assignability(&self) -> &Assignability {
        &self.0.assignability
    }

    /// `dyn`, `google.protobuf.Any` or a type parameter
    pub fn is_dyn(&self) -> bool {
        matches!(self.kind(), Kind::Dyn | Kind::Any | Kind::TypeParam)
    }

    /// `dyn` or `error`
    pub fn is_dyn_or_error(&self) -> bool {
        matches!(self.kind(), Kind::Dyn | Kind::Error)
    }

    /// Whether this is `optional_type(T)`
    pub fn is_optional(&self) -> bool {
        self.kind() == Kind::Opaque
            && self.type_name() == OPTIONAL_TYPE_NAME
            && self.parameters().len() == 1
    }

    /// `T` for `optional_type(T)`
    pub fn optional_inner(&self) -> Option<&Type> {
        if self.is_optional() {
            self.parameter(0)
        } else {
            None
        }
    }

    /// Whether a `null` literal may be assigned to this type
    pub fn accepts_null(&self) -> bool {
        self.is_assignable_type(&Type::null())
    }

    /// Exact equality: kind, name and parameters, recursively
    pub fn is_exact_type(&self, other: &Type) -> bool {
        self.compare(other, true)
    }

    /// Like [`is_exact_type`](Self::is_exact_type) but type parameter names are ignored
    pub fn is_equivalent_type(&self, other: &Type) -> bool {
        self.compare(other, false)
    }

    fn compare(&self, other: &Type, exact: bool) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.kind() != other.kind() || self.parameters().len() != other.parameters().len() {
            return false;
        }
        if (exact || self.kind() != Kind::TypeParam) && self.type_name() != other.type_name() {
            return false;
        }
        self.parameters()
            .iter()
            .zip(other.parameters())
            .all(|(a, b)| a.compare(b, exact))
    }

    /// Whether a value of type `from` may be used where `self` is expected
    pub fn is_assignable_type(&self, from: &Type) -> bool {
        match &self.0.assignability {
            Assignability::Structural => self.default_is_assignable(from),
            Assignability::Nullable => {
                from.kind() == Kind::Null || self.default_is_assignable(from)
            }
            Assignability::Custom(predicate) => predicate(self, from),
        }
    }

    fn default_is_assignable(&self, from: &Type) -> bool {
        if Arc::ptr_eq(&self.0, &from.0) || self.is_dyn() {
            return true;
        }
        if self.kind() != from.kind()
            || self.type_name() != from.type_name()
            || self.parameters().len() != from.parameters().len()
        {
            return false;
        }
        self.parameters()
            .iter()
            .zip(from.parameters())
            .all(|(p, fp)| p.is_assignable_type(fp))
    }

    /// Name as written in declarations; wrappers are shown as `wrapper(T)`
    pub fn declared_type_name(&self) -> String {
        if self.kind() != Kind::Null && !self.is_dyn() && self.accepts_null() {
            format!("wrapper({})", self.type_name())
        } else {
            self.type_name().to_string()
        }
    }

    /// Canonical key used by substitution mappings: `name(p1, p2)`
    pub fn key(&self) -> String {
        let mut out = String::new();
        self.write_key(&mut out);
        out
    }

    fn write_key(&self, out: &mut String) {
        out.push_str(self.type_name());
        if self.parameters().is_empty() {
            return;
        }
        out.push('(');
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            p.write_key(out);
        }
        out.push(')');
    }

    /// Replace message types named after well-known protobuf types with their checked form
    pub fn sanitize(&self) -> Type {
        match self.kind() {
            Kind::Struct => {
                wellknown::checked_well_known(self.type_name()).unwrap_or_else(|| self.clone())
            }
            _ if self.parameters().is_empty() => self.clone(),
            _ => self.with_parameters(self.parameters().iter().map(Type::sanitize).collect()),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.is_exact_type(other)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.type_name().hash(state);
        self.parameters().hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Null => return write!(f, "null"),
            Kind::Timestamp => return write!(f, "timestamp"),
            Kind::Duration => return write!(f, "duration"),
            Kind::Any => return write!(f, "any"),
            _ => {}
        }
        if self.parameters().is_empty() {
            return write!(f, "{}", self.declared_type_name());
        }
        write!(f, "{}(", self.type_name())?;
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({:?}, {})", self.kind(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::int().to_string(), "int");
        assert_eq!(Type::list(Type::string()).to_string(), "list(string)");
        assert_eq!(
            Type::map(Type::string(), Type::dyn_type()).to_string(),
            "map(string, dyn)"
        );
        assert_eq!(Type::optional(Type::int()).to_string(), "optional_type(int)");
        assert_eq!(Type::type_of(Type::uint()).to_string(), "type(uint)");
        assert_eq!(Type::null().to_string(), "null");
        assert_eq!(Type::timestamp().to_string(), "timestamp");
    }

    #[test]
    fn test_nullable_display_and_equality() {
        let wrapped = Type::nullable(Type::int());
        assert_eq!(wrapped.to_string(), "wrapper(int)");
        assert_eq!(wrapped.declared_type_name(), "wrapper(int)");
        assert_eq!(wrapped, Type::int());
        assert!(wrapped.accepts_null());
        assert!(!Type::int().accepts_null());
    }

    #[test]
    fn test_exact_vs_equivalent() {
        let a = Type::list(Type::type_param("A"));
        let b = Type::list(Type::type_param("B"));
        assert!(!a.is_exact_type(&b));
        assert!(a.is_equivalent_type(&b));
        assert!(!a.is_equivalent_type(&Type::list(Type::int())));
    }

    #[test]
    fn test_default_assignability() {
        assert!(Type::dyn_type().is_assignable_type(&Type::int()));
        assert!(Type::int().is_assignable_type(&Type::int()));
        assert!(!Type::int().is_assignable_type(&Type::uint()));
        assert!(Type::list(Type::dyn_type()).is_assignable_type(&Type::list(Type::int())));
        assert!(!Type::list(Type::int()).is_assignable_type(&Type::list(Type::dyn_type())));
    }

    #[test]
    fn test_custom_predicate() {
        let only_strings: AssignablePredicate = Arc::new(|_, from| from.kind() == Kind::String);
        let t = Type::opaque("text", vec![]).with_predicate(only_strings);
        assert!(t.is_assignable_type(&Type::string()));
        assert!(!t.is_assignable_type(&Type::int()));
    }

    #[test]
    fn test_key_and_traits() {
        let t = Type::map(Type::type_param("K"), Type::list(Type::int()));
        assert_eq!(t.key(), "map(K, list(int))");
        assert!(Type::string().has_trait(Trait::Matcher));
        assert!(!Type::uint().has_trait(Trait::Negater));
        assert!(Type::list(Type::int()).has_trait(Trait::Iterable));
    }

    #[test]
    fn test_object_resolves_well_known() {
        assert_eq!(Type::object("google.protobuf.Int64Value").to_string(), "wrapper(int)");
        assert_eq!(Type::object("google.protobuf.Struct"), Type::map(Type::string(), Type::dyn_type()));
        let msg = Type::object("acme.Order");
        assert_eq!(msg.kind(), Kind::Struct);
        assert_eq!(msg.to_string(), "acme.Order");
    }

    #[test]
    fn test_sanitize_nested() {
        let t = Type::list(Type::build(
            Kind::Struct,
            "google.protobuf.Value",
            Vec::new(),
            TraitMask::NONE,
            Assignability::Structural,
        ));
        assert_eq!(t.sanitize(), Type::list(Type::dyn_type()));
    }
}
