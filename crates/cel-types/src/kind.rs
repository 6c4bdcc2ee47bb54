//! Type kinds and capability traits

use std::fmt;
use std::ops::BitOr;

/// Discriminant of a [`Type`](crate::Type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// `google.protobuf.Any`
    Any,
    /// `bool`
    Bool,
    /// `bytes`
    Bytes,
    /// `double`
    Double,
    /// `google.protobuf.Duration`
    Duration,
    /// The dynamic type, assignable to and from everything
    Dyn,
    /// The type of an expression that failed to check
    Error,
    /// `int`
    Int,
    /// `list(E)`
    List,
    /// `map(K, V)`
    Map,
    /// `null_type`
    Null,
    /// Named type with parameters that has no further structure (e.g. `optional_type(T)`)
    Opaque,
    /// `string`
    String,
    /// A message type known to the type provider
    Struct,
    /// `google.protobuf.Timestamp`
    Timestamp,
    /// The type of a type, `type(T)`
    Type,
    /// A free type parameter
    TypeParam,
    /// `uint`
    Uint,
    /// The type of an unknown value
    Unknown,
    /// Unset kind
    Unspecified,
}

impl Kind {
    /// Whether the kind carries type parameters
    pub fn is_parameterized(self) -> bool {
        matches!(self, Kind::List | Kind::Map | Kind::Opaque | Kind::Type)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Any => "any",
            Kind::Bool => "bool",
            Kind::Bytes => "bytes",
            Kind::Double => "double",
            Kind::Duration => "duration",
            Kind::Dyn => "dyn",
            Kind::Error => "error",
            Kind::Int => "int",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Null => "null",
            Kind::Opaque => "opaque",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::Timestamp => "timestamp",
            Kind::Type => "type",
            Kind::TypeParam => "type_param",
            Kind::Uint => "uint",
            Kind::Unknown => "unknown",
            Kind::Unspecified => "unspecified",
        };
        write!(f, "{}", name)
    }
}

/// A single capability a type may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Trait {
    /// Supports `+`
    Adder = 1,
    /// Supports ordering comparisons
    Comparer = 1 << 1,
    /// Supports `in`
    Container = 1 << 2,
    /// Supports `/`
    Divider = 1 << 3,
    /// Supports presence tests
    FieldTester = 1 << 4,
    /// Supports `[]`
    Indexer = 1 << 5,
    /// Can be the range of a comprehension
    Iterable = 1 << 6,
    /// Is an iterator
    Iterator = 1 << 7,
    /// Supports `matches`
    Matcher = 1 << 8,
    /// Supports `%`
    Modder = 1 << 9,
    /// Supports `*`
    Multiplier = 1 << 10,
    /// Supports unary `-`
    Negater = 1 << 11,
    /// Has member functions
    Receiver = 1 << 12,
    /// Supports `size`
    Sizer = 1 << 13,
    /// Supports `-`
    Subtractor = 1 << 14,
    /// Can be folded over
    Foldable = 1 << 15,
}

/// Set of [`Trait`] flags declared by a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraitMask(u16);

impl TraitMask {
    /// The empty set
    pub const NONE: TraitMask = TraitMask(0);

    /// Build a mask from a list of traits
    pub fn of(traits: &[Trait]) -> Self {
        traits.iter().fold(TraitMask::NONE, |mask, t| mask | *t)
    }

    /// Whether the trait is present
    pub fn contains(self, t: Trait) -> bool {
        self.0 & (t as u16) != 0
    }

    /// Raw bit representation
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Whether no traits are present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr<Trait> for TraitMask {
    type Output = TraitMask;

    fn bitor(self, rhs: Trait) -> TraitMask {
        TraitMask(self.0 | rhs as u16)
    }
}

impl BitOr for TraitMask {
    type Output = TraitMask;

    fn bitor(self, rhs: TraitMask) -> TraitMask {
        TraitMask(self.0 | rhs.0)
    }
}
