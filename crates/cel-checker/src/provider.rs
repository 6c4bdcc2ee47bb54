//! Structured type lookups
//!
//! The checker treats message types as an opaque service behind
//! [`TypeProvider`]. [`TypeRegistry`] is a simple in-memory implementation
//! used by the CLI and by tests.

use cel_types::Type;
use rustc_hash::FxHashMap;

/// Declared type of a message field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    /// Field type
    pub ty: Type,
}

/// Answers questions about message types, enums and type identifiers
pub trait TypeProvider: Send + Sync {
    /// Message type for a fully qualified name
    fn find_struct_type(&self, name: &str) -> Option<Type>;

    /// Type of `field` in message `struct_name`
    fn find_struct_field_type(&self, struct_name: &str, field: &str) -> Option<FieldType>;

    /// Type of a value-level identifier known to the provider, e.g. an enum type name
    fn find_ident(&self, name: &str) -> Option<Type>;

    /// Value of a fully qualified enum constant such as `acme.Status.ACTIVE`
    fn enum_value(&self, name: &str) -> Option<i64>;
}

#[derive(Debug, Clone)]
struct StructDef {
    ty: Type,
    fields: Vec<(String, Type)>,
}

/// In-memory [`TypeProvider`]
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: FxHashMap<String, StructDef>,
    enum_values: FxHashMap<String, i64>,
    idents: FxHashMap<String, Type>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type and its fields, in declaration order
    pub fn register_struct<I, S>(&mut self, name: &str, fields: I)
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        let def = StructDef {
            ty: Type::object(name),
            fields: fields
                .into_iter()
                .map(|(field, ty)| (field.into(), ty.sanitize()))
                .collect(),
        };
        self.structs.insert(name.to_string(), def);
    }

    /// Register an enum; each value is reachable as `enum_name.VALUE`
    pub fn register_enum<I, S>(&mut self, enum_name: &str, values: I)
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        for (value_name, value) in values {
            self.enum_values
                .insert(format!("{}.{}", enum_name, value_name.as_ref()), value);
        }
        self.idents
            .insert(enum_name.to_string(), Type::type_of(Type::int()));
    }

    /// Register a value-level identifier
    pub fn register_ident(&mut self, name: &str, ty: Type) {
        self.idents.insert(name.to_string(), ty);
    }
}

impl TypeProvider for TypeRegistry {
    fn find_struct_type(&self, name: &str) -> Option<Type> {
        self.structs.get(name).map(|def| def.ty.clone())
    }

    fn find_struct_field_type(&self, struct_name: &str, field: &str) -> Option<FieldType> {
        let def = self.structs.get(struct_name)?;
        def.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, ty)| FieldType { ty: ty.clone() })
    }

    fn find_ident(&self, name: &str) -> Option<Type> {
        self.idents.get(name).cloned()
    }

    fn enum_value(&self, name: &str) -> Option<i64> {
        self.enum_values.get(name).copied()
    }
}
