//! Checked forms of the protobuf well-known types

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::ty::Type;

static CHECKED_WELL_KNOWNS: Lazy<FxHashMap<&'static str, Type>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    // Wrapper types
    m.insert("google.protobuf.BoolValue", Type::nullable(Type::bool()));
    m.insert("google.protobuf.BytesValue", Type::nullable(Type::bytes()));
    m.insert("google.protobuf.DoubleValue", Type::nullable(Type::double()));
    m.insert("google.protobuf.FloatValue", Type::nullable(Type::double()));
    m.insert("google.protobuf.Int32Value", Type::nullable(Type::int()));
    m.insert("google.protobuf.Int64Value", Type::nullable(Type::int()));
    m.insert("google.protobuf.StringValue", Type::nullable(Type::string()));
    m.insert("google.protobuf.UInt32Value", Type::nullable(Type::uint()));
    m.insert("google.protobuf.UInt64Value", Type::nullable(Type::uint()));
    // Well-known types
    m.insert("google.protobuf.Any", Type::any());
    m.insert("google.protobuf.Duration", Type::duration());
    m.insert("google.protobuf.Timestamp", Type::timestamp());
    // JSON types
    m.insert("google.protobuf.ListValue", Type::list(Type::dyn_type()));
    m.insert("google.protobuf.NullValue", Type::null());
    m.insert("google.protobuf.Struct", Type::map(Type::string(), Type::dyn_type()));
    m.insert("google.protobuf.Value", Type::dyn_type());
    m
});

/// The checked type for a well-known protobuf message name
pub fn checked_well_known(name: &str) -> Option<Type> {
    CHECKED_WELL_KNOWNS.get(name).cloned()
}

/// Whether `name` is one of the well-known protobuf message names
pub fn is_well_known(name: &str) -> bool {
    CHECKED_WELL_KNOWNS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn test_wrappers_accept_null() {
        let t = checked_well_known("google.protobuf.UInt32Value").unwrap();
        assert_eq!(t.kind(), Kind::Uint);
        assert!(t.accepts_null());
    }

    #[test]
    fn test_json_types() {
        assert_eq!(
            checked_well_known("google.protobuf.ListValue"),
            Some(Type::list(Type::dyn_type()))
        );
        assert_eq!(checked_well_known("google.protobuf.Value"), Some(Type::dyn_type()));
        assert!(checked_well_known("acme.Order").is_none());
        assert!(is_well_known("google.protobuf.Any"));
    }
}
