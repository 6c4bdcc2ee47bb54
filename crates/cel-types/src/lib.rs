//! CEL Type System
//!
//! Type algebra, substitution mappings and unification for checking CEL
//! expressions.

#![warn(missing_docs)]

pub mod kind;
pub mod ty;
pub mod wellknown;
pub mod mapping;
pub mod assignability;
pub mod parse;
pub mod error;

pub use kind::{Kind, Trait, TraitMask};
pub use ty::{Assignability, AssignablePredicate, Type, OPTIONAL_TYPE_NAME};
pub use mapping::TypeMapping;
pub use assignability::{
    is_assignable, is_assignable_list, is_equal_or_less_specific, most_general,
    not_referenced_in, substitute,
};
pub use parse::parse_type;
pub use wellknown::{checked_well_known, is_well_known};
pub use error::TypeError;
