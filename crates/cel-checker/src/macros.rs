//! Standard macro signatures
//!
//! Macros are expanded by the parser before checking. A function declared
//! with the same name, arity and call style as a macro could never be
//! called, so the environment refuses such declarations.

/// Shape of a parser macro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroSignature {
    /// Macro name
    pub name: &'static str,
    /// Argument count, excluding the receiver
    pub arg_count: usize,
    /// Whether the macro is written with receiver syntax
    pub receiver_style: bool,
}

const fn global(name: &'static str, arg_count: usize) -> MacroSignature {
    MacroSignature {
        name,
        arg_count,
        receiver_style: false,
    }
}

const fn receiver(name: &'static str, arg_count: usize) -> MacroSignature {
    MacroSignature {
        name,
        arg_count,
        receiver_style: true,
    }
}

/// Macros recognized by the standard parser
pub const STANDARD_MACROS: &[MacroSignature] = &[
    global("has", 1),
    receiver("all", 2),
    receiver("all", 3),
    receiver("exists", 2),
    receiver("exists", 3),
    receiver("exists_one", 2),
    receiver("exists_one", 3),
    receiver("map", 2),
    receiver("map", 3),
    receiver("filter", 2),
];

/// Find the standard macro with this shape
pub fn find_macro(name: &str, arg_count: usize, receiver_style: bool) -> Option<&'static MacroSignature> {
    STANDARD_MACROS
        .iter()
        .find(|m| m.name == name && m.arg_count == arg_count && m.receiver_style == receiver_style)
}
