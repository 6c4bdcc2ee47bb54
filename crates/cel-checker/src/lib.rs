//! CEL Type Checker
//!
//! Static type checking for Common Expression Language expressions.
//!
//! This crate provides:
//! - Identifier and function declarations with overload validation
//! - Container-relative name resolution with aliases and abbreviations
//! - Lexical scopes for comprehension variables
//! - A single-pass checker that types every node and resolves references
//! - The standard library declarations
//! - Codespan diagnostics with human and JSON rendering
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use cel_checker::{check, CheckerOptions, Constant, Container, Env, Expr, SourceInfo, TypeRegistry};
//!
//! let env = Env::standard(Container::default(), Arc::new(TypeRegistry::new()), CheckerOptions::default())?;
//! let source = SourceInfo::new("<input>", "1 + 2");
//! let expr = Expr::call(3, "_+_", vec![Expr::constant(1, Constant::Int(1)), Expr::constant(2, Constant::Int(2))]);
//!
//! let result = check(&env, &source, expr);
//! assert!(!result.has_errors());
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod source;
pub mod error;
pub mod container;
pub mod decls;
pub mod macros;
pub mod overloads;
pub mod provider;
pub mod scopes;
pub mod stdlib;
pub mod env;
pub mod checker;
pub mod diagnostic;

// Re-export main types
pub use ast::{Comprehension, Constant, Expr, ExprId, ExprKind, MapEntry, ReferenceInfo, StructField};
pub use source::{Location, SourceInfo};
pub use error::{CheckError, CheckErrors, DeclError, ReportedError};
pub use container::Container;
pub use decls::{FunctionDecl, OverloadDecl, OverloadImpl, VariableDecl};
pub use provider::{FieldType, TypeProvider, TypeRegistry};
pub use env::{CheckerOptions, Env};
pub use checker::{check, CheckResult, Checker};
pub use diagnostic::{Diagnostic, ErrorCode};
