//! Error types for declaration assembly and type checking
//!
//! Declaration problems abort environment construction with a [`DeclError`].
//! Checking problems never abort: each becomes a [`CheckError`] collected in
//! [`CheckErrors`] while the checker keeps going.

use std::fmt;

use thiserror::Error;

use crate::ast::ExprId;
use crate::source::{Location, SourceInfo};

/// Most diagnostics reported for a single expression
pub const MAX_REPORTED_ERRORS: usize = 100;

// ============================================================================
// Declaration errors
// ============================================================================

/// Errors raised while assembling declarations into an environment
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeclError {
    /// Two overloads of one function accept overlapping arguments
    #[error("overload signature collision in function {function}: {overload} collides with {existing}")]
    OverloadCollision {
        /// Function name
        function: String,
        /// Overload being added
        overload: String,
        /// Overload already present
        existing: String,
    },

    /// Same overload id declared twice with different signatures
    #[error("overload redefinition in function {function}: {overload} has multiple definitions")]
    OverloadRedefinition {
        /// Function name
        function: String,
        /// Overload id
        overload: String,
    },

    /// Both sides of a merge carry a singleton binding
    #[error("function already has a singleton binding: {function}")]
    SingletonConflict {
        /// Function name
        function: String,
    },

    /// Merging declarations that do not share a name
    #[error("cannot merge unrelated functions. {function} and {other}")]
    UnrelatedMerge {
        /// Receiving function
        function: String,
        /// Function being merged in
        other: String,
    },

    /// Identifier declared twice with different types
    #[error("overlapping identifier for name '{name}'")]
    OverlappingIdentifier {
        /// Identifier name
        name: String,
    },

    /// Function overload shaped like a standard macro
    #[error("overlapping macro for name '{name}' with {arg_count} args")]
    OverlappingMacro {
        /// Function name
        name: String,
        /// Argument count, excluding the receiver
        arg_count: usize,
    },

    /// Container, alias or abbreviation that is not a valid name
    #[error("invalid qualified name: {name}, {reason}")]
    InvalidQualifiedName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Alias already bound to a different name
    #[error("{kind} collides with existing reference: name={name}, alias={alias}, existing={existing}")]
    AliasCollision {
        /// `alias` or `abbreviation`
        kind: &'static str,
        /// Qualified name being aliased
        name: String,
        /// Alias
        alias: String,
        /// Name the alias already points to
        existing: String,
    },
}

// ============================================================================
// Check errors
// ============================================================================

/// Diagnostics produced while checking an expression
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckError {
    /// Identifier or function that resolves to nothing
    #[error("undeclared reference to '{name}' (in container '{container}')")]
    UndeclaredReference {
        /// Name as written
        name: String,
        /// Active container
        container: String,
        /// Node id
        id: ExprId,
    },

    /// No overload accepts the argument types
    #[error("found no matching overload for '{function}' applied to '{signature}'")]
    NoMatchingOverload {
        /// Function name
        function: String,
        /// Argument types, `(a, b)` or `target.(a, b)`
        signature: String,
        /// Node id
        id: ExprId,
    },

    /// Two types that had to unify did not
    #[error("expected type '{expected}' but found '{actual}'")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
        /// Node id
        id: ExprId,
    },

    /// Struct field initializer of the wrong type
    #[error("expected type of field '{field}' is '{expected}' but provided type is '{actual}'")]
    FieldTypeMismatch {
        /// Field name
        field: String,
        /// Declared field type
        expected: String,
        /// Initializer type
        actual: String,
        /// Entry id
        id: ExprId,
    },

    /// Node typed twice with different types
    #[error("incompatible type already exists for expression: {expr}({id}) old:{old}, new:{new}")]
    IncompatibleType {
        /// Node description
        expr: String,
        /// Previous type
        old: String,
        /// New type
        new: String,
        /// Node id
        id: ExprId,
    },

    /// Node resolved twice to different references
    #[error("reference already exists for expression: {expr}({id}) old:{old}, new:{new}")]
    ReferenceRedefinition {
        /// Node description
        expr: String,
        /// Previous reference
        old: String,
        /// New reference
        new: String,
        /// Node id
        id: ExprId,
    },

    /// Struct literal named after something that is not a type
    #[error("'{name}' is not a type")]
    NotAType {
        /// Name
        name: String,
        /// Node id
        id: ExprId,
    },

    /// Struct literal named after a type that is not a message
    #[error("'{name}' is not a message type")]
    NotAMessageType {
        /// Name
        name: String,
        /// Node id
        id: ExprId,
    },

    /// Field absent from a message type
    #[error("undefined field '{field}'")]
    UndefinedField {
        /// Field name
        field: String,
        /// Node id
        id: ExprId,
    },

    /// Comprehension over a value that cannot be iterated
    #[error("expression of type '{ty}' cannot be range of a comprehension (must be list, map, or dynamic)")]
    NotAComprehensionRange {
        /// Range type
        ty: String,
        /// Node id
        id: ExprId,
    },

    /// Field selection on a type without fields
    #[error("type '{ty}' does not support field selection")]
    FieldSelectionUnsupported {
        /// Operand type
        ty: String,
        /// Node id
        id: ExprId,
    },

    /// `_?._` whose field argument is not a string literal
    #[error("unsupported optional field selection: {field}")]
    NotAnOptionalFieldSelection {
        /// Field argument as written
        field: String,
        /// Node id
        id: ExprId,
    },

    /// Registry no longer knows a struct it reported earlier
    #[error("unexpected failed resolution of '{name}'")]
    UnexpectedFailedResolution {
        /// Struct name
        name: String,
        /// Node id
        id: ExprId,
    },

    /// Invariant violation inside the checker
    #[error("internal error: {message}")]
    Internal {
        /// Description
        message: String,
        /// Node id
        id: ExprId,
    },
}

impl CheckError {
    /// Node the diagnostic is attached to
    pub fn id(&self) -> ExprId {
        use CheckError::*;

        match self {
            UndeclaredReference { id, .. }
            | NoMatchingOverload { id, .. }
            | TypeMismatch { id, .. }
            | FieldTypeMismatch { id, .. }
            | IncompatibleType { id, .. }
            | ReferenceRedefinition { id, .. }
            | NotAType { id, .. }
            | NotAMessageType { id, .. }
            | UndefinedField { id, .. }
            | NotAComprehensionRange { id, .. }
            | FieldSelectionUnsupported { id, .. }
            | NotAnOptionalFieldSelection { id, .. }
            | UnexpectedFailedResolution { id, .. }
            | Internal { id, .. } => *id,
        }
    }
}

/// A [`CheckError`] with its resolved source location
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedError {
    /// The diagnostic
    pub error: CheckError,
    /// Where it occurred
    pub location: Location,
}

/// Ordered, capped collection of check diagnostics
#[derive(Debug, Clone, Default)]
pub struct CheckErrors {
    description: String,
    errors: Vec<ReportedError>,
    dropped: usize,
}

impl CheckErrors {
    /// Empty collector for the named source
    pub fn new(description: impl Into<String>) -> Self {
        CheckErrors {
            description: description.into(),
            errors: Vec::new(),
            dropped: 0,
        }
    }

    /// Record a diagnostic; anything past [`MAX_REPORTED_ERRORS`] is counted but not kept
    pub fn report(&mut self, error: CheckError, source: &SourceInfo) {
        if self.errors.len() >= MAX_REPORTED_ERRORS {
            self.dropped += 1;
            return;
        }
        let location = source.location(error.id());
        self.errors.push(ReportedError { error, location });
    }

    /// Kept diagnostics in report order
    pub fn errors(&self) -> &[ReportedError] {
        &self.errors
    }

    /// Diagnostics past the cap
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of kept diagnostics
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate the kept diagnostics
    pub fn iter(&self) -> impl Iterator<Item = &CheckError> {
        self.errors.iter().map(|e| &e.error)
    }
}

impl fmt::Display for CheckErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "ERROR: {}:{}:{}: {}",
                self.description, e.location.line, e.location.column, e.error
            )?;
        }
        if self.dropped > 0 {
            write!(f, "\n{} more errors were truncated", self.dropped)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckErrors {}
