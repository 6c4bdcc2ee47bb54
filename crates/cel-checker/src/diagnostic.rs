//! Diagnostic infrastructure for error reporting
//!
//! Turns check and declaration errors into codespan diagnostics with source
//! context, and renders them either to a terminal or as JSON.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use termcolor::{ColorChoice, StandardStream, WriteColor};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

use crate::error::{CheckError, CheckErrors, DeclError, ReportedError};

/// Error code for a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    /// Code as text, e.g. `E1001`
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
    code: Option<ErrorCode>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner = self.inner.with_code(code.0);
        self.code = Some(code);
        self
    }

    /// Add a primary label (main error location)
    pub fn with_primary_label(mut self, file_id: usize, range: Range<usize>, message: impl Into<String>) -> Self {
        self.inner
            .labels
            .push(Label::primary(file_id, range).with_message(message));
        self
    }

    /// Add a secondary label (related location)
    pub fn with_secondary_label(mut self, file_id: usize, range: Range<usize>, message: impl Into<String>) -> Self {
        self.inner
            .labels
            .push(Label::secondary(file_id, range).with_message(message));
        self
    }

    /// Add a note (additional context)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Add a help suggestion
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.notes.push(format!("help: {}", help.into()));
        self
    }

    /// Create diagnostic from a reported check error
    ///
    /// The primary label covers one character at the node's offset, clamped
    /// to the length of `source`.
    pub fn from_check_error(reported: &ReportedError, file_id: usize, source: &str) -> Self {
        use CheckError::*;

        let error = &reported.error;
        let start = reported.location.offset.min(source.len());
        let end = (start + 1).min(source.len());
        let span = start..end;

        let diag = Diagnostic::error(error.to_string()).with_code(error_code(error));
        match error {
            UndeclaredReference { name, container, .. } => {
                let diag = diag.with_primary_label(file_id, span, "not found in this scope");
                if container.is_empty() {
                    diag
                } else {
                    diag.with_note(format!("'{}' was also looked up relative to container '{}'", name, container))
                }
            }

            NoMatchingOverload { function, .. } => diag
                .with_primary_label(file_id, span, "no overload accepts these arguments")
                .with_help(format!("check the declared overloads of '{}'", function)),

            TypeMismatch { expected, actual, .. } => diag.with_primary_label(
                file_id,
                span,
                format!("expected '{}', found '{}'", expected, actual),
            ),

            FieldTypeMismatch { field, .. } => {
                diag.with_primary_label(file_id, span, format!("initializer for '{}'", field))
            }

            IncompatibleType { .. } | ReferenceRedefinition { .. } => diag
                .with_primary_label(file_id, span, "node checked twice")
                .with_note("expression ids are expected to be unique"),

            NotAType { .. } => diag.with_primary_label(file_id, span, "not a type"),

            NotAMessageType { .. } => diag
                .with_primary_label(file_id, span, "not a message type")
                .with_help("only message types can be constructed with `Name{field: value}`"),

            UndefinedField { .. } => diag.with_primary_label(file_id, span, "field not found"),

            NotAComprehensionRange { .. } => diag.with_primary_label(file_id, span, "not iterable"),

            FieldSelectionUnsupported { .. } => {
                diag.with_primary_label(file_id, span, "field selection not supported")
            }

            NotAnOptionalFieldSelection { .. } => diag
                .with_primary_label(file_id, span, "expected a field name")
                .with_help("optional selection takes the form `operand.?field`"),

            UnexpectedFailedResolution { .. } => diag
                .with_primary_label(file_id, span, "type provider lookup failed")
                .with_note("the type provider reported this type earlier but no longer resolves it"),

            Internal { .. } => diag.with_primary_label(file_id, span, "internal error"),
        }
    }

    /// Create diagnostic from a declaration error; these have no source location
    pub fn from_decl_error(error: &DeclError) -> Self {
        use DeclError::*;

        let code = match error {
            OverloadCollision { .. } => "E2001",
            OverloadRedefinition { .. } => "E2002",
            SingletonConflict { .. } => "E2003",
            UnrelatedMerge { .. } => "E2004",
            OverlappingIdentifier { .. } => "E2005",
            OverlappingMacro { .. } => "E2006",
            InvalidQualifiedName { .. } => "E2007",
            AliasCollision { .. } => "E2008",
        };
        let diag = Diagnostic::error(error.to_string()).with_code(ErrorCode(code));
        match error {
            OverlappingMacro { .. } => diag.with_note("macros are expanded before checking, so this function could never be called"),
            _ => diag,
        }
    }

    /// Emit the diagnostic to stderr with colors
    pub fn emit(&self, files: &SimpleFiles<String, String>) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        self.emit_to(&mut writer, files)
    }

    /// Emit the diagnostic to any color-capable writer
    pub fn emit_to(
        &self,
        writer: &mut dyn WriteColor,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        term::emit(writer, &config, files, &self.inner)
    }

    /// Get the underlying codespan diagnostic (for testing/custom rendering)
    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }

    /// Error code, if set
    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    /// Convert to JSON representation for tooling
    pub fn to_json(&self, files: &SimpleFiles<String, String>) -> Result<String, serde_json::Error> {
        let json_diag = JsonDiagnostic::from_diagnostic(self, files);
        serde_json::to_string_pretty(&json_diag)
    }
}

/// Diagnostics for every error in a collector, in report order
pub fn from_check_errors(errors: &CheckErrors, file_id: usize, source: &str) -> Vec<Diagnostic> {
    errors
        .errors()
        .iter()
        .map(|reported| Diagnostic::from_check_error(reported, file_id, source))
        .collect()
}

/// JSON representation of a diagnostic
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// Error code (e.g., "E1001")
    pub code: Option<String>,
    /// Severity level
    pub severity: String,
    /// Main error message
    pub message: String,
    /// Source locations with labels
    pub labels: Vec<JsonLabel>,
    /// Additional notes and help
    pub notes: Vec<String>,
}

/// JSON representation of a diagnostic label
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLabel {
    /// File path
    pub file: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Label message
    pub message: Option<String>,
    /// Label style (primary or secondary)
    pub style: String,
}

impl JsonDiagnostic {
    /// Convert a Diagnostic to JSON representation
    pub fn from_diagnostic(diag: &Diagnostic, files: &SimpleFiles<String, String>) -> Self {
        let severity = match diag.inner.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
            Severity::Bug => "bug",
        };

        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file = files.get(label.file_id).ok()?;
                let start = file.location((), label.range.start).ok()?;
                let end = file.location((), label.range.end).ok()?;

                Some(JsonLabel {
                    file: file.name().to_string(),
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: Some(label.message.clone()),
                    style: match label.style {
                        LabelStyle::Primary => "primary",
                        LabelStyle::Secondary => "secondary",
                    }
                    .to_string(),
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.as_ref().map(|c| c.0.to_string()),
            severity: severity.to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// Get error code for a CheckError
pub fn error_code(error: &CheckError) -> ErrorCode {
    use CheckError::*;

    match error {
        UndeclaredReference { .. } => ErrorCode("E1001"),
        NoMatchingOverload { .. } => ErrorCode("E1002"),
        TypeMismatch { .. } => ErrorCode("E1003"),
        FieldTypeMismatch { .. } => ErrorCode("E1004"),
        IncompatibleType { .. } => ErrorCode("E1005"),
        ReferenceRedefinition { .. } => ErrorCode("E1006"),
        NotAType { .. } => ErrorCode("E1007"),
        NotAMessageType { .. } => ErrorCode("E1008"),
        UndefinedField { .. } => ErrorCode("E1009"),
        NotAComprehensionRange { .. } => ErrorCode("E1010"),
        FieldSelectionUnsupported { .. } => ErrorCode("E1011"),
        NotAnOptionalFieldSelection { .. } => ErrorCode("E1012"),
        UnexpectedFailedResolution { .. } => ErrorCode("E1013"),
        Internal { .. } => ErrorCode("E1014"),
    }
}

/// Helper to create a SimpleFiles instance from source code
pub fn create_files(path: impl Into<PathBuf>, source: impl Into<String>) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(path.into().display().to_string(), source.into());
    files
}
