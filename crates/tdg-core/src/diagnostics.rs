use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::SourceLocation;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DuplicateName,
    UndefinedType,
    UndefinedField,
    UndefinedTable,
    CircularType,
    CircularDependency,
    ConstraintWellFormedness,
    UnsatisfiableConstraint,
    EmptyReferenceSet,
    InvalidDirective,
    InvalidDocument,
    MissingKey,
    RedundantType,
    UnusedType,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateName => "duplicate_name",
            DiagnosticKind::UndefinedType => "undefined_type",
            DiagnosticKind::UndefinedField => "undefined_field",
            DiagnosticKind::UndefinedTable => "undefined_table",
            DiagnosticKind::CircularType => "circular_type",
            DiagnosticKind::CircularDependency => "circular_dependency",
            DiagnosticKind::ConstraintWellFormedness => "constraint_well_formedness",
            DiagnosticKind::UnsatisfiableConstraint => "unsatisfiable_constraint",
            DiagnosticKind::EmptyReferenceSet => "empty_reference_set",
            DiagnosticKind::InvalidDirective => "invalid_directive",
            DiagnosticKind::InvalidDocument => "invalid_document",
            DiagnosticKind::MissingKey => "missing_key",
            DiagnosticKind::RedundantType => "redundant_type",
            DiagnosticKind::UnusedType => "unused_type",
        }
    }
}

/// Structured diagnostic with optional location, table and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location: None,
            table: None,
            field: None,
        }
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn in_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}[{}]", self.kind.code())?;
        match (&self.table, &self.field) {
            (Some(table), Some(field)) => write!(f, " {table}.{field}")?,
            (Some(table), None) => write!(f, " {table}")?,
            (None, Some(field)) => write!(f, " {field}")?,
            (None, None) => {}
        }
        if let Some(location) = self.location {
            write!(f, " ({location})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Aggregated diagnostics split by severity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn push_warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    /// Route a diagnostic by its severity.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.push_error(diagnostic),
            Severity::Warning => self.push_warning(diagnostic),
        }
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.iter().any(|diagnostic| diagnostic.kind == kind)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
