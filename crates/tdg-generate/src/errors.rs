use thiserror::Error;

use tdg_core::{Diagnostic, DiagnosticKind, Diagnostics};

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No conforming value was found within the resample budget.
    #[error("table '{table}': field '{field}' cannot satisfy {constraint}")]
    UnsatisfiableConstraint {
        table: String,
        field: String,
        constraint: String,
    },
    #[error("table '{table}': no generated rows in '{target_table}' to reference")]
    EmptyReferenceSet { table: String, target_table: String },
    #[error("invalid directive: {0}")]
    InvalidDirective(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("schema analysis failed with {} error(s)", .0.errors.len())]
    Analysis(Diagnostics),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("telemetry init failed: {0}")]
    Telemetry(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GenerationError {
    /// Structured form for front ends; `None` for errors that are not schema diagnostics.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        match self {
            GenerationError::UnsatisfiableConstraint { table, field, .. } => Some(
                Diagnostic::error(DiagnosticKind::UnsatisfiableConstraint, self.to_string())
                    .in_table(table)
                    .on_field(field),
            ),
            GenerationError::EmptyReferenceSet { table, .. } => Some(
                Diagnostic::error(DiagnosticKind::EmptyReferenceSet, self.to_string())
                    .in_table(table),
            ),
            GenerationError::InvalidDirective(message) => Some(Diagnostic::error(
                DiagnosticKind::InvalidDirective,
                message.clone(),
            )),
            GenerationError::Analysis(diagnostics) => diagnostics.errors.first().cloned(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
