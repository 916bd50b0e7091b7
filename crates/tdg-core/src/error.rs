use thiserror::Error;

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Core error type shared across tdg crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A table, field or type was declared twice.
    #[error("duplicate {what} '{name}'")]
    DuplicateName { what: &'static str, name: String },
    #[error("undefined type '{name}'")]
    UndefinedType { name: String },
    /// Custom type inheritance loops back on itself.
    #[error("circular type reference: {}", render_cycle(.cycle))]
    CircularType { cycle: Vec<String> },
    /// Foreign keys form a cycle; the tables are listed in reference order.
    #[error("circular foreign-key dependency: {}", render_cycle(.cycle))]
    CircularDependency { cycle: Vec<String> },
    #[error("invalid schema document")]
    InvalidDocument(Diagnostics),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Diagnostic category matching this error, if it has one.
    pub fn kind(&self) -> Option<DiagnosticKind> {
        match self {
            Error::DuplicateName { .. } => Some(DiagnosticKind::DuplicateName),
            Error::UndefinedType { .. } => Some(DiagnosticKind::UndefinedType),
            Error::CircularType { .. } => Some(DiagnosticKind::CircularType),
            Error::CircularDependency { .. } => Some(DiagnosticKind::CircularDependency),
            Error::InvalidDocument(_) => Some(DiagnosticKind::InvalidDocument),
            Error::Json(_) => None,
        }
    }
}

fn render_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}

/// Convenience alias for results returned by tdg crates.
pub type Result<T> = std::result::Result<T, Error>;
