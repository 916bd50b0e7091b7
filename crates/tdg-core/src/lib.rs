//! Core model and compiler pipeline for tdg schemas.
//!
//! This crate defines the schema AST, the custom type registry, semantic analysis,
//! foreign-key dependency ordering, and the value model shared with the generator.

pub mod ast;
pub mod constraints;
pub mod diagnostics;
pub mod document;
pub mod domain;
pub mod error;
pub mod expr;
pub mod graph;
pub mod semantic;
pub mod symbols;
pub mod types;
pub mod value;

pub use ast::{
    DataType, Field, FieldModifiers, FieldOverride, GenerationDirective, Literal, PrimitiveType,
    Schema, SourceLocation, StrategyKind, Table, TypeDecl,
};
pub use constraints::{
    CheckConstraint, Constraint, Distribution, EnumConstraint, ForeignKey, LengthConstraint,
    PatternConstraint, PrimaryKey, RangeConstraint, UniqueConstraint,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use document::{document_json_schema, parse_document, to_document, validate_document};
pub use domain::{Bounds, DomainError, ValueDomain};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphReport, GraphSummary};
pub use semantic::{
    CompiledCheck, KeyConstraint, SemanticAnalyzer, ValidatedDirective, ValidatedField,
    ValidatedForeignKey, ValidatedOverride, ValidatedSchema, ValidatedTable, analyze,
};
pub use symbols::SymbolTable;
pub use types::{ResolvedType, TerminalType, TypeDefinition, TypeRegistry};
pub use value::{GeneratedRecord, GeneratedValue};

/// Analyze a schema and compute its generation order.
///
/// A foreign-key cycle is reported as a fatal `circular_dependency` diagnostic on the first
/// table of the cycle.
pub fn compile(schema: &Schema) -> std::result::Result<(ValidatedSchema, Vec<String>), Diagnostics> {
    let validated = analyze(schema)?;
    match DependencyGraph::from_validated(&validated).order() {
        Ok(order) => Ok((validated, order)),
        Err(err) => {
            let mut diagnostic =
                Diagnostic::error(DiagnosticKind::CircularDependency, err.to_string());
            if let Error::CircularDependency { cycle } = &err
                && let Some(first) = cycle.first()
            {
                diagnostic = diagnostic
                    .in_table(first.clone())
                    .at(validated.table(first).and_then(|table| table.location));
            }
            let mut diagnostics = Diagnostics::default();
            diagnostics.push_error(diagnostic);
            for warning in validated.warnings {
                diagnostics.push_warning(warning);
            }
            Err(diagnostics)
        }
    }
}
