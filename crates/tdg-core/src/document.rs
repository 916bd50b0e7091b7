//! JSON interchange for parsed schemas.
//!
//! An external parser may deliver the AST as a JSON document. Documents are checked against
//! the JSON Schema derived from [`Schema`] before they are deserialized.

use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use crate::ast::Schema;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};

/// Emit the JSON Schema for schema documents.
pub fn document_json_schema() -> RootSchema {
    schema_for!(Schema)
}

/// Validate a JSON document against the schema document contract.
pub fn validate_document(document: &Value) -> Result<Diagnostics> {
    let schema = serde_json::to_value(document_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push_error(Diagnostic::error(
            DiagnosticKind::InvalidDocument,
            format!("document schema does not compile: {err}"),
        ));
        Error::InvalidDocument(diagnostics)
    })?;

    let mut diagnostics = Diagnostics::default();
    if let Err(errors) = compiled.validate(document) {
        for error in errors {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            diagnostics.push_error(Diagnostic::error(
                DiagnosticKind::InvalidDocument,
                format!("{path}: {error}"),
            ));
        }
    }
    Ok(diagnostics)
}

/// Parse and validate a schema document.
pub fn parse_document(source: &str) -> Result<Schema> {
    let document: Value = serde_json::from_str(source)?;
    let diagnostics = validate_document(&document)?;
    if !diagnostics.is_ok() {
        return Err(Error::InvalidDocument(diagnostics));
    }
    Ok(serde_json::from_value(document)?)
}

/// Serialize a schema back to its document form.
pub fn to_document(schema: &Schema) -> Result<String> {
    Ok(serde_json::to_string_pretty(schema)?)
}
