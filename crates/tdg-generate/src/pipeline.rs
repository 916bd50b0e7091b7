//! Analyze, order and generate in one call.

use tracing::info;

use tdg_core::{Diagnostic, Schema};

use crate::engine::{GenerationEngine, GenerationOutput};
use crate::errors::{GenerationError, Result};
use crate::model::GenerateOptions;

/// Generated records together with the analyzer's advisory warnings.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output: GenerationOutput,
    pub order: Vec<String>,
    pub warnings: Vec<Diagnostic>,
}

/// Run a schema end to end. Analysis errors come back as [`GenerationError::Analysis`]
/// with every diagnostic; nothing is generated in that case.
pub fn run(schema: &Schema, options: &GenerateOptions, seed: u64) -> Result<PipelineOutput> {
    options.validate()?;
    let (validated, order) = tdg_core::compile(schema).map_err(GenerationError::Analysis)?;
    info!(
        schema = %validated.name,
        tables = order.len(),
        warnings = validated.warnings.len(),
        "schema compiled"
    );

    let output = GenerationEngine::new(options.clone()).generate(&validated, &order, seed)?;
    Ok(PipelineOutput {
        warnings: output.report.warnings.clone(),
        output,
        order,
    })
}
