//! Deterministic record generation for validated tdg schemas.
//!
//! Tables are generated in foreign-key order. Each row draws from its own seeded RNG, so the
//! record stream depends only on the schema, the options and the seed.

pub mod batch;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod planner;
pub mod reference;
pub mod sink;
pub mod strategy;
pub mod telemetry;
pub mod unique;

pub use engine::{GenerationEngine, GenerationOutput};
pub use errors::{GenerationError, Result};
pub use model::{GenerateOptions, GenerationReport, TableReport, TableState};
pub use pipeline::{PipelineOutput, run};
pub use reference::ReferenceResolver;
pub use sink::{CollectingSink, RecordSink};
pub use strategy::{Strategy, StrategyConfig};
pub use telemetry::{TelemetryOptions, init_tracing};
