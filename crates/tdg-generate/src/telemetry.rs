use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use crate::errors::{GenerationError, Result};

/// Subscriber settings for front ends embedding the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryOptions {
    /// Filter directive such as `tdg_generate=debug`; falls back to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    /// One JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            filter: None,
            json: true,
        }
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_tracing(options: &TelemetryOptions) -> Result<()> {
    let filter = match options.filter.as_deref() {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|err| GenerationError::Telemetry(err.to_string()))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let json_layer = options.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
    });
    let text_layer = (!options.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|err| GenerationError::Telemetry(err.to_string()))?;

    Ok(())
}
