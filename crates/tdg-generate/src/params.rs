use std::collections::BTreeMap;

use serde_json::Value;

use tdg_core::Distribution;

use crate::errors::{GenerationError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    String,
    Distribution,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind) -> Self {
        Self { key, kind }
    }
}

/// Directive options after their keys and value kinds were checked.
pub struct ParamMap<'a> {
    map: &'a BTreeMap<String, Value>,
}

/// Check every option key against `specs`; unknown keys are rejected.
pub fn validate_params<'a>(
    options: &'a BTreeMap<String, Value>,
    specs: &[ParamSpec],
    ctx: &str,
) -> Result<ParamMap<'a>> {
    for (key, value) in options {
        let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
            return Err(GenerationError::InvalidDirective(format!(
                "{ctx}: unknown option '{key}'"
            )));
        };
        validate_kind(ctx, key, spec.kind, value)?;
    }
    Ok(ParamMap { map: options })
}

impl<'a> ParamMap<'a> {
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.map.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.map.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn get_distribution(&self, key: &str) -> Option<Distribution> {
        self.get_str(key).and_then(Distribution::parse)
    }
}

fn validate_kind(ctx: &str, key: &str, kind: ParamKind, value: &Value) -> Result<()> {
    let valid = match kind {
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::String => value.is_string(),
        ParamKind::Distribution => value.as_str().and_then(Distribution::parse).is_some(),
    };

    if valid {
        Ok(())
    } else {
        Err(GenerationError::InvalidDirective(format!(
            "{ctx}: invalid value for option '{key}'"
        )))
    }
}
