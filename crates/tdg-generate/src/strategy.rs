//! Value-generation strategies.
//!
//! Directive strategy names parse into a closed [`Strategy`] enum whose variants carry their
//! validated options. Adding a strategy means adding a variant here and a sampling arm in
//! `generators`.

use std::collections::BTreeMap;

use serde_json::Value;

use tdg_core::{Distribution, StrategyKind};

use crate::errors::{GenerationError, Result};
use crate::generators::faker::Locale;
use crate::generators::pattern::DEFAULT_MAX_REPEAT;
use crate::model::GenerateOptions;
use crate::params::{ParamKind, ParamMap, ParamSpec, validate_params};

const FAKER_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("locale", ParamKind::String),
    ParamSpec::new("null_rate", ParamKind::Float),
    ParamSpec::new("distribution", ParamKind::Distribution),
];
const RANDOM_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("null_rate", ParamKind::Float),
    ParamSpec::new("distribution", ParamKind::Distribution),
];
const SEQUENTIAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Int),
    ParamSpec::new("step", ParamKind::Int),
    ParamSpec::new("null_rate", ParamKind::Float),
    ParamSpec::new("distribution", ParamKind::Distribution),
];
const PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String),
    ParamSpec::new("max_repeat", ParamKind::Int),
    ParamSpec::new("null_rate", ParamKind::Float),
    ParamSpec::new("distribution", ParamKind::Distribution),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Realistic text for string fields; other types are sampled at random.
    Faker { locale: Locale },
    Random,
    /// `start + row * step`.
    Sequential { start: i64, step: i64 },
    /// Regex-driven text. Without a pattern the field's own pattern constraint is used.
    Pattern {
        pattern: Option<String>,
        max_repeat: u32,
    },
    /// The field default, verbatim.
    Default,
}

impl Strategy {
    pub fn id(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Faker { .. } => StrategyKind::Faker,
            Strategy::Random => StrategyKind::Random,
            Strategy::Sequential { .. } => StrategyKind::Sequential,
            Strategy::Pattern { .. } => StrategyKind::Pattern,
            Strategy::Default => StrategyKind::Default,
        }
    }
}

/// A strategy plus the directive options that are not specific to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub strategy: Strategy,
    pub null_rate: Option<f64>,
    pub distribution: Option<Distribution>,
}

impl StrategyConfig {
    /// Parse a strategy and its options, rejecting options the strategy does not take.
    pub fn parse(
        kind: StrategyKind,
        options: &BTreeMap<String, Value>,
        defaults: &GenerateOptions,
        ctx: &str,
    ) -> Result<Self> {
        let specs = match kind {
            StrategyKind::Faker => FAKER_PARAMS,
            StrategyKind::Random | StrategyKind::Default => RANDOM_PARAMS,
            StrategyKind::Sequential => SEQUENTIAL_PARAMS,
            StrategyKind::Pattern => PATTERN_PARAMS,
        };
        let params = validate_params(options, specs, ctx)?;

        let strategy = match kind {
            StrategyKind::Faker => Strategy::Faker {
                locale: parse_locale(&params, defaults, ctx)?,
            },
            StrategyKind::Random => Strategy::Random,
            StrategyKind::Sequential => Strategy::Sequential {
                start: params.get_i64("start").unwrap_or(1),
                step: params.get_i64("step").unwrap_or(1),
            },
            StrategyKind::Pattern => Strategy::Pattern {
                pattern: params.get_str("pattern").map(str::to_string),
                max_repeat: parse_max_repeat(&params, ctx)?,
            },
            StrategyKind::Default => Strategy::Default,
        };

        let null_rate = params.get_f64("null_rate");
        if let Some(rate) = null_rate
            && !(0.0..=1.0).contains(&rate)
        {
            return Err(GenerationError::InvalidDirective(format!(
                "{ctx}: null_rate must be within [0, 1]"
            )));
        }

        Ok(Self {
            strategy,
            null_rate,
            distribution: params.get_distribution("distribution"),
        })
    }
}

fn parse_locale(params: &ParamMap<'_>, defaults: &GenerateOptions, ctx: &str) -> Result<Locale> {
    let raw = params.get_str("locale").unwrap_or(&defaults.locale);
    Locale::parse(raw).ok_or_else(|| {
        GenerationError::InvalidDirective(format!("{ctx}: unsupported locale '{raw}'"))
    })
}

fn parse_max_repeat(params: &ParamMap<'_>, ctx: &str) -> Result<u32> {
    match params.get_i64("max_repeat") {
        None => Ok(DEFAULT_MAX_REPEAT),
        Some(value) if value > 0 => u32::try_from(value).map_err(|_| {
            GenerationError::InvalidDirective(format!("{ctx}: max_repeat must fit u32"))
        }),
        Some(_) => Err(GenerationError::InvalidDirective(format!(
            "{ctx}: max_repeat must be > 0"
        ))),
    }
}
