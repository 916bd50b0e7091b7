//! Per-field value synthesis.
//!
//! Enum constraints and text patterns take precedence over the strategy: an enum field only
//! ever draws its allowed values, and a patterned text field always samples its regex. Key
//! members outside those cases take row-derived values before any strategy. Every candidate is
//! checked against the field's value domain and resampled on violation.

pub mod faker;
pub mod keyed;
pub mod pattern;
pub mod primitives;
pub mod sequential;

use chrono::NaiveDate;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use tdg_core::{Bounds, GeneratedValue, PrimitiveType, TerminalType, ValidatedField};

use crate::planner::FieldPlan;
use crate::strategy::Strategy;

/// Everything needed to produce one field value of one row.
pub struct ValueRequest<'a> {
    pub field: &'a ValidatedField,
    pub plan: &'a FieldPlan,
    pub row: u64,
    /// Distinct per row and attempt; numbers row-derived key values.
    pub ordinal: u64,
    pub base_date: NaiveDate,
}

/// Sample until the value satisfies the field's value constraints.
///
/// The strategy drives the first half of the budget; the rest falls back to random sampling.
/// On exhaustion the error names the constraint violated last.
pub fn generate_value(
    request: &ValueRequest<'_>,
    budget: u32,
    rng: &mut ChaCha8Rng,
) -> Result<GeneratedValue, String> {
    let synthetic_budget = budget.div_ceil(2);
    let mut violated = String::new();
    for attempt in 0..budget {
        let value = candidate(request, attempt < synthetic_budget, rng);
        match request.field.domain.admits(&value) {
            Ok(()) => return Ok(value),
            Err(label) => violated = label,
        }
    }
    Err(violated)
}

fn candidate(request: &ValueRequest<'_>, synthetic: bool, rng: &mut ChaCha8Rng) -> GeneratedValue {
    let domain = &request.field.domain;
    if request.plan.row_keyed
        && synthetic
        && let TerminalType::Primitive(primitive) = domain.terminal
        && let Some(value) = keyed::keyed_value(
            primitive,
            domain,
            request.plan.semantic,
            &request.field.name,
            request.ordinal,
            request.base_date,
        )
    {
        return value;
    }
    if let (Strategy::Default, Some(default)) = (&request.plan.strategy, &request.field.default) {
        return default.clone();
    }

    match domain.terminal {
        TerminalType::Primitive(primitive) => {
            element(request, primitive, domain.length, synthetic, rng)
        }
        TerminalType::Array { item, length } => {
            let (min, max) = match length {
                Some(fixed) => (u64::from(fixed), u64::from(fixed)),
                None => primitives::length_range(domain.length, primitives::DEFAULT_ARRAY_LEN),
            };
            let count = primitives::pick_len(min, max, rng);
            GeneratedValue::Array(
                (0..count)
                    .map(|_| element(request, item, Bounds::default(), synthetic, rng))
                    .collect(),
            )
        }
    }
}

fn element(
    request: &ValueRequest<'_>,
    primitive: PrimitiveType,
    length: Bounds<u64>,
    synthetic: bool,
    rng: &mut ChaCha8Rng,
) -> GeneratedValue {
    let domain = &request.field.domain;
    if let Some(allowed) = domain.allowed.as_deref()
        && !allowed.is_empty()
    {
        let index = match request.plan.strategy {
            Strategy::Sequential { .. } if synthetic => {
                usize::try_from(request.row % allowed.len() as u64).unwrap_or(0)
            }
            _ => rng.random_range(0..allowed.len()),
        };
        return allowed[index].clone();
    }

    if primitive == PrimitiveType::String
        && let Some(regex) = &request.plan.regex
    {
        return GeneratedValue::Text(pattern::sample(regex, rng));
    }

    match &request.plan.strategy {
        Strategy::Faker { locale } if synthetic && primitive == PrimitiveType::String => {
            GeneratedValue::Text(faker::semantic_text(request.plan.semantic, *locale, rng))
        }
        Strategy::Sequential { start, step } if synthetic => {
            let n = start.saturating_add((request.row as i64).saturating_mul(*step));
            sequential::sequential_value(
                primitive,
                domain.numeric,
                &request.field.name,
                n,
                request.base_date,
            )
        }
        _ => primitives::random_scalar(primitive, domain, length, request.base_date, rng),
    }
}
