//! Row-derived values for primary-key and unique members.
//!
//! Value number `ordinal` is distinct for every row and attempt of a table, so keys drawn this
//! way never collide however many rows the table has.

use chrono::{Days, Duration, NaiveDate, NaiveTime};

use tdg_core::{GeneratedValue, PrimitiveType, ValueDomain};

use super::faker::SemanticKind;

/// Key value number `ordinal` inside the field's bounds, counting up from the lower bound (or
/// down from the upper one). `None` when the bounds are too narrow or the type has no ordering
/// worth deriving.
pub fn keyed_value(
    primitive: PrimitiveType,
    domain: &ValueDomain,
    semantic: SemanticKind,
    field: &str,
    ordinal: u64,
    base_date: NaiveDate,
) -> Option<GeneratedValue> {
    let value = match primitive {
        PrimitiveType::Integer => {
            let n = i64::try_from(ordinal).ok()?;
            GeneratedValue::Int(match (domain.numeric.min, domain.numeric.max) {
                (Some(min), _) => (min.ceil() as i64).checked_add(n)?,
                (None, Some(max)) => (max.floor() as i64).checked_sub(n)?,
                (None, None) => n.checked_add(1)?,
            })
        }
        PrimitiveType::Decimal => {
            let n = ordinal as f64;
            GeneratedValue::Decimal(match (domain.numeric.min, domain.numeric.max) {
                (Some(min), _) => min + n,
                (None, Some(max)) => max - n,
                (None, None) => n + 1.0,
            })
        }
        PrimitiveType::String => GeneratedValue::Text(match semantic {
            SemanticKind::Email => format!("user{:05}@example.com", ordinal.saturating_add(1)),
            _ => format!("{field}_{}", ordinal.saturating_add(1)),
        }),
        PrimitiveType::Date => {
            let days = Days::new(ordinal);
            GeneratedValue::Date(match (domain.temporal.min, domain.temporal.max) {
                (Some(min), _) => min.date().checked_add_days(days)?,
                (None, Some(max)) => max.date().checked_sub_days(days)?,
                (None, None) => base_date.checked_add_days(days)?,
            })
        }
        PrimitiveType::Timestamp => {
            let seconds = Duration::try_seconds(i64::try_from(ordinal).ok()?)?;
            GeneratedValue::Timestamp(match (domain.temporal.min, domain.temporal.max) {
                (Some(min), _) => min.checked_add_signed(seconds)?,
                (None, Some(max)) => max.checked_sub_signed(seconds)?,
                (None, None) => base_date
                    .and_time(NaiveTime::MIN)
                    .checked_add_signed(seconds)?,
            })
        }
        PrimitiveType::Boolean
        | PrimitiveType::Uuid
        | PrimitiveType::Binary
        | PrimitiveType::Json => return None,
    };
    domain.admits(&value).is_ok().then_some(value)
}

/// Whether [`keyed_value`] can produce values of `primitive` at all.
pub fn derives(primitive: PrimitiveType) -> bool {
    matches!(
        primitive,
        PrimitiveType::Integer
            | PrimitiveType::Decimal
            | PrimitiveType::String
            | PrimitiveType::Date
            | PrimitiveType::Timestamp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdg_core::{Constraint, LengthConstraint, Literal, RangeConstraint, TerminalType};

    fn domain(primitive: PrimitiveType, constraints: &[Constraint]) -> ValueDomain {
        ValueDomain::build(TerminalType::Primitive(primitive), constraints).expect("domain")
    }

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn integer(domain: &ValueDomain, ordinal: u64) -> Option<GeneratedValue> {
        keyed_value(
            PrimitiveType::Integer,
            domain,
            SemanticKind::Word,
            "id",
            ordinal,
            base(),
        )
    }

    #[test]
    fn unbounded_integers_count_from_one() {
        let domain = domain(PrimitiveType::Integer, &[]);
        assert_eq!(integer(&domain, 0), Some(GeneratedValue::Int(1)));
        assert_eq!(integer(&domain, 24_999), Some(GeneratedValue::Int(25_000)));
    }

    #[test]
    fn ranged_integers_stay_inside_the_range() {
        let domain = domain(
            PrimitiveType::Integer,
            &[Constraint::Range(RangeConstraint {
                min: Some(Literal::Int(100)),
                max: Some(Literal::Int(102)),
            })],
        );
        assert_eq!(integer(&domain, 0), Some(GeneratedValue::Int(100)));
        assert_eq!(integer(&domain, 2), Some(GeneratedValue::Int(102)));
        assert_eq!(integer(&domain, 3), None);

        let below = domain_with_max(-5);
        assert_eq!(integer(&below, 3), Some(GeneratedValue::Int(-8)));
    }

    fn domain_with_max(max: i64) -> ValueDomain {
        domain(
            PrimitiveType::Integer,
            &[Constraint::Range(RangeConstraint {
                min: None,
                max: Some(Literal::Int(max)),
            })],
        )
    }

    #[test]
    fn emails_and_text_carry_the_row_number() {
        let text = domain(PrimitiveType::String, &[]);
        assert_eq!(
            keyed_value(PrimitiveType::String, &text, SemanticKind::Email, "email", 41, base()),
            Some(GeneratedValue::Text("user00042@example.com".to_string()))
        );
        assert_eq!(
            keyed_value(PrimitiveType::String, &text, SemanticKind::Word, "sku", 0, base()),
            Some(GeneratedValue::Text("sku_1".to_string()))
        );

        let short = domain(
            PrimitiveType::String,
            &[Constraint::Length(LengthConstraint {
                min: None,
                max: Some(3),
            })],
        );
        assert_eq!(
            keyed_value(PrimitiveType::String, &short, SemanticKind::Word, "sku", 0, base()),
            None
        );
    }

    #[test]
    fn dates_step_one_day_per_row() {
        let domain = domain(PrimitiveType::Date, &[]);
        assert_eq!(
            keyed_value(PrimitiveType::Date, &domain, SemanticKind::Word, "day", 400, base()),
            NaiveDate::from_ymd_opt(2025, 2, 4).map(GeneratedValue::Date)
        );
        assert_eq!(
            keyed_value(PrimitiveType::Uuid, &domain, SemanticKind::Word, "day", 0, base()),
            None
        );
    }
}
