//! Uniform random values per primitive type, kept inside a field's value domain.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, RngCore};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use tdg_core::{Bounds, GeneratedValue, PrimitiveType, ValueDomain};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 10000;
const DEFAULT_DECIMAL_SCALE: i32 = 2;
pub const DEFAULT_TEXT_LEN: (u64, u64) = (5, 20);
pub const DEFAULT_BINARY_LEN: (u64, u64) = (8, 32);
pub const DEFAULT_ARRAY_LEN: (u64, u64) = (1, 5);
const DATE_SPAN_DAYS: i64 = 365;
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random scalar of `primitive`. `length` bounds text and binary sizes.
pub fn random_scalar(
    primitive: PrimitiveType,
    domain: &ValueDomain,
    length: Bounds<u64>,
    base_date: NaiveDate,
    rng: &mut ChaCha8Rng,
) -> GeneratedValue {
    match primitive {
        PrimitiveType::Integer => {
            let (min, max) = int_range(domain.numeric);
            GeneratedValue::Int(if min >= max {
                min
            } else {
                rng.random_range(min..=max)
            })
        }
        PrimitiveType::Decimal => GeneratedValue::Decimal(random_decimal(domain.numeric, rng)),
        PrimitiveType::String => {
            let (min, max) = length_range(length, DEFAULT_TEXT_LEN);
            let len = pick_len(min, max, rng);
            GeneratedValue::Text(alphanumeric(len, rng))
        }
        PrimitiveType::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
        PrimitiveType::Date => GeneratedValue::Date(random_date(domain.temporal, base_date, rng)),
        PrimitiveType::Timestamp => {
            GeneratedValue::Timestamp(random_timestamp(domain.temporal, base_date, rng))
        }
        PrimitiveType::Uuid => GeneratedValue::Uuid(random_uuid(rng)),
        PrimitiveType::Binary => {
            let (min, max) = length_range(length, DEFAULT_BINARY_LEN);
            let mut bytes = vec![0_u8; pick_len(min, max, rng)];
            rng.fill_bytes(&mut bytes);
            GeneratedValue::Binary(bytes)
        }
        PrimitiveType::Json => GeneratedValue::Json(json!({
            "id": rng.random_range(1..=DEFAULT_INT_MAX),
            "label": alphanumeric(8, rng),
            "active": rng.random_bool(0.5),
        })),
    }
}

/// Inclusive size range to sample from. Missing bounds fall back to `default`, and the upper end
/// never exceeds `max(min, default.1)` however large the declared max is.
pub fn length_range(bounds: Bounds<u64>, default: (u64, u64)) -> (u64, u64) {
    let floor = bounds.min.unwrap_or(default.0);
    let ceiling = floor.max(default.1);
    let max = bounds.max.map_or(ceiling, |max| max.min(ceiling));
    match bounds.min {
        Some(min) => (min, max.max(min)),
        None => (floor.min(max), max),
    }
}

pub fn pick_len(min: u64, max: u64, rng: &mut ChaCha8Rng) -> usize {
    let len = if min >= max {
        min
    } else {
        rng.random_range(min..=max)
    };
    usize::try_from(len).unwrap_or(usize::MAX)
}

pub fn random_uuid(rng: &mut ChaCha8Rng) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

fn int_range(bounds: Bounds<f64>) -> (i64, i64) {
    let min = bounds.min.map(|value| value.ceil() as i64);
    let max = bounds.max.map(|value| value.floor() as i64);
    match (min, max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) if min < DEFAULT_INT_MAX => (min, DEFAULT_INT_MAX),
        (Some(min), None) => (min, min.saturating_add(DEFAULT_INT_MAX)),
        (None, Some(max)) if max > DEFAULT_INT_MIN => (DEFAULT_INT_MIN, max),
        (None, Some(max)) => (max.saturating_sub(DEFAULT_INT_MAX), max),
        (None, None) => (DEFAULT_INT_MIN, DEFAULT_INT_MAX),
    }
}

fn random_decimal(bounds: Bounds<f64>, rng: &mut ChaCha8Rng) -> f64 {
    let default_max = DEFAULT_INT_MAX as f64;
    let (min, max) = match (bounds.min, bounds.max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min.max(0.0) + default_max),
        (None, Some(max)) => (max.min(0.0) - default_max, max),
        (None, None) => (0.0, default_max),
    };
    if min >= max {
        return min;
    }
    let raw = rng.random_range(min..=max);
    let factor = 10_f64.powi(DEFAULT_DECIMAL_SCALE);
    let rounded = (raw * factor).round() / factor;
    if bounds.contains(rounded) { rounded } else { raw }
}

fn random_date(bounds: Bounds<NaiveDateTime>, base_date: NaiveDate, rng: &mut ChaCha8Rng) -> NaiveDate {
    let min = bounds.min.map(|instant| {
        if instant.time() == NaiveTime::MIN {
            instant.date()
        } else {
            instant.date().succ_opt().unwrap_or(instant.date())
        }
    });
    let max = bounds.max.map(|instant| instant.date());
    let span = Duration::days(DATE_SPAN_DAYS);
    let (min, max) = match (min, max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min.checked_add_signed(span).unwrap_or(min)),
        (None, Some(max)) => (max.checked_sub_signed(span).unwrap_or(max), max),
        (None, None) => (base_date, base_date.checked_add_signed(span).unwrap_or(base_date)),
    };
    let days = (max - min).num_days();
    if days <= 0 {
        return min;
    }
    let offset = rng.random_range(0..=days);
    min.checked_add_signed(Duration::days(offset)).unwrap_or(min)
}

fn random_timestamp(
    bounds: Bounds<NaiveDateTime>,
    base_date: NaiveDate,
    rng: &mut ChaCha8Rng,
) -> NaiveDateTime {
    let base = base_date.and_time(NaiveTime::MIN);
    let span = Duration::days(DATE_SPAN_DAYS);
    let (min, max) = match (bounds.min, bounds.max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min.checked_add_signed(span).unwrap_or(min)),
        (None, Some(max)) => (max.checked_sub_signed(span).unwrap_or(max), max),
        (None, None) => (base, base.checked_add_signed(span).unwrap_or(base)),
    };
    let seconds = (max - min).num_seconds();
    if seconds <= 0 {
        return min;
    }
    let offset = rng.random_range(0..=seconds);
    min.checked_add_signed(Duration::seconds(offset))
        .unwrap_or(min)
}

fn alphanumeric(len: usize, rng: &mut ChaCha8Rng) -> String {
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tdg_core::{Constraint, LengthConstraint, Literal, RangeConstraint, TerminalType};

    fn domain(primitive: PrimitiveType, constraints: &[Constraint]) -> ValueDomain {
        ValueDomain::build(TerminalType::Primitive(primitive), constraints).expect("domain")
    }

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn integers_stay_in_range() {
        let domain = domain(
            PrimitiveType::Integer,
            &[Constraint::Range(RangeConstraint {
                min: Some(Literal::Int(18)),
                max: Some(Literal::Int(100)),
            })],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            let value = random_scalar(PrimitiveType::Integer, &domain, domain.length, base(), &mut rng);
            let number = value.as_i64().expect("int");
            assert!((18..=100).contains(&number), "{number}");
        }
    }

    #[test]
    fn text_honours_length_bounds() {
        let domain = domain(
            PrimitiveType::String,
            &[Constraint::Length(LengthConstraint {
                min: Some(3),
                max: Some(4),
            })],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            let value = random_scalar(PrimitiveType::String, &domain, domain.length, base(), &mut rng);
            assert!(domain.admits(&value).is_ok(), "{value:?}");
        }
    }

    #[test]
    fn huge_length_bounds_sample_short_values() {
        let text = |min, max| length_range(Bounds { min, max }, DEFAULT_TEXT_LEN);
        assert_eq!(text(Some(1), Some(u64::MAX)), (1, 20));
        assert_eq!(text(None, Some(3)), (3, 3));
        assert_eq!(text(Some(40), None), (40, 40));
        assert_eq!(text(None, None), (5, 20));

        let domain = domain(
            PrimitiveType::Binary,
            &[Constraint::Length(LengthConstraint {
                min: Some(1),
                max: Some(10_000_000_000),
            })],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for _ in 0..50 {
            let value =
                random_scalar(PrimitiveType::Binary, &domain, domain.length, base(), &mut rng);
            assert!(value.length().is_some_and(|len| (1..=32).contains(&len)), "{value:?}");
        }
    }

    #[test]
    fn dates_default_to_a_year_from_base() {
        let domain = ValueDomain::unconstrained(TerminalType::Primitive(PrimitiveType::Date));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let GeneratedValue::Date(date) =
                random_scalar(PrimitiveType::Date, &domain, domain.length, base(), &mut rng)
            else {
                panic!("expected date");
            };
            assert!(date >= base());
            assert!(date <= NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        }
    }

    #[test]
    fn decimals_keep_two_places() {
        let domain = ValueDomain::unconstrained(TerminalType::Primitive(PrimitiveType::Decimal));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let value = random_scalar(PrimitiveType::Decimal, &domain, domain.length, base(), &mut rng)
            .as_f64()
            .expect("decimal");
        assert_eq!((value * 100.0).round() / 100.0, value);
    }

    #[test]
    fn uuids_are_version_four() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let raw = random_uuid(&mut rng);
        let parsed = uuid::Uuid::parse_str(&raw).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }
}
