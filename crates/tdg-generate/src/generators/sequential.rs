use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::json;

use tdg_core::{Bounds, GeneratedValue, PrimitiveType};

/// Value number `n` of a sequence. Integers with both bounds wrap around inside them.
pub fn sequential_value(
    primitive: PrimitiveType,
    numeric: Bounds<f64>,
    field: &str,
    n: i64,
    base_date: NaiveDate,
) -> GeneratedValue {
    match primitive {
        PrimitiveType::Integer => GeneratedValue::Int(wrap_into(numeric, n)),
        PrimitiveType::Decimal => GeneratedValue::Decimal(n as f64),
        PrimitiveType::String => GeneratedValue::Text(format!("{field}_{n}")),
        PrimitiveType::Boolean => GeneratedValue::Bool(n.rem_euclid(2) == 1),
        PrimitiveType::Date => GeneratedValue::Date(
            base_date
                .checked_add_signed(Duration::days(n))
                .unwrap_or(base_date),
        ),
        PrimitiveType::Timestamp => {
            let base = base_date.and_time(NaiveTime::MIN);
            GeneratedValue::Timestamp(
                base.checked_add_signed(Duration::hours(n)).unwrap_or(base),
            )
        }
        PrimitiveType::Uuid => GeneratedValue::Uuid(
            uuid::Uuid::from_u128(u128::from(n.unsigned_abs()))
                .hyphenated()
                .to_string(),
        ),
        PrimitiveType::Binary => GeneratedValue::Binary(n.to_be_bytes().to_vec()),
        PrimitiveType::Json => GeneratedValue::Json(json!({ "seq": n })),
    }
}

fn wrap_into(bounds: Bounds<f64>, n: i64) -> i64 {
    let (Some(min), Some(max)) = (bounds.min, bounds.max) else {
        return n;
    };
    let (min, max) = (min.ceil() as i64, max.floor() as i64);
    if min > max || (min..=max).contains(&n) {
        return n;
    }
    let span = i128::from(max) - i128::from(min) + 1;
    let offset = (i128::from(n) - i128::from(min)).rem_euclid(span);
    i64::try_from(i128::from(min) + offset).unwrap_or(min)
}
