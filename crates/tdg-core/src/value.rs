use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::ast::{Literal, PrimitiveType};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Generated value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<GeneratedValue>),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GeneratedValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            GeneratedValue::Date(value) => value.and_hms_opt(0, 0, 0),
            GeneratedValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Length used by length constraints: characters, bytes or elements.
    pub fn length(&self) -> Option<u64> {
        match self {
            GeneratedValue::Text(value) => Some(value.chars().count() as u64),
            GeneratedValue::Binary(value) => Some(value.len() as u64),
            GeneratedValue::Array(items) => Some(items.len() as u64),
            _ => None,
        }
    }

    /// Stable textual key used for uniqueness tracking.
    pub fn key(&self) -> String {
        match self {
            GeneratedValue::Null => "<null>".to_string(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Decimal(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date(value) => value.format(DATE_FORMAT).to_string(),
            GeneratedValue::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
            GeneratedValue::Binary(value) => hex::encode(value),
            GeneratedValue::Json(value) => value.to_string(),
            GeneratedValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(GeneratedValue::key).collect();
                format!("[{}]", parts.join(","))
            }
        }
    }

    /// Ordering between comparable values; `None` for nulls or mismatched kinds.
    pub fn compare(&self, other: &GeneratedValue) -> Option<Ordering> {
        if let (Some(left), Some(right)) = (self.as_f64(), other.as_f64()) {
            return left.partial_cmp(&right);
        }
        match (self, other) {
            (GeneratedValue::Bool(left), GeneratedValue::Bool(right)) => Some(left.cmp(right)),
            (GeneratedValue::Date(_) | GeneratedValue::Timestamp(_), _)
            | (_, GeneratedValue::Date(_) | GeneratedValue::Timestamp(_)) => {
                let left = self.as_timestamp().or_else(|| parse_timestamp(self.as_str()?))?;
                let right = other
                    .as_timestamp()
                    .or_else(|| parse_timestamp(other.as_str()?))?;
                Some(left.cmp(&right))
            }
            _ => match (self.as_str(), other.as_str()) {
                (Some(left), Some(right)) => Some(left.cmp(right)),
                _ => None,
            },
        }
    }

    /// Coerce a source literal to a value of the given primitive type.
    pub fn from_literal(literal: &Literal, primitive: PrimitiveType) -> Option<GeneratedValue> {
        match (literal, primitive) {
            (Literal::Null, _) => Some(GeneratedValue::Null),
            (Literal::Bool(value), PrimitiveType::Boolean) => Some(GeneratedValue::Bool(*value)),
            (Literal::Int(value), PrimitiveType::Integer) => Some(GeneratedValue::Int(*value)),
            (Literal::Int(value), PrimitiveType::Decimal) => {
                Some(GeneratedValue::Decimal(*value as f64))
            }
            (Literal::Decimal(value), PrimitiveType::Decimal) => {
                Some(GeneratedValue::Decimal(*value))
            }
            (Literal::Text(value), PrimitiveType::String) => {
                Some(GeneratedValue::Text(value.clone()))
            }
            (Literal::Text(value), PrimitiveType::Date) => NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(GeneratedValue::Date),
            (Literal::Text(value), PrimitiveType::Timestamp) => {
                parse_timestamp(value).map(GeneratedValue::Timestamp)
            }
            (Literal::Text(value), PrimitiveType::Uuid) => uuid::Uuid::parse_str(value)
                .ok()
                .map(|parsed| GeneratedValue::Uuid(parsed.hyphenated().to_string())),
            (Literal::Text(value), PrimitiveType::Binary) => {
                hex::decode(value).ok().map(GeneratedValue::Binary)
            }
            (Literal::Text(value), PrimitiveType::Json) => Some(GeneratedValue::Json(
                serde_json::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.clone())),
            )),
            (Literal::Bool(value), PrimitiveType::Json) => {
                Some(GeneratedValue::Json(serde_json::Value::Bool(*value)))
            }
            (Literal::Int(value), PrimitiveType::Json) => {
                Some(GeneratedValue::Json(serde_json::Value::from(*value)))
            }
            (Literal::Decimal(value), PrimitiveType::Json) => {
                Some(GeneratedValue::Json(serde_json::Value::from(*value)))
            }
            _ => None,
        }
    }
}

/// Parse the timestamp formats accepted in source literals.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl Serialize for GeneratedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GeneratedValue::Null => serializer.serialize_none(),
            GeneratedValue::Bool(value) => serializer.serialize_bool(*value),
            GeneratedValue::Int(value) => serializer.serialize_i64(*value),
            GeneratedValue::Decimal(value) => serializer.serialize_f64(*value),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => {
                serializer.serialize_str(value)
            }
            GeneratedValue::Date(value) => {
                serializer.collect_str(&value.format(DATE_FORMAT))
            }
            GeneratedValue::Timestamp(value) => {
                serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
            }
            GeneratedValue::Binary(value) => serializer.serialize_str(&hex::encode(value)),
            GeneratedValue::Json(value) => value.serialize(serializer),
            GeneratedValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// One generated row: field values in declaration order plus the row position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRecord {
    pub table: Arc<str>,
    /// Zero-based row index; doubles as identity for tables without a primary key.
    pub position: u64,
    fields: Arc<[String]>,
    values: Vec<GeneratedValue>,
}

impl GeneratedRecord {
    pub fn new(
        table: Arc<str>,
        position: u64,
        fields: Arc<[String]>,
        values: Vec<GeneratedValue>,
    ) -> Self {
        debug_assert_eq!(fields.len(), values.len());
        Self {
            table,
            position,
            fields,
            values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&GeneratedValue> {
        self.fields
            .iter()
            .position(|name| name == field)
            .and_then(|index| self.values.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedValue)> {
        self.fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn values(&self) -> &[GeneratedValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for GeneratedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
