use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

use crate::ast::{Literal, PrimitiveType};
use crate::constraints::Constraint;
use crate::types::TerminalType;
use crate::value::{GeneratedValue, parse_timestamp};

/// Reasons a set of value constraints cannot describe a domain.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("{constraint} does not apply to {terminal}")]
    Inapplicable { constraint: String, terminal: String },
    #[error("{0} has a bound that does not match the field type")]
    BadBound(String),
    #[error("{0} has min greater than max")]
    Inverted(String),
    #[error("invalid regex in {constraint}: {message}")]
    BadPattern { constraint: String, message: String },
    #[error("{0} has a value that does not match the field type")]
    BadEnumValue(String),
    #[error("constraints leave no admissible value: {0}")]
    Empty(String),
}

/// Inclusive optional bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn tighten(&mut self, other: Bounds<T>) {
        if let Some(min) = other.min
            && self.min.is_none_or(|current| min > current)
        {
            self.min = Some(min);
        }
        if let Some(max) = other.max
            && self.max.is_none_or(|current| max < current)
        {
            self.max = Some(max);
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone)]
enum ValueCheck {
    Numeric { label: String, bounds: Bounds<f64> },
    Temporal { label: String, bounds: Bounds<NaiveDateTime> },
    Pattern { label: String, regex: Regex },
    Enum { label: String, keys: HashSet<String> },
    Length { label: String, bounds: Bounds<u64> },
}

impl ValueCheck {
    fn label(&self) -> &str {
        match self {
            ValueCheck::Numeric { label, .. }
            | ValueCheck::Temporal { label, .. }
            | ValueCheck::Pattern { label, .. }
            | ValueCheck::Enum { label, .. }
            | ValueCheck::Length { label, .. } => label,
        }
    }

    fn admits(&self, value: &GeneratedValue) -> bool {
        match self {
            ValueCheck::Numeric { bounds, .. } => {
                value.as_f64().is_some_and(|number| bounds.contains(number))
            }
            ValueCheck::Temporal { bounds, .. } => value
                .as_timestamp()
                .is_some_and(|instant| bounds.contains(instant)),
            ValueCheck::Pattern { regex, .. } => {
                value.as_str().is_some_and(|text| regex.is_match(text))
            }
            ValueCheck::Enum { keys, .. } => keys.contains(&value.key()),
            ValueCheck::Length { bounds, .. } => {
                value.length().is_some_and(|length| bounds.contains(length))
            }
        }
    }
}

/// Admissible values of a field, derived from its terminal type and value constraints.
#[derive(Debug, Clone)]
pub struct ValueDomain {
    pub terminal: TerminalType,
    /// Merged numeric bounds of all range constraints.
    pub numeric: Bounds<f64>,
    pub temporal: Bounds<NaiveDateTime>,
    /// Character, byte or element-count bounds.
    pub length: Bounds<u64>,
    /// Regex sources in constraint order.
    pub patterns: Vec<String>,
    /// Values allowed by every enum constraint, after the other checks.
    pub allowed: Option<Vec<GeneratedValue>>,
    element_checks: Vec<ValueCheck>,
    length_checks: Vec<ValueCheck>,
}

impl ValueDomain {
    pub fn unconstrained(terminal: TerminalType) -> Self {
        Self {
            terminal,
            numeric: Bounds::default(),
            temporal: Bounds::default(),
            length: Bounds::default(),
            patterns: Vec::new(),
            allowed: None,
            element_checks: Vec::new(),
            length_checks: Vec::new(),
        }
    }

    /// Build the domain; key and check constraints are ignored.
    pub fn build(terminal: TerminalType, constraints: &[Constraint]) -> Result<Self, DomainError> {
        let element = terminal.element();
        let mut domain = Self::unconstrained(terminal);
        let mut enum_sets: Vec<Vec<GeneratedValue>> = Vec::new();

        for constraint in constraints {
            let label = constraint.to_string();
            match constraint {
                Constraint::Range(range) if element.is_numeric() => {
                    let bounds = Bounds {
                        min: numeric_bound(range.min.as_ref(), &label)?,
                        max: numeric_bound(range.max.as_ref(), &label)?,
                    };
                    if bounds.is_empty() {
                        return Err(DomainError::Inverted(label));
                    }
                    domain.numeric.tighten(bounds);
                    domain
                        .element_checks
                        .push(ValueCheck::Numeric { label, bounds });
                }
                Constraint::Range(range) if element.is_temporal() => {
                    let bounds = Bounds {
                        min: temporal_bound(range.min.as_ref(), &label)?,
                        max: temporal_bound(range.max.as_ref(), &label)?,
                    };
                    if bounds.is_empty() {
                        return Err(DomainError::Inverted(label));
                    }
                    domain.temporal.tighten(bounds);
                    domain
                        .element_checks
                        .push(ValueCheck::Temporal { label, bounds });
                }
                Constraint::Pattern(pattern) if element == PrimitiveType::String => {
                    let regex =
                        Regex::new(&pattern.regex).map_err(|err| DomainError::BadPattern {
                            constraint: label.clone(),
                            message: err.to_string(),
                        })?;
                    domain.patterns.push(pattern.regex.clone());
                    domain
                        .element_checks
                        .push(ValueCheck::Pattern { label, regex });
                }
                Constraint::Enum(values) => {
                    let mut coerced = Vec::with_capacity(values.values.len());
                    for literal in &values.values {
                        match GeneratedValue::from_literal(literal, element) {
                            Some(value) if !value.is_null() => coerced.push(value),
                            _ => return Err(DomainError::BadEnumValue(label)),
                        }
                    }
                    let keys = coerced.iter().map(GeneratedValue::key).collect();
                    enum_sets.push(coerced);
                    domain.element_checks.push(ValueCheck::Enum { label, keys });
                }
                Constraint::Length(length)
                    if terminal.is_array()
                        || matches!(element, PrimitiveType::String | PrimitiveType::Binary) =>
                {
                    let bounds = Bounds {
                        min: length.min,
                        max: length.max,
                    };
                    if bounds.is_empty() {
                        return Err(DomainError::Inverted(label));
                    }
                    domain.length.tighten(bounds);
                    domain
                        .length_checks
                        .push(ValueCheck::Length { label, bounds });
                }
                Constraint::Range(_)
                | Constraint::Pattern(_)
                | Constraint::Length(_) => {
                    return Err(DomainError::Inapplicable {
                        constraint: label,
                        terminal: terminal.to_string(),
                    });
                }
                Constraint::PrimaryKey(_)
                | Constraint::ForeignKey(_)
                | Constraint::Unique(_)
                | Constraint::Check(_) => {}
            }
        }

        if let TerminalType::Array {
            length: Some(fixed),
            ..
        } = terminal
        {
            domain.length.tighten(Bounds {
                min: Some(u64::from(fixed)),
                max: Some(u64::from(fixed)),
            });
        }
        match element {
            PrimitiveType::Date => domain.temporal = whole_days(domain.temporal),
            PrimitiveType::Integer => domain.numeric = whole_numbers(domain.numeric),
            _ => {}
        }
        if domain.numeric.is_empty() || domain.temporal.is_empty() || domain.length.is_empty() {
            return Err(DomainError::Empty(
                "range or length bounds do not overlap".to_string(),
            ));
        }

        if let Some((first, rest)) = enum_sets.split_first() {
            let allowed: Vec<GeneratedValue> = first
                .iter()
                .filter(|value| {
                    rest.iter()
                        .all(|set| set.iter().any(|other| other.key() == value.key()))
                })
                .filter(|value| domain.element_admits(value).is_ok())
                .cloned()
                .collect();
            if allowed.is_empty() {
                return Err(DomainError::Empty(
                    "no enum value satisfies every constraint".to_string(),
                ));
            }
            domain.allowed = Some(allowed);
        }

        Ok(domain)
    }

    /// Checks a non-null value against every value constraint; returns the violated one.
    pub fn admits(&self, value: &GeneratedValue) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match (&self.terminal, value) {
            (TerminalType::Array { .. }, GeneratedValue::Array(items)) => {
                if let Some(fixed) = self.fixed_length()
                    && items.len() as u64 != fixed
                {
                    return Err(format!("array length {fixed}"));
                }
                self.length_admits(value)?;
                for item in items {
                    self.element_admits(item)?;
                }
                Ok(())
            }
            (TerminalType::Array { .. }, _) => Err(format!("type {}", self.terminal)),
            _ => {
                self.length_admits(value)?;
                self.element_admits(value)
            }
        }
    }

    pub fn element_admits(&self, value: &GeneratedValue) -> Result<(), String> {
        match self.element_checks.iter().find(|check| !check.admits(value)) {
            Some(check) => Err(check.label().to_string()),
            None => Ok(()),
        }
    }

    fn length_admits(&self, value: &GeneratedValue) -> Result<(), String> {
        match self.length_checks.iter().find(|check| !check.admits(value)) {
            Some(check) => Err(check.label().to_string()),
            None => Ok(()),
        }
    }

    fn fixed_length(&self) -> Option<u64> {
        match self.terminal {
            TerminalType::Array {
                length: Some(length),
                ..
            } => Some(u64::from(length)),
            _ => None,
        }
    }
}

/// Date values sit at midnight: a min later in the day admits from the next day on.
fn whole_days(bounds: Bounds<NaiveDateTime>) -> Bounds<NaiveDateTime> {
    Bounds {
        min: bounds.min.map(|instant| {
            let day = if instant.time() == NaiveTime::MIN {
                instant.date()
            } else {
                instant.date().succ_opt().unwrap_or(NaiveDate::MAX)
            };
            day.and_time(NaiveTime::MIN)
        }),
        max: bounds.max.map(|instant| instant.date().and_time(NaiveTime::MIN)),
    }
}

fn whole_numbers(bounds: Bounds<f64>) -> Bounds<f64> {
    Bounds {
        min: bounds.min.map(f64::ceil),
        max: bounds.max.map(f64::floor),
    }
}

fn numeric_bound(bound: Option<&Literal>, label: &str) -> Result<Option<f64>, DomainError> {
    match bound {
        None | Some(Literal::Null) => Ok(None),
        Some(literal) => literal
            .as_f64()
            .map(Some)
            .ok_or_else(|| DomainError::BadBound(label.to_string())),
    }
}

fn temporal_bound(
    bound: Option<&Literal>,
    label: &str,
) -> Result<Option<NaiveDateTime>, DomainError> {
    match bound {
        None | Some(Literal::Null) => Ok(None),
        Some(Literal::Text(raw)) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| DomainError::BadBound(label.to_string())),
        Some(_) => Err(DomainError::BadBound(label.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{EnumConstraint, LengthConstraint, PatternConstraint, RangeConstraint};

    fn range(min: i64, max: i64) -> Constraint {
        Constraint::Range(RangeConstraint {
            min: Some(Literal::Int(min)),
            max: Some(Literal::Int(max)),
        })
    }

    #[test]
    fn merges_ranges_and_names_the_violated_one() {
        let domain = ValueDomain::build(
            TerminalType::Primitive(PrimitiveType::Integer),
            &[range(18, 100), range(0, 65)],
        )
        .expect("build domain");
        assert_eq!(domain.numeric.min, Some(18.0));
        assert_eq!(domain.numeric.max, Some(65.0));
        assert!(domain.admits(&GeneratedValue::Int(40)).is_ok());
        assert_eq!(
            domain.admits(&GeneratedValue::Int(70)),
            Err("range(0, 65)".to_string())
        );
        assert!(domain.admits(&GeneratedValue::Null).is_ok());
    }

    #[test]
    fn rejects_constraints_that_do_not_fit_the_type() {
        let pattern = Constraint::Pattern(PatternConstraint {
            regex: "^a$".to_string(),
        });
        assert!(matches!(
            ValueDomain::build(TerminalType::Primitive(PrimitiveType::Integer), &[pattern]),
            Err(DomainError::Inapplicable { .. })
        ));
        assert!(matches!(
            ValueDomain::build(
                TerminalType::Primitive(PrimitiveType::Integer),
                &[range(10, 1)]
            ),
            Err(DomainError::Inverted(_))
        ));
    }

    #[test]
    fn enum_values_are_filtered_by_other_constraints() {
        let values = Constraint::Enum(EnumConstraint {
            values: vec![Literal::Int(1), Literal::Int(5), Literal::Int(50)],
        });
        let domain = ValueDomain::build(
            TerminalType::Primitive(PrimitiveType::Integer),
            &[values.clone(), range(2, 60)],
        )
        .expect("build domain");
        assert_eq!(
            domain.allowed,
            Some(vec![GeneratedValue::Int(5), GeneratedValue::Int(50)])
        );

        assert!(matches!(
            ValueDomain::build(
                TerminalType::Primitive(PrimitiveType::Integer),
                &[values, range(100, 200)]
            ),
            Err(DomainError::Empty(_))
        ));
    }

    #[test]
    fn date_bounds_snap_to_whole_days() {
        let within_one_day = Constraint::Range(RangeConstraint {
            min: Some(Literal::Text("2024-03-10T08:00:00".to_string())),
            max: Some(Literal::Text("2024-03-10T20:00:00".to_string())),
        });
        assert!(matches!(
            ValueDomain::build(
                TerminalType::Primitive(PrimitiveType::Date),
                std::slice::from_ref(&within_one_day)
            ),
            Err(DomainError::Empty(_))
        ));
        assert!(
            ValueDomain::build(
                TerminalType::Primitive(PrimitiveType::Timestamp),
                &[within_one_day]
            )
            .is_ok()
        );

        let spanning = Constraint::Range(RangeConstraint {
            min: Some(Literal::Text("2024-03-10T08:00:00".to_string())),
            max: Some(Literal::Text("2024-03-12T20:00:00".to_string())),
        });
        let domain = ValueDomain::build(TerminalType::Primitive(PrimitiveType::Date), &[spanning])
            .expect("build domain");
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        assert_eq!(domain.temporal.min, Some(day(11).and_time(NaiveTime::MIN)));
        assert_eq!(domain.temporal.max, Some(day(12).and_time(NaiveTime::MIN)));
        assert!(domain.admits(&GeneratedValue::Date(day(10))).is_err());
        assert!(domain.admits(&GeneratedValue::Date(day(12))).is_ok());
    }

    #[test]
    fn integer_ranges_without_a_whole_number_are_empty() {
        let fractional = Constraint::Range(RangeConstraint {
            min: Some(Literal::Decimal(1.2)),
            max: Some(Literal::Decimal(1.8)),
        });
        assert!(matches!(
            ValueDomain::build(
                TerminalType::Primitive(PrimitiveType::Integer),
                std::slice::from_ref(&fractional)
            ),
            Err(DomainError::Empty(_))
        ));
        assert!(
            ValueDomain::build(TerminalType::Primitive(PrimitiveType::Decimal), &[fractional])
                .is_ok()
        );
    }

    #[test]
    fn array_length_applies_to_element_count() {
        let domain = ValueDomain::build(
            TerminalType::Array {
                item: PrimitiveType::Integer,
                length: None,
            },
            &[
                Constraint::Length(LengthConstraint {
                    min: Some(1),
                    max: Some(2),
                }),
                range(0, 9),
            ],
        )
        .expect("build domain");
        let ok = GeneratedValue::Array(vec![GeneratedValue::Int(1), GeneratedValue::Int(9)]);
        let too_long = GeneratedValue::Array(vec![GeneratedValue::Int(1); 3]);
        let bad_item = GeneratedValue::Array(vec![GeneratedValue::Int(10)]);
        assert!(domain.admits(&ok).is_ok());
        assert!(domain.admits(&too_long).is_err());
        assert_eq!(domain.admits(&bad_item), Err("range(0, 9)".to_string()));
    }
}
