use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ast::Literal;

/// Constraint attached to a table, a field, or a custom type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey(PrimaryKey),
    ForeignKey(ForeignKey),
    Unique(UniqueConstraint),
    Check(CheckConstraint),
    Range(RangeConstraint),
    Pattern(PatternConstraint),
    Enum(EnumConstraint),
    Length(LengthConstraint),
}

impl Constraint {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constraint::PrimaryKey(_) => "primary_key",
            Constraint::ForeignKey(_) => "foreign_key",
            Constraint::Unique(_) => "unique",
            Constraint::Check(_) => "check",
            Constraint::Range(_) => "range",
            Constraint::Pattern(_) => "pattern",
            Constraint::Enum(_) => "enum",
            Constraint::Length(_) => "length",
        }
    }

    /// Constraints that bound a single value's domain.
    pub fn is_value_constraint(&self) -> bool {
        matches!(
            self,
            Constraint::Range(_)
                | Constraint::Pattern(_)
                | Constraint::Enum(_)
                | Constraint::Length(_)
        )
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PrimaryKey(pk) => write!(f, "primary key({})", pk.fields.join(", ")),
            Constraint::ForeignKey(fk) => write!(
                f,
                "foreign key({}) references {}({})",
                fk.fields.join(", "),
                fk.target_table,
                fk.target_fields.join(", ")
            ),
            Constraint::Unique(unique) => write!(f, "unique({})", unique.fields.join(", ")),
            Constraint::Check(check) => write!(f, "check({})", check.expression),
            Constraint::Range(range) => write!(
                f,
                "range({}, {})",
                bound_label(range.min.as_ref()),
                bound_label(range.max.as_ref())
            ),
            Constraint::Pattern(pattern) => write!(f, "pattern('{}')", pattern.regex),
            Constraint::Enum(values) => {
                let labels: Vec<String> = values.values.iter().map(|v| v.to_string()).collect();
                write!(f, "enum({})", labels.join(", "))
            }
            Constraint::Length(length) => write!(
                f,
                "length({}, {})",
                length.min.map_or("*".to_string(), |v| v.to_string()),
                length.max.map_or("*".to_string(), |v| v.to_string())
            ),
        }
    }
}

fn bound_label(bound: Option<&Literal>) -> String {
    bound.map_or("*".to_string(), |literal| literal.to_string())
}

/// Primary key definition. An empty field list on an inline constraint means the owning field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    pub target_table: String,
    pub target_fields: Vec<String>,
    /// Sampling bias used when resolving this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
}

/// Unique constraint definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UniqueConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Boolean check expression over the table's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expression: String,
}

/// Inclusive bounds for numeric and temporal values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RangeConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PatternConstraint {
    pub regex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnumConstraint {
    pub values: Vec<Literal>,
}

/// Inclusive length bounds for strings, binary values and arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LengthConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// Sampling bias applied when resolving a foreign key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Uniform,
    Zipf,
    Normal,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Zipf => "zipf",
            Distribution::Normal => "normal",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uniform" => Some(Distribution::Uniform),
            "zipf" => Some(Distribution::Zipf),
            "normal" => Some(Distribution::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
