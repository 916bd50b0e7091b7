use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraints::Constraint;

/// Position of a declaration in the schema source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Root of a parsed TDG schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Custom types declared in this schema.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    /// Custom types brought in from other schemas.
    #[serde(default)]
    pub imports: Vec<TypeDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Local declarations first, then imports.
    pub fn type_decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter().chain(self.imports.iter())
    }
}

/// Table definition with fields, constraints and an optional directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<GenerationDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Table {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Table-level constraints followed by constraints declared inline on fields.
    pub fn all_constraints(&self) -> impl Iterator<Item = (Option<&Field>, &Constraint)> {
        self.constraints
            .iter()
            .map(|constraint| (None, constraint))
            .chain(self.fields.iter().flat_map(|field| {
                field
                    .constraints
                    .iter()
                    .map(move |constraint| (Some(field), constraint))
            }))
    }
}

/// Field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub modifiers: FieldModifiers,
    /// Inline constraints such as `with range(1, 10)` or `primary key`.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

/// Nullability and default modifiers of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldModifiers {
    /// Explicit `null` modifier.
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

/// Type reference of a field or custom type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    Primitive {
        name: PrimitiveType,
    },
    Array {
        item: PrimitiveType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u32>,
    },
    Custom {
        name: String,
    },
}

impl DataType {
    pub fn primitive(name: PrimitiveType) -> Self {
        DataType::Primitive { name }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        DataType::Custom { name: name.into() }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Primitive { name } => write!(f, "{name}"),
            DataType::Array {
                item,
                length: Some(length),
            } => write!(f, "array<{item}, {length}>"),
            DataType::Array { item, length: None } => write!(f, "array<{item}>"),
            DataType::Custom { name } => write!(f, "{name}"),
        }
    }
}

/// Built-in primitive types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Integer,
    Decimal,
    String,
    Boolean,
    Date,
    Timestamp,
    Binary,
    Uuid,
    Json,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 9] = [
        PrimitiveType::Integer,
        PrimitiveType::Decimal,
        PrimitiveType::String,
        PrimitiveType::Boolean,
        PrimitiveType::Date,
        PrimitiveType::Timestamp,
        PrimitiveType::Binary,
        PrimitiveType::Uuid,
        PrimitiveType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::String => "string",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Date => "date",
            PrimitiveType::Timestamp => "timestamp",
            PrimitiveType::Binary => "binary",
            PrimitiveType::Uuid => "uuid",
            PrimitiveType::Json => "json",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|primitive| primitive.as_str() == raw)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveType::Integer | PrimitiveType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, PrimitiveType::Date | PrimitiveType::Timestamp)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom type declaration: `type Age = integer with range(18, 100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypeDecl {
    pub name: String,
    pub base: DataType,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

/// Literal value as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(value) => Some(*value as f64),
            Literal::Decimal(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Decimal(value) => write!(f, "{value}"),
            Literal::Text(value) => write!(f, "'{value}'"),
        }
    }
}

/// Per-table `generate { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationDirective {
    /// Record count; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
    /// Field name to strategy override.
    #[serde(default)]
    pub overrides: BTreeMap<String, FieldOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Default for GenerationDirective {
    fn default() -> Self {
        Self {
            count: None,
            strategy: default_strategy(),
            options: BTreeMap::new(),
            overrides: BTreeMap::new(),
            location: None,
        }
    }
}

/// Strategy override for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOverride {
    pub strategy: String,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

fn default_strategy() -> String {
    StrategyKind::Random.as_str().to_string()
}

/// Closed set of value-generation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Faker,
    Random,
    Sequential,
    Pattern,
    Default,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Faker,
        StrategyKind::Random,
        StrategyKind::Sequential,
        StrategyKind::Pattern,
        StrategyKind::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Faker => "faker",
            StrategyKind::Random => "random",
            StrategyKind::Sequential => "sequential",
            StrategyKind::Pattern => "pattern",
            StrategyKind::Default => "default",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_uses_kind_tag() {
        let json = serde_json::json!({ "kind": "array", "item": "integer", "length": 3 });
        let parsed: DataType = serde_json::from_value(json).expect("parse data type");
        assert_eq!(
            parsed,
            DataType::Array {
                item: PrimitiveType::Integer,
                length: Some(3)
            }
        );
        assert_eq!(parsed.to_string(), "array<integer, 3>");
    }

    #[test]
    fn literal_is_untagged() {
        let values: Vec<Literal> =
            serde_json::from_str(r#"[null, true, 7, 2.5, "x"]"#).expect("parse literals");
        assert_eq!(
            values,
            vec![
                Literal::Null,
                Literal::Bool(true),
                Literal::Int(7),
                Literal::Decimal(2.5),
                Literal::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn directive_defaults_to_random_strategy() {
        let directive: GenerationDirective =
            serde_json::from_str(r#"{ "count": 5 }"#).expect("parse directive");
        assert_eq!(directive.count, Some(5));
        assert_eq!(StrategyKind::parse(&directive.strategy), Some(StrategyKind::Random));
    }

    #[test]
    fn primitive_names_parse_case_insensitively() {
        assert_eq!(PrimitiveType::parse("Timestamp"), Some(PrimitiveType::Timestamp));
        assert_eq!(PrimitiveType::parse("varchar"), None);
    }
}
