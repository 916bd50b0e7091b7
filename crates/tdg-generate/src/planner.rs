//! Per-table generation plans.
//!
//! All directives are parsed and every pattern compiled before the first row is generated, so a
//! bad directive fails the run up front.

use std::collections::HashSet;
use std::sync::Arc;

use rand_regex::Regex as RandRegex;
use tracing::{debug, warn};

use tdg_core::{
    Distribution, PrimitiveType, TerminalType, ValidatedField, ValidatedSchema, ValidatedTable,
};

use crate::errors::{GenerationError, Result};
use crate::generators::faker::SemanticKind;
use crate::generators::keyed;
use crate::generators::pattern::{self, DEFAULT_MAX_REPEAT};
use crate::model::GenerateOptions;
use crate::strategy::{Strategy, StrategyConfig};

/// How one field of a table is generated.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub name: String,
    pub strategy: Strategy,
    pub null_rate: f64,
    /// Compiled text pattern, from the field's constraints or the strategy options.
    pub regex: Option<RandRegex>,
    pub semantic: SemanticKind,
    /// Whether the engine may emit null: nullable, not part of a key, not a foreign key.
    pub nullable: bool,
    /// Key member drawing row-derived values instead of sampling for freshness.
    pub row_keyed: bool,
    /// Index into [`TablePlan::foreign_keys`] for foreign-key fields.
    pub foreign_key: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyPlan {
    /// Field indices in the child table, aligned with `target_fields`.
    pub fields: Vec<usize>,
    pub target_table: String,
    pub target_fields: Vec<String>,
    pub distribution: Distribution,
}

/// A primary key or unique constraint tracked during generation.
#[derive(Debug, Clone)]
pub struct KeySetPlan {
    pub label: String,
    pub fields: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct TablePlan {
    pub name: Arc<str>,
    pub field_names: Arc<[String]>,
    pub fields: Vec<FieldPlan>,
    pub foreign_keys: Vec<ForeignKeyPlan>,
    pub key_sets: Vec<KeySetPlan>,
    pub count: u64,
    pub strategy: Strategy,
}

impl TablePlan {
    /// Strategy ids with the number of fields each one drives.
    pub fn strategy_fields(&self) -> Vec<(&'static str, u64)> {
        let mut usage: Vec<(&'static str, u64)> = Vec::new();
        for field in &self.fields {
            let id = if field.foreign_key.is_some() {
                "reference"
            } else {
                field.strategy.id()
            };
            match usage.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, count)) => *count += 1,
                None => usage.push((id, 1)),
            }
        }
        usage
    }
}

/// Plan every table of `order`.
pub fn plan_tables(
    schema: &ValidatedSchema,
    order: &[String],
    options: &GenerateOptions,
) -> Result<Vec<TablePlan>> {
    order
        .iter()
        .map(|name| {
            let table = schema.table(name).ok_or_else(|| {
                GenerationError::InvalidDirective(format!("table '{name}' is not in the schema"))
            })?;
            plan_table(table, options)
        })
        .collect()
}

pub fn plan_table(table: &ValidatedTable, options: &GenerateOptions) -> Result<TablePlan> {
    let directive = &table.directive;
    let table_config = StrategyConfig::parse(
        directive.strategy,
        &directive.options,
        options,
        &table.name,
    )?;
    let table_null_rate = table_config.null_rate.unwrap_or(options.null_rate);
    let table_distribution = table_config
        .distribution
        .unwrap_or(options.default_distribution);

    let key_members: HashSet<&str> = table
        .key_sets()
        .flat_map(|key| key.fields.iter().map(String::as_str))
        .collect();

    let mut field_configs = Vec::with_capacity(table.fields.len());
    for field in &table.fields {
        let config = match directive.overrides.get(&field.name) {
            Some(entry) => StrategyConfig::parse(
                entry.strategy,
                &entry.options,
                options,
                &format!("{}.{}", table.name, field.name),
            )?,
            None => table_config.clone(),
        };
        field_configs.push(config);
    }

    let mut foreign_keys = Vec::with_capacity(table.foreign_keys.len());
    for fk in &table.foreign_keys {
        let fields = field_indices(table, &fk.fields)?;
        let field_override = fields.iter().find_map(|&index| {
            directive
                .overrides
                .contains_key(&table.fields[index].name)
                .then(|| field_configs[index].distribution)
                .flatten()
        });
        foreign_keys.push(ForeignKeyPlan {
            fields,
            target_table: fk.target_table.clone(),
            target_fields: fk.target_fields.clone(),
            distribution: fk
                .distribution
                .or(field_override)
                .unwrap_or(table_distribution),
        });
    }

    let mut fields = Vec::with_capacity(table.fields.len());
    for (index, (field, config)) in table.fields.iter().zip(field_configs).enumerate() {
        let foreign_key = foreign_keys
            .iter()
            .rposition(|fk| fk.fields.contains(&index));
        let regex = compile_field_pattern(&table.name, field, &config.strategy)?;
        if matches!(config.strategy, Strategy::Pattern { .. })
            && regex.is_none()
            && foreign_key.is_none()
        {
            warn!(
                table = %table.name,
                field = %field.name,
                "pattern strategy without a usable pattern; sampling at random"
            );
        }
        let key_member = key_members.contains(field.name.as_str());
        let row_keyed = key_member
            && foreign_key.is_none()
            && regex.is_none()
            && field.domain.allowed.is_none()
            && !matches!(config.strategy, Strategy::Sequential { .. })
            && match field.terminal {
                TerminalType::Primitive(primitive) => keyed::derives(primitive),
                TerminalType::Array { .. } => false,
            };
        fields.push(FieldPlan {
            name: field.name.clone(),
            null_rate: config.null_rate.unwrap_or(table_null_rate),
            regex,
            semantic: SemanticKind::for_field(&field.name),
            nullable: field.nullable && foreign_key.is_none() && !key_member,
            row_keyed,
            foreign_key,
            strategy: config.strategy,
        });
    }

    let key_sets = table
        .key_sets()
        .map(|key| {
            Ok(KeySetPlan {
                label: key.label(),
                fields: field_indices(table, &key.fields)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let field_names: Arc<[String]> = table
        .fields
        .iter()
        .map(|field| field.name.clone())
        .collect::<Vec<_>>()
        .into();

    debug!(
        table = %table.name,
        strategy = table_config.strategy.id(),
        fields = fields.len(),
        foreign_keys = foreign_keys.len(),
        "planned table"
    );

    Ok(TablePlan {
        name: Arc::from(table.name.as_str()),
        field_names,
        fields,
        foreign_keys,
        key_sets,
        count: directive.count.unwrap_or(options.default_count),
        strategy: table_config.strategy,
    })
}

fn field_indices(table: &ValidatedTable, names: &[String]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| {
            table.field_index(name).ok_or_else(|| {
                GenerationError::InvalidDirective(format!(
                    "table '{}' has no field '{name}'",
                    table.name
                ))
            })
        })
        .collect()
}

fn compile_field_pattern(
    table: &str,
    field: &ValidatedField,
    strategy: &Strategy,
) -> Result<Option<RandRegex>> {
    if field.terminal.element() != PrimitiveType::String {
        return Ok(None);
    }
    let (option_pattern, max_repeat) = match strategy {
        Strategy::Pattern {
            pattern,
            max_repeat,
        } => (pattern.as_deref(), *max_repeat),
        _ => (None, DEFAULT_MAX_REPEAT),
    };

    if let Some(source) = field.domain.patterns.first() {
        return match pattern::compile(source, max_repeat) {
            Ok(regex) => Ok(Some(regex)),
            Err(err) => {
                debug!(
                    table,
                    field = %field.name,
                    error = %err,
                    "pattern cannot drive sampling; resampling at random"
                );
                Ok(None)
            }
        };
    }

    match option_pattern {
        Some(source) => pattern::compile(source, max_repeat).map(Some).map_err(|err| {
            GenerationError::InvalidDirective(format!(
                "{table}.{}: invalid pattern '{source}': {err}",
                field.name
            ))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tdg_core::{Schema, compile};

    fn compiled(value: serde_json::Value) -> (ValidatedSchema, Vec<String>) {
        let schema: Schema = serde_json::from_value(value).expect("schema json");
        compile(&schema).expect("compile")
    }

    fn shop() -> (ValidatedSchema, Vec<String>) {
        compiled(json!({
            "name": "shop",
            "tables": [
                {
                    "name": "users",
                    "fields": [
                        { "name": "id", "data_type": { "kind": "primitive", "name": "integer" },
                          "constraints": [{ "kind": "primary_key" }] },
                        { "name": "email", "data_type": { "kind": "primitive", "name": "string" } }
                    ],
                    "directive": { "count": 4, "strategy": "faker",
                                   "options": { "distribution": "normal" } }
                },
                {
                    "name": "orders",
                    "fields": [
                        { "name": "id", "data_type": { "kind": "primitive", "name": "integer" },
                          "constraints": [{ "kind": "primary_key" }] },
                        { "name": "user_id", "data_type": { "kind": "primitive", "name": "integer" },
                          "constraints": [{ "kind": "foreign_key", "target_table": "users",
                                            "target_fields": ["id"] }] },
                        { "name": "buyer_id", "data_type": { "kind": "primitive", "name": "integer" },
                          "constraints": [{ "kind": "foreign_key", "target_table": "users",
                                            "target_fields": ["id"], "distribution": "uniform" }] },
                        { "name": "note", "data_type": { "kind": "primitive", "name": "string" } }
                    ],
                    "directive": {
                        "strategy": "random",
                        "options": { "distribution": "normal" },
                        "overrides": {
                            "user_id": { "strategy": "random", "options": { "distribution": "zipf" } },
                            "buyer_id": { "strategy": "random", "options": { "distribution": "zipf" } }
                        }
                    }
                }
            ]
        }))
    }

    #[test]
    fn foreign_key_distribution_precedence() {
        let (schema, order) = shop();
        let plans = plan_tables(&schema, &order, &GenerateOptions::default()).expect("plan");
        let orders = &plans[1];
        assert_eq!(&*orders.name, "orders");
        // Key-level beats the field override, which beats the directive.
        assert_eq!(orders.foreign_keys[0].distribution, Distribution::Zipf);
        assert_eq!(orders.foreign_keys[1].distribution, Distribution::Uniform);
        assert_eq!(orders.count, GenerateOptions::default().default_count);
    }

    #[test]
    fn keys_and_references_are_never_null() {
        let (schema, order) = shop();
        let plans = plan_tables(&schema, &order, &GenerateOptions::default()).expect("plan");
        let orders = &plans[1];
        let nullable: Vec<(&str, bool)> = orders
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.nullable))
            .collect();
        assert_eq!(
            nullable,
            vec![("id", false), ("user_id", false), ("buyer_id", false), ("note", true)]
        );
        assert_eq!(orders.fields[1].foreign_key, Some(0));
        let row_keyed: Vec<bool> = orders.fields.iter().map(|field| field.row_keyed).collect();
        assert_eq!(row_keyed, vec![true, false, false, false]);
        assert_eq!(
            orders.strategy_fields(),
            vec![("random", 2), ("reference", 2)]
        );
    }

    #[test]
    fn sequences_enums_and_patterns_keep_their_own_keys() {
        let (schema, order) = compiled(json!({
            "name": "codes",
            "tables": [{
                "name": "codes",
                "fields": [
                    { "name": "id", "data_type": { "kind": "primitive", "name": "integer" },
                      "constraints": [{ "kind": "primary_key" }] },
                    { "name": "sku", "data_type": { "kind": "primitive", "name": "string" },
                      "constraints": [{ "kind": "unique" },
                                      { "kind": "pattern", "regex": "^[A-Z]{4}$" }] },
                    { "name": "tier", "data_type": { "kind": "primitive", "name": "string" },
                      "constraints": [{ "kind": "unique" },
                                      { "kind": "enum", "values": ["gold", "silver"] }] },
                    { "name": "token", "data_type": { "kind": "primitive", "name": "uuid" },
                      "constraints": [{ "kind": "unique" }] },
                    { "name": "label", "data_type": { "kind": "primitive", "name": "string" },
                      "constraints": [{ "kind": "unique" }] }
                ],
                "directive": { "overrides": { "id": { "strategy": "sequential" } } }
            }]
        }));
        let plans = plan_tables(&schema, &order, &GenerateOptions::default()).expect("plan");
        let row_keyed: Vec<(&str, bool)> = plans[0]
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.row_keyed))
            .collect();
        assert_eq!(
            row_keyed,
            vec![
                ("id", false),
                ("sku", false),
                ("tier", false),
                ("token", false),
                ("label", true)
            ]
        );
    }

    #[test]
    fn invalid_option_pattern_fails_planning() {
        let (schema, order) = compiled(json!({
            "name": "codes",
            "tables": [{
                "name": "codes",
                "fields": [
                    { "name": "code", "data_type": { "kind": "primitive", "name": "string" },
                      "constraints": [{ "kind": "primary_key" }] }
                ],
                "directive": { "strategy": "pattern", "options": { "pattern": "([a-z" } }
            }]
        }));
        let err = plan_tables(&schema, &order, &GenerateOptions::default()).expect_err("bad regex");
        assert!(matches!(err, GenerationError::InvalidDirective(_)));
    }
}
