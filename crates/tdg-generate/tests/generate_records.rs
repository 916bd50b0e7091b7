use std::collections::HashSet;

use regex::Regex;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use tdg_core::{DiagnosticKind, GeneratedRecord, GeneratedValue, Schema, compile};
use tdg_generate::{
    GenerateOptions, GenerationEngine, GenerationError, RecordSink, TableState, pipeline,
};

fn schema_from(value: Value) -> Schema {
    serde_json::from_value(value).expect("parse schema json")
}

fn int_pk(name: &str) -> Value {
    json!({ "name": name, "data_type": { "kind": "primitive", "name": "integer" },
            "constraints": [{ "kind": "primary_key" }] })
}

fn shop_schema(users: u64, orders: u64) -> Schema {
    schema_from(json!({
        "name": "shop",
        "tables": [
            {
                "name": "orders",
                "fields": [
                    int_pk("id"),
                    { "name": "user_id", "data_type": { "kind": "primitive", "name": "integer" },
                      "modifiers": { "not_null": true },
                      "constraints": [{ "kind": "foreign_key", "target_table": "users",
                                        "target_fields": ["id"], "distribution": "zipf" }] },
                    { "name": "total", "data_type": { "kind": "primitive", "name": "decimal" },
                      "constraints": [{ "kind": "range", "min": 1, "max": 500 }] },
                    { "name": "placed_on", "data_type": { "kind": "primitive", "name": "date" } }
                ],
                "directive": { "count": orders, "strategy": "random" }
            },
            {
                "name": "users",
                "fields": [
                    int_pk("id"),
                    { "name": "email", "data_type": { "kind": "primitive", "name": "string" },
                      "modifiers": { "not_null": true },
                      "constraints": [{ "kind": "unique" }] },
                    { "name": "first_name", "data_type": { "kind": "primitive", "name": "string" } }
                ],
                "directive": {
                    "count": users,
                    "strategy": "faker",
                    "overrides": { "id": { "strategy": "sequential" } }
                }
            }
        ]
    }))
}

fn stream_digest(tables: &[(String, Vec<GeneratedRecord>)]) -> String {
    let bytes = serde_json::to_vec(tables).expect("serialize records");
    hex::encode(Sha256::digest(&bytes))
}

#[test]
fn same_seed_gives_identical_streams() {
    let schema = shop_schema(30, 120);
    let options = GenerateOptions::default();
    let first = pipeline::run(&schema, &options, 42).expect("first run");
    let second = pipeline::run(&schema, &options, 42).expect("second run");
    assert_eq!(
        stream_digest(&first.output.tables),
        stream_digest(&second.output.tables)
    );

    let other_seed = pipeline::run(&schema, &options, 43).expect("other seed");
    assert_ne!(
        stream_digest(&first.output.tables),
        stream_digest(&other_seed.output.tables)
    );
}

#[test]
fn thread_count_does_not_change_output() {
    let schema = shop_schema(25, 80);
    let base = GenerateOptions {
        max_batch_size: 16,
        ..GenerateOptions::default()
    };
    let parallel = pipeline::run(&schema, &base, 7).expect("parallel");
    let single = pipeline::run(
        &schema,
        &GenerateOptions {
            threads: Some(1),
            ..base.clone()
        },
        7,
    )
    .expect("one thread");
    let sequential = pipeline::run(
        &schema,
        &GenerateOptions {
            parallel: false,
            ..base.clone()
        },
        7,
    )
    .expect("sequential");

    let digest = stream_digest(&parallel.output.tables);
    assert_eq!(digest, stream_digest(&single.output.tables));
    assert_eq!(digest, stream_digest(&sequential.output.tables));
}

#[test]
fn foreign_keys_draw_from_parent_keys() {
    let result = pipeline::run(&shop_schema(20, 200), &GenerateOptions::default(), 3)
        .expect("generate");
    assert_eq!(result.order, vec!["users", "orders"]);
    let table_names: Vec<&str> = result
        .output
        .tables
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(table_names, vec!["users", "orders"]);

    let users = result.output.records("users").expect("users");
    let user_ids: HashSet<i64> = users
        .iter()
        .filter_map(|record| record.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(user_ids, (1..=20).collect());

    let orders = result.output.records("orders").expect("orders");
    assert_eq!(orders.len(), 200);
    for order in orders {
        let user_id = order.get("user_id").and_then(GeneratedValue::as_i64);
        assert!(user_id.is_some_and(|id| user_ids.contains(&id)), "{order:?}");
    }

    let emails: HashSet<&str> = users
        .iter()
        .filter_map(|record| record.get("email").and_then(GeneratedValue::as_str))
        .collect();
    assert_eq!(emails.len(), 20);
}

#[test]
fn custom_type_range_and_not_null_hold_for_any_seed() {
    let schema = schema_from(json!({
        "name": "people",
        "types": [
            { "name": "Age", "base": { "kind": "primitive", "name": "integer" },
              "constraints": [{ "kind": "range", "min": 18, "max": 100 }] }
        ],
        "tables": [{
            "name": "people",
            "fields": [
                int_pk("id"),
                { "name": "age", "data_type": { "kind": "custom", "name": "Age" },
                  "modifiers": { "not_null": true } },
                { "name": "nickname", "data_type": { "kind": "primitive", "name": "string" } }
            ],
            "directive": { "count": 150, "strategy": "random", "options": { "null_rate": 0.5 } }
        }]
    }));

    for seed in 0..5 {
        let result = pipeline::run(&schema, &GenerateOptions::default(), seed).expect("generate");
        let people = result.output.records("people").expect("people");
        assert_eq!(people.len(), 150);
        for person in people {
            let age = person.get("age").and_then(GeneratedValue::as_i64);
            assert!(age.is_some_and(|age| (18..=100).contains(&age)), "{person:?}");
        }
        let nulls = people
            .iter()
            .filter(|person| person.get("nickname").is_some_and(GeneratedValue::is_null))
            .count();
        assert!(nulls > 0 && nulls < people.len(), "nulls = {nulls}");
    }
}

#[test]
fn empty_parent_fails_with_empty_reference_set() {
    let err = pipeline::run(&shop_schema(0, 5), &GenerateOptions::default(), 1)
        .expect_err("no users to reference");
    assert!(
        matches!(
            err,
            GenerationError::EmptyReferenceSet { ref table, ref target_table }
                if table == "orders" && target_table == "users"
        ),
        "{err}"
    );
    let diagnostic = err.to_diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.kind, DiagnosticKind::EmptyReferenceSet);
    assert_eq!(diagnostic.table.as_deref(), Some("orders"));
}

#[test]
fn empty_child_of_empty_parent_succeeds() {
    let result = pipeline::run(&shop_schema(0, 0), &GenerateOptions::default(), 1)
        .expect("nothing to resolve");
    assert_eq!(result.output.report.rows_total, 0);
}

#[test]
fn unique_enum_with_too_few_values_is_unsatisfiable() {
    let schema = schema_from(json!({
        "name": "flags",
        "tables": [{
            "name": "flags",
            "fields": [
                int_pk("id"),
                { "name": "state", "data_type": { "kind": "primitive", "name": "string" },
                  "modifiers": { "not_null": true },
                  "constraints": [
                      { "kind": "enum", "values": ["on", "off"] },
                      { "kind": "unique" }
                  ] }
            ],
            "directive": { "count": 5 }
        }]
    }));
    let options = GenerateOptions {
        max_attempts_row: 10,
        ..GenerateOptions::default()
    };
    let err = pipeline::run(&schema, &options, 9).expect_err("only two states");
    match err {
        GenerationError::UnsatisfiableConstraint {
            table,
            field,
            constraint,
        } => {
            assert_eq!(table, "flags");
            assert_eq!(field, "state");
            assert!(constraint.starts_with("unique"), "{constraint}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn check_constraints_hold_on_every_row() {
    let schema = schema_from(json!({
        "name": "bookings",
        "tables": [{
            "name": "bookings",
            "fields": [
                int_pk("id"),
                { "name": "start_slot", "data_type": { "kind": "primitive", "name": "integer" },
                  "modifiers": { "not_null": true },
                  "constraints": [{ "kind": "range", "min": 0, "max": 20 }] },
                { "name": "end_slot", "data_type": { "kind": "primitive", "name": "integer" },
                  "modifiers": { "not_null": true },
                  "constraints": [{ "kind": "range", "min": 0, "max": 20 }] }
            ],
            "constraints": [{ "kind": "check", "expression": "end_slot > start_slot" }],
            "directive": { "count": 100 }
        }]
    }));
    let result = pipeline::run(&schema, &GenerateOptions::default(), 11).expect("generate");
    for booking in result.output.records("bookings").expect("bookings") {
        let start = booking.get("start_slot").and_then(GeneratedValue::as_i64);
        let end = booking.get("end_slot").and_then(GeneratedValue::as_i64);
        assert!(matches!((start, end), (Some(start), Some(end)) if end > start));
    }
    let report = result.output.report.table("bookings").expect("report");
    assert!(report.retries > 0);
}

#[test]
fn pattern_constraints_drive_text() {
    let schema = schema_from(json!({
        "name": "catalog",
        "tables": [{
            "name": "products",
            "fields": [
                int_pk("id"),
                { "name": "sku", "data_type": { "kind": "primitive", "name": "string" },
                  "modifiers": { "not_null": true },
                  "constraints": [{ "kind": "pattern", "regex": "^[A-Z]{3}-[0-9]{4}$" }] }
            ],
            "directive": { "count": 50, "strategy": "faker" }
        }]
    }));
    let sku = Regex::new("^[A-Z]{3}-[0-9]{4}$").expect("regex");
    let result = pipeline::run(&schema, &GenerateOptions::default(), 5).expect("generate");
    for product in result.output.records("products").expect("products") {
        let value = product.get("sku").and_then(GeneratedValue::as_str).expect("sku");
        assert!(sku.is_match(value), "{value}");
    }
}

#[test]
fn report_tracks_states_batches_and_strategies() {
    let options = GenerateOptions {
        max_batch_size: 7,
        ..GenerateOptions::default()
    };
    let result = pipeline::run(&shop_schema(20, 10), &options, 2).expect("generate");
    let report = &result.output.report;
    assert_eq!(report.seed, 2);
    assert_eq!(report.rows_total, 30);
    assert!(
        report
            .tables
            .iter()
            .all(|table| table.state == TableState::Complete)
    );

    let users = report.table("users").expect("users report");
    assert_eq!(users.batches, 3);
    assert_eq!(users.batch_size, 7);
    assert_eq!(users.strategy_usage.get("sequential"), Some(&20));
    assert_eq!(users.strategy_usage.get("faker"), Some(&40));

    let orders = report.table("orders").expect("orders report");
    assert_eq!(orders.strategy_usage.get("reference"), Some(&10));
    assert_eq!(orders.strategy_usage.get("random"), Some(&30));
}

#[derive(Default)]
struct CountingSink {
    events: Vec<String>,
}

impl RecordSink for CountingSink {
    fn begin_table(&mut self, table: &str, rows: u64) -> tdg_generate::Result<()> {
        self.events.push(format!("begin {table} {rows}"));
        Ok(())
    }

    fn write_batch(
        &mut self,
        table: &str,
        batch: Vec<GeneratedRecord>,
    ) -> tdg_generate::Result<()> {
        let first = batch.first().map_or(0, |record| record.position);
        self.events
            .push(format!("batch {table} {first}+{}", batch.len()));
        Ok(())
    }

    fn finish_table(&mut self, table: &str) -> tdg_generate::Result<()> {
        self.events.push(format!("finish {table}"));
        Ok(())
    }
}

#[test]
fn sinks_receive_batches_in_row_order() {
    let (validated, order) = compile(&shop_schema(5, 12)).expect("compile");
    let engine = GenerationEngine::new(GenerateOptions {
        max_batch_size: 5,
        ..GenerateOptions::default()
    });
    let mut sink = CountingSink::default();
    engine
        .generate_into(&validated, &order, 4, &mut sink)
        .expect("generate");
    assert_eq!(
        sink.events,
        vec![
            "begin users 5",
            "batch users 0+5",
            "finish users",
            "begin orders 12",
            "batch orders 0+5",
            "batch orders 5+5",
            "batch orders 10+2",
            "finish orders",
        ]
    );
}

#[test]
fn analyzer_warnings_come_back_with_output() {
    let schema = schema_from(json!({
        "name": "logs",
        "tables": [{
            "name": "events",
            "fields": [
                { "name": "message", "data_type": { "kind": "primitive", "name": "string" } }
            ],
            "directive": { "count": 3 }
        }]
    }));
    let result = pipeline::run(&schema, &GenerateOptions::default(), 1).expect("generate");
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.kind == DiagnosticKind::MissingKey)
    );
    assert_eq!(result.output.records("events").map(<[_]>::len), Some(3));
}

#[test]
fn analysis_errors_stop_the_pipeline() {
    let schema = schema_from(json!({
        "name": "broken",
        "tables": [{
            "name": "orders",
            "fields": [
                int_pk("id"),
                { "name": "user_id", "data_type": { "kind": "primitive", "name": "integer" },
                  "constraints": [{ "kind": "foreign_key", "target_table": "users",
                                    "target_fields": ["id"] }] }
            ]
        }]
    }));
    let err = pipeline::run(&schema, &GenerateOptions::default(), 1).expect_err("dangling fk");
    match err {
        GenerationError::Analysis(diagnostics) => {
            assert!(diagnostics.has_kind(DiagnosticKind::UndefinedTable));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn strategy_options_of_another_strategy_are_rejected() {
    let schema = schema_from(json!({
        "name": "ids",
        "tables": [{
            "name": "items",
            "fields": [int_pk("id")],
            "directive": { "count": 3, "strategy": "sequential",
                           "options": { "pattern": "[a-z]+" } }
        }]
    }));
    let err = pipeline::run(&schema, &GenerateOptions::default(), 1).expect_err("bad option");
    assert!(matches!(err, GenerationError::InvalidDirective(_)), "{err}");
}

#[test]
fn options_load_from_a_toml_file() {
    let path = std::env::temp_dir().join(format!("tdg-options-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "default_count = 12\nmax_batch_size = 4\nlocale = \"pt-BR\"\nparallel = false\n",
    )
    .expect("write options");
    let options = GenerateOptions::load(&path).expect("load options");
    std::fs::remove_file(&path).ok();

    assert_eq!(options.default_count, 12);
    assert_eq!(options.max_batch_size, 4);
    assert!(!options.parallel);

    let schema = schema_from(json!({
        "name": "ids",
        "tables": [{ "name": "items", "fields": [int_pk("id")] }]
    }));
    let result = pipeline::run(&schema, &options, 1).expect("generate");
    let report = result.output.report.table("items").expect("items");
    assert_eq!(report.rows_generated, 12);
    assert_eq!(report.batches, 3);
}

#[test]
fn large_key_sets_get_fresh_values_for_every_row() {
    let rows = 20_000_u64;
    let schema = schema_from(json!({
        "name": "accounts",
        "tables": [{
            "name": "accounts",
            "fields": [
                int_pk("id"),
                { "name": "legacy_id", "data_type": { "kind": "primitive", "name": "integer" },
                  "constraints": [{ "kind": "unique" },
                                  { "kind": "range", "min": 50000, "max": 70000 }] },
                { "name": "email", "data_type": { "kind": "primitive", "name": "string" },
                  "constraints": [{ "kind": "unique" }] },
                { "name": "opened_on", "data_type": { "kind": "primitive", "name": "date" },
                  "constraints": [{ "kind": "unique" }] }
            ],
            "directive": { "count": rows, "strategy": "faker" }
        }]
    }));
    let result = pipeline::run(&schema, &GenerateOptions::default(), 17).expect("generate");
    let accounts = result.output.records("accounts").expect("accounts");
    assert_eq!(accounts.len() as u64, rows);

    let ids: HashSet<i64> = accounts
        .iter()
        .filter_map(|record| record.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(ids, (1..=rows as i64).collect());

    let legacy: HashSet<i64> = accounts
        .iter()
        .filter_map(|record| record.get("legacy_id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(legacy.len() as u64, rows);
    assert!(legacy.iter().all(|id| (50_000..=70_000).contains(id)));

    let emails: HashSet<&str> = accounts
        .iter()
        .filter_map(|record| record.get("email").and_then(GeneratedValue::as_str))
        .collect();
    assert_eq!(emails.len() as u64, rows);
    assert!(emails.contains("user00001@example.com"));

    let days: HashSet<String> = accounts
        .iter()
        .filter_map(|record| record.get("opened_on").map(GeneratedValue::key))
        .collect();
    assert_eq!(days.len() as u64, rows);
}

#[test]
fn huge_length_bounds_generate_bounded_text() {
    let table = |count: u64| {
        schema_from(json!({
            "name": "notes",
            "tables": [{
                "name": "notes",
                "fields": [
                    int_pk("id"),
                    { "name": "body", "data_type": { "kind": "primitive", "name": "string" },
                      "modifiers": { "not_null": true },
                      "constraints": [{ "kind": "length", "min": 1, "max": u64::MAX }] }
                ],
                "directive": { "count": count }
            }]
        }))
    };

    let empty = pipeline::run(&table(0), &GenerateOptions::default(), 1).expect("empty table");
    assert_eq!(empty.output.report.rows_total, 0);

    let result = pipeline::run(&table(25), &GenerateOptions::default(), 1).expect("generate");
    let notes = result.output.records("notes").expect("notes");
    assert_eq!(notes.len(), 25);
    for note in notes {
        let length = note.get("body").and_then(GeneratedValue::length);
        assert!(length.is_some_and(|len| (1..=20).contains(&len)), "{note:?}");
    }
    let report = result.output.report.table("notes").expect("report");
    assert!(report.batch_size > 1);
}

#[test]
fn default_strategy_uses_field_defaults_verbatim() {
    let schema = schema_from(json!({
        "name": "prefs",
        "tables": [{
            "name": "settings",
            "fields": [
                int_pk("id"),
                { "name": "status", "data_type": { "kind": "primitive", "name": "string" },
                  "modifiers": { "not_null": true, "default": "active" } },
                { "name": "retries", "data_type": { "kind": "primitive", "name": "integer" },
                  "modifiers": { "not_null": true, "default": 3 } },
                { "name": "theme", "data_type": { "kind": "primitive", "name": "string" },
                  "modifiers": { "default": "dark" } },
                { "name": "nickname", "data_type": { "kind": "primitive", "name": "string" } }
            ],
            "directive": { "count": 40, "strategy": "default", "options": { "null_rate": 0.0 } }
        }]
    }));
    let result = pipeline::run(&schema, &GenerateOptions::default(), 4).expect("generate");
    let settings = result.output.records("settings").expect("settings");
    assert_eq!(settings.len(), 40);

    for setting in settings {
        assert_eq!(setting.get("status").and_then(GeneratedValue::as_str), Some("active"));
        assert_eq!(setting.get("retries").and_then(GeneratedValue::as_i64), Some(3));
        assert_eq!(setting.get("theme").and_then(GeneratedValue::as_str), Some("dark"));
    }

    // Without a default the field falls back to random text.
    let nicknames: HashSet<&str> = settings
        .iter()
        .map(|setting| {
            setting
                .get("nickname")
                .and_then(GeneratedValue::as_str)
                .expect("null_rate 0 keeps nickname set")
        })
        .collect();
    assert!(nicknames.len() > 1);
    assert!(nicknames.iter().all(|name| (5..=20).contains(&name.len())));

    let ids: HashSet<i64> = settings
        .iter()
        .filter_map(|setting| setting.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(ids, (1..=40).collect());
}
