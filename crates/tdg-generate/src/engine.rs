use std::ops::Range;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use tdg_core::{
    CompiledCheck, GeneratedRecord, GeneratedValue, ValidatedSchema, ValidatedTable,
};

use crate::batch;
use crate::errors::{GenerationError, Result};
use crate::generators::{ValueRequest, generate_value};
use crate::model::{GenerateOptions, GenerationReport, TableReport, TableState};
use crate::planner::{ForeignKeyPlan, KeySetPlan, TablePlan, plan_tables};
use crate::reference::ReferenceResolver;
use crate::sink::{CollectingSink, RecordSink};
use crate::unique::UniqueTracker;

/// Every table's records in generation order, plus the run report.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub tables: Vec<(String, Vec<GeneratedRecord>)>,
    pub report: GenerationReport,
}

impl GenerationOutput {
    pub fn records(&self, table: &str) -> Option<&[GeneratedRecord]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, records)| records.as_slice())
    }
}

/// Entry point for generating records from a validated schema.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Generate every table of `order` and collect the records in memory.
    ///
    /// Output is only returned once every table is complete.
    pub fn generate(
        &self,
        schema: &ValidatedSchema,
        order: &[String],
        seed: u64,
    ) -> Result<GenerationOutput> {
        let mut sink = CollectingSink::new();
        let report = self.generate_into(schema, order, seed, &mut sink)?;
        Ok(GenerationOutput {
            tables: sink.into_tables(),
            report,
        })
    }

    /// Generate every table of `order`, streaming batches into `sink`.
    pub fn generate_into<S: RecordSink>(
        &self,
        schema: &ValidatedSchema,
        order: &[String],
        seed: u64,
        sink: &mut S,
    ) -> Result<GenerationReport> {
        let start = Instant::now();
        self.options.validate()?;
        let plans = plan_tables(schema, order, &self.options)?;
        let pool = self.build_pool()?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut report = GenerationReport::new(run_id.clone(), seed);
        let mut resolver = ReferenceResolver::new();

        for warning in &schema.warnings {
            warn!(
                kind = ?warning.kind,
                table = warning.table.as_deref().unwrap_or_default(),
                "{}",
                warning.message
            );
            report.record_warning(warning.clone());
        }
        for plan in &plans {
            report.record_table(TableReport::pending(&plan.name, plan.count));
        }

        info!(
            run_id = %run_id,
            tables = plans.len(),
            seed,
            parallel = self.options.parallel,
            "generation started"
        );

        for plan in &plans {
            let table = schema.table(&plan.name).ok_or_else(|| {
                GenerationError::InvalidDirective(format!(
                    "table '{}' is not in the schema",
                    plan.name
                ))
            })?;
            set_state(&mut report, &plan.name, TableState::Generating);

            let outcome = TableContext {
                table,
                plan,
                resolver: &resolver,
                tracker: UniqueTracker::new(&plan.key_sets),
                options: &self.options,
                table_seed: hash_seed(seed, &plan.name),
                reference_fields: reference_field_lists(table, &plans),
            }
            .generate(pool.as_ref(), sink);
            match outcome {
                Ok(run) => {
                    for (fields, tuples) in run.key_tuples {
                        resolver.register(&plan.name, &fields, tuples);
                    }
                    report.record_table(run.report);
                }
                Err(err) => {
                    set_state(&mut report, &plan.name, TableState::Failed);
                    warn!(
                        run_id = %run_id,
                        table = %plan.name,
                        error = %err,
                        "generation failed"
                    );
                    return Err(err);
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            rows = report.rows_total,
            retries = report.retries_total,
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(report)
    }

    fn build_pool(&self) -> Result<Option<ThreadPool>> {
        match self.options.threads {
            Some(threads) if self.options.parallel => ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("tdg-worker-{i}"))
                .build()
                .map(Some)
                .map_err(|err| GenerationError::ThreadPool(err.to_string())),
            _ => Ok(None),
        }
    }
}

fn set_state(report: &mut GenerationReport, table: &str, state: TableState) {
    if let Some(entry) = report.table_mut(table) {
        entry.state = state;
    }
}

/// Field lists other tables will resolve against: the primary key (or first unique) and
/// every foreign-key target.
fn reference_field_lists(table: &ValidatedTable, plans: &[TablePlan]) -> Vec<Vec<String>> {
    let mut lists: Vec<Vec<String>> = table
        .key_sets()
        .next()
        .map(|key| key.fields.clone())
        .into_iter()
        .collect();
    let targets = plans
        .iter()
        .flat_map(|plan| plan.foreign_keys.iter())
        .filter(|fk| fk.target_table == table.name);
    for fk in targets {
        if !lists.contains(&fk.target_fields) {
            lists.push(fk.target_fields.clone());
        }
    }
    lists
}

struct TableRun {
    report: TableReport,
    key_tuples: Vec<(Vec<String>, Vec<Vec<GeneratedValue>>)>,
}

struct SampledRow {
    values: Vec<GeneratedValue>,
    attempt: u32,
    retries: u64,
}

struct TableContext<'a> {
    table: &'a ValidatedTable,
    plan: &'a TablePlan,
    resolver: &'a ReferenceResolver,
    tracker: UniqueTracker,
    options: &'a GenerateOptions,
    table_seed: u64,
    reference_fields: Vec<Vec<String>>,
}

impl TableContext<'_> {
    fn generate<S: RecordSink>(&self, pool: Option<&ThreadPool>, sink: &mut S) -> Result<TableRun> {
        let table_start = Instant::now();
        let plan = self.plan;
        self.ensure_parents(plan)?;
        let batch_size = batch::batch_size(
            self.table,
            self.options.batch_memory_ceiling_bytes,
            self.options.max_batch_size,
        );

        let mut report = TableReport::pending(&plan.name, plan.count);
        report.state = TableState::Generating;
        report.batch_size = batch_size;
        info!(
            table = %plan.name,
            rows = plan.count,
            batch_size,
            "generating table"
        );

        let key_indices: Vec<Vec<usize>> = self
            .reference_fields
            .iter()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|name| self.table.field_index(name))
                    .collect()
            })
            .collect();
        let mut key_tuples: Vec<Vec<Vec<GeneratedValue>>> =
            vec![Vec::new(); self.reference_fields.len()];

        sink.begin_table(&plan.name, plan.count)?;
        let mut start = 0_u64;
        while start < plan.count {
            let end = start.saturating_add(batch_size as u64).min(plan.count);
            let sampled = self.sample_batch(start..end, pool);

            let mut records = Vec::with_capacity(sampled.len());
            for (row, sampled) in (start..end).zip(sampled) {
                let row_values = self.commit_row(row, sampled?)?;
                report.retries += row_values.retries;
                for (indices, tuples) in key_indices.iter().zip(key_tuples.iter_mut()) {
                    tuples.push(
                        indices
                            .iter()
                            .map(|&index| row_values.values[index].clone())
                            .collect(),
                    );
                }
                records.push(GeneratedRecord::new(
                    plan.name.clone(),
                    row,
                    plan.field_names.clone(),
                    row_values.values,
                ));
            }

            report.batches += 1;
            report.rows_generated += records.len() as u64;
            debug!(
                table = %plan.name,
                batch = report.batches,
                rows = records.len(),
                "batch committed"
            );
            sink.write_batch(&plan.name, records)?;
            start = end;
        }
        sink.finish_table(&plan.name)?;

        for (id, fields) in plan.strategy_fields() {
            report.record_strategy(id, fields * report.rows_generated);
        }
        report.state = TableState::Complete;
        report.duration_ms = table_start.elapsed().as_millis() as u64;
        info!(
            table = %plan.name,
            rows_generated = report.rows_generated,
            retries = report.retries,
            duration_ms = report.duration_ms,
            "table generated"
        );

        Ok(TableRun {
            report,
            key_tuples: self.reference_fields.iter().cloned().zip(key_tuples).collect(),
        })
    }

    /// A table with rows to generate needs every referenced parent to have produced keys.
    fn ensure_parents(&self, plan: &TablePlan) -> Result<()> {
        if plan.count == 0 {
            return Ok(());
        }
        match plan.foreign_keys.iter().find(|fk| {
            self.resolver
                .key_count(&fk.target_table, &fk.target_fields)
                == 0
        }) {
            Some(fk) => Err(GenerationError::EmptyReferenceSet {
                table: plan.name.to_string(),
                target_table: fk.target_table.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Sample rows against keys committed by earlier batches.
    fn sample_batch(&self, rows: Range<u64>, pool: Option<&ThreadPool>) -> Vec<Result<SampledRow>> {
        if !self.options.parallel {
            return rows.map(|row| self.sample_row(row, 1)).collect();
        }
        let job = || {
            rows.into_par_iter()
                .map(|row| self.sample_row(row, 1))
                .collect::<Vec<_>>()
        };
        match pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }

    /// Record the row's keys, resampling from the next attempt on a collision with a row
    /// committed earlier.
    fn commit_row(&self, row: u64, mut sampled: SampledRow) -> Result<SampledRow> {
        loop {
            let conflict = match self.tracker.try_insert(&sampled.values) {
                Ok(()) => return Ok(sampled),
                Err(set) => set,
            };
            if sampled.attempt >= self.options.max_attempts_row {
                return Err(self.unsatisfiable_key(conflict));
            }
            let retries = sampled.retries + 1;
            sampled = self.sample_row(row, sampled.attempt + 1)?;
            sampled.retries += retries;
        }
    }

    fn sample_row(&self, row: u64, first_attempt: u32) -> Result<SampledRow> {
        let mut violation: Option<GenerationError> = None;
        for attempt in first_attempt..=self.options.max_attempts_row {
            let mut rng =
                ChaCha8Rng::seed_from_u64(hash_row_seed(self.table_seed, row, attempt));
            let values = self.build_values(row, attempt, &mut rng)?;
            if let Some(check) = self.failing_check(&values) {
                violation = Some(self.unsatisfiable_check(check));
                continue;
            }
            if let Some(set) = self.tracker.conflict(&values) {
                violation = Some(self.unsatisfiable_key(set));
                continue;
            }
            return Ok(SampledRow {
                values,
                attempt,
                retries: u64::from(attempt - first_attempt),
            });
        }
        Err(violation.unwrap_or_else(|| GenerationError::UnsatisfiableConstraint {
            table: self.plan.name.to_string(),
            field: String::new(),
            constraint: format!("{} row attempts", self.options.max_attempts_row),
        }))
    }

    /// Foreign keys first, then every other field from its strategy.
    fn build_values(
        &self,
        row: u64,
        attempt: u32,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<GeneratedValue>> {
        // Attempt k of row r gets ordinal r + (k - 1) * count: unique across every row and retry.
        let ordinal = u64::from(attempt.saturating_sub(1))
            .saturating_mul(self.plan.count)
            .saturating_add(row);
        let mut values = vec![GeneratedValue::Null; self.plan.fields.len()];
        for fk in &self.plan.foreign_keys {
            let tuple = self.resolve_foreign_key(fk, rng)?;
            for (&index, value) in fk.fields.iter().zip(tuple) {
                values[index] = value.clone();
            }
        }

        for (index, (field_plan, field)) in
            self.plan.fields.iter().zip(&self.table.fields).enumerate()
        {
            if field_plan.foreign_key.is_some() {
                continue;
            }
            if field_plan.nullable && rng.random_bool(field_plan.null_rate) {
                continue;
            }
            let request = ValueRequest {
                field,
                plan: field_plan,
                row,
                ordinal,
                base_date: self.options.base_date,
            };
            values[index] = generate_value(&request, self.options.max_attempts_value, rng)
                .map_err(|constraint| GenerationError::UnsatisfiableConstraint {
                    table: self.plan.name.to_string(),
                    field: field.name.clone(),
                    constraint,
                })?;
        }
        Ok(values)
    }

    /// Parent key tuple whose values also satisfy the child fields' own constraints.
    fn resolve_foreign_key(
        &self,
        fk: &ForeignKeyPlan,
        rng: &mut ChaCha8Rng,
    ) -> Result<&[GeneratedValue]> {
        let mut violated = None;
        for _ in 0..self.options.max_attempts_value {
            let tuple = self.resolver.resolve(&self.plan.name, fk, rng)?;
            let rejected = fk.fields.iter().zip(tuple).find_map(|(&index, value)| {
                self.table.fields[index]
                    .domain
                    .admits(value)
                    .err()
                    .map(|label| (index, label))
            });
            match rejected {
                None => return Ok(tuple),
                Some(found) => violated = Some(found),
            }
        }
        let (index, constraint) = violated.unwrap_or_default();
        Err(GenerationError::UnsatisfiableConstraint {
            table: self.plan.name.to_string(),
            field: self.plan.field_names[index].clone(),
            constraint,
        })
    }

    /// First check that evaluates to false; unknown results pass.
    fn failing_check(&self, values: &[GeneratedValue]) -> Option<&CompiledCheck> {
        let lookup = |name: &str| {
            self.table
                .field_index(name)
                .and_then(|index| values.get(index))
        };
        self.table
            .checks
            .iter()
            .find(|check| check.expr.holds(&lookup) == Some(false))
    }

    fn unsatisfiable_check(&self, check: &CompiledCheck) -> GenerationError {
        let fields: Vec<String> = check.expr.fields().into_iter().collect();
        GenerationError::UnsatisfiableConstraint {
            table: self.plan.name.to_string(),
            field: fields.join(", "),
            constraint: check.label(),
        }
    }

    fn unsatisfiable_key(&self, set: &KeySetPlan) -> GenerationError {
        let fields: Vec<&str> = set
            .fields
            .iter()
            .map(|&index| self.plan.field_names[index].as_str())
            .collect();
        GenerationError::UnsatisfiableConstraint {
            table: self.plan.name.to_string(),
            field: fields.join(", "),
            constraint: set.label.clone(),
        }
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_row_seed(table_seed: u64, row_index: u64, attempt: u32) -> u64 {
    let mut hash = table_seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= attempt as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash
}
