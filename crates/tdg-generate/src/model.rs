use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tdg_core::{Diagnostic, Distribution};

use crate::errors::{GenerationError, Result};
use crate::generators::faker::Locale;

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Record count for tables whose directive has none.
    pub default_count: u64,
    /// Upper bound on records per batch.
    pub max_batch_size: usize,
    /// Estimated in-memory size one batch may occupy.
    pub batch_memory_ceiling_bytes: usize,
    /// Resample budget for a single field value.
    pub max_attempts_value: u32,
    /// Attempts to build a row that passes checks and uniqueness.
    pub max_attempts_row: u32,
    /// Chance that a nullable non-key field is left null.
    pub null_rate: f64,
    /// Foreign-key sampling when neither the key nor the directive picks one.
    pub default_distribution: Distribution,
    /// Faker locale, `en_us` or `pt_br`.
    pub locale: String,
    /// Anchor for generated dates and timestamps.
    pub base_date: NaiveDate,
    /// Worker threads; the global rayon pool when unset.
    pub threads: Option<usize>,
    /// Sample rows on worker threads.
    pub parallel: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            default_count: 100,
            max_batch_size: 1000,
            batch_memory_ceiling_bytes: 8 * 1024 * 1024,
            max_attempts_value: 100,
            max_attempts_row: 50,
            null_rate: 0.1,
            default_distribution: Distribution::Uniform,
            locale: "en_us".to_string(),
            base_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            threads: None,
            parallel: true,
        }
    }
}

impl GenerateOptions {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.null_rate) {
            return Err(GenerationError::InvalidOptions(format!(
                "null_rate must be within [0, 1], got {}",
                self.null_rate
            )));
        }
        if self.max_batch_size == 0 {
            return Err(GenerationError::InvalidOptions(
                "max_batch_size must be > 0".to_string(),
            ));
        }
        if self.max_attempts_value == 0 || self.max_attempts_row == 0 {
            return Err(GenerationError::InvalidOptions(
                "attempt budgets must be > 0".to_string(),
            ));
        }
        if Locale::parse(&self.locale).is_none() {
            return Err(GenerationError::InvalidOptions(format!(
                "unsupported locale '{}'",
                self.locale
            )));
        }
        if self.threads == Some(0) {
            return Err(GenerationError::InvalidOptions(
                "threads must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of one table within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Pending,
    Generating,
    Complete,
    Failed,
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub state: TableState,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub batches: u64,
    pub batch_size: usize,
    pub retries: u64,
    pub duration_ms: u64,
    pub strategy_usage: BTreeMap<String, u64>,
}

impl TableReport {
    pub fn pending(table: &str, rows_requested: u64) -> Self {
        Self {
            table: table.to_string(),
            state: TableState::Pending,
            rows_requested,
            rows_generated: 0,
            batches: 0,
            batch_size: 0,
            retries: 0,
            duration_ms: 0,
            strategy_usage: BTreeMap::new(),
        }
    }

    pub fn record_strategy(&mut self, id: &str, count: u64) {
        *self.strategy_usage.entry(id.to_string()).or_insert(0) += count;
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub tables: Vec<TableReport>,
    pub retries_total: u64,
    pub rows_total: u64,
    pub duration_ms: u64,
    pub warnings: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            tables: Vec::new(),
            retries_total: 0,
            rows_total: 0,
            duration_ms: 0,
            warnings: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableReport> {
        self.tables.iter_mut().find(|report| report.table == name)
    }

    pub fn record_table(&mut self, report: TableReport) {
        match self.table_mut(&report.table) {
            Some(existing) => *existing = report,
            None => self.tables.push(report),
        }
        self.retries_total = self.tables.iter().map(|table| table.retries).sum();
        self.rows_total = self.tables.iter().map(|table| table.rows_generated).sum();
    }

    pub fn record_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_toml_keys_fall_back_to_defaults() {
        let options = GenerateOptions::from_toml_str(
            r#"
            default_count = 25
            locale = "pt_br"
            default_distribution = "zipf"
            base_date = "2023-06-01"
            threads = 2
            "#,
        )
        .expect("parse options");
        assert_eq!(options.default_count, 25);
        assert_eq!(options.locale, "pt_br");
        assert_eq!(options.default_distribution, Distribution::Zipf);
        assert_eq!(options.base_date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(options.threads, Some(2));
        assert_eq!(options.max_attempts_row, 50);
        assert_eq!(options.batch_memory_ceiling_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn rejects_out_of_range_null_rate() {
        let err = GenerateOptions::from_toml_str("null_rate = 1.5").expect_err("invalid");
        assert!(matches!(err, GenerationError::InvalidOptions(_)));
    }

    #[test]
    fn recording_a_table_twice_replaces_it() {
        let mut report = GenerationReport::new("run".to_string(), 7);
        report.record_table(TableReport::pending("users", 10));
        let mut done = TableReport::pending("users", 10);
        done.state = TableState::Complete;
        done.rows_generated = 10;
        report.record_table(done);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.table("users").map(|t| t.state), Some(TableState::Complete));
        assert_eq!(report.rows_total, 10);
    }
}
