//! Destinations for generated record batches.

use tdg_core::GeneratedRecord;

use crate::errors::Result;

const PREALLOCATE_ROWS: u64 = 65_536;

/// Receives each table's records in generation order, one batch at a time.
pub trait RecordSink {
    fn begin_table(&mut self, table: &str, rows: u64) -> Result<()>;
    fn write_batch(&mut self, table: &str, batch: Vec<GeneratedRecord>) -> Result<()>;
    fn finish_table(&mut self, table: &str) -> Result<()>;
}

/// Keeps every table in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    tables: Vec<(String, Vec<GeneratedRecord>)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_tables(self) -> Vec<(String, Vec<GeneratedRecord>)> {
        self.tables
    }
}

impl RecordSink for CollectingSink {
    fn begin_table(&mut self, table: &str, rows: u64) -> Result<()> {
        let capacity = usize::try_from(rows.min(PREALLOCATE_ROWS)).unwrap_or(0);
        self.tables
            .push((table.to_string(), Vec::with_capacity(capacity)));
        Ok(())
    }

    fn write_batch(&mut self, table: &str, batch: Vec<GeneratedRecord>) -> Result<()> {
        match self.tables.last_mut() {
            Some((name, records)) if name == table => {
                records.extend(batch);
                Ok(())
            }
            _ => {
                self.begin_table(table, batch.len() as u64)?;
                self.write_batch(table, batch)
            }
        }
    }

    fn finish_table(&mut self, _table: &str) -> Result<()> {
        Ok(())
    }
}
