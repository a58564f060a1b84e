//! In-memory table store, used for dry runs.

use super::{StoreError, TableStore};
use polars::prelude::*;
use std::collections::HashMap;

/// Keeps replaced tables as DataFrames.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, DataFrame>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }
}

impl TableStore for MemoryStore {
    fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<u64, StoreError> {
        self.tables.insert(table.to_string(), df.clone());
        Ok(df.height() as u64)
    }

    fn count_rows(&mut self, table: &str) -> Result<u64, StoreError> {
        self.tables
            .get(table)
            .map(|df| df.height() as u64)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }
}
