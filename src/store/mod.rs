//! Store module - table destinations for the pipeline

mod dialect;
mod memory;
mod sql;

pub use dialect::{ColumnValues, SqlDialect, TableColumn};
pub use memory::MemoryStore;
pub use sql::SqlStore;

use crate::settings::{SettingsError, StoreKind};
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Runtime error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("No {0} driver is linked into this build")]
    DriverUnavailable(StoreKind),
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// A destination that can hold one named table.
pub trait TableStore {
    /// Drop `table` if it exists, recreate it from the DataFrame schema and
    /// insert every row. Returns the number of rows written.
    fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<u64, StoreError>;

    fn count_rows(&mut self, table: &str) -> Result<u64, StoreError>;
}
