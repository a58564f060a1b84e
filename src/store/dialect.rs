//! SQL text generation per store type.

use crate::settings::StoreKind;
use polars::prelude::*;

/// Upper bound on bound parameters per INSERT statement (SQLite allows 32766).
const MAX_BIND_PARAMS: usize = 30_000;
const MAX_BATCH_ROWS: usize = 1_000;

/// Column values pulled out of a DataFrame, ready for binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

/// A named column of the table being written.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl TableColumn {
    /// Convert every DataFrame column, keeping column order.
    pub fn from_dataframe(df: &DataFrame) -> PolarsResult<Vec<TableColumn>> {
        df.get_columns()
            .iter()
            .map(|col| {
                Ok(TableColumn {
                    name: col.name().to_string(),
                    values: ColumnValues::from_column(col)?,
                })
            })
            .collect()
    }
}

impl ColumnValues {
    pub fn from_column(col: &Column) -> PolarsResult<Self> {
        let dtype = col.dtype();
        let values = if dtype.is_integer() {
            ColumnValues::Int(col.cast(&DataType::Int64)?.i64()?.into_iter().collect())
        } else if dtype.is_float() {
            ColumnValues::Float(col.cast(&DataType::Float64)?.f64()?.into_iter().collect())
        } else if dtype == &DataType::Boolean {
            ColumnValues::Bool(col.bool()?.into_iter().collect())
        } else {
            ColumnValues::Text(
                col.cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|s| s.map(str::to_string))
                    .collect(),
            )
        };
        Ok(values)
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnValues::Int(_) => "BIGINT",
            ColumnValues::Float(_) => "DOUBLE PRECISION",
            ColumnValues::Bool(_) => "BOOLEAN",
            ColumnValues::Text(_) => "TEXT",
        }
    }
}

/// Renders statements for one store type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDialect {
    kind: StoreKind,
}

impl SqlDialect {
    pub fn new(kind: StoreKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn quote_ident(&self, name: &str) -> String {
        match self.kind {
            StoreKind::MySql => format!("`{}`", name.replace('`', "``")),
            _ => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self.kind {
            StoreKind::Postgres => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    /// Comma separated placeholders for parameters `first..first + count`.
    pub fn placeholders(&self, first: usize, count: usize) -> String {
        (first..first + count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }

    pub fn create_table_sql(&self, table: &str, columns: &[TableColumn]) -> String {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", self.quote_ident(&c.name), c.values.sql_type()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            self.quote_ident(table),
            defs.join(", ")
        )
    }

    /// Multi-row INSERT for `rows` rows of `columns`.
    pub fn insert_sql(&self, table: &str, columns: &[TableColumn], rows: usize) -> String {
        let names: Vec<String> = columns.iter().map(|c| self.quote_ident(&c.name)).collect();
        let width = columns.len();
        let tuples: Vec<String> = (0..rows)
            .map(|r| format!("({})", self.placeholders(r * width + 1, width)))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote_ident(table),
            names.join(", "),
            tuples.join(", ")
        )
    }

    pub fn count_sql(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quote_ident(table))
    }

    /// Rows per INSERT so that one statement stays under the bind limit.
    pub fn batch_rows(&self, width: usize) -> usize {
        (MAX_BIND_PARAMS / width.max(1)).clamp(1, MAX_BATCH_ROWS)
    }
}
