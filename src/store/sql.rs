//! Relational store backed by sqlx's Any driver.
//!
//! The connection is driven on a private current-thread runtime so callers
//! stay synchronous.

use super::dialect::{ColumnValues, SqlDialect, TableColumn};
use super::{StoreError, TableStore};
use crate::settings::{Destination, StoreKind};
use polars::prelude::*;
use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyConnection, Connection};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// A single connection to the configured destination.
pub struct SqlStore {
    // Declared before `runtime` so the connection drops first.
    conn: AnyConnection,
    runtime: Runtime,
    dialect: SqlDialect,
}

impl SqlStore {
    pub fn connect(destination: &Destination) -> Result<Self, StoreError> {
        if destination.kind == StoreKind::MsSql {
            return Err(StoreError::DriverUnavailable(destination.kind));
        }

        let url = destination.connection_url()?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        sqlx::any::install_default_drivers();

        info!(destination = %destination.describe(), "Connecting to {}", destination.kind);
        let conn = runtime.block_on(AnyConnection::connect(&url))?;

        Ok(Self {
            conn,
            runtime,
            dialect: SqlDialect::new(destination.kind),
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Run a read query with string parameters bound in order.
    pub fn fetch_all(&mut self, sql: &str, params: &[String]) -> Result<Vec<AnyRow>, StoreError> {
        debug!(sql, "Running query");
        let Self { conn, runtime, .. } = self;
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.clone());
        }
        Ok(runtime.block_on(query.fetch_all(&mut *conn))?)
    }

    /// Close the connection gracefully.
    pub fn close(self) -> Result<(), StoreError> {
        let Self { conn, runtime, .. } = self;
        runtime.block_on(conn.close())?;
        Ok(())
    }
}

impl TableStore for SqlStore {
    /// Drop, create and insert inside one transaction. MySQL commits
    /// implicitly on `DROP TABLE` and `CREATE TABLE`, so there only the
    /// inserts are rolled back on failure.
    fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<u64, StoreError> {
        let columns = TableColumn::from_dataframe(df)?;
        let height = df.height();
        let dialect = self.dialect;
        let drop_sql = dialect.drop_table_sql(table);
        let create_sql = dialect.create_table_sql(table, &columns);
        let batch_rows = dialect.batch_rows(columns.len());

        let Self { conn, runtime, .. } = self;
        runtime.block_on(async move {
            let mut tx = conn.begin().await?;
            sqlx::query(&drop_sql).execute(&mut *tx).await?;
            sqlx::query(&create_sql).execute(&mut *tx).await?;

            let mut written = 0u64;
            let mut start = 0usize;
            while start < height {
                let end = (start + batch_rows).min(height);
                let sql = dialect.insert_sql(table, &columns, end - start);
                let mut query = sqlx::query(&sql);
                for row in start..end {
                    for column in &columns {
                        query = bind_value(query, &column.values, row);
                    }
                }
                written += query.execute(&mut *tx).await?.rows_affected();
                debug!(from = start, to = end, "Inserted batch");
                start = end;
            }

            tx.commit().await?;
            Ok::<u64, StoreError>(written)
        })
    }

    fn count_rows(&mut self, table: &str) -> Result<u64, StoreError> {
        let sql = self.dialect.count_sql(table);
        let Self { conn, runtime, .. } = self;
        let count: i64 =
            runtime.block_on(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn))?;
        Ok(count.max(0) as u64)
    }
}

fn bind_value<'q>(query: AnyQuery<'q>, values: &ColumnValues, row: usize) -> AnyQuery<'q> {
    match values {
        ColumnValues::Int(v) => query.bind(v[row]),
        ColumnValues::Float(v) => query.bind(v[row]),
        ColumnValues::Bool(v) => query.bind(v[row]),
        ColumnValues::Text(v) => query.bind(v[row].clone()),
    }
}
