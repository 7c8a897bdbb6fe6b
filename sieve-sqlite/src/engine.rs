//! SQLite query engine implementation.

use std::path::Path;

use rusqlite::types::Value;
use tracing::{debug, instrument};

use sieve_query::error::QueryError;
use sieve_query::query::QueryPlan;
use sieve_query::sql::DatabaseType;
use sieve_query::traits::{BoxFuture, QueryEngine, Row};
use sieve_query::value::FilterValue;

use crate::error::{SqliteError, SqliteResult};
use crate::types::{filter_value_to_sqlite, get_value_at_index};

/// Runs query plans on a single `tokio-rusqlite` connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: tokio_rusqlite::Connection,
}

impl SqliteEngine {
    /// Wrap an open connection.
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> SqliteResult<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| SqliteError::connection(e.to_string()))?;
        Ok(Self::new(conn))
    }

    /// Open a database file, creating it if missing.
    pub async fn open(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| SqliteError::connection(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(conn))
    }

    /// The underlying connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Execute a batch of statements, such as schema setup or fixtures.
    #[instrument(skip(self, sql), fields(sql_len = %sql.len()))]
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        debug!("Executing SQL batch");
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run a parameterized query and return every row as a JSON object.
    #[instrument(skip(self, params), fields(sql = %sql))]
    pub async fn query(&self, sql: &str, params: &[FilterValue]) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();
        let params: Vec<Value> = params.iter().map(filter_value_to_sqlite).collect();

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();

                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    let mut map = Row::new();
                    for (i, col) in columns.iter().enumerate() {
                        map.insert(col.clone(), get_value_at_index(row, i));
                    }
                    Ok(map)
                })?;

                let results: Result<Vec<_>, _> = rows.collect();
                Ok(results?)
            })
            .await
            .map_err(SqliteError::from)?;

        debug!(rows = rows.len(), "Query returned");
        Ok(rows)
    }

    /// Render `plan` as SQLite SQL and run it.
    #[instrument(skip(self, plan), fields(entity = %plan.root_entity))]
    pub async fn fetch(&self, plan: &QueryPlan) -> SqliteResult<Vec<Row>> {
        let (sql, params) = plan.to_sql_for(DatabaseType::SQLite);
        self.query(&sql, &params).await
    }
}

impl QueryEngine for SqliteEngine {
    fn fetch_all<'a>(&'a self, plan: &'a QueryPlan) -> BoxFuture<'a, Result<Vec<Row>, QueryError>> {
        Box::pin(async move { self.fetch(plan).await.map_err(QueryError::from) })
    }
}
