//! Statement execution.
//!
//! Every `run_*` entry point follows the same sequence:
//!
//! 1. stage write values (validation errors surface here);
//! 2. dispatch the `pre_*` event, with no connection held;
//! 3. if a listener canceled, run its substitute statements instead;
//!    otherwise compile, acquire a connection, bind and execute;
//! 4. dispatch the `post_*` event.
//!
//! The connection is dropped, and so returned to its pool, as soon as the
//! statement finished, on success and on error alike.

use std::sync::Arc;

use spork_core::{
    dispatch, ColumnValues, Dispatch, EventKind, FromSqlValue, Grammar, Query, SqlValue,
    StatementKind,
};
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::Sqlite;
use tracing::{debug, trace, warn};

use crate::config::ExecutorConfig;
use crate::connection::ConnectionSource;
use crate::error::Result;
use crate::row::DbRow;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Result of an insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertResult {
    pub rows_affected: u64,
    /// Generated keys, in row order. Empty unless requested.
    pub generated: Vec<i64>,
}

impl InsertResult {
    /// First generated key.
    #[must_use]
    pub fn generated_key(&self) -> Option<i64> {
        self.generated.first().copied()
    }
}

/// Compiles and runs query descriptors against a connection source.
#[derive(Clone)]
pub struct Executor {
    source: Arc<dyn ConnectionSource>,
    grammar: Arc<dyn Grammar>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("grammar", &self.grammar.name())
            .finish_non_exhaustive()
    }
}

impl Executor {
    #[must_use]
    pub fn new(source: impl ConnectionSource + 'static, grammar: impl Grammar + 'static) -> Self {
        Self {
            source: Arc::new(source),
            grammar: Arc::new(grammar),
        }
    }

    /// Builds an executor with the grammar selected by `config`.
    #[must_use]
    pub fn from_config(source: impl ConnectionSource + 'static, config: &ExecutorConfig) -> Self {
        Self {
            source: Arc::new(source),
            grammar: config.dialect.grammar(),
        }
    }

    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// Runs a select and returns its rows.
    ///
    /// # Errors
    ///
    /// Validation, listener-misuse and database errors.
    pub async fn run_select(&self, mut query: Query) -> Result<Vec<DbRow>> {
        self.dispatch(EventKind::PreSelect, &mut query)?;
        let sql = self.grammar.compile(StatementKind::Select, &query)?;
        let bindings = self.grammar.bind(&query, StatementKind::Select);
        let rows = self.fetch(&sql, bindings).await?;
        self.dispatch(EventKind::PostSelect, &mut query)?;
        Ok(rows)
    }

    /// Runs `SELECT EXISTS(...)`.
    ///
    /// # Errors
    ///
    /// Validation, listener-misuse and database errors.
    pub async fn run_exists(&self, mut query: Query) -> Result<bool> {
        self.dispatch(EventKind::PreSelect, &mut query)?;
        let sql = self.grammar.compile(StatementKind::Exists, &query)?;
        let bindings = self.grammar.bind(&query, StatementKind::Exists);
        let rows = self.fetch(&sql, bindings).await?;
        self.dispatch(EventKind::PostSelect, &mut query)?;
        let exists = rows
            .first()
            .and_then(|row| row.values().iter().next())
            .and_then(|(_, value)| bool::from_sql_value(value))
            .unwrap_or(false);
        Ok(exists)
    }

    /// Runs an update with `values` as the `SET` list. Returns affected rows.
    ///
    /// # Errors
    ///
    /// [`spork_core::QueryError::EmptyAssignment`] for an empty `values`,
    /// plus listener-misuse and database errors.
    pub async fn run_update(&self, mut query: Query, values: ColumnValues) -> Result<u64> {
        query.stage_update(values);
        if query.assignments().is_empty() {
            return Err(spork_core::QueryError::EmptyAssignment.into());
        }
        self.run_write(EventKind::PreUpdate, EventKind::PostUpdate, StatementKind::Update, query)
            .await
    }

    /// Runs a delete. Returns affected rows.
    ///
    /// # Errors
    ///
    /// Listener-misuse and database errors.
    pub async fn run_delete(&self, query: Query) -> Result<u64> {
        self.run_write(EventKind::PreDelete, EventKind::PostDelete, StatementKind::Delete, query)
            .await
    }

    /// Inserts one row.
    ///
    /// # Errors
    ///
    /// Staging, listener-misuse and database errors.
    pub async fn run_insert(
        &self,
        query: Query,
        row: ColumnValues,
        return_key: bool,
    ) -> Result<InsertResult> {
        self.insert(query, vec![row], StatementKind::Insert, return_key)
            .await
    }

    /// Inserts several rows in one statement.
    ///
    /// Rows are validated before any event is dispatched or connection
    /// acquired.
    ///
    /// # Errors
    ///
    /// [`spork_core::QueryError::InsertRowMismatch`] and friends for
    /// inconsistent rows, plus listener-misuse and database errors.
    pub async fn run_insert_many(
        &self,
        query: Query,
        rows: Vec<ColumnValues>,
        return_keys: bool,
    ) -> Result<InsertResult> {
        self.insert(query, rows, StatementKind::InsertMany, return_keys)
            .await
    }

    async fn insert(
        &self,
        mut query: Query,
        rows: Vec<ColumnValues>,
        kind: StatementKind,
        return_keys: bool,
    ) -> Result<InsertResult> {
        query.stage_insert(rows)?;
        let report = self.dispatch(EventKind::PreCreate, &mut query)?;

        let result = if report.is_canceled() {
            InsertResult {
                rows_affected: self.run_substitutes(report).await?,
                generated: Vec::new(),
            }
        } else {
            let sql = self.grammar.compile(kind, &query)?;
            let bindings = self.grammar.bind(&query, kind);
            let done = self.execute(&sql, bindings).await?;
            let generated = if return_keys {
                generated_keys(done.last_insert_rowid(), done.rows_affected())
            } else {
                Vec::new()
            };
            InsertResult {
                rows_affected: done.rows_affected(),
                generated,
            }
        };

        self.dispatch(EventKind::PostCreate, &mut query)?;
        Ok(result)
    }

    async fn run_write(
        &self,
        pre: EventKind,
        post: EventKind,
        kind: StatementKind,
        mut query: Query,
    ) -> Result<u64> {
        let report = self.dispatch(pre, &mut query)?;
        let affected = if report.is_canceled() {
            self.run_substitutes(report).await?
        } else {
            let sql = self.grammar.compile(kind, &query)?;
            let bindings = self.grammar.bind(&query, kind);
            self.execute(&sql, bindings).await?.rows_affected()
        };
        self.dispatch(post, &mut query)?;
        Ok(affected)
    }

    async fn run_substitutes(&self, report: Dispatch) -> Result<u64> {
        let mut affected = 0;
        for substitute in report.into_substitutes() {
            let sql = self.grammar.compile(substitute.kind(), substitute.query())?;
            let bindings = self.grammar.bind(substitute.query(), substitute.kind());
            trace!(kind = ?substitute.kind(), "running substitute statement");
            affected += self.execute(&sql, bindings).await?.rows_affected();
        }
        Ok(affected)
    }

    fn dispatch(&self, kind: EventKind, query: &mut Query) -> Result<Dispatch> {
        let report = dispatch(kind, query)?;
        if !report.failures().is_empty() {
            warn!(
                event = %kind,
                table = query.table_name(),
                failures = report.failures().len(),
                "lifecycle listeners failed"
            );
        }
        Ok(report)
    }

    // Raw SQL

    /// Runs raw SQL and returns its rows. No lifecycle events.
    ///
    /// # Errors
    ///
    /// Database errors.
    pub async fn raw(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<Vec<DbRow>> {
        self.fetch(sql, bindings).await
    }

    /// Runs raw SQL and returns the affected row count. No lifecycle events.
    ///
    /// # Errors
    ///
    /// Database errors.
    pub async fn raw_execute(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<u64> {
        Ok(self.execute(sql, bindings).await?.rows_affected())
    }

    /// First row of a raw query, if any.
    ///
    /// # Errors
    ///
    /// Database errors.
    pub async fn first_row(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<Option<DbRow>> {
        Ok(self.fetch(sql, bindings).await?.into_iter().next())
    }

    /// Value of the first column of the first row, if any.
    ///
    /// # Errors
    ///
    /// Database errors.
    pub async fn first_column(
        &self,
        sql: &str,
        bindings: Vec<SqlValue>,
    ) -> Result<Option<SqlValue>> {
        let row = self.first_row(sql, bindings).await?;
        Ok(row.and_then(first_value))
    }

    /// First column of every row, in row order.
    ///
    /// # Errors
    ///
    /// Database errors.
    pub async fn first_column_values(
        &self,
        sql: &str,
        bindings: Vec<SqlValue>,
    ) -> Result<Vec<SqlValue>> {
        let rows = self.fetch(sql, bindings).await?;
        Ok(rows
            .into_iter()
            .filter_map(first_value)
            .collect())
    }

    async fn fetch(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<Vec<DbRow>> {
        debug!(sql = %sql, bindings = bindings.len(), "executing query");
        let mut conn = self.source.acquire().await?;
        let rows = bind_all(sqlx::query(sql), bindings)
            .fetch_all(&mut *conn)
            .await?;
        drop(conn);
        let rows = rows
            .iter()
            .map(DbRow::from_sqlite)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        trace!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    async fn execute(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<SqliteQueryResult> {
        debug!(sql = %sql, bindings = bindings.len(), "executing statement");
        let mut conn = self.source.acquire().await?;
        let done = bind_all(sqlx::query(sql), bindings)
            .execute(&mut *conn)
            .await?;
        trace!(rows_affected = done.rows_affected(), "statement finished");
        Ok(done)
    }
}

fn first_value(row: DbRow) -> Option<SqlValue> {
    row.into_values().into_iter().next().map(|(_, value)| value)
}

/// SQLite assigns consecutive rowids to the rows of one insert.
fn generated_keys(last_rowid: i64, rows: u64) -> Vec<i64> {
    let count = i64::try_from(rows).unwrap_or(0);
    if count == 0 {
        return Vec::new();
    }
    ((last_rowid - count + 1)..=last_rowid).collect()
}

fn bind_all(mut query: SqliteQuery<'_>, bindings: Vec<SqlValue>) -> SqliteQuery<'_> {
    for value in bindings {
        query = bind_value(query, value);
    }
    query
}

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
        SqlValue::Timestamp(ts) => query.bind(ts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_consecutive() {
        assert_eq!(generated_keys(10, 3), vec![8, 9, 10]);
        assert_eq!(generated_keys(1, 1), vec![1]);
        assert!(generated_keys(5, 0).is_empty());
    }

    #[test]
    fn test_first_value_takes_leading_column() {
        let row = DbRow::new(ColumnValues::new().with("a", 1).with("b", 2));
        assert_eq!(first_value(row), Some(SqlValue::Int(1)));
        assert_eq!(first_value(DbRow::default()), None);
    }

    #[test]
    fn test_insert_result_first_key() {
        let result = InsertResult {
            rows_affected: 2,
            generated: vec![4, 5],
        };
        assert_eq!(result.generated_key(), Some(4));
        assert_eq!(InsertResult::default().generated_key(), None);
    }
}
