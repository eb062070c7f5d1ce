//! Bounded worker pool and blocking entry points.
//!
//! [`BlockingExecutor`] exposes the same operations as [`Executor`] for
//! synchronous callers. Each call spawns the async path onto the pool and
//! blocks the calling thread on its join handle. Calling it from inside an
//! async context panics, as with any tokio `block_on`.

use std::future::Future;
use std::sync::Arc;

use spork_core::{ColumnValues, Query, SqlValue};
use tokio::runtime::Builder;
use tracing::debug;

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::executor::{Executor, InsertResult};
use crate::row::DbRow;

/// Multi-thread tokio runtime sized from [`ExecutorConfig`].
#[derive(Debug)]
pub struct Runtime {
    inner: tokio::runtime::Runtime,
}

impl Runtime {
    /// Builds the pool.
    ///
    /// # Errors
    ///
    /// [`crate::OrmError::Runtime`] if the threads cannot be started.
    pub fn new(config: &ExecutorConfig) -> Result<Self> {
        let inner = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;
        debug!(
            workers = config.worker_threads.max(1),
            thread_name = %config.thread_name,
            "query pool started"
        );
        Ok(Self { inner })
    }

    /// Runs `future` to completion on the calling thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.inner.block_on(future)
    }

    /// Runs `future` on a pool worker and waits for it.
    ///
    /// # Errors
    ///
    /// [`crate::OrmError::Join`] if the task panicked, otherwise the
    /// future's own result.
    pub fn submit<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.inner.spawn(future);
        self.inner.block_on(handle)?
    }
}

/// Synchronous facade over [`Executor`].
#[derive(Debug)]
pub struct BlockingExecutor {
    executor: Arc<Executor>,
    runtime: Runtime,
}

impl BlockingExecutor {
    #[must_use]
    pub fn new(executor: Executor, runtime: Runtime) -> Self {
        Self {
            executor: Arc::new(executor),
            runtime,
        }
    }

    /// The wrapped async executor.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Blocking [`Executor::run_select`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn select(&self, query: Query) -> Result<Vec<DbRow>> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_select(query).await })
    }

    /// Blocking [`Executor::run_exists`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn exists(&self, query: Query) -> Result<bool> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_exists(query).await })
    }

    /// Blocking [`Executor::run_update`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn update(&self, query: Query, values: ColumnValues) -> Result<u64> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_update(query, values).await })
    }

    /// Blocking [`Executor::run_delete`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn delete(&self, query: Query) -> Result<u64> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_delete(query).await })
    }

    /// Blocking [`Executor::run_insert`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn insert(&self, query: Query, row: ColumnValues, return_key: bool) -> Result<InsertResult> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_insert(query, row, return_key).await })
    }

    /// Blocking [`Executor::run_insert_many`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn insert_many(
        &self,
        query: Query,
        rows: Vec<ColumnValues>,
        return_keys: bool,
    ) -> Result<InsertResult> {
        let executor = Arc::clone(&self.executor);
        self.runtime
            .submit(async move { executor.run_insert_many(query, rows, return_keys).await })
    }

    /// Blocking [`Executor::raw_execute`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn raw_execute(&self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Result<u64> {
        let executor = Arc::clone(&self.executor);
        let sql = sql.into();
        self.runtime
            .submit(async move { executor.raw_execute(&sql, bindings).await })
    }

    /// Blocking [`Executor::raw`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn raw(&self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Result<Vec<DbRow>> {
        let executor = Arc::clone(&self.executor);
        let sql = sql.into();
        self.runtime
            .submit(async move { executor.raw(&sql, bindings).await })
    }

    /// Blocking [`Executor::first_row`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn first_row(
        &self,
        sql: impl Into<String>,
        bindings: Vec<SqlValue>,
    ) -> Result<Option<DbRow>> {
        let executor = Arc::clone(&self.executor);
        let sql = sql.into();
        self.runtime
            .submit(async move { executor.first_row(&sql, bindings).await })
    }

    /// Blocking [`Executor::first_column`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn first_column(
        &self,
        sql: impl Into<String>,
        bindings: Vec<SqlValue>,
    ) -> Result<Option<SqlValue>> {
        let executor = Arc::clone(&self.executor);
        let sql = sql.into();
        self.runtime
            .submit(async move { executor.first_column(&sql, bindings).await })
    }

    /// Blocking [`Executor::first_column_values`].
    ///
    /// # Errors
    ///
    /// Same as the async call, plus [`crate::OrmError::Join`].
    pub fn first_column_values(
        &self,
        sql: impl Into<String>,
        bindings: Vec<SqlValue>,
    ) -> Result<Vec<SqlValue>> {
        let executor = Arc::clone(&self.executor);
        let sql = sql.into();
        self.runtime
            .submit(async move { executor.first_column_values(&sql, bindings).await })
    }
}
