//! Model-scoped queries.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use spork_core::{ColumnValues, Query, SqlValue, ToSqlValue};

use crate::enhancer::{enhancers_for, Enhancer, SOFT_DELETE};
use crate::error::{OrmError, Result};
use crate::executor::Executor;
use crate::model::{Model, Record};

/// A [`Query`] over `M`'s table with `M`'s enhancers attached at run time.
///
/// ```ignore
/// let drafts = Post::query()
///     .filter(|q| q.where_eq("status", "draft").order_by("id", Direction::Desc))
///     .get(&executor)
///     .await?;
/// ```
pub struct ModelQuery<M: Model> {
    query: Query,
    skipped: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelQuery<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            query: Query::table(M::schema().table()),
            skipped: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Refines the underlying query.
    #[must_use]
    pub fn filter(mut self, f: impl FnOnce(Query) -> Query) -> Self {
        self.query = f(self.query);
        self
    }

    /// Refines the underlying query with a fallible builder step.
    ///
    /// # Errors
    ///
    /// The builder's error, e.g. an operator outside the whitelist.
    pub fn try_filter(
        mut self,
        f: impl FnOnce(Query) -> spork_core::Result<Query>,
    ) -> Result<Self> {
        self.query = f(self.query)?;
        Ok(self)
    }

    /// Skips the enhancer called `name` for this query only.
    #[must_use]
    pub fn without_enhancer(mut self, name: impl Into<String>) -> Self {
        self.skipped.push(name.into());
        self
    }

    /// Includes soft-deleted rows. A delete on this query removes rows.
    #[must_use]
    pub fn with_trashed(self) -> Self {
        self.without_enhancer(SOFT_DELETE)
    }

    /// Only soft-deleted rows.
    ///
    /// # Errors
    ///
    /// [`OrmError::NotSoftDeleting`] if the model has no soft-delete column.
    pub fn only_trashed(self) -> Result<Self> {
        let column = Self::soft_delete_column()?;
        Ok(self.with_trashed().filter(|q| q.where_not_null(column)))
    }

    /// Enhancers that will run, in order.
    #[must_use]
    pub fn enhancers(&self) -> Vec<Arc<dyn Enhancer>> {
        enhancers_for::<M>()
            .into_iter()
            .filter(|e| !self.skipped.iter().any(|name| name == e.name()))
            .collect()
    }

    /// The underlying query with enhancer listeners registered.
    #[must_use]
    pub fn into_query(self) -> Query {
        let schema = M::schema();
        let enhancers = self.enhancers();
        let mut query = self.query;
        for enhancer in &enhancers {
            enhancer.enhance(schema, &mut query);
        }
        query
    }

    /// All matching records.
    ///
    /// # Errors
    ///
    /// Execution and decoding errors.
    pub async fn get(self, executor: &Executor) -> Result<Vec<Record<M>>> {
        let rows = executor.run_select(self.into_query()).await?;
        rows.iter().map(Record::hydrate).collect()
    }

    /// The first matching record.
    ///
    /// # Errors
    ///
    /// Execution and decoding errors.
    pub async fn first(self, executor: &Executor) -> Result<Option<Record<M>>> {
        let records = self.filter(|q| q.limit(1)).get(executor).await?;
        Ok(records.into_iter().next())
    }

    /// The record with primary key `key`.
    ///
    /// # Errors
    ///
    /// Execution and decoding errors.
    pub async fn find(
        self,
        executor: &Executor,
        key: impl ToSqlValue + Send,
    ) -> Result<Option<Record<M>>> {
        let pk = M::schema().primary_key();
        self.filter(|q| q.where_eq(pk, key)).first(executor).await
    }

    /// Returns `true` if any row matches.
    ///
    /// # Errors
    ///
    /// Execution errors.
    pub async fn exists(self, executor: &Executor) -> Result<bool> {
        executor.run_exists(self.into_query()).await
    }

    /// Bulk update. Enhancers adjust `values` first (timestamps, for one).
    ///
    /// # Errors
    ///
    /// [`spork_core::QueryError::EmptyAssignment`] and execution errors.
    pub async fn update(self, executor: &Executor, mut values: ColumnValues) -> Result<u64> {
        let schema = M::schema();
        if !values.is_empty() {
            for enhancer in self.enhancers() {
                enhancer.on_update(schema, &mut values);
            }
        }
        executor.run_update(self.into_query(), values).await
    }

    /// Bulk delete. Soft-deleting models turn this into an update.
    ///
    /// # Errors
    ///
    /// Execution errors.
    pub async fn delete(self, executor: &Executor) -> Result<u64> {
        executor.run_delete(self.into_query()).await
    }

    /// Clears the soft-delete column on every matching trashed row.
    ///
    /// # Errors
    ///
    /// [`OrmError::NotSoftDeleting`] and execution errors.
    pub async fn restore(self, executor: &Executor) -> Result<u64> {
        let column = Self::soft_delete_column()?;
        self.only_trashed()?
            .update(executor, ColumnValues::new().with(column, SqlValue::Null))
            .await
    }

    fn soft_delete_column() -> Result<&'static str> {
        let schema = M::schema();
        schema
            .soft_delete_column()
            .ok_or(OrmError::NotSoftDeleting(schema.table()))
    }
}

impl<M: Model> Default for ModelQuery<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for ModelQuery<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            skipped: self.skipped.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for ModelQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelQuery")
            .field("table", &M::schema().table())
            .field("query", &self.query)
            .field("skipped", &self.skipped)
            .finish()
    }
}
