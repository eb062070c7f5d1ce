//! Model trait and change-tracked records.
//!
//! A [`Model`] is a plain struct that knows its [`Schema`], how to read
//! itself from a [`DbRow`] and how to accept a single attribute by name.
//! [`Record`] wraps a model with its persisted snapshot and drives
//! inserts, dirty-only updates and (soft) deletes.
//!
//! # Example
//!
//! ```ignore
//! static POSTS: Schema = Schema::new("posts", COLUMNS)
//!     .with_timestamps("created_at", "updated_at")
//!     .soft_deletes("deleted_at");
//!
//! let mut post = Record::new(Post { id: 0, title: "hello".into(), ..Post::default() });
//! post.save(&executor).await?;
//!
//! post.model_mut().title = "edited".into();
//! post.save(&executor).await?; // UPDATE `posts` SET `title` = ?, `updated_at` = ? WHERE `id` = ?
//!
//! post.delete(&executor).await?; // sets `deleted_at`
//! ```

use std::sync::Arc;

use chrono::Utc;
use spork_core::{Attributes, ColumnValues, DirtyTracker, Schema, SqlValue};
use tracing::{debug, trace, warn};

use crate::enhancer::{enhancers_for, Enhancer, SOFT_DELETE};
use crate::error::{OrmError, Result};
use crate::executor::Executor;
use crate::query::ModelQuery;
use crate::row::DbRow;

/// A persistable entity.
pub trait Model: Attributes + Sized + Send + Sync + 'static {
    /// Table metadata.
    fn schema() -> &'static Schema;

    /// Builds the model from a result row.
    ///
    /// # Errors
    ///
    /// Missing or mistyped columns.
    fn from_row(row: &DbRow) -> Result<Self>;

    /// Writes one attribute by column name.
    ///
    /// # Errors
    ///
    /// [`OrmError::UnknownAttribute`] for a column the model does not have,
    /// [`OrmError::Decode`] for a value of the wrong type.
    fn set_attribute(&mut self, column: &str, value: SqlValue) -> Result<()>;

    /// Model-specific enhancers, applied before the schema-derived ones.
    fn enhancers() -> Vec<Arc<dyn Enhancer>> {
        Vec::new()
    }

    /// A fresh query over this model's table.
    fn query() -> ModelQuery<Self> {
        ModelQuery::new()
    }
}

/// A model instance plus its persisted state.
#[derive(Debug, Clone)]
pub struct Record<M: Model> {
    model: M,
    tracker: DirtyTracker,
    exists: bool,
}

impl<M: Model> Record<M> {
    /// Wraps a model that has not been inserted yet.
    #[must_use]
    pub fn new(model: M) -> Self {
        Self {
            model,
            tracker: DirtyTracker::new(),
            exists: false,
        }
    }

    /// Builds a persisted record from a result row.
    ///
    /// # Errors
    ///
    /// Whatever [`Model::from_row`] returns.
    pub fn hydrate(row: &DbRow) -> Result<Self> {
        let model = M::from_row(row)?;
        let mut tracker = DirtyTracker::new();
        tracker.snapshot(&model);
        Ok(Self {
            model,
            tracker,
            exists: true,
        })
    }

    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    #[must_use]
    pub fn into_model(self) -> M {
        self.model
    }

    /// Returns `true` once the record has been inserted or loaded.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    /// Returns `true` if any attribute differs from the persisted snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(&self.model)
    }

    /// Changed columns, in attribute order.
    #[must_use]
    pub fn dirty_columns(&self) -> Vec<String> {
        self.tracker.diff(&self.model)
    }

    /// Returns `true` if the soft-delete column is set.
    #[must_use]
    pub fn is_trashed(&self) -> bool {
        M::schema()
            .soft_delete_column()
            .and_then(|column| self.model.attributes().get(column).cloned())
            .is_some_and(|value| !value.is_null())
    }

    /// Inserts a new record or updates the dirty columns of an existing
    /// one. Returns `false` when there was nothing to write.
    ///
    /// # Errors
    ///
    /// Execution errors, and [`OrmError::MissingPrimaryKey`] when an
    /// existing record cannot be addressed.
    pub async fn save(&mut self, executor: &Executor) -> Result<bool> {
        let previous = self.model.attributes();
        let saved = self.persist(executor).await;
        if saved.is_err() {
            self.revert(&previous);
        }
        saved
    }

    async fn persist(&mut self, executor: &Executor) -> Result<bool> {
        if self.exists {
            if !self.is_dirty() {
                trace!(table = M::schema().table(), "record is clean, nothing to save");
                return Ok(false);
            }
            self.update(executor).await?;
        } else {
            self.create(executor).await?;
            self.exists = true;
        }
        self.tracker.snapshot(&self.model);
        Ok(true)
    }

    /// Deletes the record. Soft-deleting models only set their deleted-at
    /// column.
    ///
    /// # Errors
    ///
    /// Execution errors.
    pub async fn delete(&mut self, executor: &Executor) -> Result<bool> {
        let schema = M::schema();
        let Some(column) = schema.soft_delete_column() else {
            return self.force_delete(executor).await;
        };
        if !self.exists {
            return Ok(false);
        }
        self.write_column(executor, column, SqlValue::Timestamp(Utc::now()))
            .await
    }

    /// Removes the row, bypassing soft deletes.
    ///
    /// # Errors
    ///
    /// Execution errors and [`OrmError::MissingPrimaryKey`].
    pub async fn force_delete(&mut self, executor: &Executor) -> Result<bool> {
        if !self.exists {
            return Ok(false);
        }
        let schema = M::schema();
        let key = self.key()?;
        let query = ModelQuery::<M>::new()
            .without_enhancer(SOFT_DELETE)
            .filter(|q| q.where_eq(schema.primary_key(), key))
            .into_query();
        let affected = executor.run_delete(query).await?;
        debug!(table = schema.table(), affected, "record deleted");
        self.exists = false;
        self.tracker.forget();
        Ok(affected > 0)
    }

    /// Clears the soft-delete column.
    ///
    /// # Errors
    ///
    /// [`OrmError::NotSoftDeleting`] if the model has no soft-delete column,
    /// plus execution errors.
    pub async fn restore(&mut self, executor: &Executor) -> Result<bool> {
        let schema = M::schema();
        let column = schema
            .soft_delete_column()
            .ok_or(OrmError::NotSoftDeleting(schema.table()))?;
        self.write_column(executor, column, SqlValue::Null).await
    }

    /// Sets one attribute and saves, undoing the change if the write fails.
    async fn write_column(
        &mut self,
        executor: &Executor,
        column: &str,
        value: SqlValue,
    ) -> Result<bool> {
        let previous = self.model.attributes();
        if let Err(err) = self.model.set_attribute(column, value) {
            self.revert(&previous);
            return Err(err);
        }
        let saved = self.persist(executor).await;
        if saved.is_err() {
            self.revert(&previous);
        }
        saved
    }

    /// Puts back attribute values captured before a failed write.
    fn revert(&mut self, previous: &ColumnValues) {
        if let Err(err) = self.sync(previous) {
            warn!(table = M::schema().table(), error = %err, "could not revert record attributes");
        }
    }

    async fn create(&mut self, executor: &Executor) -> Result<()> {
        let schema = M::schema();
        let mut values = self.model.attributes();
        values.retain(|column, value| match schema.column(column) {
            Some(def) if def.primary_key && def.auto_increment => !is_unset_key(value),
            Some(def) if def.has_default => !value.is_null(),
            _ => true,
        });
        for enhancer in enhancers_for::<M>() {
            enhancer.on_insert(schema, &mut values);
        }
        self.sync(&values)?;

        let query = ModelQuery::<M>::new().into_query();
        let result = executor
            .run_insert(query, values, schema.is_auto_increment())
            .await?;
        if let Some(key) = result.generated_key() {
            self.model
                .set_attribute(schema.primary_key(), SqlValue::Int(key))?;
        }
        debug!(table = schema.table(), key = ?result.generated_key(), "record created");
        Ok(())
    }

    async fn update(&mut self, executor: &Executor) -> Result<()> {
        let schema = M::schema();
        let key = self.key()?;
        let mut values = self.tracker.dirty_values(&self.model);
        for enhancer in enhancers_for::<M>() {
            enhancer.on_update(schema, &mut values);
        }
        self.sync(&values)?;

        let query = ModelQuery::<M>::new()
            .filter(|q| q.where_eq(schema.primary_key(), key))
            .into_query();
        let columns = values.len();
        executor.run_update(query, values).await?;
        debug!(table = schema.table(), columns, "record updated");
        Ok(())
    }

    /// Persisted primary key, falling back to the current one.
    fn key(&self) -> Result<SqlValue> {
        let schema = M::schema();
        let pk = schema.primary_key();
        self.tracker
            .original(pk)
            .cloned()
            .or_else(|| self.model.attributes().get(pk).cloned())
            .filter(|value| !value.is_null())
            .ok_or(OrmError::MissingPrimaryKey(schema.table()))
    }

    /// Writes `values` onto the model where they differ.
    fn sync(&mut self, values: &ColumnValues) -> Result<()> {
        let current = self.model.attributes();
        for (column, value) in values.iter() {
            if current.get(column) != Some(value) {
                self.model.set_attribute(column, value.clone())?;
            }
        }
        Ok(())
    }
}

/// An auto-increment key the database should assign.
fn is_unset_key(value: &SqlValue) -> bool {
    matches!(value, SqlValue::Null | SqlValue::Int(0))
}
