//! Dirty-state tracking.
//!
//! A [`DirtyTracker`] remembers the attribute snapshot taken when an entity
//! was last hydrated, inserted or updated, and diffs the entity's current
//! attributes against it.

use std::collections::HashMap;

use crate::value::{ColumnValues, SqlValue};

/// Produces an ordered `column -> value` snapshot of an entity.
pub trait Attributes {
    fn attributes(&self) -> ColumnValues;
}

/// Last-persisted snapshot of one entity.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    persisted: HashMap<String, SqlValue>,
}

impl DirtyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot with the entity's current attributes.
    pub fn snapshot<E: Attributes + ?Sized>(&mut self, entity: &E) -> &HashMap<String, SqlValue> {
        self.persisted = entity.attributes().into_iter().collect();
        &self.persisted
    }

    /// Forgets the snapshot; every column becomes dirty.
    pub fn forget(&mut self) {
        self.persisted.clear();
    }

    /// Persisted value of a column.
    #[must_use]
    pub fn original(&self, column: &str) -> Option<&SqlValue> {
        self.persisted.get(column)
    }

    /// Dirty columns, in attribute order.
    ///
    /// A column missing from the snapshot is always dirty.
    #[must_use]
    pub fn diff<E: Attributes + ?Sized>(&self, entity: &E) -> Vec<String> {
        self.dirty_values(entity).columns().map(String::from).collect()
    }

    /// Dirty columns with their current values.
    #[must_use]
    pub fn dirty_values<E: Attributes + ?Sized>(&self, entity: &E) -> ColumnValues {
        let mut current = entity.attributes();
        current.retain(|column, value| self.persisted.get(column) != Some(value));
        current
    }

    #[must_use]
    pub fn is_dirty<E: Attributes + ?Sized>(&self, entity: &E) -> bool {
        !self.diff(entity).is_empty()
    }
}
