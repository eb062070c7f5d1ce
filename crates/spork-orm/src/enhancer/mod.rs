//! Enhancers: cross-cutting model behaviour layered onto queries.
//!
//! An enhancer gets two kinds of hooks:
//!
//! - [`Enhancer::enhance`] runs once on every freshly built model query and
//!   typically registers lifecycle listeners on it.
//! - [`Enhancer::on_insert`] and [`Enhancer::on_update`] adjust the write set
//!   before a record or bulk write is staged.
//!
//! Enhancers are addressed by name so a single query can opt out of one
//! (see [`crate::ModelQuery::without_enhancer`]).

mod scope;
mod soft_delete;
mod timestamps;

use std::sync::Arc;

use spork_core::{ColumnValues, Query, Schema};

pub use scope::ColumnScope;
pub use soft_delete::SoftDeletes;
pub use timestamps::Timestamps;

use crate::model::Model;

/// Name of the built-in soft-delete enhancer.
pub const SOFT_DELETE: &str = "soft_delete";

/// Name of the built-in timestamps enhancer.
pub const TIMESTAMPS: &str = "timestamps";

/// A named extension applied to model queries and writes.
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &str;

    /// Adjusts a freshly built query, usually by registering listeners.
    fn enhance(&self, _schema: &'static Schema, _query: &mut Query) {}

    /// Adjusts the values of a row about to be inserted.
    fn on_insert(&self, _schema: &'static Schema, _values: &mut ColumnValues) {}

    /// Adjusts the `SET` list of an update about to run.
    fn on_update(&self, _schema: &'static Schema, _values: &mut ColumnValues) {}
}

/// Enhancers of `M`, in application order.
///
/// Model-declared enhancers come first, then timestamps, then soft
/// deletes, so scopes have constrained a delete before soft deletion
/// cancels it.
#[must_use]
pub fn enhancers_for<M: Model>() -> Vec<Arc<dyn Enhancer>> {
    let schema = M::schema();
    let mut enhancers = M::enhancers();
    if schema.timestamps().is_some() {
        enhancers.push(Arc::new(Timestamps));
    }
    if schema.soft_delete_column().is_some() {
        enhancers.push(Arc::new(SoftDeletes));
    }
    enhancers
}
