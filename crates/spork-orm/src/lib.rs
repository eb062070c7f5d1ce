//! # spork-orm
//!
//! Execution and model layer for the spork data-mapping layer.
//!
//! This crate provides:
//! - [`Executor`]: compiles `spork-core` queries, dispatches lifecycle
//!   events and runs the statements over a [`ConnectionSource`]
//! - [`BlockingExecutor`]: the same operations for synchronous callers,
//!   backed by a bounded worker [`Runtime`]
//! - [`Model`], [`Record`] and [`ModelQuery`]: change-tracked entities with
//!   [`Enhancer`]s such as [`SoftDeletes`], [`Timestamps`] and
//!   [`ColumnScope`]
//! - [`HasOne`] and [`HasMany`]: lazily loaded, cached relationships
//!
//! ## Quick Start
//!
//! ```ignore
//! use spork_core::{MySqlGrammar, Query};
//! use spork_orm::Executor;
//! use sqlx::SqlitePool;
//!
//! async fn example(pool: SqlitePool) -> spork_orm::Result<()> {
//!     let executor = Executor::new(pool, MySqlGrammar);
//!
//!     let rows = executor
//!         .run_select(Query::table("users").where_eq("active", true))
//!         .await?;
//!
//!     let removed = executor
//!         .run_delete(Query::table("sessions").where_null("user_id"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod enhancer;
pub mod error;
pub mod executor;
pub mod model;
pub mod query;
pub mod relation;
pub mod row;
pub mod runtime;

pub use config::{Dialect, ExecutorConfig};
pub use connection::{Connection, ConnectionSource};
pub use enhancer::{
    enhancers_for, ColumnScope, Enhancer, SoftDeletes, Timestamps, SOFT_DELETE, TIMESTAMPS,
};
pub use error::{OrmError, Result};
pub use executor::{Executor, InsertResult};
pub use model::{Model, Record};
pub use query::ModelQuery;
pub use relation::{HasMany, HasOne};
pub use row::{decode, DbRow};
pub use runtime::{BlockingExecutor, Runtime};

pub use spork_core;
