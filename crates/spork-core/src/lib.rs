//! # spork-core
//!
//! Query descriptors, clause model and SQL grammars for the spork
//! data-mapping layer.
//!
//! This crate is pure: it builds [`Query`] descriptors, compiles them into
//! parameterized SQL through a [`Grammar`] and keeps every bound value in
//! the exact order its `?` placeholder appears. Execution lives in
//! `spork-orm`.
//!
//! ```rust
//! use spork_core::{Grammar, MySqlGrammar, Query, SqlValue, StatementKind};
//!
//! let query = Query::table("testing").where_in("x", [1, 2, 3]);
//!
//! assert_eq!(
//!     MySqlGrammar.compile_select(&query),
//!     "SELECT * FROM `testing` WHERE `x` IN (?, ?, ?)"
//! );
//! assert_eq!(
//!     MySqlGrammar.bind(&query, StatementKind::Select),
//!     vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
//! );
//! ```

pub mod binding;
pub mod clause;
pub mod dirty;
pub mod error;
pub mod event;
pub mod grammar;
pub mod query;
pub mod schema;
pub mod value;

pub use binding::{Bindings, Section, StatementKind};
pub use clause::{Clause, ClauseKind, Connector, Direction, JoinKind, Operator, OPERATORS};
pub use dirty::{Attributes, DirtyTracker};
pub use error::{QueryError, Result};
pub use event::{
    dispatch, Dispatch, ErrorPolicy, EventBus, EventKind, HookError, HookOutcome, HookResult,
    LifecycleEvent, ListenerId, Substitute,
};
pub use grammar::{Grammar, MySqlGrammar, SqliteGrammar};
pub use query::Query;
pub use schema::{ColumnDef, Schema, TimestampColumns};
pub use value::{ColumnValues, FromSqlValue, SqlValue, ToSqlValue};
