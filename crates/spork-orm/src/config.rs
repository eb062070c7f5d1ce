//! Executor configuration.

use std::sync::Arc;

use serde::Deserialize;
use spork_core::{Grammar, MySqlGrammar, SqliteGrammar};

/// SQL dialect selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// Grammar for this dialect.
    #[must_use]
    pub fn grammar(self) -> Arc<dyn Grammar> {
        match self {
            Self::MySql => Arc::new(MySqlGrammar),
            Self::Sqlite => Arc::new(SqliteGrammar),
        }
    }
}

/// Settings for [`crate::Executor`] and [`crate::Runtime`].
///
/// Every field has a default, so partial documents deserialize:
///
/// ```rust
/// use spork_orm::{Dialect, ExecutorConfig};
///
/// let config: ExecutorConfig = serde_json::from_str(r#"{ "dialect": "sqlite" }"#).unwrap();
/// assert_eq!(config.dialect, Dialect::Sqlite);
/// assert_eq!(config.worker_threads, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker threads in the query pool.
    pub worker_threads: usize,
    /// Worker thread name.
    pub thread_name: String,
    pub dialect: Dialect,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 5,
            thread_name: String::from("spork-query"),
            dialect: Dialect::default(),
        }
    }
}
