//! Connection source SPI.
//!
//! Pooling and connection lifetime are owned outside this crate. The
//! executor only asks a [`ConnectionSource`] for a connection right before
//! a statement runs and drops it as soon as the statement finished, which
//! hands it back to the pool on every exit path.

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};

/// A pooled SQLite connection, returned to its pool on drop.
pub type Connection = PoolConnection<Sqlite>;

/// Hands out connections on demand.
pub trait ConnectionSource: Send + Sync {
    /// Acquires one connection.
    fn acquire(&self) -> BoxFuture<'_, Result<Connection, sqlx::Error>>;
}

impl ConnectionSource for SqlitePool {
    fn acquire(&self) -> BoxFuture<'_, Result<Connection, sqlx::Error>> {
        sqlx::Pool::acquire(self).boxed()
    }
}
