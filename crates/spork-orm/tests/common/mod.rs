//! Shared fixtures for the executor and model tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use spork_core::{Attributes, ColumnDef, ColumnValues, Schema, SqlValue, SqliteGrammar};
use spork_orm::{decode, Connection, ConnectionSource, DbRow, Executor, Model, OrmError, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Single-connection in-memory database that lives as long as the pool.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Pool wrapper that counts acquisitions.
#[derive(Clone)]
pub struct CountingSource {
    pool: SqlitePool,
    acquired: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for CountingSource {
    fn acquire(&self) -> BoxFuture<'_, std::result::Result<Connection, sqlx::Error>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.pool.acquire().boxed()
    }
}

pub const USERS_DDL: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER
)";

pub const POSTS_DDL: &str = "CREATE TABLE posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id INTEGER NOT NULL DEFAULT 0,
    title TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0,
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
)";

/// Executor over a fresh database with `ddl` applied.
pub async fn executor_with(ddl: &[&str]) -> (Executor, CountingSource) {
    init_tracing();
    let pool = memory_pool().await;
    for statement in ddl {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    let source = CountingSource::new(pool);
    (Executor::new(source.clone(), SqliteGrammar), source)
}

const POST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id").primary_key().auto_increment(),
    ColumnDef::new("tenant_id").has_default(),
    ColumnDef::new("title"),
    ColumnDef::new("views").has_default(),
    ColumnDef::new("created_at"),
    ColumnDef::new("updated_at"),
    ColumnDef::new("deleted_at"),
];

pub static POSTS: Schema = Schema::new("posts", POST_COLUMNS)
    .with_timestamps("created_at", "updated_at")
    .soft_deletes("deleted_at");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub title: String,
    pub views: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Post {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }
}

impl Attributes for Post {
    fn attributes(&self) -> ColumnValues {
        ColumnValues::new()
            .with("id", self.id)
            .with("tenant_id", self.tenant_id)
            .with("title", &self.title)
            .with("views", self.views)
            .with("created_at", self.created_at)
            .with("updated_at", self.updated_at)
            .with("deleted_at", self.deleted_at)
    }
}

impl Model for Post {
    fn schema() -> &'static Schema {
        &POSTS
    }

    fn from_row(row: &DbRow) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            title: row.get("title")?,
            views: row.get("views")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    fn set_attribute(&mut self, column: &str, value: SqlValue) -> Result<()> {
        match column {
            "id" => self.id = decode(column, &value)?,
            "tenant_id" => self.tenant_id = decode(column, &value)?,
            "title" => self.title = decode(column, &value)?,
            "views" => self.views = decode(column, &value)?,
            "created_at" => self.created_at = decode(column, &value)?,
            "updated_at" => self.updated_at = decode(column, &value)?,
            "deleted_at" => self.deleted_at = decode(column, &value)?,
            _ => {
                return Err(OrmError::UnknownAttribute {
                    table: POSTS.table(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }
}

pub const COMMENTS_DDL: &str = "CREATE TABLE comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER,
    body TEXT NOT NULL
)";

const COMMENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id").primary_key().auto_increment(),
    ColumnDef::new("post_id"),
    ColumnDef::new("body"),
];

pub static COMMENTS: Schema = Schema::new("comments", COMMENT_COLUMNS);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: Option<i64>,
    pub body: String,
}

impl Comment {
    pub fn on(post_id: i64, body: &str) -> Self {
        Self {
            id: 0,
            post_id: Some(post_id),
            body: body.to_string(),
        }
    }
}

impl Attributes for Comment {
    fn attributes(&self) -> ColumnValues {
        ColumnValues::new()
            .with("id", self.id)
            .with("post_id", self.post_id)
            .with("body", &self.body)
    }
}

impl Model for Comment {
    fn schema() -> &'static Schema {
        &COMMENTS
    }

    fn from_row(row: &DbRow) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            post_id: row.get("post_id")?,
            body: row.get("body")?,
        })
    }

    fn set_attribute(&mut self, column: &str, value: SqlValue) -> Result<()> {
        match column {
            "id" => self.id = decode(column, &value)?,
            "post_id" => self.post_id = decode(column, &value)?,
            "body" => self.body = decode(column, &value)?,
            _ => {
                return Err(OrmError::UnknownAttribute {
                    table: COMMENTS.table(),
                    column: column.to_string(),
                })
            }
        }
        Ok(())
    }
}
