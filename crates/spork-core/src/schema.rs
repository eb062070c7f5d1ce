//! Static schema descriptors.
//!
//! Entity metadata is declared once per type as plain data, typically in a
//! `static`:
//!
//! ```rust
//! use spork_core::schema::{ColumnDef, Schema};
//!
//! const COLUMNS: &[ColumnDef] = &[
//!     ColumnDef::new("id").primary_key().auto_increment(),
//!     ColumnDef::new("title"),
//!     ColumnDef::new("views").has_default(),
//!     ColumnDef::new("created_at"),
//!     ColumnDef::new("updated_at"),
//! ];
//!
//! static POSTS: Schema =
//!     Schema::new("posts", COLUMNS).with_timestamps("created_at", "updated_at");
//!
//! assert_eq!(POSTS.primary_key(), "id");
//! assert!(POSTS.is_auto_increment());
//! ```

/// Column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// The database supplies a default; a null value is left out of inserts.
    pub has_default: bool,
}

impl ColumnDef {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            auto_increment: false,
            has_default: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub const fn has_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// `created_at` / `updated_at` column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampColumns {
    pub created: &'static str,
    pub updated: &'static str,
}

/// Table metadata for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    table: &'static str,
    columns: &'static [ColumnDef],
    timestamps: Option<TimestampColumns>,
    soft_delete: Option<&'static str>,
}

impl Schema {
    #[must_use]
    pub const fn new(table: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self {
            table,
            columns,
            timestamps: None,
            soft_delete: None,
        }
    }

    /// Maintains `created` and `updated` automatically.
    #[must_use]
    pub const fn with_timestamps(mut self, created: &'static str, updated: &'static str) -> Self {
        self.timestamps = Some(TimestampColumns { created, updated });
        self
    }

    /// Deletes set `column` instead of removing the row.
    #[must_use]
    pub const fn soft_deletes(mut self, column: &'static str) -> Self {
        self.soft_delete = Some(column);
        self
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    #[must_use]
    pub const fn columns(&self) -> &'static [ColumnDef] {
        self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key column, `id` when none is flagged.
    #[must_use]
    pub fn primary_key(&self) -> &'static str {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map_or("id", |c| c.name)
    }

    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key && c.auto_increment)
    }

    #[must_use]
    pub const fn timestamps(&self) -> Option<TimestampColumns> {
        self.timestamps
    }

    #[must_use]
    pub const fn soft_delete_column(&self) -> Option<&'static str> {
        self.soft_delete
    }
}
